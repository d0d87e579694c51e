use screening_core::memory::{MemoryPage, NodeSpec, Rect};
use screening_core::{Document, Element, HostError};

fn shop() -> MemoryPage {
    MemoryPage::from_json_str(
        r#"{
            "title": "Shop",
            "url": "http://shop.test/",
            "window": [800, 600],
            "body": [
                {"tag": "nav", "children": [
                    {"tag": "a", "attributes": {"href": "/home"}, "text": "Home"},
                    {"tag": "a", "attributes": {"href": "/cart", "class": "cart"}, "text": "Cart"}
                ]},
                {"tag": "ul", "attributes": {"id": "items"}, "children": [
                    {"tag": "li", "text": "Apple"},
                    {"tag": "li", "text": "Pear", "children": [{"tag": "span", "text": " (sale)"}]},
                    {"tag": "li", "text": "Plum"}
                ]},
                {"tag": "div", "attributes": {"id": "banner"},
                 "rect": {"x": 0, "y": 0, "width": 800, "height": 100},
                 "children": [
                    {"tag": "button", "text": "Buy", "rect": {"x": 10, "y": 10, "width": 80, "height": 30}}
                 ]}
            ]
        }"#,
    )
    .unwrap()
}

fn texts(page: &MemoryPage, selector: &str) -> Vec<String> {
    page.evaluate(selector)
        .unwrap()
        .iter()
        .map(|element| element.inner_text().unwrap())
        .collect()
}

#[test]
fn test_fixture_page_metadata() {
    let page = shop();
    assert_eq!(page.title().unwrap(), "Shop");
    assert_eq!(page.url(), "http://shop.test/");
    assert_eq!(page.window_size().unwrap(), (800.0, 600.0));
}

#[test]
fn test_xpath_positions_and_predicates() {
    let page = shop();
    assert_eq!(texts(&page, "//ul/li"), vec!["Apple", "Pear (sale)", "Plum"]);
    assert_eq!(texts(&page, "//ul/li[2]"), vec!["Pear (sale)"]);
    assert_eq!(texts(&page, "//li[last()]"), vec!["Plum"]);
    assert_eq!(texts(&page, "//a[@class]"), vec!["Cart"]);
    assert_eq!(texts(&page, "//a[@href='/home']"), vec!["Home"]);
    assert_eq!(texts(&page, "//li[text()='Plum']"), vec!["Plum"]);
    assert_eq!(texts(&page, "//li[contains(., 'sale')]"), vec!["Pear (sale)"]);
    assert_eq!(texts(&page, "//a[contains(@href, 'car')]"), vec!["Cart"]);
    assert_eq!(texts(&page, "/html/body/nav/*[1]"), vec!["Home"]);
}

#[test]
fn test_xpath_results_are_in_document_order() {
    let page = shop();
    let tags: Vec<String> = page
        .evaluate("//*")
        .unwrap()
        .iter()
        .map(|element| element.tag_name().unwrap())
        .collect();
    assert_eq!(tags[..4], ["HTML", "HEAD", "BODY", "NAV"]);
    assert_eq!(tags.last().map(String::as_str), Some("BUTTON"));

    // Overlapping descendant steps do not produce duplicates.
    assert_eq!(texts(&page, "//body//li").len(), 3);
    assert_eq!(page.evaluate("//*//span").unwrap().len(), 1);
}

#[test]
fn test_invalid_xpath_is_rejected() {
    let page = shop();
    for bad in ["li", "//li[", "//li[@id=1]", "//li]"] {
        match page.evaluate(bad) {
            Err(HostError::InvalidSelector(_)) => {}
            Err(other) => panic!("{}: unexpected error {}", bad, other),
            Ok(found) => panic!("{}: unexpectedly matched {} nodes", bad, found.len()),
        }
    }
}

#[test]
fn test_hit_testing() {
    let page = shop();
    let at = |x, y| page.element_at(x, y).unwrap().unwrap().tag_name().unwrap();
    assert_eq!(at(20.0, 20.0), "BUTTON");
    assert_eq!(at(500.0, 50.0), "DIV");
    assert_eq!(at(500.0, 500.0), "HTML");
}

#[test]
fn test_detached_element_fails_every_operation() {
    let page = MemoryPage::new("Detach");
    let list = page.append(page.body(), &NodeSpec::new("ul"));
    let item = page.append(list, &NodeSpec::new("li").text("x"));
    let handle = page.handle(item);

    page.remove(list);

    assert_eq!(handle.inner_text().unwrap_err(), HostError::Detached);
    assert_eq!(handle.attribute("id").unwrap_err(), HostError::Detached);
    assert_eq!(handle.focus().unwrap_err(), HostError::Detached);
    assert!(page.evaluate("//li").unwrap().is_empty());
}

#[test]
fn test_select_defaults_to_first_option() {
    let page = MemoryPage::new("Select");
    let select = page.append(
        page.body(),
        &NodeSpec::new("select")
            .child(NodeSpec::new("option").text("One"))
            .child(NodeSpec::new("option").attr("value", "2").text("Two")),
    );
    let handle = page.handle(select);

    assert_eq!(handle.selected_index().unwrap(), 0);
    assert_eq!(handle.option_values().unwrap(), vec!["One", "2"]);

    handle.set_selected_index(9).unwrap();
    assert_eq!(handle.selected_index().unwrap(), -1);
}

#[test]
fn test_scroll_is_clamped_at_zero() {
    let page = MemoryPage::new("Scroll");
    page.set_scroll(-5.0, 40.0).unwrap();
    assert_eq!(page.scroll().unwrap(), (0.0, 40.0));

    let node = page.append(page.body(), &NodeSpec::new("div").rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
    let handle = page.handle(node);
    handle.set_scroll(3.0, -1.0).unwrap();
    assert_eq!(handle.scroll().unwrap(), (3.0, 0.0));
}
