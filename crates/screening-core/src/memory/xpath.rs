//! XPath subset for the in-memory page.
//!
//! Supported: absolute location paths built from `/` and `//` steps, name
//! tests and `*`, and the predicates `[n]`, `[last()]`, `[@a]`, `[@a='v']`,
//! `[text()='v']` and `[contains(@a|text()|., 'v')]`.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub type NodeKey = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct XPathError {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    DescendantOrSelfChild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Attribute(String),
    Text,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Position(usize),
    Last,
    HasAttribute(String),
    AttributeEquals(String, String),
    TextEquals(String),
    Contains(Operand, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    pub steps: Vec<Step>,
}

/// Read access to a node tree.
pub trait Tree {
    fn children(&self, node: NodeKey) -> &[NodeKey];
    fn tag(&self, node: NodeKey) -> &str;
    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str>;
    fn own_text(&self, node: NodeKey) -> &str;
    /// Concatenated text of the node and its descendants.
    fn string_value(&self, node: NodeKey) -> String;
}

pub fn parse(expression: &str) -> Result<LocationPath, XPathError> {
    Parser::new(expression).parse_path()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(expression: &str) -> Self {
        Self {
            chars: expression.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let end = self.pos + token.chars().count();
        if end <= self.chars.len() && self.chars[self.pos..end].iter().copied().eq(token.chars()) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), XPathError> {
        self.skip_ws();
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn parse_path(&mut self) -> Result<LocationPath, XPathError> {
        let mut steps = Vec::new();
        self.skip_ws();
        loop {
            let axis = if self.eat("//") {
                Axis::DescendantOrSelfChild
            } else if self.eat("/") {
                Axis::Child
            } else {
                break;
            };
            steps.push(self.parse_step(axis)?);
            self.skip_ws();
        }
        if steps.is_empty() {
            return Err(self.error("expected an absolute location path"));
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{}'", c)));
        }
        Ok(LocationPath { steps })
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, XPathError> {
        let test = if self.eat("*") {
            NameTest::Any
        } else {
            NameTest::Name(self.parse_name()?.to_ascii_lowercase())
        };
        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat("[") {
                break;
            }
            predicates.push(self.parse_predicate()?);
            self.expect("]")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_name(&mut self) -> Result<String, XPathError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_literal(&mut self) -> Result<String, XPathError> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a string literal")),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated string literal"));
        }
        let literal = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(literal)
    }

    fn parse_operand(&mut self) -> Result<Operand, XPathError> {
        self.skip_ws();
        if self.eat("@") {
            Ok(Operand::Attribute(self.parse_name()?))
        } else if self.eat("text()") {
            Ok(Operand::Text)
        } else if self.eat(".") {
            Ok(Operand::Context)
        } else {
            Err(self.error("expected @attribute, text() or ."))
        }
    }

    fn parse_predicate(&mut self) -> Result<Predicate, XPathError> {
        self.skip_ws();
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            return match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Predicate::Position(n)),
                _ => Err(self.error("positions start at 1")),
            };
        }
        if self.eat("last()") {
            return Ok(Predicate::Last);
        }
        if self.eat("contains(") {
            let operand = self.parse_operand()?;
            self.expect(",")?;
            let literal = self.parse_literal()?;
            self.expect(")")?;
            return Ok(Predicate::Contains(operand, literal));
        }
        match self.parse_operand()? {
            Operand::Attribute(name) => {
                self.skip_ws();
                if self.eat("=") {
                    Ok(Predicate::AttributeEquals(name, self.parse_literal()?))
                } else {
                    Ok(Predicate::HasAttribute(name))
                }
            }
            Operand::Text => {
                self.expect("=")?;
                Ok(Predicate::TextEquals(self.parse_literal()?))
            }
            Operand::Context => Err(self.error("'.' is only supported inside contains()")),
        }
    }
}

/// Evaluate `path` from `root`, returning matches in document order.
pub fn evaluate<T: Tree>(tree: &T, root: NodeKey, path: &LocationPath) -> Vec<NodeKey> {
    let order = document_order(tree, root);
    let mut context = vec![root];

    for step in &path.steps {
        let mut seen = HashSet::new();
        let mut next = Vec::new();
        for &node in &context {
            let bases = match step.axis {
                Axis::Child => vec![node],
                Axis::DescendantOrSelfChild => descendants_or_self(tree, node),
            };
            for base in bases {
                let candidates: Vec<NodeKey> = tree
                    .children(base)
                    .iter()
                    .copied()
                    .filter(|&child| name_matches(tree, child, &step.test))
                    .collect();
                for matched in apply_predicates(tree, candidates, &step.predicates) {
                    if seen.insert(matched) {
                        next.push(matched);
                    }
                }
            }
        }
        next.sort_by_key(|node| order.get(node).copied().unwrap_or(usize::MAX));
        context = next;
    }
    context
}

fn name_matches<T: Tree>(tree: &T, node: NodeKey, test: &NameTest) -> bool {
    match test {
        NameTest::Any => true,
        NameTest::Name(name) => tree.tag(node).eq_ignore_ascii_case(name),
    }
}

fn apply_predicates<T: Tree>(
    tree: &T,
    mut nodes: Vec<NodeKey>,
    predicates: &[Predicate],
) -> Vec<NodeKey> {
    for predicate in predicates {
        let size = nodes.len();
        nodes = nodes
            .into_iter()
            .enumerate()
            .filter(|&(i, node)| match predicate {
                Predicate::Position(n) => i + 1 == *n,
                Predicate::Last => i + 1 == size,
                Predicate::HasAttribute(name) => tree.attribute(node, name).is_some(),
                Predicate::AttributeEquals(name, value) => {
                    tree.attribute(node, name) == Some(value.as_str())
                }
                Predicate::TextEquals(value) => tree.own_text(node) == value,
                Predicate::Contains(operand, needle) => match operand {
                    Operand::Attribute(name) => tree
                        .attribute(node, name)
                        .is_some_and(|v| v.contains(needle.as_str())),
                    Operand::Text => tree.own_text(node).contains(needle.as_str()),
                    Operand::Context => tree.string_value(node).contains(needle.as_str()),
                },
            })
            .map(|(_, node)| node)
            .collect();
    }
    nodes
}

fn descendants_or_self<T: Tree>(tree: &T, node: NodeKey) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        stack.extend(tree.children(current).iter().rev().copied());
    }
    out
}

fn document_order<T: Tree>(tree: &T, root: NodeKey) -> HashMap<NodeKey, usize> {
    descendants_or_self(tree, root)
        .into_iter()
        .enumerate()
        .map(|(i, node)| (node, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_and_predicates() {
        let path = parse("//ul/li[@class='item'][2]").unwrap();
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelfChild);
        assert_eq!(path.steps[1].axis, Axis::Child);
        assert_eq!(
            path.steps[1].predicates,
            vec![
                Predicate::AttributeEquals("class".into(), "item".into()),
                Predicate::Position(2)
            ]
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in ["", "div", "//div[", "//div[@id='x]", "//[1]", "//div]", "//li[0]"] {
            assert!(parse(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn parses_contains() {
        let path = parse("//a[contains(@href, 'example')]").unwrap();
        assert_eq!(
            path.steps[0].predicates[0],
            Predicate::Contains(Operand::Attribute("href".into()), "example".into())
        );
    }
}
