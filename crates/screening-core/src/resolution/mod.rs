pub mod selector_resolver;

pub use selector_resolver::SelectorResolver;
