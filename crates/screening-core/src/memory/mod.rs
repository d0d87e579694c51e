//! In-memory page host.
//!
//! Backs the native runner and the test suites with a small DOM, an XPath
//! subset and scriptable components.

pub mod component;
pub mod dom;
pub mod fixture;
pub mod xpath;

pub use component::MemoryComponent;
pub use dom::MemoryPage;
pub use fixture::{ComponentSpec, NodeSpec, PageFixture, Rect};
pub use xpath::NodeKey;
