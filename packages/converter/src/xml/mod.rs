//! XML reading, writing and DOM helpers.
//!
//! - [`reader`]: quick-xml based construction of listing trees
//! - [`writer`]: serialisation of listing trees back to XML text
//! - [`utils`]: helpers for navigating roxmltree documents

pub mod reader;
pub mod utils;
pub mod writer;

pub use reader::parse_element;
pub use utils::{element_children, find_child, get_tag_name, get_text, node_position};
pub use writer::{to_xml, wrap_document};
