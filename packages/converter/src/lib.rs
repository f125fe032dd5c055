//! REX Converter - convert real-estate listings between the REX XML format
//! and partner formats.
//!
//! Listings stream out of XML documents as subtrees, are mapped field by
//! field with the help of a dictionary file, checked against a table of
//! mandatory fields and assembled into output documents. Problems with
//! single listings are collected, never fatal to a batch.
//!
//! # Example
//!
//! ```
//! use rex_converter::DictionarySet;
//!
//! let dic = DictionarySet::parse("[aptp]\n1 квартира квартира\n").unwrap();
//! assert_eq!(dic.from_id("aptp", "1").as_deref(), Some("квартира"));
//! assert_eq!(dic.to_id("aptp", "квартира").as_deref(), Some("1"));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants and validation
//! - [`types`]: Documents and conversion direction
//! - [`error`]: Error types and Result alias
//! - [`dictionary`]: Dictionary file lookups
//! - [`tree`]: Listing trees and their comparable value view
//! - [`xml`]: XML reading and writing
//! - [`registry`]: Streaming subtree matcher and event parser
//! - [`schema`]: XSD subset validation
//! - [`convert`]: Converter interface and the Winner converter
//! - [`report`]: Error and statistics collectors
//! - [`compare`]: Double-conversion comparator
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod compare;
pub mod config;
pub mod convert;
pub mod dictionary;
pub mod error;
pub mod numbers;
pub mod registry;
pub mod report;
pub mod schema;
pub mod tree;
pub mod types;
pub mod xml;

// Re-export commonly used items
pub use compare::{Comparator, ComparatorConfig, CompareOptions};
pub use convert::{converter_for, Converter, Task, TaskConfig};
pub use dictionary::{DicEntry, DictionarySet};
pub use error::{ConvertError, Result};
pub use report::{ErrorCollector, Level, StatCollector};
pub use types::{Direction, Document};
