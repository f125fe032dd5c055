//! The Winner format: four XML files of flats, rent, country houses and
//! commercial property, exchanged with the REX order format.

pub mod export;
pub mod fields;
pub mod import;
pub mod matrix;
pub mod routing;

use super::{Converter, Task};
use crate::error::Result;
use crate::types::Document;

/// Converter between REX and Winner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Winner;

impl Converter for Winner {
    fn name(&self) -> &'static str {
        "winner"
    }

    fn export(&self, task: &mut Task, input: &[Document]) -> Result<Vec<Document>> {
        export::export_documents(task, input)
    }

    fn import(&self, task: &mut Task, input: &[Document]) -> Result<Document> {
        import::import_documents(task, input)
    }
}
