/// JSON pipeline documents.
pub mod document;
