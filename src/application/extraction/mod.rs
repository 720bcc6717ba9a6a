pub mod field_extractor;
pub mod vocabulary;

pub use field_extractor::FieldExtractor;
pub use vocabulary::Vocabulary;
