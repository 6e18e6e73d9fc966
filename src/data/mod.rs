//! Data module - spreadsheet loading, reshaping and joining

mod joiner;
mod loader;
mod processor;

pub use joiner::{join, per_capita, to_dataframe, JoinedRecord, JOINED_HEADERS};
pub use loader::{DataLoader, LoadError, RawTable, METADATA_ROWS};
pub use processor::{DataProcessor, LongRecord, ShapeError, COUNTRY_COLUMN};
