pub mod etl;
pub mod fetcher;
pub mod order_key;
pub mod parser;
pub mod pipeline;
pub mod sheet_writer;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use crate::domain::model::{LineItem, LoadSummary, Posting, TransformResult};
pub use crate::domain::ports::{ApiTransport, Pipeline, SheetSink, WarehouseDirectory};
pub use crate::utils::error::Result;
