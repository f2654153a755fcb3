// Concrete implementations of the domain ports: the posting API over HTTP and
// the sheet sinks (local CSV, Google Sheets).

pub mod csv_sheet;
pub mod google_sheets;
pub mod ozon_http;

pub use csv_sheet::CsvSheetStore;
pub use google_sheets::GoogleSheetsSink;
pub use ozon_http::{HttpSettings, OzonHttpTransport};
