pub mod runner;

pub use runner::{authorize, run_warehouse, run_with_sink, RunRequest};
