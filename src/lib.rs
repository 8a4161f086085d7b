pub mod config;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod recorder;
pub mod report;
pub mod stats;
pub mod sweep;
pub mod types;
