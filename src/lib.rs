pub mod config;
pub mod errors;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pricing;
