pub mod aggregator;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod message;
pub mod presenter;
pub mod store;
pub mod types;
