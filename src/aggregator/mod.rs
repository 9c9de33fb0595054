pub mod capped;
pub mod service;

pub use service::{Aggregator, WriteDiscipline};
