//! Page-side extraction: marketplace detection, per-marketplace selector
//! tables, debounced re-extraction, and event building.

pub mod debounce;
pub mod fetcher;
pub mod listing;
pub mod marketplace;
pub mod page;

pub use debounce::{Debouncer, Trigger};
pub use listing::extract_listings;
pub use marketplace::identify_marketplace;
pub use page::PageTracker;
