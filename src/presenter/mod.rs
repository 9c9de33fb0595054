//! Popup-side logic: stats snapshot, recent-activity list, clear and export.
//! Terminal rendering lives in `src/bin/popup.rs`.

pub mod export;
pub mod format;
pub mod view;

pub use export::{export_filename, export_to_dir, ExportSnapshot};
pub use format::format_relative_time;
pub use view::{ConnectionStatus, Mode, PopupState, EMPTY_STATE};
