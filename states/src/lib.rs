//! Persisted data model and key-value storage for qrdesk.
//!
//! The reader and generator each keep exactly one collection in storage:
//! scan history under [`SCAN_HISTORY_KEY`] and saved codes under
//! [`SAVED_CODES_KEY`]. Both go through [`load_collection`] and
//! [`save_collection`], so a missing or corrupt blob always reads back as an
//! empty collection.

mod collection;
mod color;
mod error;
mod saved_code;
mod scan_record;
mod store;

pub use collection::{SCHEMA_VERSION, load_collection, save_collection};
pub use color::{HexColor, ParseColorError};
pub use error::StorageError;
pub use saved_code::{SAVED_CODES_KEY, SavedCode, ShapeStyle};
pub use scan_record::{SCAN_HISTORY_KEY, ScanRecord, is_web_link, normalize_link};
pub use store::{FileStore, KeyValueStore, MemoryStore};
