pub mod record_store;

pub use record_store::{RecordStore, StoreConfig, DEFAULT_MAP_SIZE};
