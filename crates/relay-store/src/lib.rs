pub mod context;
pub mod cooldown;
pub mod db;
pub mod error;
pub mod kv;
pub mod memory;
pub mod sqlite;
pub mod upstash;

pub use context::{ContextStore, Preference, PreferenceDefaults};
pub use cooldown::CooldownRecords;
pub use error::StoreError;
pub use kv::KvStore;
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;
pub use upstash::UpstashKv;
