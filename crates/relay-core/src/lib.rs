pub mod catalog;
pub mod config;
pub mod error;
pub mod i18n;
pub mod types;

pub use catalog::ModelCatalog;
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use i18n::{translate, Key, Locale};
pub use types::{CallbackAction, ChatKind, InboundMessage};
