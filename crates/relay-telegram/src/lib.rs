pub mod adapter;
pub mod context;
pub mod error;
pub mod handler;
pub mod transport;

pub use adapter::TelegramAdapter;
pub use context::TelegramAppContext;
pub use error::TelegramError;
pub use handler::dispatch_update;
pub use transport::TelegramTransport;
