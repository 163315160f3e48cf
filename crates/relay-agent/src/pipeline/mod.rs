//! Transport-agnostic conversation pipeline.
//!
//! Transport adapters convert platform updates into [`InboundMessage`] /
//! [`CallbackAction`] values and call [`handle_inbound`] / [`handle_callback`];
//! everything from admission to persistence happens here.
//!
//! [`InboundMessage`]: relay_core::InboundMessage
//! [`CallbackAction`]: relay_core::CallbackAction

pub mod commands;
pub mod context;
pub mod inbound;
pub mod retry;
pub mod transport;
pub mod turn;

pub use context::PipelineContext;
pub use inbound::{handle_callback, handle_inbound, Routed};
pub use retry::{generate_with_retry, RetryPolicy};
pub use transport::{ChatTransport, DeliveryError, Keyboard, KeyboardButton, SendOptions};
pub use turn::{run_turn, TurnFailure, TurnOutcome, TurnState};
