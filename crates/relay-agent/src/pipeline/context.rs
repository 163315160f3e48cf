//! Host interface for the turn pipeline.
//!
//! Implemented by `AppState` in `relay-gateway` and by test harnesses.
//! Defined here so the pipeline stays transport-agnostic: `relay-telegram`
//! provides the transport, `relay-gateway` wires everything together.

use relay_core::RelayConfig;
use relay_store::ContextStore;

use crate::admission::AdmissionControl;
use crate::provider::{CompletionClient, PromptMessage};

use super::transport::ChatTransport;

pub trait PipelineContext: Send + Sync {
    fn config(&self) -> &RelayConfig;
    fn store(&self) -> &ContextStore;
    fn admission(&self) -> &AdmissionControl;
    fn completion(&self) -> &dyn CompletionClient;
    fn transport(&self) -> &dyn ChatTransport;

    /// System entry placed first in every prompt, fixed for the process.
    fn system_message(&self) -> &PromptMessage;
}
