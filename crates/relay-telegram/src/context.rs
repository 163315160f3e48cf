//! The adapter drives the shared pipeline; its context is the pipeline's.

pub use relay_agent::pipeline::PipelineContext as TelegramAppContext;
