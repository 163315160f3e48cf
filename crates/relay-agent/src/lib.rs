pub mod admission;
pub mod format;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod router;

pub use admission::{Admission, AdmissionControl, DenyReason};
pub use openai::OpenAiCompatClient;
pub use provider::{CompletionClient, CompletionError, PromptMessage};
pub use router::{CatalogRouter, CatalogSlot};
