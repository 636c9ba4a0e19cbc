//! Language-model enrichment of collected posts.
//!
//! Sanitizes each post, asks a chat model for a fixed set of labels and
//! scores, and appends the answers to an output table that is checkpointed
//! after every record so interrupted runs resume where they stopped.

pub mod classification;
pub mod classifier;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod runner;
pub mod sanitize;

mod retry;

pub use classification::{field_keys, Classification, Field, FieldKind, FieldValue, FIELDS};
pub use classifier::Classifier;
pub use error::{ClassifierError, EnrichError};
pub use openai::OpenAiClassifier;
pub use prompt::build_prompt;
pub use runner::{
    plan, run, CheckpointMode, FailurePolicy, MatchKey, Plan, Record, RunSummary, RunnerSettings,
};
pub use sanitize::sanitize;
