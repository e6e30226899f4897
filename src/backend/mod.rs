pub mod local;
pub mod remote;

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

pub use local::LocalBackend;
pub use remote::OpenAiBackend;

/// Terminal artifact of the pipeline. The date is the string the model
/// returned (expected `YYYY-MM-DD`); validating it as a calendar date
/// is a caller concern. Missing keys or non-string values in the model
/// output fail deserialization, which reads as an absent result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
}

/// One capability, two implementations: turn unstructured text into
/// patient fields via a local model process or a hosted model API.
///
/// `Ok(None)` means the model answered but nothing recoverable came
/// back (no balanced JSON object, or it didn't match the schema).
/// `Err` is reserved for startup/transport failures; the orchestrator
/// is the layer that converts those to an absent result.
pub trait FieldExtractor {
    fn extract_fields(&self, text: &str) -> Result<Option<PatientFields>, PipelineError>;
}
