pub mod ollama;

use crate::error::PipelineError;

pub use ollama::OllamaServer;

/// Captured output of one synchronous model invocation.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Seam over the local model-serving runtime.
///
/// The real implementation talks to an Ollama process; tests substitute
/// a scripted mock to exercise supervisor and backend behavior.
pub trait ModelServer {
    /// Short-timeout reachability probe of the serving port.
    fn probe(&self) -> bool;

    /// Launch the serving process detached from this process group.
    fn launch(&self) -> Result<(), PipelineError>;

    /// Run the model synchronously, feeding `prompt` on stdin and
    /// capturing stdout/stderr after completion.
    fn run_model(&self, prompt: &str) -> Result<ModelOutput, PipelineError>;

    /// Best-effort termination of the serving process. Never fails;
    /// problems are logged instead of propagated.
    fn shutdown(&self);
}
