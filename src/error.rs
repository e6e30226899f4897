use thiserror::Error;

/// Failure taxonomy for the extraction pipeline.
///
/// The Text Extractor and Process Supervisor raise; the backends raise
/// transport-level failures and report malformed model output as an
/// absent result instead. Only the orchestrator swallows.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be rendered to page images.
    #[error("pdf render failed: {0}")]
    Render(String),

    /// The OCR engine is unavailable or failed on a page.
    #[error("ocr failed: {0}")]
    Ocr(String),

    /// The local model server never became reachable.
    #[error("model server not reachable after {attempts} poll attempts")]
    StartupTimeout { attempts: u32 },

    /// The model call itself failed (process exec or network transport).
    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
