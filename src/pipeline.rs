use crate::{
    backend::{FieldExtractor, LocalBackend, OpenAiBackend, PatientFields},
    config::Config,
    error::PipelineError,
    ocr, postprocess,
};
use std::path::Path;
use tracing::{error, info};

/// Backend selector for one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

/// Best-effort extraction of patient fields from a scanned order form.
///
/// This is the single failure boundary of the pipeline: every error
/// from rendering, OCR, model startup, invocation, or recovery is
/// logged and collapsed into `None`. Nothing propagates to the caller.
pub fn extract_patient_data(cfg: &Config, input: &Path, backend: Backend) -> Option<PatientFields> {
    match run_extraction(cfg, input, backend) {
        Ok(Some(fields)) => {
            info!("extracted fields for {}", input.display());
            Some(fields)
        }
        Ok(None) => {
            info!("no fields recovered from {}", input.display());
            None
        }
        Err(err) => {
            error!("extraction failed for {}: {err}", input.display());
            None
        }
    }
}

fn run_extraction(
    cfg: &Config,
    input: &Path,
    backend: Backend,
) -> Result<Option<PatientFields>, PipelineError> {
    let raw = ocr::extract_text(cfg, input)?;
    let text = postprocess::clean_text(cfg, &raw)
        .map_err(|e| PipelineError::Ocr(format!("postprocess: {e}")))?;

    match backend {
        Backend::Local => LocalBackend::new(cfg).extract_fields(&text),
        Backend::Remote => OpenAiBackend::new(cfg)?.extract_fields(&text),
    }
}
