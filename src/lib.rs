//! Patient order form extraction: OCR text recovery plus prompt-driven
//! structured-field extraction against a local or hosted model.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod recover;
pub mod runtime;
pub mod supervisor;
pub mod util;
