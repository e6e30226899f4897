use crate::{config::Config, error::PipelineError};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Recover text from a scanned PDF.
///
/// Renders every page to a raster image at the configured DPI with
/// `pdftoppm`, runs `tesseract` over each page image, and joins the
/// per-page text in page order with newlines. An empty string is a
/// valid result (blank document). The caller guarantees the path
/// exists; this function does not validate it.
pub fn extract_text(cfg: &Config, input: &Path) -> Result<String, PipelineError> {
    std::fs::create_dir_all(&cfg.paths.work_dir).map_err(PipelineError::Io)?;
    let scratch = tempfile::tempdir_in(&cfg.paths.work_dir).map_err(PipelineError::Io)?;
    let pages = render_pages(cfg, input, scratch.path())?;
    debug!("rendered {} page image(s)", pages.len());

    let mut texts = Vec::with_capacity(pages.len());
    for page in &pages {
        texts.push(ocr_page(cfg, page)?);
    }

    let text = texts.join("\n");
    info!(
        "ocr complete: {} page(s), {} chars",
        pages.len(),
        text.len()
    );
    Ok(text)
}

/// Render all pages to images under `out_dir`, returned in page order.
fn render_pages(cfg: &Config, input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let (format_flag, ext) = match cfg.ocr.image_format.as_str() {
        "png" => ("-png", "png"),
        _ => ("-jpeg", "jpg"),
    };
    let prefix = out_dir.join("page");

    let output = Command::new(&cfg.ocr.pdftoppm_exe)
        .arg("-r")
        .arg(cfg.ocr.dpi.to_string())
        .arg(format_flag)
        .arg(input)
        .arg(&prefix)
        .output()
        .map_err(|e| PipelineError::Render(format!("spawning {}: {e}", cfg.ocr.pdftoppm_exe)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Render(format!(
            "{} failed for {}: {}",
            cfg.ocr.pdftoppm_exe,
            input.display(),
            stderr.trim()
        )));
    }

    let mut pages: Vec<PathBuf> = std::fs::read_dir(out_dir)
        .map_err(PipelineError::Io)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(ext))
        .collect();
    // pdftoppm zero-pads page numbers uniformly, so name order is page order.
    pages.sort();
    Ok(pages)
}

fn ocr_page(cfg: &Config, page: &Path) -> Result<String, PipelineError> {
    let output = Command::new(&cfg.ocr.tesseract_exe)
        .arg(page)
        .arg("stdout")
        .arg("-l")
        .arg(&cfg.ocr.languages)
        .output()
        .map_err(|e| PipelineError::Ocr(format!("spawning {}: {e}", cfg.ocr.tesseract_exe)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Ocr(format!(
            "{} failed for {}: {}",
            cfg.ocr.tesseract_exe,
            page.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
