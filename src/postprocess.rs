use crate::config::Config;
use anyhow::Result;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Clean up raw OCR text before it is embedded into the prompt.
///
/// OCR output tends to carry odd codepoints, CRLF line endings, and
/// page-furniture lines that only distract the model.
pub fn clean_text(cfg: &Config, raw: &str) -> Result<String> {
    let mut text = raw.to_string();

    if cfg.postprocess.normalize_newlines {
        text = text.replace("\r\n", "\n");
    }

    if cfg.postprocess.normalize_unicode {
        text = text.nfkc().collect::<String>();
    }

    if cfg.postprocess.trim_trailing_whitespace {
        text = text
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
    }

    if cfg.postprocess.remove_by_regex {
        text = remove_by_regex(cfg, &text)?;
    }

    Ok(text)
}

fn remove_by_regex(cfg: &Config, s: &str) -> Result<String> {
    let regs: Vec<Regex> = cfg
        .postprocess
        .regex
        .patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut out = Vec::new();
    for line in s.lines() {
        let mut matched = false;
        for r in &regs {
            if r.is_match(line.trim()) {
                matched = true;
                break;
            }
        }
        if !matched {
            out.push(line);
        }
    }
    Ok(out.join("\n"))
}
