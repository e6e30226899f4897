use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub ollama: Ollama,
    #[serde(default)]
    pub openai: Openai,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            ocr: Default::default(),
            postprocess: Default::default(),
            ollama: Default::default(),
            openai: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
            security: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            work_dir: ".patient-intake-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub pdftoppm_exe: String,
    pub tesseract_exe: String,
    pub dpi: u32,
    pub image_format: String,
    pub languages: String,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            pdftoppm_exe: "pdftoppm".into(),
            tesseract_exe: "tesseract".into(),
            dpi: 300,
            image_format: "jpeg".into(),
            languages: "eng".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
    pub remove_by_regex: bool,
    #[serde(default)]
    pub regex: PostprocessRegex,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
            remove_by_regex: true,
            regex: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessRegex {
    pub patterns: Vec<String>,
}
impl Default for PostprocessRegex {
    fn default() -> Self {
        Self {
            patterns: vec!["^(page\\s+\\d+|\\d+\\s*/\\s*\\d+)$".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ollama {
    pub exe: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub probe_timeout_seconds: u64,
    pub startup_poll_attempts: u32,
    pub startup_poll_interval_ms: u64,
    /// Cap on one `ollama run` invocation; 0 disables the cap.
    pub run_timeout_seconds: u64,
    pub shutdown_pattern: String,
}
impl Default for Ollama {
    fn default() -> Self {
        Self {
            exe: "ollama".into(),
            host: "127.0.0.1".into(),
            port: 11434,
            model: "phi".into(),
            probe_timeout_seconds: 1,
            startup_poll_attempts: 10,
            startup_poll_interval_ms: 500,
            run_timeout_seconds: 600,
            shutdown_pattern: "ollama".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Openai {
    pub api_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}
impl Default for Openai {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.0,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub log_model_stderr: bool,
    pub log_model_output: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            log_model_stderr: true,
            log_model_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
