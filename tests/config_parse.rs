use patient_intake::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../patient-intake.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.ocr.dpi, 300);
    assert_eq!(cfg.ollama.port, 11434);
    assert_eq!(cfg.ollama.startup_poll_attempts, 10);
    assert_eq!(cfg.openai.temperature, 0.0);
}

#[test]
fn defaults_match_published_interface() {
    let cfg = Config::default();
    assert_eq!(cfg.ollama.host, "127.0.0.1");
    assert_eq!(cfg.ollama.port, 11434);
    assert_eq!(cfg.ollama.model, "phi");
    assert_eq!(cfg.ollama.startup_poll_interval_ms, 500);
    assert_eq!(cfg.openai.model, "gpt-4");
    assert_eq!(cfg.ocr.dpi, 300);
    assert_eq!(cfg.ocr.image_format, "jpeg");
}

#[test]
fn partial_config_fills_defaults() {
    let cfg: Config = toml::from_str("[ollama]\nmodel = \"phi:2\"\n").expect("parse TOML");
    assert_eq!(cfg.ollama.model, "phi:2");
    assert_eq!(cfg.ollama.exe, "ollama");
    assert_eq!(cfg.ollama.port, 11434);
    assert!(cfg.security.reject_url_inputs);
}

#[test]
fn every_section_tolerates_partial_keys() {
    let raw = "[ocr]\ndpi = 150\n\n[openai]\nmodel = \"gpt-4o\"\n\n[logging]\njson = true\n";
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.ocr.dpi, 150);
    assert_eq!(cfg.ocr.tesseract_exe, "tesseract");
    assert_eq!(cfg.openai.model, "gpt-4o");
    assert_eq!(cfg.openai.api_key_env, "OPENAI_API_KEY");
    assert!(cfg.logging.json);
    assert_eq!(cfg.logging.level, "info");
}
