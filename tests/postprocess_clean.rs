use patient_intake::{config::Config, postprocess::clean_text};

#[test]
fn normalizes_newlines_and_trailing_whitespace() {
    let cfg = Config::default();
    let cleaned = clean_text(&cfg, "Patient: Marie Curie   \r\nDOB 1900-12-05  ").unwrap();
    assert_eq!(cleaned, "Patient: Marie Curie\nDOB 1900-12-05");
}

#[test]
fn removes_page_furniture_lines() {
    let cfg = Config::default();
    let cleaned = clean_text(&cfg, "Name: John Doe\npage 3\n2 / 10\nDOB 1904-05-12").unwrap();
    assert!(!cleaned.contains("page 3"));
    assert!(!cleaned.contains("2 / 10"));
    assert!(cleaned.contains("Name: John Doe"));
    assert!(cleaned.contains("DOB 1904-05-12"));
}

#[test]
fn normalizes_unicode_compatibility_forms() {
    let cfg = Config::default();
    // OCR loves ligatures; NFKC folds ﬁ into fi.
    let cleaned = clean_text(&cfg, "ﬁrst name").unwrap();
    assert_eq!(cleaned, "first name");
}
