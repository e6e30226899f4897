/// Extraction prompt shared by both backends.
///
/// The field list and format instructions are fixed; the OCR text is
/// embedded verbatim between the `---` fences.
pub fn build_prompt(text: &str) -> String {
    format!(
        r#"You are an extraction-only engine.

Return a single-line JSON with the following fields:
- first_name
- last_name
- date_of_birth (in YYYY-MM-DD format)

Example:
{{"first_name":"John","last_name":"Doe","date_of_birth":"1904-05-12"}}

Only return the JSON. Do not explain. Do not greet. Do not say anything else.

Text:
---
{text}
---
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_text_between_fences() {
        let p = build_prompt("Patient: Marie Curie");
        assert!(p.contains("---\nPatient: Marie Curie\n---"));
    }

    #[test]
    fn lists_expected_fields() {
        let p = build_prompt("");
        assert!(p.contains("- first_name"));
        assert!(p.contains("- last_name"));
        assert!(p.contains("- date_of_birth (in YYYY-MM-DD format)"));
        assert!(p.contains(r#"{"first_name":"John","last_name":"Doe","date_of_birth":"1904-05-12"}"#));
    }
}
