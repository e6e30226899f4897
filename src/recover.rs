use crate::backend::PatientFields;
use tracing::debug;

/// Recover the patient fields from free-form model output.
///
/// Models rarely honor "only return the JSON" exactly; the answer is
/// usually wrapped in greetings or trailing prose. Scan for the first
/// balanced `{...}` object (string-aware, so braces inside string
/// literals don't terminate the span) and take the first span that
/// deserializes into the expected schema. Anything else is an absent
/// result, never an error.
pub fn recover_fields(output: &str) -> Option<PatientFields> {
    let mut search_from = 0;
    while let Some(rel) = output[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(len) = balanced_span(&output[start..]) {
            let span = &output[start..start + len];
            match serde_json::from_str::<PatientFields>(span) {
                Ok(fields) => return Some(fields),
                Err(err) => debug!("candidate object rejected: {err}"),
            }
        }
        // Unbalanced or rejected span: a later brace may still open the
        // real answer (e.g. an unterminated string swallowed this one).
        search_from = start + 1;
    }
    None
}

/// Length in bytes of the balanced object starting at `s` (which must
/// begin with `{`), or None if the braces never balance.
fn balanced_span(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_span_simple() {
        assert_eq!(balanced_span(r#"{"a":1}"#), Some(7));
    }

    #[test]
    fn balanced_span_ignores_braces_in_strings() {
        let s = r#"{"a":"}{"}"#;
        assert_eq!(balanced_span(s), Some(s.len()));
    }

    #[test]
    fn balanced_span_unclosed() {
        assert_eq!(balanced_span(r#"{"a":1"#), None);
    }
}
