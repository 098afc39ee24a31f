// Request mutation for sqlprobe
// Builds a concrete request by appending one payload to every template value

use crate::error::ProbeError;
use crate::models::{MutatedQuery, RequestTemplate};
use std::collections::BTreeMap;

/// Apply `payload` as a suffix to every query parameter and body field of `template`.
///
/// Keys are preserved; only values change. The payload is inserted verbatim, with no
/// escaping or encoding beyond what the HTTP client applies on the wire.
///
/// Examples:
/// - params `{q: "shoes"}` + `'` → `{q: "shoes'"}`
/// - body `{user: "admin"}` + `" OR 1=1--` → `{user: "admin\" OR 1=1--"}`
pub fn mutate(
    template: &RequestTemplate,
    payload: &str,
    index: usize,
) -> Result<MutatedQuery, ProbeError> {
    template.validate()?;

    Ok(MutatedQuery {
        index,
        payload: payload.to_string(),
        url: template.url.clone(),
        method: template.method,
        params: append_suffix(&template.params, payload),
        body: append_suffix(&template.body, payload),
    })
}

fn append_suffix(fields: &BTreeMap<String, String>, payload: &str) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(k, v)| {
            let mut value = String::with_capacity(v.len() + payload.len());
            value.push_str(v);
            value.push_str(payload);
            (k.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Method;

    fn template() -> RequestTemplate {
        RequestTemplate::new("http://localhost:3000/api/products", Method::POST)
            .with_param("q", "shoes")
            .with_param("page", "2")
            .with_body_field("username", "admin")
            .with_body_field("note", "")
    }

    // ============================================
    // Suffix Injection
    // ============================================

    #[test]
    fn test_every_param_gets_payload_suffix() {
        let t = template();
        let q = mutate(&t, "' OR '1'='1", 1).unwrap();
        for (k, v) in &t.params {
            assert_eq!(q.params[k], format!("{}' OR '1'='1", v));
        }
    }

    #[test]
    fn test_every_body_field_gets_payload_suffix() {
        let t = template();
        let q = mutate(&t, "\"", 7).unwrap();
        assert_eq!(q.body["username"], "admin\"");
        assert_eq!(q.body["note"], "\"");
        assert_eq!(q.index, 7);
    }

    #[test]
    fn test_keys_are_preserved() {
        let t = template();
        let q = mutate(&t, "--", 1).unwrap();
        assert!(q.params.keys().eq(t.params.keys()));
        assert!(q.body.keys().eq(t.body.keys()));
        assert_eq!(q.url, t.url);
        assert_eq!(q.method, t.method);
    }

    #[test]
    fn test_payload_is_not_escaped() {
        let t = template();
        let q = mutate(&t, "%27; DROP TABLE users;--", 1).unwrap();
        assert_eq!(q.params["q"], "shoes%27; DROP TABLE users;--");
        assert_eq!(q.payload, "%27; DROP TABLE users;--");
    }

    // ============================================
    // Edge Cases
    // ============================================

    #[test]
    fn test_whitespace_payload_is_a_baseline_probe() {
        let t = template();
        let q = mutate(&t, " ", 1).unwrap();
        assert_eq!(q.params["page"], "2 ");
    }

    #[test]
    fn test_template_without_fields() {
        let t = RequestTemplate::new("https://example.com/", Method::GET);
        let q = mutate(&t, "'", 1).unwrap();
        assert!(q.params.is_empty());
        assert!(q.body.is_empty());
    }

    #[test]
    fn test_malformed_template_is_rejected() {
        let t = RequestTemplate::new("", Method::GET).with_param("id", "1");
        assert!(matches!(mutate(&t, "'", 1), Err(ProbeError::InvalidTemplate(_))));
    }

    #[test]
    fn test_template_is_untouched() {
        let t = template();
        let before = t.clone();
        let _ = mutate(&t, "'", 1).unwrap();
        assert_eq!(t, before);
    }
}
