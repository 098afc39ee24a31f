// Key/value input parsing for sqlprobe
// Scan requests carry params, body and headers as "key:value, key:value" strings

use std::collections::BTreeMap;

/// Parse `"q:shoes, page:2"` into `{page: "2", q: "shoes"}`.
///
/// Pairs are split on the first `:` so values may contain colons (URLs, times).
/// A pair without `:` maps its key to an empty value; blank pairs are ignored.
pub fn parse_key_value_string(input: &str) -> BTreeMap<String, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once(':').unwrap_or((pair, ""));
            let key = key.trim();
            if key.is_empty() {
                None
            } else {
                Some((key.to_string(), value.trim().to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_pairs() {
        let map = parse_key_value_string(" q:shoes , page:2");
        assert_eq!(map.len(), 2);
        assert_eq!(map["q"], "shoes");
        assert_eq!(map["page"], "2");
    }

    #[test]
    fn value_keeps_later_colons() {
        let map = parse_key_value_string("referer:http://example.com:8080/");
        assert_eq!(map["referer"], "http://example.com:8080/");
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(parse_key_value_string("").is_empty());
        assert!(parse_key_value_string(" , ,").is_empty());
        assert!(parse_key_value_string(":orphan").is_empty());
    }

    #[test]
    fn key_without_value() {
        let map = parse_key_value_string("debug");
        assert_eq!(map["debug"], "");
    }
}
