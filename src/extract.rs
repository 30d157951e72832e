//! Tolerant parsing of upstream language-model replies.
//!
//! Replies arrive in inconsistent shapes: JSON wrapped in prose, objects with
//! the text under one of several keys, or scores embedded in free text.

use log::trace;
use serde_json::Value;

/// Fields searched, in order, for the text of an object-shaped reply.
const REPLY_FIELDS: [&str; 6] = ["reply", "text", "feedback", "message", "output_text", "content"];
const FEEDBACK_KEY: &str = "\"feedback\"";
const DEFAULT_PROBABILITY: u32 = 50;

/// Returns the first JSON object or array embedded in `text` that parses.
///
/// Every `{` and `[` is tried in order. From a start position only brackets of
/// the same kind are counted, so the candidate ends where that depth returns to
/// zero. A candidate that fails to parse moves the search to the next start.
pub fn extract_first_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    for (start, &open) in bytes.iter().enumerate() {
        let close = match open {
            b'{' => b'}',
            b'[' => b']',
            _ => continue,
        };
        let mut depth = 0usize;
        for (offset, &ch) in bytes[start..].iter().enumerate() {
            if ch == open {
                depth += 1;
            } else if ch == close {
                depth -= 1;
            }
            if depth == 0 {
                let candidate = &text[start..start + offset + 1];
                match serde_json::from_str(candidate) {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        trace!("Candidate at {} is not JSON: {}", start, e);
                        break;
                    }
                }
            }
        }
    }
    None
}

/// Reduces a reply of unknown shape to its text.
pub fn normalize_reply(reply: &Value) -> String {
    match reply {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(number) if number.as_f64() == Some(0.0) => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Object(fields) => {
            let nested = fields.get("feedback").and_then(|feedback| feedback.get("text"));
            let found = REPLY_FIELDS
                .iter()
                .map(|field| fields.get(*field))
                .chain(std::iter::once(nested))
                .flatten()
                .filter_map(Value::as_str)
                .find(|text| !text.trim().is_empty());
            match found {
                Some(text) => text.trim().to_string(),
                None => feedback_or_serialized(reply),
            }
        }
        Value::Array(_) => feedback_or_serialized(reply),
        other => other.to_string().trim().to_string(),
    }
}
fn feedback_or_serialized(reply: &Value) -> String {
    let serialized = reply.to_string();
    find_feedback(&serialized).unwrap_or_else(|| serialized.trim().to_string())
}
/// Matches `"feedback"\s*:\s*"([^"]+)"` against serialized JSON.
fn find_feedback(serialized: &str) -> Option<String> {
    let mut from = 0;
    while let Some(found) = serialized[from..].find(FEEDBACK_KEY) {
        let key_end = from + found + FEEDBACK_KEY.len();
        from += found + 1;
        let Some(rest) = serialized[key_end..].trim_start().strip_prefix(':') else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix('"') else {
            continue;
        };
        match rest.find('"') {
            Some(end) if end > 0 => {
                return Some(rest[..end].replace("\\n", "\n").trim().to_string())
            }
            _ => continue,
        }
    }
    None
}

/// Finds a score written as `87/100`, `87 percent` or `87%`.
///
/// Up to three digits are taken, and the leftmost match wins, so `1234%`
/// yields 234.
pub fn extract_score(text: &str) -> Option<u32> {
    let chars: Vec<char> = text.chars().collect();
    for start in 0..chars.len() {
        for len in (1..=3).rev() {
            let end = start + len;
            if end > chars.len() || !chars[start..end].iter().all(char::is_ascii_digit) {
                continue;
            }
            if is_score_suffix(&chars[end..]) {
                return chars[start..end].iter().collect::<String>().parse().ok();
            }
        }
    }
    None
}
fn is_score_suffix(rest: &[char]) -> bool {
    if starts_with_ignore_case(rest, "/100") {
        return true;
    }
    let spaces = rest.iter().take_while(|c| c.is_whitespace()).count();
    let rest = &rest[spaces..];
    rest.first() == Some(&'%') || starts_with_ignore_case(rest, "percent")
}
fn starts_with_ignore_case(chars: &[char], prefix: &str) -> bool {
    let prefix: Vec<char> = prefix.chars().collect();
    chars.len() >= prefix.len()
        && chars
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| a.to_ascii_lowercase() == *b)
}

/// Reads an admission probability from an estimate reply.
///
/// The first run of digits is taken and clamped to 1..=100. A reply without
/// digits falls back to 50.
pub fn parse_probability(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return DEFAULT_PROBABILITY;
    }
    // only overflow can fail here
    digits
        .parse::<u64>()
        .map(|probability| probability.clamp(1, 100) as u32)
        .unwrap_or(100)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_after_prose() {
        let text = "Sure! Here is the data you asked for:\n{\"activities\": [{\"years\": \"9-12\"}]}\nLet me know.";
        assert_eq!(
            extract_first_json(text),
            Some(json!({"activities": [{"years": "9-12"}]}))
        );
    }

    #[test]
    fn json_skips_unparseable_candidates() {
        // the first brace pair is not JSON, the array after it is
        assert_eq!(
            extract_first_json("note {not json} then [1, 2, 3] done"),
            Some(json!([1, 2, 3]))
        );
        // an unbalanced opener falls through to the later object
        assert_eq!(
            extract_first_json("{ unterminated ... {\"a\": 1}"),
            Some(json!({"a": 1}))
        );
        // the outer array fails, the object inside it parses
        assert_eq!(
            extract_first_json("[oops, {\"b\": true}]"),
            Some(json!({"b": true}))
        );
    }

    #[test]
    fn json_first_success_wins() {
        assert_eq!(
            extract_first_json("{\"first\": 1} {\"second\": 2}"),
            Some(json!({"first": 1}))
        );
    }

    #[test]
    fn json_absent() {
        assert_eq!(extract_first_json(""), None);
        assert_eq!(extract_first_json("no brackets here"), None);
        assert_eq!(extract_first_json("{ never closed"), None);
        assert_eq!(extract_first_json("caf\u{e9} {oops}"), None);
    }

    #[test]
    fn reply_plain_values() {
        assert_eq!(normalize_reply(&json!("  hello there \n")), "hello there");
        assert_eq!(normalize_reply(&Value::Null), "");
        assert_eq!(normalize_reply(&json!(false)), "");
        assert_eq!(normalize_reply(&json!(0)), "");
        assert_eq!(normalize_reply(&json!("")), "");
        assert_eq!(normalize_reply(&json!(42)), "42");
        assert_eq!(normalize_reply(&json!(true)), "true");
    }

    #[test]
    fn reply_field_priority() {
        assert_eq!(
            normalize_reply(&json!({"text": "from text", "reply": "from reply"})),
            "from reply"
        );
        assert_eq!(
            normalize_reply(&json!({"content": "c", "message": " m "})),
            "m"
        );
        // blank and non-string candidates are skipped
        assert_eq!(
            normalize_reply(&json!({"reply": "   ", "text": 7, "output_text": "out"})),
            "out"
        );
        assert_eq!(
            normalize_reply(&json!({"feedback": {"text": "nested"}})),
            "nested"
        );
    }

    #[test]
    fn reply_feedback_pattern() {
        assert_eq!(
            normalize_reply(&json!({"result": {"feedback": "Line one\nLine two"}})),
            "Line one\nLine two"
        );
        assert_eq!(
            normalize_reply(&json!([{"type": "story", "feedback": "Vivid opening."}])),
            "Vivid opening."
        );
        assert_eq!(
            normalize_reply(&json!({"feedback": {"score": 3}, "notes": {"feedback" : "ok"}})),
            "ok"
        );
    }

    #[test]
    fn reply_falls_back_to_serialized() {
        assert_eq!(normalize_reply(&json!({"score": 91})), "{\"score\":91}");
        assert_eq!(normalize_reply(&json!([])), "[]");
    }

    #[test]
    fn scores() {
        assert_eq!(extract_score("Authenticity: 87/100"), Some(87));
        assert_eq!(extract_score("I'd say 72 percent human."), Some(72));
        assert_eq!(extract_score("roughly 64 PERCENT"), Some(64));
        assert_eq!(extract_score("Confidence 9%"), Some(9));
        assert_eq!(extract_score("100 % authentic"), Some(100));
        assert_eq!(extract_score("1234%"), Some(234));
        assert_eq!(extract_score("written in 2024, scored 55%"), Some(55));
        assert_eq!(extract_score("no score here"), None);
        assert_eq!(extract_score("87 points"), None);
    }

    #[test]
    fn probabilities() {
        assert_eq!(parse_probability("42"), 42);
        assert_eq!(parse_probability("Probability: 17% give or take 5"), 17);
        assert_eq!(parse_probability("0"), 1);
        assert_eq!(parse_probability("250"), 100);
        assert_eq!(parse_probability("99999999999999999999999"), 100);
        assert_eq!(parse_probability("no idea"), 50);
    }
}
