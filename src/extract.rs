//! Lenient parsing of model replies.
//!
//! Model output is not schema-constrained: the JSON we asked for may be
//! wrapped in prose or markdown fences, or be missing entirely. Everything here
//! degrades to a fallback instead of failing.

use serde_json::Value;

pub const UNPARSED_REASON: &str = "Could not parse response";
pub const MISSING_REASON: &str = "No reason provided";

/// Slices from the first `{` or `[` to the last matching closer.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_lenient(text: &str) -> Option<Value> {
    serde_json::from_str(extract_json(text)?).ok()
}

/// A model's judgement of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub score: i64,
    pub reason: String,
}

impl Verdict {
    pub fn unparsed() -> Self {
        Self {
            score: 0,
            reason: UNPARSED_REASON.to_string(),
        }
    }

    fn from_object(value: &Value) -> Self {
        Self {
            score: value.get("score").map(coerce_score).unwrap_or(0),
            reason: value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or(MISSING_REASON)
                .to_string(),
        }
    }
}

fn coerce_score(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Parses a `{"score": .., "reason": ..}` reply.
pub fn parse_verdict(text: &str) -> Verdict {
    match parse_lenient(text) {
        Some(value @ Value::Object(_)) => Verdict::from_object(&value),
        _ => Verdict::unparsed(),
    }
}

/// One entry of a batched `[{"number": .., "score": .., "reason": ..}]` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    /// 1-based position in the candidate list sent to the model.
    pub number: i64,
    pub verdict: Verdict,
}

/// Parses a batched reply. `None` when no JSON array could be recovered.
pub fn parse_ratings(text: &str) -> Option<Vec<Rating>> {
    let Value::Array(entries) = parse_lenient(text)? else {
        return None;
    };
    let ratings = entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| Rating {
            number: entry.get("number").map(coerce_score).unwrap_or(0),
            verdict: Verdict::from_object(entry),
        })
        .collect();
    Some(ratings)
}
