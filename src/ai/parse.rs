//! Decoding of model response text.
//!
//! Structured output is requested as `application/json`, but models still
//! occasionally wrap the object in markdown fences, surround it with chatter,
//! or leave trailing commas. The payload is tried as-is first and then through
//! a short list of cleaned-up candidates.

use serde::de::DeserializeOwned;

/// Parse model response text as `T`.
///
/// Returns the error from the untouched payload when no candidate parses, so
/// diagnostics point at what the model actually sent.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    log::debug!("Raw model response:\n{text}");

    let first_err = match serde_json::from_str::<T>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for candidate in json_candidates(text.trim()) {
        if let Ok(value) = serde_json::from_str::<T>(&candidate) {
            return Ok(value);
        }
        let fixed = strip_trailing_commas(&candidate);
        if fixed != candidate {
            if let Ok(value) = serde_json::from_str::<T>(&fixed) {
                return Ok(value);
            }
        }
    }

    Err(first_err)
}

/// Possible JSON object strings inside `text`, most specific first.
fn json_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    // ```json ... ``` or ``` ... ```
    if text.contains("```") {
        let fenced = text
            .lines()
            .skip_while(|l| !l.trim().starts_with("```"))
            .skip(1)
            .take_while(|l| !l.trim().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
        if !fenced.trim().is_empty() {
            candidates.push(fenced);
        }
    }

    // Outermost { ... }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            candidates.push(text[start..=end].to_string());
        }
    }

    candidates.push(text.to_string());
    candidates
}

/// Drop commas directly followed (modulo whitespace) by `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
        } else if in_string && c == '\\' {
            escape_next = true;
        } else if c == '"' {
            in_string = !in_string;
        } else if !in_string && c == ',' {
            let rest = text[i + 1..].trim_start();
            if rest.starts_with('}') || rest.starts_with(']') {
                continue;
            }
        }
        result.push(c);
    }
    result
}
