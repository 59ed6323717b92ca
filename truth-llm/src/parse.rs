// truth-llm/src/parse.rs
// ============================================================================
// Module: Response JSON Extraction
// Description: Recovers a JSON object from a chat-completion response body
//              (§4.2 step 5).
// Purpose: Models commonly wrap JSON in code fences, prose, or emit it into
//          `message.thinking` instead of `message.content`; extraction must
//          be resilient to all three without ever silently accepting
//          malformed JSON.
// Dependencies: serde_json, crate::transport::ChatResponseMessage
// ============================================================================

//! ## Overview
//! [`extract_json_object`] implements §4.2 step 5 verbatim: prefer
//! `message.content`; if empty, fall back to `message.thinking`; strip code
//! fences; extract the first balanced `{…}` object; parse it. Any failure
//! along the way is a retryable [`ParseError`], never a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::transport::ChatResponseMessage;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure extracting a JSON object from a chat response (§4.2 step 5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Both `content` and `thinking` were empty.
    #[error("response had no content or thinking text")]
    EmptyResponse,
    /// No balanced `{…}` object could be found in the text.
    #[error("no balanced JSON object found in response")]
    NoJsonObject,
    /// A `{…}` span was found but did not parse as valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Code Fence Stripping
// ============================================================================

/// Strips a leading/trailing Markdown code fence (` ``` ` or ` ```json `),
/// if present, leaving the inner text untouched otherwise.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);
    after_open.strip_suffix("```").map_or(after_open, str::trim_end)
}

// ============================================================================
// SECTION: Balanced Object Extraction
// ============================================================================

/// Scans `text` for the first balanced `{…}` span, respecting string
/// literals and escape sequences so braces inside quoted strings don't
/// perturb the depth count.
fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return text.get(start..=offset);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// SECTION: Extraction Entry Point
// ============================================================================

/// Extracts a JSON object from `message`, per §4.2 step 5.
///
/// # Errors
///
/// Returns [`ParseError::EmptyResponse`] when both fields are blank,
/// [`ParseError::NoJsonObject`] when no balanced object is found, or
/// [`ParseError::Malformed`] when the extracted span fails to parse.
pub fn extract_json_object(message: &ChatResponseMessage) -> Result<serde_json::Value, ParseError> {
    let raw = message
        .content
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .or_else(|| message.thinking.as_deref().filter(|text| !text.trim().is_empty()))
        .ok_or(ParseError::EmptyResponse)?;

    let stripped = strip_code_fences(raw);
    let object_span = first_balanced_object(stripped).ok_or(ParseError::NoJsonObject)?;
    serde_json::from_str(object_span).map_err(|err| ParseError::Malformed(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::extract_json_object;
    use crate::transport::ChatResponseMessage;

    fn message(content: Option<&str>, thinking: Option<&str>) -> ChatResponseMessage {
        ChatResponseMessage {
            content: content.map(str::to_owned),
            thinking: thinking.map(str::to_owned),
        }
    }

    #[test]
    fn extracts_plain_json_from_content() {
        let msg = message(Some(r#"{"extractions": []}"#), None);
        let value = extract_json_object(&msg).expect("extraction succeeds");
        assert_eq!(value["extractions"], serde_json::json!([]));
    }

    #[test]
    fn strips_code_fences() {
        let msg = message(Some("```json\n{\"a\": 1}\n```"), None);
        let value = extract_json_object(&msg).expect("extraction succeeds");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn falls_back_to_thinking_when_content_is_empty() {
        let msg = message(Some(""), Some(r#"{"b": 2}"#));
        let value = extract_json_object(&msg).expect("extraction succeeds");
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn extracts_first_balanced_object_amid_prose() {
        let msg = message(Some(r#"Sure, here you go: {"nested": {"a": "}"}} trailing"#), None);
        let value = extract_json_object(&msg).expect("extraction succeeds");
        assert_eq!(value["nested"]["a"], "}");
    }

    #[test]
    fn empty_response_is_rejected() {
        let msg = message(Some(""), Some("   "));
        assert_eq!(extract_json_object(&msg), Err(super::ParseError::EmptyResponse));
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        let msg = message(Some("no json here"), None);
        assert_eq!(extract_json_object(&msg), Err(super::ParseError::NoJsonObject));
    }
}
