//! Response schema and parsing for generated segments.

use super::NarratorError;
use crate::story::StorySegment;
use serde_json::{json, Value};
use std::collections::HashSet;

/// JSON schema every generated segment must follow.
pub fn segment_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "visualDescription": { "type": "STRING" },
            "lines": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "speaker": { "type": "STRING" },
                        "text": { "type": "STRING" },
                        "emotion": {
                            "type": "STRING",
                            "enum": [
                                "neutral", "happy", "angry", "sad",
                                "surprised", "determined", "fear"
                            ]
                        },
                        "monologue": { "type": "STRING" }
                    },
                    "required": ["speaker", "text", "emotion"]
                }
            },
            "choices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "text": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["action", "dialogue", "deduction"] }
                    },
                    "required": ["id", "text", "type"]
                }
            },
            "isEnding": { "type": "BOOLEAN" },
            "endingType": {
                "type": "STRING",
                "enum": ["true", "good", "normal", "bad", "dead"],
                "nullable": true
            }
        },
        "required": ["visualDescription", "lines", "choices"]
    })
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse and validate model output into a segment with a fresh `ai-` id.
pub fn parse_segment(raw: &str) -> Result<StorySegment, NarratorError> {
    let mut segment: StorySegment = serde_json::from_str(strip_code_fences(raw))?;
    validate_segment(&segment)?;
    segment.id = Some(format!("ai-{}", uuid::Uuid::new_v4()));
    Ok(segment)
}

/// Check the structural rules a playable segment must satisfy.
pub fn validate_segment(segment: &StorySegment) -> Result<(), NarratorError> {
    if segment.lines.is_empty() {
        return Err(NarratorError::Invalid("segment has no lines".to_string()));
    }
    if let Some(i) = segment.lines.iter().position(|l| l.text.trim().is_empty()) {
        return Err(NarratorError::Invalid(format!("line {i} has no text")));
    }
    if !segment.is_ending && segment.choices.is_empty() {
        return Err(NarratorError::Invalid(
            "non-ending segment offers no choices".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for choice in &segment.choices {
        if choice.id.trim().is_empty() || choice.text.trim().is_empty() {
            return Err(NarratorError::Invalid("choice without id or text".to_string()));
        }
        if !seen.insert(choice.id.as_str()) {
            return Err(NarratorError::Invalid(format!(
                "duplicate choice id {:?}",
                choice.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{ChoiceKind, EndingType};

    const VALID: &str = r#"{
        "visualDescription": "Kaelen shielding Elara, collapsing dome",
        "lines": [
            {"speaker": "旁白", "text": "穹顶碎裂。", "emotion": "surprised"},
            {"speaker": "凯伦", "text": "趴下！", "emotion": "determined", "monologue": "又来了。"}
        ],
        "choices": [
            {"id": "c1", "text": "拉住她", "type": "action"},
            {"id": "c2", "text": "观察袭击者", "type": "deduction"}
        ]
    }"#;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_parse_valid_segment() {
        let segment = parse_segment(VALID).unwrap();
        assert_eq!(segment.lines.len(), 2);
        assert_eq!(segment.choices[1].kind, ChoiceKind::Deduction);
        assert!(segment.id.as_deref().unwrap().starts_with("ai-"));
    }

    #[test]
    fn test_parse_fenced_segment() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_segment(&fenced).is_ok());
    }

    #[test]
    fn test_fresh_ids() {
        let a = parse_segment(VALID).unwrap();
        let b = parse_segment(VALID).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            parse_segment("I'm sorry, I can't do that"),
            Err(NarratorError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_missing_choices() {
        let raw = r#"{"visualDescription":"x","lines":[{"speaker":"a","text":"b"}],"choices":[]}"#;
        assert!(matches!(parse_segment(raw), Err(NarratorError::Invalid(_))));
    }

    #[test]
    fn test_ending_may_omit_choices() {
        let raw = r#"{"visualDescription":"x","lines":[{"speaker":"a","text":"b"}],
            "choices":[],"isEnding":true,"endingType":"dead"}"#;
        let segment = parse_segment(raw).unwrap();
        assert_eq!(segment.ending_type, Some(EndingType::Dead));
    }

    #[test]
    fn test_rejects_duplicate_choice_ids() {
        let raw = r#"{"visualDescription":"x","lines":[{"speaker":"a","text":"b"}],
            "choices":[{"id":"c","text":"1"},{"id":"c","text":"2"}]}"#;
        assert!(matches!(parse_segment(raw), Err(NarratorError::Invalid(_))));
    }

    #[test]
    fn test_rejects_blank_line_text() {
        let raw = r#"{"visualDescription":"x","lines":[{"speaker":"a","text":"  "}],
            "choices":[{"id":"c","text":"1"}]}"#;
        assert!(matches!(parse_segment(raw), Err(NarratorError::Invalid(_))));
    }

    #[test]
    fn test_schema_requires_lines() {
        let schema = segment_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "lines"));
        assert_eq!(schema["properties"]["choices"]["type"], "ARRAY");
    }
}
