//! Purpose: Decode raw screen documents into ordered typed elements.
//! Exports: `RawDocument`, `decode`, `unknown_count`.
//! Role: Schema-validated parse boundary between untyped JSON and the model.
//! Invariants: Per-element faults degrade to `Unknown`; decode never fails.
//! Invariants: Output is stably sorted ascending by element index.
//! Invariants: Decode is pure; the same document always yields the same output.

use serde_json::{Map, Value};

use super::element::{ScreenElement, SizeSpec};

/// Untyped screen document as fetched from a store: group keys mapping to
/// arrays of per-element objects.
pub type RawDocument = Map<String, Value>;

/// Flatten every group of `raw` into one sequence of typed elements,
/// sorted ascending by index. Group keys are discarded; groups whose value
/// is not an array are skipped. Malformed entries become `Unknown`.
pub fn decode(raw: &RawDocument) -> Vec<ScreenElement> {
    let mut elements = Vec::new();
    for (group, value) in raw {
        let Some(entries) = value.as_array() else {
            tracing::debug!(group = group.as_str(), "skipping non-array screen group");
            continue;
        };
        for entry in entries {
            elements.push(decode_element(entry));
        }
    }
    elements.sort_by_key(ScreenElement::index);
    elements
}

/// Number of elements that decoded to `Unknown`.
pub fn unknown_count(elements: &[ScreenElement]) -> usize {
    elements
        .iter()
        .filter(|element| matches!(element, ScreenElement::Unknown { .. }))
        .count()
}

fn decode_element(entry: &Value) -> ScreenElement {
    let Some(fields) = entry.as_object() else {
        tracing::debug!("screen entry is not an object");
        return ScreenElement::unknown();
    };
    match fields.get("type").and_then(Value::as_str) {
        Some("TITLE") => text_element(fields, TextTag::Title),
        Some("SUBTITLE") => text_element(fields, TextTag::Subtitle),
        Some("SPACER") => spacer_element(fields),
        other => {
            tracing::debug!(element_type = ?other, "unrecognized screen element type");
            ScreenElement::unknown()
        }
    }
}

enum TextTag {
    Title,
    Subtitle,
}

fn text_element(fields: &Map<String, Value>, tag: TextTag) -> ScreenElement {
    let Some(index) = parse_index(fields.get("index")) else {
        return ScreenElement::unknown();
    };
    let Some(content) = fields.get("content").and_then(Value::as_str) else {
        tracing::debug!(index, "text element missing string content");
        return ScreenElement::unknown();
    };
    let content = content.to_string();
    match tag {
        TextTag::Title => ScreenElement::Title { index, content },
        TextTag::Subtitle => ScreenElement::Subtitle { index, content },
    }
}

fn spacer_element(fields: &Map<String, Value>) -> ScreenElement {
    let Some(index) = parse_index(fields.get("index")) else {
        return ScreenElement::unknown();
    };
    let Some(pair) = fields.get("size").and_then(Value::as_array) else {
        tracing::debug!(index, "spacer size is missing or not an array");
        return ScreenElement::unknown();
    };
    let Some(tag) = pair.first().and_then(Value::as_str) else {
        tracing::debug!(index, "spacer size tag is missing or not a string");
        return ScreenElement::unknown();
    };
    let magnitude = pair.get(1);
    // Unrecognized tags fall back to a fixed-height gap.
    let size = match tag {
        "WEIGHT" => SizeSpec::Weight(magnitude.and_then(Value::as_f64)),
        _ => SizeSpec::Height(magnitude.and_then(as_extent)),
    };
    ScreenElement::Spacer { index, size }
}

fn parse_index(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_extent(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|raw| u32::try_from(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::{RawDocument, decode, parse_index, unknown_count};
    use crate::core::element::{ScreenElement, SizeSpec, UNKNOWN_INDEX};
    use serde_json::{Value, json};

    fn document(value: Value) -> RawDocument {
        value.as_object().expect("object document").clone()
    }

    #[test]
    fn parse_index_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_index(Some(&json!(7))), Some(7));
        assert_eq!(parse_index(Some(&json!("12"))), Some(12));
        assert_eq!(parse_index(Some(&json!(" 3 "))), Some(3));
        assert_eq!(parse_index(Some(&json!("three"))), None);
        assert_eq!(parse_index(Some(&json!(1.5))), None);
        assert_eq!(parse_index(None), None);
    }

    #[test]
    fn groups_are_flattened_and_keys_discarded() {
        let raw = document(json!({
            "header": [{"type": "TITLE", "index": 0, "content": "Today"}],
            "body": [{"type": "SUBTITLE", "index": 1, "content": "Two pours"}],
        }));
        let elements = decode(&raw);
        assert_eq!(
            elements,
            vec![
                ScreenElement::Title {
                    index: 0,
                    content: "Today".to_string()
                },
                ScreenElement::Subtitle {
                    index: 1,
                    content: "Two pours".to_string()
                },
            ]
        );
    }

    #[test]
    fn output_is_sorted_by_index() {
        let raw = document(json!({
            "group": [
                {"type": "TITLE", "index": 3, "content": "c"},
                {"type": "TITLE", "index": 1, "content": "a"},
                {"type": "TITLE", "index": 2, "content": "b"},
            ],
        }));
        let indices: Vec<i64> = decode(&raw).iter().map(ScreenElement::index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn bad_index_or_content_degrades_single_element() {
        let raw = document(json!({
            "group": [
                {"type": "TITLE", "index": "not-a-number", "content": "x"},
                {"type": "TITLE", "index": 0, "content": 42},
                {"type": "TITLE", "index": 1, "content": "kept"},
            ],
        }));
        let elements = decode(&raw);
        assert_eq!(unknown_count(&elements), 2);
        assert!(elements.contains(&ScreenElement::Title {
            index: 1,
            content: "kept".to_string()
        }));
    }

    #[test]
    fn missing_or_bogus_type_becomes_unknown_sentinel() {
        let raw = document(json!({
            "group": [
                {"type": "BOGUS", "index": 0},
                {"index": 1, "content": "no type"},
                "not even an object",
            ],
        }));
        let elements = decode(&raw);
        assert_eq!(elements.len(), 3);
        for element in &elements {
            assert_eq!(
                element,
                &ScreenElement::Unknown {
                    index: UNKNOWN_INDEX
                }
            );
        }
    }

    #[test]
    fn spacer_tags_select_sizing_variant() {
        let raw = document(json!({
            "group": [
                {"type": "SPACER", "index": 0, "size": ["HEIGHT", 40]},
                {"type": "SPACER", "index": 1, "size": ["WEIGHT", 0.5]},
                {"type": "SPACER", "index": 2, "size": ["DIAGONAL", 8]},
            ],
        }));
        let elements = decode(&raw);
        assert_eq!(
            elements,
            vec![
                ScreenElement::Spacer {
                    index: 0,
                    size: SizeSpec::Height(Some(40))
                },
                ScreenElement::Spacer {
                    index: 1,
                    size: SizeSpec::Weight(Some(0.5))
                },
                // Unknown tags fall back to HEIGHT.
                ScreenElement::Spacer {
                    index: 2,
                    size: SizeSpec::Height(Some(8))
                },
            ]
        );
    }

    #[test]
    fn spacer_without_magnitude_keeps_absent_size() {
        let raw = document(json!({
            "group": [{"type": "SPACER", "index": 0, "size": ["HEIGHT"]}],
        }));
        assert_eq!(
            decode(&raw),
            vec![ScreenElement::Spacer {
                index: 0,
                size: SizeSpec::Height(None)
            }]
        );
    }

    #[test]
    fn spacer_with_malformed_size_is_unknown() {
        let raw = document(json!({
            "group": [
                {"type": "SPACER", "index": 0},
                {"type": "SPACER", "index": 1, "size": "HEIGHT"},
                {"type": "SPACER", "index": 2, "size": [40, "HEIGHT"]},
            ],
        }));
        let elements = decode(&raw);
        assert_eq!(unknown_count(&elements), 3);
    }

    #[test]
    fn decode_is_idempotent() {
        let raw = document(json!({
            "a": [
                {"type": "TITLE", "index": 2, "content": "Later"},
                {"type": "BOGUS"},
            ],
            "b": [{"type": "SPACER", "index": 0, "size": ["WEIGHT", 1.0]}],
        }));
        assert_eq!(decode(&raw), decode(&raw));
    }

    #[test]
    fn non_array_groups_are_skipped() {
        let raw = document(json!({
            "meta": {"version": 2},
            "group": [{"type": "TITLE", "index": 0, "content": "Hi"}],
        }));
        let elements = decode(&raw);
        assert_eq!(elements.len(), 1);
    }
}
