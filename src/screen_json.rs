//! Purpose: Shared JSON projections for decoded screen elements.
//! Exports: `element_json`, `elements_json`.
//! Role: Keep CLI stdout shapes for elements defined in one place.
//! Invariants: Shapes are stable once published; fields are additive-only.

use screenbrew::api::{ScreenElement, SizeSpec};
use serde_json::{Value, json};

pub fn element_json(element: &ScreenElement) -> Value {
    match element {
        ScreenElement::Title { index, content } => json!({
            "type": "title",
            "index": index,
            "content": content,
        }),
        ScreenElement::Subtitle { index, content } => json!({
            "type": "subtitle",
            "index": index,
            "content": content,
        }),
        ScreenElement::Spacer { index, size } => json!({
            "type": "spacer",
            "index": index,
            "size": size_json(*size),
        }),
        ScreenElement::Unknown { index } => json!({
            "type": "unknown",
            "index": index,
        }),
    }
}

pub fn elements_json(elements: &[ScreenElement]) -> Value {
    Value::Array(elements.iter().map(element_json).collect())
}

fn size_json(size: SizeSpec) -> Value {
    match size {
        SizeSpec::Height(units) => json!({ "height": units }),
        SizeSpec::Weight(share) => json!({ "weight": share }),
    }
}
