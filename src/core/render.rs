//! Purpose: Project view elements into UI nodes for a layout collaborator.
//! Exports: `UiNode`, `TextNode`, `TextRole`, `render`, `node_json`.
//! Role: Stateless final stage of the screen pipeline.
//! Invariants: Dispatch is exhaustive; `Unknown` renders as `Empty`, never an error.
//! Invariants: Rendering the same sequence twice yields the same nodes.

use serde_json::{Value, json};

use super::view::{GapSize, ViewElement};

/// Text emphasis as understood by the host UI toolkit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextRole {
    Title,
    Subtitle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub role: TextRole,
}

/// One node handed to the UI framework. Fixed and flexible gaps are
/// mutually exclusive strategies along the primary layout axis.
#[derive(Clone, Debug, PartialEq)]
pub enum UiNode {
    Text(TextNode),
    FixedGap(u32),
    FlexGap(f64),
    Empty,
}

/// Render view elements in order. Pure projection; holds no state.
pub fn render(elements: &[ViewElement]) -> Vec<UiNode> {
    elements.iter().map(render_element).collect()
}

fn render_element(element: &ViewElement) -> UiNode {
    match element {
        ViewElement::Title { content, .. } => UiNode::Text(TextNode {
            content: content.clone(),
            role: TextRole::Title,
        }),
        ViewElement::Subtitle { content, .. } => UiNode::Text(TextNode {
            content: content.clone(),
            role: TextRole::Subtitle,
        }),
        ViewElement::Spacer { size, .. } => match size {
            GapSize::Fixed(units) => UiNode::FixedGap(*units),
            GapSize::Flex(share) => UiNode::FlexGap(*share),
        },
        ViewElement::Unknown { .. } => UiNode::Empty,
    }
}

/// Stable JSON shape for a node, used by the CLI `render` output.
pub fn node_json(node: &UiNode) -> Value {
    match node {
        UiNode::Text(text) => json!({
            "node": "text",
            "role": match text.role {
                TextRole::Title => "title",
                TextRole::Subtitle => "subtitle",
            },
            "content": text.content,
        }),
        UiNode::FixedGap(units) => json!({ "node": "fixed_gap", "units": units }),
        UiNode::FlexGap(share) => json!({ "node": "flex_gap", "share": share }),
        UiNode::Empty => json!({ "node": "empty" }),
    }
}
