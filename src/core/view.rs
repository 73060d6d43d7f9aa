//! Purpose: Map decoded screen elements into presentation-ready view elements.
//! Exports: `ViewElement`, `GapSize`, `to_view`.
//! Role: Translation layer that lets the wire schema evolve independently of
//! render semantics.
//! Invariants: `to_view` is pure and total; every variant maps tag-for-tag.
//! Invariants: Absent spacer magnitudes are default-filled to zero here.

use super::element::{ScreenElement, SizeSpec, UNKNOWN_INDEX};

/// Presentation-ready element consumed by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewElement {
    Title { index: i64, content: String },
    Subtitle { index: i64, content: String },
    Spacer { index: i64, size: GapSize },
    Unknown { index: i64 },
}

/// Normalized spacer sizing: a fixed extent or a flexible share.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GapSize {
    Fixed(u32),
    Flex(f64),
}

/// Translate decoded elements one-to-one into view elements.
pub fn to_view(elements: &[ScreenElement]) -> Vec<ViewElement> {
    elements.iter().map(view_element).collect()
}

fn view_element(element: &ScreenElement) -> ViewElement {
    match element {
        ScreenElement::Title { index, content } => ViewElement::Title {
            index: *index,
            content: content.clone(),
        },
        ScreenElement::Subtitle { index, content } => ViewElement::Subtitle {
            index: *index,
            content: content.clone(),
        },
        ScreenElement::Spacer { index, size } => ViewElement::Spacer {
            index: *index,
            size: gap_size(*size),
        },
        // The sentinel is re-applied rather than passed through; all unknown
        // view elements share one index.
        ScreenElement::Unknown { .. } => ViewElement::Unknown {
            index: UNKNOWN_INDEX,
        },
    }
}

fn gap_size(size: SizeSpec) -> GapSize {
    match size {
        SizeSpec::Height(units) => GapSize::Fixed(units.unwrap_or(0)),
        SizeSpec::Weight(share) => GapSize::Flex(share.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::{GapSize, ViewElement, to_view};
    use crate::core::element::{ScreenElement, SizeSpec, UNKNOWN_INDEX};

    #[test]
    fn maps_tag_for_tag() {
        let elements = vec![
            ScreenElement::Title {
                index: 0,
                content: "Hi".to_string(),
            },
            ScreenElement::Spacer {
                index: 1,
                size: SizeSpec::Height(Some(24)),
            },
            ScreenElement::Subtitle {
                index: 2,
                content: "there".to_string(),
            },
        ];
        assert_eq!(
            to_view(&elements),
            vec![
                ViewElement::Title {
                    index: 0,
                    content: "Hi".to_string()
                },
                ViewElement::Spacer {
                    index: 1,
                    size: GapSize::Fixed(24)
                },
                ViewElement::Subtitle {
                    index: 2,
                    content: "there".to_string()
                },
            ]
        );
    }

    #[test]
    fn absent_magnitudes_default_to_zero() {
        let elements = vec![
            ScreenElement::Spacer {
                index: 0,
                size: SizeSpec::Height(None),
            },
            ScreenElement::Spacer {
                index: 1,
                size: SizeSpec::Weight(None),
            },
        ];
        assert_eq!(
            to_view(&elements),
            vec![
                ViewElement::Spacer {
                    index: 0,
                    size: GapSize::Fixed(0)
                },
                ViewElement::Spacer {
                    index: 1,
                    size: GapSize::Flex(0.0)
                },
            ]
        );
    }

    #[test]
    fn unknown_keeps_the_sentinel_not_the_decoded_index() {
        // The decoder only ever produces Unknown with the sentinel, but the
        // mapper pins the sentinel independently.
        let elements = vec![ScreenElement::Unknown { index: 7 }];
        assert_eq!(
            to_view(&elements),
            vec![ViewElement::Unknown {
                index: UNKNOWN_INDEX
            }]
        );
    }
}
