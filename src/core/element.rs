//! Purpose: Define the decoded screen-element model.
//! Exports: `ScreenElement`, `SizeSpec`, `UNKNOWN_INDEX`.
//! Role: Closed sum type produced by `core::decode`; the wire-facing model.
//! Invariants: `Unknown` is a normal variant, never an error path.
//! Invariants: All unknown or malformed elements carry `UNKNOWN_INDEX`.

/// Sentinel index assigned to every element that failed to decode.
///
/// Unknown elements collapse onto one index and therefore sort together;
/// the upstream document format reserves indices below 99 for real content.
pub const UNKNOWN_INDEX: i64 = 99;

/// One decoded record of a screen document, discriminated by the wire
/// `type` field and ordered by `index`.
#[derive(Clone, Debug, PartialEq)]
pub enum ScreenElement {
    Title { index: i64, content: String },
    Subtitle { index: i64, content: String },
    Spacer { index: i64, size: SizeSpec },
    Unknown { index: i64 },
}

impl ScreenElement {
    pub fn index(&self) -> i64 {
        match self {
            ScreenElement::Title { index, .. }
            | ScreenElement::Subtitle { index, .. }
            | ScreenElement::Spacer { index, .. }
            | ScreenElement::Unknown { index } => *index,
        }
    }

    pub fn unknown() -> Self {
        ScreenElement::Unknown {
            index: UNKNOWN_INDEX,
        }
    }
}

/// Sizing strategy for a spacer. Exactly one variant applies per spacer;
/// the magnitude may be absent on the wire and is default-filled by the
/// view mapper, not here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizeSpec {
    /// Fixed extent in layout units.
    Height(Option<u32>),
    /// Proportional share of the remaining space.
    Weight(Option<f64>),
}

#[cfg(test)]
mod tests {
    use super::{ScreenElement, SizeSpec, UNKNOWN_INDEX};

    #[test]
    fn index_accessor_covers_every_variant() {
        let elements = [
            ScreenElement::Title {
                index: 1,
                content: "roast notes".to_string(),
            },
            ScreenElement::Subtitle {
                index: 2,
                content: "washed process".to_string(),
            },
            ScreenElement::Spacer {
                index: 3,
                size: SizeSpec::Height(Some(16)),
            },
            ScreenElement::Unknown { index: 4 },
        ];
        let indices: Vec<i64> = elements.iter().map(ScreenElement::index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn unknown_constructor_uses_sentinel() {
        assert_eq!(
            ScreenElement::unknown(),
            ScreenElement::Unknown {
                index: UNKNOWN_INDEX
            }
        );
    }
}
