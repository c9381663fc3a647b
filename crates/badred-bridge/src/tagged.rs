//! Tagged-enum encodings exposed across the script boundary. The wire
//! format is language-independent: `{type, variant, values?}`. These types
//! are the in-process shape that gets serialized to that shape by the
//! scripting host (not this crate's concern), mirroring `BackendKind` /
//! `PaneTypeTag` without committing script callers to the core's internal
//! enums.

use badred_pane::SplitType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTypeTag {
    Naive,
    Gap,
}

impl BufferTypeTag {
    pub const TYPE_NAME: &'static str = "EditorBufferType";

    pub fn variant_name(self) -> &'static str {
        match self {
            BufferTypeTag::Naive => "naive",
            BufferTypeTag::Gap => "gap",
        }
    }
}

impl From<badred_text::BackendKind> for BufferTypeTag {
    fn from(kind: badred_text::BackendKind) -> Self {
        match kind {
            badred_text::BackendKind::Naive => BufferTypeTag::Naive,
            badred_text::BackendKind::Gap => BufferTypeTag::Gap,
        }
    }
}

impl From<BufferTypeTag> for badred_text::BackendKind {
    fn from(tag: BufferTypeTag) -> Self {
        match tag {
            BufferTypeTag::Naive => badred_text::BackendKind::Naive,
            BufferTypeTag::Gap => badred_text::BackendKind::Gap,
        }
    }
}

/// `{type: "pane_node_type", variant: "leaf" | "vsplit" | "hsplit", values?}`.
/// Splits nest their `SplitType` under `values.split_type`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaneNodeType {
    Leaf,
    VSplit(Option<SplitType>),
    HSplit(Option<SplitType>),
}

impl PaneNodeType {
    pub const TYPE_NAME: &'static str = "pane_node_type";

    pub fn variant_name(self) -> &'static str {
        match self {
            PaneNodeType::Leaf => "leaf",
            PaneNodeType::VSplit(_) => "vsplit",
            PaneNodeType::HSplit(_) => "hsplit",
        }
    }

    pub fn split_type(self) -> Option<SplitType> {
        match self {
            PaneNodeType::Leaf => None,
            PaneNodeType::VSplit(s) | PaneNodeType::HSplit(s) => s,
        }
    }
}

pub fn split_type_variant_name(split_type: SplitType) -> &'static str {
    match split_type {
        SplitType::Percent(_) => "percent",
        SplitType::FirstFixed(_) => "first_fixed",
        SplitType::SecondFixed(_) => "second_fixed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_type_tag_round_trips_through_backend_kind() {
        let kind = badred_text::BackendKind::Gap;
        let tag: BufferTypeTag = kind.into();
        assert_eq!(badred_text::BackendKind::from(tag), kind);
    }

    #[test]
    fn split_type_variant_names_match_wire_contract() {
        assert_eq!(split_type_variant_name(SplitType::Percent(0.5)), "percent");
        assert_eq!(
            split_type_variant_name(SplitType::FirstFixed(10)),
            "first_fixed"
        );
        assert_eq!(
            split_type_variant_name(SplitType::SecondFixed(10)),
            "second_fixed"
        );
    }
}
