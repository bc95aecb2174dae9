use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{ApplyError, Editor, ElementKind, HeadingLevel};
use crate::ops::Op;
use crate::query::{above_selection, children_at, elements_in_range, unhang_range};
use crate::transforms::{unwrap_node, wrap_nodes};

/// A toolbar block format, written `paragraph` or `heading-1` … `heading-6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlockFormat {
    Paragraph,
    Heading(HeadingLevel),
}

impl BlockFormat {
    pub fn all() -> Vec<BlockFormat> {
        std::iter::once(BlockFormat::Paragraph)
            .chain((HeadingLevel::MIN..=HeadingLevel::MAX).map(|l| BlockFormat::Heading(HeadingLevel::clamped(l))))
            .collect()
    }

    pub fn label(self) -> String {
        match self {
            BlockFormat::Paragraph => "Paragraph".to_string(),
            BlockFormat::Heading(level) => format!("Heading {}", level.get()),
        }
    }

    fn matches(self, kind: &ElementKind) -> bool {
        match (self, kind) {
            (BlockFormat::Paragraph, ElementKind::Paragraph) => true,
            (BlockFormat::Heading(want), ElementKind::Heading { level }) => want == *level,
            _ => false,
        }
    }
}

impl fmt::Display for BlockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockFormat::Paragraph => f.write_str("paragraph"),
            BlockFormat::Heading(level) => write!(f, "heading-{}", level.get()),
        }
    }
}

impl FromStr for BlockFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "paragraph" {
            return Ok(BlockFormat::Paragraph);
        }
        s.strip_prefix("heading-")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(HeadingLevel::new)
            .map(BlockFormat::Heading)
            .ok_or_else(|| format!("Unknown block format: {s}"))
    }
}

impl TryFrom<String> for BlockFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockFormat> for String {
    fn from(format: BlockFormat) -> Self {
        format.to_string()
    }
}

pub fn get_active_formatting(editor: &Editor) -> Option<BlockFormat> {
    let selection = editor.selection()?;
    let (_, el) = above_selection(editor.doc(), selection, |el| {
        matches!(el.kind, ElementKind::Paragraph | ElementKind::Heading { .. })
    })?;
    match el.kind {
        ElementKind::Heading { level } => Some(BlockFormat::Heading(level)),
        _ => Some(BlockFormat::Paragraph),
    }
}

pub fn is_formatting_active(editor: &Editor, format: BlockFormat) -> bool {
    let Some(selection) = editor.selection() else {
        return false;
    };
    let (start, end) = selection.edges();
    let (start, end) = unhang_range(editor.doc(), &start, &end);
    !elements_in_range(editor.doc(), &start, &end, |el| format.matches(&el.kind)).is_empty()
}

/// Applies `format` to the lowest paragraph, heading or list-item that holds
/// the whole selection. A selection spanning several blocks has no such
/// block and leaves the document unchanged.
pub fn toggle_formatting(editor: &mut Editor, format: BlockFormat) -> Result<(), ApplyError> {
    let Some(selection) = editor.selection().cloned() else {
        return Ok(());
    };
    let Some((path, el)) = above_selection(editor.doc(), &selection, |el| {
        matches!(
            el.kind,
            ElementKind::Paragraph | ElementKind::Heading { .. } | ElementKind::ListItem
        )
    }) else {
        return Ok(());
    };
    let kind = el.kind.clone();
    let top_level = path.len() == 1;

    editor.batch("block.toggle_formatting", |b| match (format, kind) {
        (BlockFormat::Paragraph, ElementKind::Paragraph | ElementKind::ListItem) => Ok(()),
        (BlockFormat::Heading(level), ElementKind::Heading { level: current }) => {
            if level != current {
                b.apply(Op::SetNode {
                    path,
                    kind: ElementKind::Heading { level },
                })?;
            }
            Ok(())
        }
        (BlockFormat::Heading(level), ElementKind::Paragraph) if top_level => b.apply(Op::SetNode {
            path,
            kind: ElementKind::Heading { level },
        }),
        (BlockFormat::Heading(level), _) => {
            let len = children_at(b.doc(), &path).map_or(0, |children| children.len());
            if len == 0 {
                return Ok(());
            }
            wrap_nodes(b, &path, 0..=len - 1, ElementKind::Heading { level }).map(|_| ())
        }
        (BlockFormat::Paragraph, ElementKind::Heading { .. }) => {
            // Below the document a heading sits in a list-item or paragraph.
            if !top_level {
                unwrap_node(b, &path)
            } else {
                b.apply(Op::SetNode {
                    path,
                    kind: ElementKind::Paragraph,
                })
            }
        }
        (BlockFormat::Paragraph, _) => Ok(()),
    })
}
