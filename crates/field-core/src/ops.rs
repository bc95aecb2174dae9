use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{ElementKind, Marks, Node, Point, Selection};

pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Splits the node at `path` so that everything from `position` on (a byte
    /// offset for text, a child index for elements) moves into a new next
    /// sibling. `kind` / `marks` override the new sibling's properties.
    SplitNode {
        #[serde(default)]
        path: Path,
        position: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ElementKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marks: Option<Marks>,
    },
    /// Merges the node at `path` into its previous sibling.
    MergeNode {
        #[serde(default)]
        path: Path,
    },
    /// Removes the node at `path` and inserts it at `to`, where `to` addresses
    /// the document as it is once the node has been removed.
    MoveNode {
        #[serde(default)]
        path: Path,
        to: Path,
    },
    SetNode {
        #[serde(default)]
        path: Path,
        kind: ElementKind,
    },
    SetMarks {
        #[serde(default)]
        path: Path,
        marks: Marks,
    },
}

impl Op {
    /// Whether applying this op can change the persisted value.
    pub fn is_structural(&self) -> bool {
        match self {
            Op::InsertText { text, .. } => !text.is_empty(),
            Op::RemoveText { range, .. } => range.start < range.end,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}

/// Which side a point sticks to when content is inserted or split exactly at
/// its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Forward,
    Backward,
}

pub fn parent(path: &[usize]) -> &[usize] {
    path.split_last().map(|(_, p)| p).unwrap_or(&[])
}

pub fn next(path: &[usize]) -> Path {
    let mut out = path.to_vec();
    if let Some(last) = out.last_mut() {
        *last += 1;
    }
    out
}

pub fn previous(path: &[usize]) -> Option<Path> {
    let (&last, rest) = path.split_last()?;
    let prev = last.checked_sub(1)?;
    let mut out = rest.to_vec();
    out.push(prev);
    Some(out)
}

pub fn child(path: &[usize], index: usize) -> Path {
    let mut out = path.to_vec();
    out.push(index);
    out
}

/// True if `ancestor` is a strict prefix of `path`.
pub fn is_ancestor(ancestor: &[usize], path: &[usize]) -> bool {
    ancestor.len() < path.len() && path.starts_with(ancestor)
}

pub fn common_ancestor(a: &[usize], b: &[usize]) -> Path {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// What an applied op did to the tree, in terms needed to move points.
#[derive(Debug, Clone)]
pub(crate) enum Applied {
    InsertText {
        path: Path,
        offset: usize,
        len: usize,
    },
    RemoveText {
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        path: Path,
    },
    RemoveNode {
        path: Path,
    },
    SplitNode {
        path: Path,
        position: usize,
        is_text: bool,
    },
    MergeNode {
        path: Path,
        position: usize,
        is_text: bool,
    },
    MoveNode {
        path: Path,
        to: Path,
    },
    Attributes,
}

impl Applied {
    pub(crate) fn transform_selection(&self, selection: &mut Selection) {
        self.transform_point(&mut selection.anchor, Affinity::Forward);
        self.transform_point(&mut selection.focus, Affinity::Forward);
    }

    pub(crate) fn transform_point(&self, point: &mut Point, affinity: Affinity) {
        match self {
            Applied::InsertText { path, offset, len } => {
                if point.path == *path
                    && (point.offset > *offset
                        || (point.offset == *offset && affinity == Affinity::Forward))
                {
                    point.offset += len;
                }
            }
            Applied::RemoveText { path, range } => {
                if point.path != *path || point.offset <= range.start {
                    return;
                }
                if point.offset >= range.end {
                    point.offset -= range.end - range.start;
                } else {
                    point.offset = range.start;
                }
            }
            Applied::InsertNode { path } => shift_for_insert(&mut point.path, path),
            Applied::RemoveNode { path } => {
                if point.path.starts_with(path) {
                    // The point's leaf is gone; park it on the previous sibling's
                    // end (or the next sibling's start) and let selection
                    // normalization resolve it to a real leaf.
                    let depth = path.len() - 1;
                    point.path.truncate(depth + 1);
                    if point.path[depth] > 0 {
                        point.path[depth] -= 1;
                        point.offset = usize::MAX;
                    } else {
                        point.offset = 0;
                    }
                    return;
                }
                shift_for_remove(&mut point.path, path);
            }
            Applied::SplitNode {
                path,
                position,
                is_text,
            } => {
                let depth = path.len();
                if *is_text {
                    if point.path == *path
                        && (point.offset > *position
                            || (point.offset == *position && affinity == Affinity::Forward))
                    {
                        point.path[depth - 1] += 1;
                        point.offset -= position;
                        return;
                    }
                } else if is_ancestor(path, &point.path) && point.path[depth] >= *position {
                    point.path[depth - 1] += 1;
                    point.path[depth] -= position;
                    return;
                }
                if point.path != *path && !is_ancestor(path, &point.path) {
                    shift_for_insert(&mut point.path, &next(path));
                }
            }
            Applied::MergeNode {
                path,
                position,
                is_text,
            } => {
                let depth = path.len();
                if *is_text && point.path == *path {
                    point.path[depth - 1] -= 1;
                    point.offset += position;
                } else if !*is_text && is_ancestor(path, &point.path) {
                    point.path[depth - 1] -= 1;
                    point.path[depth] += position;
                } else {
                    shift_for_remove(&mut point.path, path);
                }
            }
            Applied::MoveNode { path, to } => {
                if point.path.starts_with(path) {
                    let mut moved = to.clone();
                    moved.extend_from_slice(&point.path[path.len()..]);
                    point.path = moved;
                } else {
                    shift_for_remove(&mut point.path, path);
                    shift_for_insert(&mut point.path, to);
                }
            }
            Applied::Attributes => {}
        }
    }
}

fn shift_for_insert(target: &mut Path, inserted: &[usize]) {
    let Some((&index, parent_path)) = inserted.split_last() else {
        return;
    };
    let depth = parent_path.len();
    if target.len() > depth && target.starts_with(parent_path) && target[depth] >= index {
        target[depth] += 1;
    }
}

fn shift_for_remove(target: &mut Path, removed: &[usize]) {
    let Some((&index, parent_path)) = removed.split_last() else {
        return;
    };
    let depth = parent_path.len();
    if target.len() > depth && target.starts_with(parent_path) && target[depth] > index {
        target[depth] -= 1;
    }
}
