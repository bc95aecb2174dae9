//! Structural edits shared by the formatting, list, link and key modules.
//! The `*_ops` builders return plain op lists (used by normalization); the
//! rest apply their ops through a [`Batch`].

use std::ops::RangeInclusive;

use crate::core::{ApplyError, Batch, Editor, ElementKind, ElementNode, Node, Point, Selection, TextNode};
use crate::ops::{self, Op, Path};
use crate::query::{above, children_at, leaves_in_range, text_at};

/// Ops that wrap `count` children of `parent`, starting at `first`, in a new
/// element of `kind`.
pub(crate) fn wrap_ops(parent: &[usize], first: usize, count: usize, kind: ElementKind) -> Vec<Op> {
    let wrapper = ops::child(parent, first);
    let mut out = vec![Op::InsertNode {
        path: wrapper.clone(),
        node: Node::element(kind, Vec::new()),
    }];
    for k in 0..count {
        out.push(Op::MoveNode {
            path: ops::child(parent, first + 1),
            to: ops::child(&wrapper, k),
        });
    }
    out
}

/// Ops that replace the element at `path` (holding `len` children) with its
/// children.
pub(crate) fn unwrap_ops(path: &[usize], len: usize) -> Vec<Op> {
    let Some((&ix, parent)) = path.split_last() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(len + 1);
    for k in 0..len {
        out.push(Op::MoveNode {
            path: ops::child(&ops::child(parent, ix + k), 0),
            to: ops::child(parent, ix + k),
        });
    }
    out.push(Op::RemoveNode {
        path: ops::child(parent, ix + len),
    });
    out
}

fn child_count(b: &Batch<'_>, path: &[usize]) -> Result<usize, ApplyError> {
    children_at(b.doc(), path)
        .map(<[Node]>::len)
        .ok_or_else(|| crate::core::PathError::new(format!("No container at {path:?}")).into())
}

/// Wraps the children `range` of `parent` in a new element; returns its path.
pub(crate) fn wrap_nodes(
    b: &mut Batch<'_>,
    parent: &[usize],
    range: RangeInclusive<usize>,
    kind: ElementKind,
) -> Result<Path, ApplyError> {
    let first = *range.start();
    let count = range.end().saturating_sub(first) + 1;
    for op in wrap_ops(parent, first, count, kind) {
        b.apply(op)?;
    }
    Ok(ops::child(parent, first))
}

pub(crate) fn unwrap_node(b: &mut Batch<'_>, path: &[usize]) -> Result<(), ApplyError> {
    let len = child_count(b, path)?;
    for op in unwrap_ops(path, len) {
        b.apply(op)?;
    }
    Ok(())
}

/// Moves the children `range` of the element at `path` out into its parent.
/// The element is split around the range so children outside it stay
/// wrapped; the emptied middle part is removed.
pub(crate) fn lift_children(
    b: &mut Batch<'_>,
    path: &[usize],
    range: RangeInclusive<usize>,
) -> Result<(), ApplyError> {
    let len = child_count(b, path)?;
    if len == 0 {
        return Ok(());
    }
    let last = (*range.end()).min(len - 1);
    let first = (*range.start()).min(last);

    if last + 1 < len {
        b.apply(Op::SplitNode {
            path: path.to_vec(),
            position: last + 1,
            kind: None,
            marks: None,
        })?;
    }
    let mut target = path.to_vec();
    if first > 0 {
        b.apply(Op::SplitNode {
            path: path.to_vec(),
            position: first,
            kind: None,
            marks: None,
        })?;
        target = ops::next(path);
    }
    unwrap_node(b, &target)
}

/// Splits the text leaf under `point` and every ancestor up to and including
/// `top`, so that `top` ends at the point and its copy starts there.
pub(crate) fn split_at_point(
    b: &mut Batch<'_>,
    point: &Point,
    top: &[usize],
) -> Result<(), ApplyError> {
    if !ops::is_ancestor(top, &point.path) {
        return Ok(());
    }
    b.apply(Op::SplitNode {
        path: point.path.clone(),
        position: point.offset,
        kind: None,
        marks: None,
    })?;
    let mut path = point.path.clone();
    while path.len() > top.len() {
        let Some(last) = path.pop() else {
            break;
        };
        b.apply(Op::SplitNode {
            path: path.clone(),
            position: last + 1,
            kind: None,
            marks: None,
        })?;
    }
    Ok(())
}

/// Splits the leaf at `point` when the point is strictly inside it.
pub(crate) fn split_leaf(b: &mut Batch<'_>, point: &Point) -> Result<(), ApplyError> {
    let Some(leaf) = text_at(b.doc(), &point.path) else {
        return Ok(());
    };
    if point.offset == 0 || point.offset >= leaf.text.len() {
        return Ok(());
    }
    b.apply(Op::SplitNode {
        path: point.path.clone(),
        position: point.offset,
        kind: None,
        marks: None,
    })
}

/// Removes the text between `start` and `end` leaf by leaf and collapses the
/// selection at `start`. Block boundaries are left in place.
pub(crate) fn delete_range(b: &mut Batch<'_>, start: &Point, end: &Point) -> Result<(), ApplyError> {
    let removals: Vec<Op> = leaves_in_range(b.doc(), start, end)
        .into_iter()
        .map(|(path, leaf)| {
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path {
                end.offset
            } else {
                leaf.text.len()
            };
            Op::RemoveText {
                path,
                range: from..to.max(from),
            }
        })
        .collect();
    for op in removals.into_iter().rev() {
        b.apply(op)?;
    }
    b.set_selection(Some(Selection::collapsed(start.clone())));
    Ok(())
}

/// The block a new line belongs to: the enclosing list-item when there is
/// one, otherwise the top-level block. Returns its path and the kind of
/// element a fresh line in that context gets.
pub(crate) fn line_context(doc: &crate::core::Document, leaf: &[usize]) -> Option<(Path, ElementKind)> {
    if let Some((path, _)) = above(doc, leaf, |el| el.kind == ElementKind::ListItem) {
        return Some((path, ElementKind::ListItem));
    }
    let top = *leaf.first()?;
    Some((vec![top], ElementKind::Paragraph))
}

/// Inserts an empty line of `kind` after `block` and moves the cursor in.
pub(crate) fn insert_line_after(
    b: &mut Batch<'_>,
    block: &[usize],
    kind: ElementKind,
) -> Result<(), ApplyError> {
    let path = ops::next(block);
    b.apply(Op::InsertNode {
        path: path.clone(),
        node: Node::Element(ElementNode {
            kind,
            children: vec![Node::text("")],
        }),
    })?;
    b.set_selection(Some(Selection::collapsed(Point::new(ops::child(&path, 0), 0))));
    Ok(())
}

impl Editor {
    /// Types `text` at the selection, replacing selected text. Pending cursor
    /// marks, if any, apply to the inserted text.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        let marks = self.pending_marks().cloned();
        let text = text.to_string();
        self.batch("editor.insert_text", move |b| {
            let (start, end) = selection.edges();
            if !selection.is_collapsed() {
                delete_range(b, &start, &end)?;
            }
            let Some(leaf) = text_at(b.doc(), &start.path) else {
                return Ok(());
            };
            match marks {
                Some(marks) if marks != leaf.marks => {
                    b.apply(Op::SplitNode {
                        path: start.path.clone(),
                        position: start.offset,
                        kind: None,
                        marks: None,
                    })?;
                    let path = ops::next(&start.path);
                    let len = text.len();
                    b.apply(Op::InsertNode {
                        path: path.clone(),
                        node: Node::Text(TextNode { text, marks }),
                    })?;
                    b.set_selection(Some(Selection::collapsed(Point::new(path, len))));
                }
                _ => {
                    b.apply(Op::InsertText {
                        path: start.path.clone(),
                        offset: start.offset,
                        text,
                    })?;
                }
            }
            Ok(())
        })?;
        self.set_pending_marks(None);
        Ok(())
    }

    /// Splits the current line at the cursor, deleting selected text first.
    pub fn insert_break(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        self.batch("editor.insert_break", |b| {
            let (start, end) = selection.edges();
            if !selection.is_collapsed() {
                delete_range(b, &start, &end)?;
            }
            let Some((block, _)) = line_context(b.doc(), &start.path) else {
                return Ok(());
            };
            split_at_point(b, &start, &block)
        })
    }
}
