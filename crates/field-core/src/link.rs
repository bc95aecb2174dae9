use serde::{Deserialize, Serialize};

use crate::core::{ApplyError, Batch, Editor, ElementKind, Node, Point, Selection};
use crate::ops::{self, Affinity, Op, Path};
use crate::query::{
    above, element_at, elements_in_range, end_point, leaves_in_range, string_in_range, text_at,
};
use crate::transforms::{lift_children, split_leaf, unwrap_node, wrap_nodes};

pub const TARGET_BLANK: &str = "_blank";
pub const TARGET_SELF: &str = "_self";

/// The first link intersecting the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLink {
    pub path: Path,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub text: String,
}

pub fn get_active_link(editor: &Editor) -> Option<ActiveLink> {
    let selection = editor.selection()?;
    let (start, end) = selection.edges();
    elements_in_range(editor.doc(), &start, &end, |el| el.kind.is_link())
        .into_iter()
        .next()
        .and_then(|(path, el)| match &el.kind {
            ElementKind::Link { url, target } => Some(ActiveLink {
                path,
                url: url.clone(),
                target: target.clone(),
                text: el.children.iter().map(Node::string).collect(),
            }),
            _ => None,
        })
}

pub fn is_link_active(editor: &Editor) -> bool {
    get_active_link(editor).is_some()
}

/// Inserts a link, replacing the active one if the selection touches a link.
/// On an expanded selection without a link the selected text is wrapped and
/// `text` is ignored. The cursor ends up right after the link.
pub fn insert_link(
    editor: &mut Editor,
    url: &str,
    text: &str,
    target: Option<&str>,
) -> Result<(), ApplyError> {
    let Some(selection) = editor.selection().cloned() else {
        return Ok(());
    };
    let kind = ElementKind::Link {
        url: url.to_string(),
        target: target.filter(|t| !t.is_empty()).map(str::to_string),
    };
    let link = Node::element(kind.clone(), vec![Node::text(text)]);

    if let Some(active) = get_active_link(editor) {
        editor.batch("link.replace", |b| {
            b.apply(Op::RemoveNode {
                path: active.path.clone(),
            })?;
            b.apply(Op::InsertNode {
                path: active.path.clone(),
                node: link,
            })?;
            let leaf = ops::child(&active.path, 0);
            b.set_selection(Some(Selection::collapsed(Point::new(leaf, text.len()))));
            Ok(())
        })?;
    } else if selection.is_collapsed() {
        editor.batch("link.insert", |b| {
            let point = selection.focus.clone();
            if text_at(b.doc(), &point.path).is_none() {
                return Ok(());
            }
            b.apply(Op::SplitNode {
                path: point.path.clone(),
                position: point.offset,
                kind: None,
                marks: None,
            })?;
            let path = ops::next(&point.path);
            b.apply(Op::InsertNode {
                path: path.clone(),
                node: link,
            })?;
            b.set_selection(Some(Selection::collapsed(Point::new(
                ops::child(&path, 0),
                text.len(),
            ))));
            Ok(())
        })?;
    } else {
        let (start, end) = selection.edges();
        editor.batch("link.wrap", |b| wrap_range(b, &start, &end, kind))?;
    }

    move_after_link(editor);
    Ok(())
}

/// Wraps the inline content between `start` and `end` in links, one per
/// block the range touches.
fn wrap_range(b: &mut Batch<'_>, start: &Point, end: &Point, kind: ElementKind) -> Result<(), ApplyError> {
    let start_ref = b.track(start.clone(), Affinity::Forward);
    let end_ref = b.track(end.clone(), Affinity::Backward);
    let end = b.point(end_ref);
    split_leaf(b, &end)?;
    let start = b.point(start_ref);
    split_leaf(b, &start)?;
    let start = b.point(start_ref);
    let end = b.point(end_ref);

    // Consecutive runs of selected leaves that share a parent.
    let mut runs: Vec<(Path, usize, usize)> = Vec::new();
    for (path, _) in leaves_in_range(b.doc(), &start, &end) {
        let Some((&ix, parent)) = path.split_last() else {
            continue;
        };
        match runs.last_mut() {
            Some((run_parent, _, last)) if run_parent.as_slice() == parent && *last + 1 == ix => {
                *last = ix;
            }
            _ => runs.push((parent.to_vec(), ix, ix)),
        }
    }

    for (parent, first, last) in runs.into_iter().rev() {
        wrap_nodes(b, &parent, first..=last, kind.clone())?;
    }
    let end = b.point(end_ref);
    b.set_selection(Some(Selection::collapsed(end)));
    Ok(())
}

/// Moves a cursor sitting at the end of a link onto the text leaf after it.
fn move_after_link(editor: &mut Editor) {
    let Some(focus) = editor.selection().map(|s| s.focus.clone()) else {
        return;
    };
    let doc = editor.doc();
    let Some((link_path, _)) = above(doc, &focus.path, |el| el.kind.is_link()) else {
        return;
    };
    if end_point(doc, &link_path) != Some(focus) {
        return;
    }
    let after = ops::next(&link_path);
    if text_at(doc, &after).is_some() {
        editor.set_selection(Some(Selection::collapsed(Point::new(after, 0))));
    }
}

/// Unwraps the link around a collapsed cursor, or the linked portions of an
/// expanded selection.
pub fn remove_link(editor: &mut Editor) -> Result<(), ApplyError> {
    let Some(selection) = editor.selection().cloned() else {
        return Ok(());
    };

    if selection.is_collapsed() {
        let Some((path, _)) = above(editor.doc(), &selection.focus.path, |el| el.kind.is_link())
        else {
            return Ok(());
        };
        return editor.batch("link.remove", |b| unwrap_node(b, &path));
    }

    let backward = selection.is_backward();
    let (start, end) = selection.edges();
    editor.batch("link.remove", |b| {
        let start_ref = b.track(start, Affinity::Forward);
        let end_ref = b.track(end, Affinity::Backward);
        let end = b.point(end_ref);
        split_leaf(b, &end)?;
        let start = b.point(start_ref);
        split_leaf(b, &start)?;
        let start = b.point(start_ref);
        let end = b.point(end_ref);

        let mut lifts: Vec<(Path, usize, usize)> = Vec::new();
        for (path, _) in leaves_in_range(b.doc(), &start, &end) {
            let Some((&ix, parent)) = path.split_last() else {
                continue;
            };
            if !element_at(b.doc(), parent).is_some_and(|el| el.kind.is_link()) {
                continue;
            }
            match lifts.last_mut() {
                Some((link, _, last)) if link.as_slice() == parent => *last = ix,
                _ => lifts.push((parent.to_vec(), ix, ix)),
            }
        }
        for (link, first, last) in lifts.into_iter().rev() {
            lift_children(b, &link, first..=last)?;
        }

        let start = b.point(start_ref);
        let end = b.point(end_ref);
        b.set_selection(Some(Selection::from_edges(start, end, backward)));
        Ok(())
    })
}

/// State for the host's link dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDialogRequest {
    pub text: String,
    pub url: String,
    pub open_in_new_tab: bool,
    pub editing: bool,
}

impl LinkDialogRequest {
    pub fn for_selection(editor: &Editor) -> Option<Self> {
        let selection = editor.selection()?;
        if let Some(active) = get_active_link(editor) {
            return Some(Self {
                text: active.text,
                url: active.url,
                open_in_new_tab: active.target.as_deref() == Some(TARGET_BLANK),
                editing: true,
            });
        }
        let (start, end) = selection.edges();
        Some(Self {
            text: string_in_range(editor.doc(), &start, &end),
            url: String::new(),
            open_in_new_tab: false,
            editing: false,
        })
    }

    pub fn title(&self) -> &'static str {
        if self.editing { "Edit link" } else { "Insert link" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LinkDialogResponse {
    Confirmed {
        url: String,
        text: String,
        open_in_new_tab: bool,
    },
    Cancelled,
}

impl LinkDialogResponse {
    /// Whether the dialog's insert button is enabled.
    pub fn can_insert(&self) -> bool {
        match self {
            LinkDialogResponse::Confirmed { url, text, .. } => {
                !url.trim().is_empty() && !text.trim().is_empty()
            }
            LinkDialogResponse::Cancelled => false,
        }
    }

    /// Applies a confirmed response. Returns whether a link was inserted.
    pub fn apply(&self, editor: &mut Editor) -> Result<bool, ApplyError> {
        if !self.can_insert() {
            return Ok(false);
        }
        let LinkDialogResponse::Confirmed {
            url,
            text,
            open_in_new_tab,
        } = self
        else {
            return Ok(false);
        };
        let target = if *open_in_new_tab {
            TARGET_BLANK
        } else {
            TARGET_SELF
        };
        insert_link(editor, url.trim(), text, Some(target))?;
        Ok(true)
    }
}
