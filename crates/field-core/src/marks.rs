use crate::core::{ApplyError, Editor, Mark, Marks, Selection};
use crate::ops::{self, Affinity, Op};
use crate::query::{leaves_in_range, text_at};
use crate::transforms::split_leaf;

/// Marks that text typed at a collapsed cursor would get: the pending
/// cursor marks if any, otherwise those of the leaf under the cursor. At the
/// very start of a leaf the previous leaf of the same parent wins.
pub fn cursor_marks(editor: &Editor) -> Option<Marks> {
    if let Some(marks) = editor.pending_marks() {
        return Some(marks.clone());
    }
    let focus = &editor.selection()?.focus;
    let doc = editor.doc();
    if focus.offset == 0
        && let Some(prev) = ops::previous(&focus.path)
        && let Some(leaf) = text_at(doc, &prev)
    {
        return Some(leaf.marks.clone());
    }
    text_at(doc, &focus.path).map(|leaf| leaf.marks.clone())
}

pub fn is_mark_active(editor: &Editor, mark: Mark) -> bool {
    let Some(selection) = editor.selection() else {
        return false;
    };
    if selection.is_collapsed() {
        return cursor_marks(editor).is_some_and(|marks| marks.is_active(mark));
    }
    let (start, end) = selection.edges();
    let leaves = leaves_in_range(editor.doc(), &start, &end);
    if leaves.is_empty() {
        return text_at(editor.doc(), &start.path).is_some_and(|leaf| leaf.marks.is_active(mark));
    }
    leaves.iter().all(|(_, leaf)| leaf.marks.is_active(mark))
}

/// Flips `mark` on the selection. A collapsed cursor only queues the change
/// for the next typed text.
pub fn toggle_mark(editor: &mut Editor, mark: Mark) -> Result<(), ApplyError> {
    let Some(selection) = editor.selection().cloned() else {
        return Ok(());
    };
    let active = is_mark_active(editor, mark);
    let value = if active { None } else { Some(true) };

    if selection.is_collapsed() {
        let mut marks = cursor_marks(editor).unwrap_or_default();
        marks.set(mark, value);
        editor.set_pending_marks(Some(marks));
        return Ok(());
    }

    let backward = selection.is_backward();
    let (start, end) = selection.edges();
    editor.batch("marks.toggle", |b| {
        let start_ref = b.track(start, Affinity::Forward);
        let end_ref = b.track(end, Affinity::Backward);

        let end = b.point(end_ref);
        split_leaf(b, &end)?;
        let start = b.point(start_ref);
        split_leaf(b, &start)?;

        let start = b.point(start_ref);
        let end = b.point(end_ref);
        let updates: Vec<(ops::Path, Marks)> = leaves_in_range(b.doc(), &start, &end)
            .into_iter()
            .map(|(path, leaf)| {
                let mut marks = leaf.marks.clone();
                marks.set(mark, value);
                (path, marks)
            })
            .collect();
        for (path, marks) in updates {
            b.apply(Op::SetMarks { path, marks })?;
        }
        b.set_selection(Some(Selection::from_edges(start, end, backward)));
        Ok(())
    })
}
