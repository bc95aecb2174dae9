use crate::core::{ApplyError, Editor, ElementKind, ListType, Node, Selection};
use crate::ops::{Affinity, Op};
use crate::query::{elements_in_range, unhang_range};
use crate::transforms::{lift_children, wrap_nodes};

pub fn is_list_active(editor: &Editor, list_type: Option<ListType>) -> bool {
    let Some(selection) = editor.selection() else {
        return false;
    };
    let (start, end) = selection.edges();
    let (start, end) = unhang_range(editor.doc(), &start, &end);
    !elements_in_range(editor.doc(), &start, &end, |el| match &el.kind {
        ElementKind::List { list_type: found } => list_type.is_none_or(|want| want == *found),
        _ => false,
    })
    .is_empty()
}

fn list_type_at(children: &[Node], ix: usize) -> Option<ListType> {
    match children.get(ix)?.as_element()?.kind {
        ElementKind::List { list_type } => Some(list_type),
        _ => None,
    }
}

/// Turns the selected top-level blocks into a list of `list_type`, or back
/// into plain blocks when that list type is already active. A new list
/// merges with same-type neighbours. A selection ending at the start of a
/// block does not reach into that block.
pub fn toggle_list(editor: &mut Editor, list_type: ListType) -> Result<(), ApplyError> {
    let Some(selection) = editor.selection().cloned() else {
        return Ok(());
    };
    let activate = !is_list_active(editor, Some(list_type));
    let backward = selection.is_backward();
    let (selected_start, selected_end) = selection.edges();
    let (start, end) = unhang_range(editor.doc(), &selected_start, &selected_end);

    editor.batch("list.toggle", |b| {
        let selected_start_ref = b.track(selected_start, Affinity::Forward);
        let selected_end_ref = b.track(selected_end, Affinity::Backward);
        let start_ref = b.track(start.clone(), Affinity::Forward);
        let end_ref = b.track(end.clone(), Affinity::Backward);

        // Lift the selected items out of every list the selection touches.
        let (first, last) = (start.path[0], end.path[0]);
        for ix in (first..=last).rev() {
            let Some(Node::Element(el)) = b.doc().children.get(ix) else {
                continue;
            };
            if !el.kind.is_list() || el.children.is_empty() {
                continue;
            }
            let from = if ix == first { start.path.get(1).copied().unwrap_or(0) } else { 0 };
            let to = if ix == last {
                end.path.get(1).copied().unwrap_or(el.children.len() - 1)
            } else {
                el.children.len() - 1
            };
            lift_children(b, &[ix], from..=to)?;
        }

        let first = b.point(start_ref).path[0];
        let last = b.point(end_ref).path[0];
        for ix in (first..=last).rev() {
            let Some(Node::Element(el)) = b.doc().children.get(ix) else {
                continue;
            };
            let kind = el.kind.clone();
            let holds_heading = matches!(
                el.children.as_slice(),
                [Node::Element(inner)] if inner.kind.is_heading()
            );
            match (kind, activate) {
                (ElementKind::Paragraph, true) => b.apply(Op::SetNode {
                    path: vec![ix],
                    kind: ElementKind::ListItem,
                })?,
                (ElementKind::Heading { .. }, true) => {
                    wrap_nodes(b, &[], ix..=ix, ElementKind::ListItem)?;
                }
                (ElementKind::ListItem, false) if holds_heading => {
                    lift_children(b, &[ix], 0..=0)?;
                }
                (ElementKind::ListItem, false) => b.apply(Op::SetNode {
                    path: vec![ix],
                    kind: ElementKind::Paragraph,
                })?,
                _ => {}
            }
        }

        if activate {
            let list = wrap_nodes(b, &[], first..=last, ElementKind::List { list_type })?;
            let mut at = list[0];
            if at > 0 && list_type_at(&b.doc().children, at - 1) == Some(list_type) {
                b.apply(Op::MergeNode { path: vec![at] })?;
                at -= 1;
            }
            if list_type_at(&b.doc().children, at + 1) == Some(list_type) {
                b.apply(Op::MergeNode { path: vec![at + 1] })?;
            }
        }

        let start = b.point(selected_start_ref);
        let end = b.point(selected_end_ref);
        b.set_selection(Some(Selection::from_edges(start, end, backward)));
        Ok(())
    })
}
