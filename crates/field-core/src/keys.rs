use crate::core::{ApplyError, Editor, ElementKind, Mark};
use crate::marks::toggle_mark;
use crate::ops;
use crate::query::{above, elements_in_range, end_point};
use crate::transforms::{insert_line_after, lift_children, line_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    /// Ctrl, or Cmd on macOS.
    pub modifier: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            modifier: false,
        }
    }

    pub fn enter() -> Self {
        Self::new(Key::Enter)
    }

    pub fn shift_enter() -> Self {
        Self {
            shift: true,
            ..Self::enter()
        }
    }

    pub fn backspace() -> Self {
        Self::new(Key::Backspace)
    }

    pub fn hotkey(c: char) -> Self {
        Self {
            modifier: true,
            ..Self::new(Key::Char(c))
        }
    }
}

/// Whether a handler consumed the key, suppressing the default behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    NotHandled,
}

/// Enter or Backspace in a list-item without text turns it into a paragraph
/// and moves it out of its list.
pub fn handle_empty_list_item(editor: &mut Editor) -> Result<KeyOutcome, ApplyError> {
    let Some(selection) = editor.selection() else {
        return Ok(KeyOutcome::NotHandled);
    };
    let (start, end) = selection.edges();
    let Some((path, item)) = elements_in_range(editor.doc(), &start, &end, |el| {
        el.kind == ElementKind::ListItem
    })
    .into_iter()
    .next() else {
        return Ok(KeyOutcome::NotHandled);
    };
    if !item.children.iter().all(|n| n.string().is_empty()) {
        return Ok(KeyOutcome::NotHandled);
    }
    let parent = ops::parent(&path).to_vec();
    let in_list = !parent.is_empty()
        && crate::query::element_at(editor.doc(), &parent).is_some_and(|el| el.kind.is_list());

    editor.batch("keys.empty_list_item", |b| {
        b.apply(ops::Op::SetNode {
            path: path.clone(),
            kind: ElementKind::Paragraph,
        })?;
        if let (true, Some(&ix)) = (in_list, path.last()) {
            lift_children(b, &parent, ix..=ix)?;
        }
        Ok(())
    })?;
    Ok(KeyOutcome::Handled)
}

/// Enter at the very end of a heading or list-item opens a fresh line after
/// it: a list-item inside lists, a paragraph elsewhere.
pub fn handle_heading_end_enter(editor: &mut Editor) -> Result<KeyOutcome, ApplyError> {
    let Some(selection) = editor.selection().filter(|s| s.is_collapsed()) else {
        return Ok(KeyOutcome::NotHandled);
    };
    let focus = selection.focus.clone();
    let doc = editor.doc();
    let Some((block, _)) = above(doc, &focus.path, |el| {
        matches!(el.kind, ElementKind::Heading { .. } | ElementKind::ListItem)
    }) else {
        return Ok(KeyOutcome::NotHandled);
    };
    if end_point(doc, &block) != Some(focus.clone()) {
        return Ok(KeyOutcome::NotHandled);
    }
    let Some((line, kind)) = line_context(doc, &focus.path) else {
        return Ok(KeyOutcome::NotHandled);
    };
    editor.batch("keys.heading_end_enter", |b| insert_line_after(b, &line, kind))?;
    Ok(KeyOutcome::Handled)
}

/// Enter at the very end of a link opens a fresh line after the enclosing
/// block instead of extending the link.
pub fn handle_link_end_enter(editor: &mut Editor) -> Result<KeyOutcome, ApplyError> {
    let Some(selection) = editor.selection().filter(|s| s.is_collapsed()) else {
        return Ok(KeyOutcome::NotHandled);
    };
    let focus = selection.focus.clone();
    let doc = editor.doc();
    let Some((link, _)) = above(doc, &focus.path, |el| el.kind.is_link()) else {
        return Ok(KeyOutcome::NotHandled);
    };
    if end_point(doc, &link) != Some(focus.clone()) {
        return Ok(KeyOutcome::NotHandled);
    }
    let Some((line, kind)) = line_context(doc, &focus.path) else {
        return Ok(KeyOutcome::NotHandled);
    };
    editor.batch("keys.link_end_enter", |b| insert_line_after(b, &line, kind))?;
    Ok(KeyOutcome::Handled)
}

/// `mod+b` and `mod+i`.
pub fn handle_hotkey(editor: &mut Editor, input: &KeyInput) -> Result<KeyOutcome, ApplyError> {
    if !input.modifier || input.shift {
        return Ok(KeyOutcome::NotHandled);
    }
    let mark = match input.key {
        Key::Char('b' | 'B') => Mark::Bold,
        Key::Char('i' | 'I') => Mark::Italic,
        _ => return Ok(KeyOutcome::NotHandled),
    };
    toggle_mark(editor, mark)?;
    Ok(KeyOutcome::Handled)
}

/// Key-down entry point. Enter is always consumed; Backspace only when the
/// empty list-item rule applies.
pub fn handle_key_down(editor: &mut Editor, input: KeyInput) -> Result<KeyOutcome, ApplyError> {
    if handle_hotkey(editor, &input)? == KeyOutcome::Handled {
        tracing::debug!(?input, "hotkey");
        return Ok(KeyOutcome::Handled);
    }
    match input.key {
        Key::Backspace => {
            let outcome = handle_empty_list_item(editor)?;
            if outcome == KeyOutcome::Handled {
                tracing::debug!("backspace left an empty list-item");
            }
            Ok(outcome)
        }
        Key::Enter => {
            if handle_empty_list_item(editor)? == KeyOutcome::Handled {
                tracing::debug!("enter left an empty list-item");
                return Ok(KeyOutcome::Handled);
            }
            if input.shift {
                editor.insert_text("\n")?;
                return Ok(KeyOutcome::Handled);
            }
            if handle_heading_end_enter(editor)? == KeyOutcome::Handled {
                tracing::debug!("enter at end of heading or list-item");
                return Ok(KeyOutcome::Handled);
            }
            if handle_link_end_enter(editor)? == KeyOutcome::Handled {
                tracing::debug!("enter at end of link");
                return Ok(KeyOutcome::Handled);
            }
            editor.insert_break()?;
            Ok(KeyOutcome::Handled)
        }
        Key::Char(_) | Key::Other => Ok(KeyOutcome::NotHandled),
    }
}
