use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{EditorConfig, ToolbarOption};
use crate::core::{ApplyError, Document, Editor, ListType, Mark, Selection};
use crate::formatting::{BlockFormat, get_active_formatting};
use crate::keys::{KeyInput, KeyOutcome, handle_key_down};
use crate::link::{LinkDialogRequest, LinkDialogResponse, is_link_active};
use crate::list::is_list_active;
use crate::marks::is_mark_active;
use crate::plugin::{CommandError, PluginRegistry};
use crate::value::{FieldValue, deserialize, serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// The document structure changed; carries the new persisted value.
    ValueChanged(FieldValue),
    /// The host should open its link dialog with this state.
    LinkDialogRequested(LinkDialogRequest),
}

/// What the toolbar shows. Entries disabled in the config are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarState {
    pub formatting: Option<BlockFormat>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub link: Option<bool>,
    pub ordered_list: Option<bool>,
    pub unordered_list: Option<bool>,
}

/// One rich-text form field: an editor plus the change events the
/// surrounding form listens to.
pub struct RichTextField {
    editor: Editor,
    last_emitted: Option<FieldValue>,
    events: Vec<FieldEvent>,
}

impl RichTextField {
    pub fn new(value: Option<&FieldValue>, config: EditorConfig) -> Self {
        let doc = Document::new(deserialize(value));
        let editor = Editor::with_config(doc, None, PluginRegistry::richtext(), config);
        Self {
            editor,
            last_emitted: value.cloned(),
            events: Vec::new(),
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Runs `f` against the editor and queues a change event if it touched
    /// the document structure.
    pub fn update<T>(&mut self, f: impl FnOnce(&mut Editor) -> T) -> T {
        let out = f(&mut self.editor);
        self.flush();
        out
    }

    pub fn value(&self) -> FieldValue {
        serialize(&self.editor.doc().children)
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.editor.set_selection(selection);
    }

    pub fn handle_key_down(&mut self, input: KeyInput) -> Result<KeyOutcome, ApplyError> {
        self.update(|editor| handle_key_down(editor, input))
    }

    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        self.update(|editor| editor.insert_text(text))
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let result = self.update(|editor| editor.run_command(id, args));
        if let Err(err) = &result {
            tracing::warn!(command = id, error = %err, "command failed");
        }
        result
    }

    pub fn toolbar_state(&self) -> ToolbarState {
        let config = self.editor.config();
        let editor = &self.editor;
        let enabled = |option| config.has_toolbar_option(option);
        ToolbarState {
            formatting: enabled(ToolbarOption::Formatting)
                .then(|| get_active_formatting(editor).unwrap_or(BlockFormat::Paragraph)),
            bold: enabled(ToolbarOption::Bold).then(|| is_mark_active(editor, Mark::Bold)),
            italic: enabled(ToolbarOption::Italic).then(|| is_mark_active(editor, Mark::Italic)),
            link: enabled(ToolbarOption::Link).then(|| is_link_active(editor)),
            ordered_list: enabled(ToolbarOption::OrderedList)
                .then(|| is_list_active(editor, Some(ListType::Ordered))),
            unordered_list: enabled(ToolbarOption::UnorderedList)
                .then(|| is_list_active(editor, Some(ListType::Unordered))),
        }
    }

    /// Asks the host to open the link dialog for the current selection.
    pub fn request_link_dialog(&mut self) -> bool {
        let Some(request) = LinkDialogRequest::for_selection(&self.editor) else {
            return false;
        };
        self.events.push(FieldEvent::LinkDialogRequested(request));
        true
    }

    /// Applies the host's answer to a link dialog. Returns whether a link was
    /// inserted.
    pub fn resolve_link_dialog(&mut self, response: &LinkDialogResponse) -> Result<bool, ApplyError> {
        self.update(|editor| response.apply(editor))
    }

    /// Replaces the document from outside the field. The echo of the value
    /// this field last emitted, or a value equal to the current document, is
    /// ignored. Returns whether the document was replaced.
    pub fn set_value(&mut self, value: Option<&FieldValue>) -> bool {
        let incoming = value.cloned().unwrap_or(FieldValue::Empty);
        if self.last_emitted.as_ref() == Some(&incoming) {
            return false;
        }
        let children = deserialize(Some(&incoming));
        if children == self.editor.doc().children {
            return false;
        }
        tracing::debug!("replacing field value from outside");
        self.editor.reset(Document::new(children));
        self.last_emitted = Some(incoming);
        true
    }

    pub fn take_events(&mut self) -> Vec<FieldEvent> {
        std::mem::take(&mut self.events)
    }

    fn flush(&mut self) {
        if !self.editor.take_changed() {
            return;
        }
        let value = self.value();
        self.last_emitted = Some(value.clone());
        self.events.push(FieldEvent::ValueChanged(value));
    }
}
