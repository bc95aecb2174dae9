use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::{ApplyError, Document, Editor, ListType, Mark};
use crate::formatting::{self, BlockFormat};
use crate::link;
use crate::list;
use crate::marks;
use crate::normalize;
use crate::ops::Op;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApplyError> for CommandError {
    fn from(err: ApplyError) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

type CommandHandler = Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

/// A structural repair run after every batch. Returns the ops that fix the
/// first problems it finds, or nothing when the document is already valid.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub trait FieldPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn FieldPlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Normalization and history only.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn FieldPlugin>> =
            vec![Box::new(CoreNormalizePlugin), Box::new(HistoryPlugin)];
        Self::new(plugins).expect("core registry must be valid")
    }

    pub fn richtext() -> Self {
        let plugins: Vec<Box<dyn FieldPlugin>> = vec![
            Box::new(CoreNormalizePlugin),
            Box::new(HistoryPlugin),
            Box::new(MarksPlugin),
            Box::new(FormattingPlugin),
            Box::new(ListPlugin),
            Box::new(LinkPlugin),
        ];
        Self::new(plugins).expect("richtext registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn FieldPlugin>) -> Result<(), RegistryError> {
        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        tracing::trace!(plugin = plugin.id(), "registered plugin");
        Ok(())
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }
}

fn str_arg<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    args.and_then(|v| v.get(key)).and_then(Value::as_str)
}

fn required_str_arg<'a>(args: Option<&'a Value>, key: &str) -> Result<&'a str, CommandError> {
    str_arg(args, key).ok_or_else(|| CommandError::new(format!("Missing args.{key}")))
}

struct CoreNormalizePlugin;

impl FieldPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        normalize::passes()
    }
}

struct HistoryPlugin;

impl FieldPlugin for HistoryPlugin {
    fn id(&self) -> &'static str {
        "core.history"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("history.undo", |editor, _args| {
                if !editor.undo() {
                    tracing::debug!("nothing to undo");
                }
                Ok(())
            }),
            CommandSpec::new("history.redo", |editor, _args| {
                if !editor.redo() {
                    tracing::debug!("nothing to redo");
                }
                Ok(())
            }),
        ]
    }
}

struct MarksPlugin;

impl FieldPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.toggle_bold", |editor, _args| {
                marks::toggle_mark(editor, Mark::Bold)
                    .map_err(|e| CommandError::new(format!("Failed to toggle bold: {e}")))
            }),
            CommandSpec::new("marks.toggle_italic", |editor, _args| {
                marks::toggle_mark(editor, Mark::Italic)
                    .map_err(|e| CommandError::new(format!("Failed to toggle italic: {e}")))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.is_bold_active", |editor, _args| {
                Ok(Value::Bool(marks::is_mark_active(editor, Mark::Bold)))
            }),
            QuerySpec::new("marks.is_italic_active", |editor, _args| {
                Ok(Value::Bool(marks::is_mark_active(editor, Mark::Italic)))
            }),
        ]
    }
}

struct FormattingPlugin;

impl FieldPlugin for FormattingPlugin {
    fn id(&self) -> &'static str {
        "block.formatting"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.toggle_formatting", |editor, args| {
                let format: BlockFormat = required_str_arg(args.as_ref(), "format")?
                    .parse()
                    .map_err(CommandError::new)?;
                formatting::toggle_formatting(editor, format)
                    .map_err(|e| CommandError::new(format!("Failed to toggle formatting: {e}")))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("block.active_formatting", |editor, _args| {
                Ok(formatting::get_active_formatting(editor)
                    .map(|format| Value::String(format.to_string()))
                    .unwrap_or(Value::Null))
            }),
            QuerySpec::new("block.is_formatting_active", |editor, args| {
                let format: BlockFormat = str_arg(args.as_ref(), "format")
                    .ok_or_else(|| QueryError::new("Missing args.format"))?
                    .parse()
                    .map_err(QueryError::new)?;
                Ok(Value::Bool(formatting::is_formatting_active(editor, format)))
            }),
        ]
    }
}

struct ListPlugin;

impl FieldPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_ordered", |editor, _args| {
                list::toggle_list(editor, ListType::Ordered)
                    .map_err(|e| CommandError::new(format!("Failed to toggle list: {e}")))
            }),
            CommandSpec::new("list.toggle_unordered", |editor, _args| {
                list::toggle_list(editor, ListType::Unordered)
                    .map_err(|e| CommandError::new(format!("Failed to toggle list: {e}")))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("list.is_active", |editor, args| {
            let list_type = match str_arg(args.as_ref(), "type") {
                Some(raw) => Some(raw.parse::<ListType>().map_err(QueryError::new)?),
                None => None,
            };
            Ok(Value::Bool(list::is_list_active(editor, list_type)))
        })]
    }
}

struct LinkPlugin;

impl FieldPlugin for LinkPlugin {
    fn id(&self) -> &'static str {
        "link"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("link.insert", |editor, args| {
                let args = args.as_ref();
                let url = required_str_arg(args, "url")?;
                let text = str_arg(args, "text").unwrap_or(url);
                let target = str_arg(args, "target");
                link::insert_link(editor, url, text, target)
                    .map_err(|e| CommandError::new(format!("Failed to insert link: {e}")))
            }),
            CommandSpec::new("link.remove", |editor, _args| {
                link::remove_link(editor)
                    .map_err(|e| CommandError::new(format!("Failed to remove link: {e}")))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("link.is_active", |editor, _args| {
                Ok(Value::Bool(link::is_link_active(editor)))
            }),
            QuerySpec::new("link.active", |editor, _args| {
                serde_json::to_value(link::get_active_link(editor))
                    .map_err(|e| QueryError::new(format!("Failed to encode link: {e}")))
            }),
        ]
    }
}
