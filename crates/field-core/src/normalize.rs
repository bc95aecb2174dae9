use crate::core::{Document, ElementKind, Node, TextNode};
use crate::ops::{self, Op, Path};
use crate::plugin::NormalizePass;
use crate::transforms::{unwrap_ops, wrap_ops};

pub(crate) fn passes() -> Vec<Box<dyn NormalizePass>> {
    vec![
        Box::new(EnsureNonEmptyDocument),
        Box::new(RepairNesting),
        Box::new(EnsureTextLeaves),
        Box::new(SurroundLinksWithText),
        Box::new(MergeAdjacentTextLeaves),
    ]
}

/// Walks every element in pre-order, calling `visit` with its path.
fn walk_elements(doc: &Document, mut visit: impl FnMut(&Path, Option<&ElementKind>, &[Node])) {
    fn walk(
        parent: Option<&ElementKind>,
        children: &[Node],
        path: &mut Path,
        visit: &mut dyn FnMut(&Path, Option<&ElementKind>, &[Node]),
    ) {
        visit(path, parent, children);
        for (ix, node) in children.iter().enumerate() {
            if let Node::Element(el) = node {
                path.push(ix);
                walk(Some(&el.kind), &el.children, path, visit);
                path.pop();
            }
        }
    }

    walk(None, &doc.children, &mut Vec::new(), &mut visit);
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

#[derive(Debug)]
enum Fix {
    Relabel(ElementKind),
    Wrap(ElementKind),
    Unwrap(usize),
    Remove,
}

/// What has to happen to `child` so it may live under `parent` (`None` is
/// the document itself).
fn nesting_fix(parent: Option<&ElementKind>, child: &Node) -> Option<Fix> {
    let el = match child {
        Node::Text(_) => {
            return match parent {
                None => Some(Fix::Wrap(ElementKind::Paragraph)),
                Some(ElementKind::List { .. }) => Some(Fix::Wrap(ElementKind::ListItem)),
                Some(_) => None,
            };
        }
        Node::Element(el) => el,
    };
    if el.kind.is_list() && el.children.is_empty() {
        return Some(Fix::Remove);
    }
    let unwrap = Some(Fix::Unwrap(el.children.len()));
    match (parent, &el.kind) {
        (None, ElementKind::Link { .. }) => Some(Fix::Wrap(ElementKind::Paragraph)),
        (None, ElementKind::ListItem) => Some(Fix::Relabel(ElementKind::Paragraph)),
        (None, _) => None,
        (Some(ElementKind::List { .. }), ElementKind::ListItem) => None,
        (Some(ElementKind::List { .. }), ElementKind::Paragraph) => {
            Some(Fix::Relabel(ElementKind::ListItem))
        }
        (Some(ElementKind::List { .. }), ElementKind::List { .. }) => unwrap,
        (Some(ElementKind::List { .. }), _) => Some(Fix::Wrap(ElementKind::ListItem)),
        (Some(ElementKind::Link { .. }), _) => unwrap,
        (Some(_), ElementKind::Link { .. }) => None,
        (Some(ElementKind::Heading { .. }), _) => unwrap,
        (Some(ElementKind::Paragraph | ElementKind::ListItem), ElementKind::Heading { .. }) => None,
        (Some(ElementKind::Paragraph | ElementKind::ListItem), _) => unwrap,
    }
}

/// Keeps the element taxonomy well-formed: lists hold only list-items and
/// live at the top level, list-items live only in lists, headings and links
/// hold only inline content, links never nest.
struct RepairNesting;

impl NormalizePass for RepairNesting {
    fn id(&self) -> &'static str {
        "core.repair_nesting"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut fixes: Vec<(Path, Fix)> = Vec::new();
        // Fixes that change the child count of a node must not be combined
        // with fixes inside it; those wait for the next round.
        let mut skipped: Vec<Path> = Vec::new();
        walk_elements(doc, |path, parent, children| {
            if skipped.iter().any(|s| path.starts_with(s)) {
                return;
            }
            for (ix, child) in children.iter().enumerate() {
                let Some(fix) = nesting_fix(parent, child) else {
                    continue;
                };
                let child_path = ops::child(path, ix);
                if matches!(fix, Fix::Unwrap(_) | Fix::Remove) {
                    skipped.push(child_path.clone());
                }
                fixes.push((child_path, fix));
            }
        });

        fixes
            .into_iter()
            .rev()
            .flat_map(|(path, fix)| match fix {
                Fix::Relabel(kind) => vec![Op::SetNode { path, kind }],
                Fix::Wrap(kind) => match path.split_last() {
                    Some((&ix, parent)) => wrap_ops(parent, ix, 1, kind),
                    None => Vec::new(),
                },
                Fix::Unwrap(len) => unwrap_ops(&path, len),
                Fix::Remove => vec![Op::RemoveNode { path }],
            })
            .collect()
    }
}

/// Every element other than a list has at least one child.
struct EnsureTextLeaves;

impl NormalizePass for EnsureTextLeaves {
    fn id(&self) -> &'static str {
        "core.ensure_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut out = Vec::new();
        walk_elements(doc, |path, _, children| {
            for (ix, child) in children.iter().enumerate() {
                if let Node::Element(el) = child
                    && el.children.is_empty()
                    && !el.kind.is_list()
                {
                    out.push(Op::InsertNode {
                        path: ops::child(&ops::child(path, ix), 0),
                        node: Node::Text(TextNode::new("")),
                    });
                }
            }
        });
        out
    }
}

/// Inline links always have a text leaf on both sides, so the cursor can be
/// placed before and after them.
struct SurroundLinksWithText;

impl NormalizePass for SurroundLinksWithText {
    fn id(&self) -> &'static str {
        "link.surround_with_text"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut out = Vec::new();
        walk_elements(doc, |path, parent, children| {
            if parent.is_none() {
                return;
            }
            let mut container_ops = Vec::new();
            for (ix, child) in children.iter().enumerate().rev() {
                let is_link = child.as_element().is_some_and(|el| el.kind.is_link());
                if !is_link {
                    continue;
                }
                let text_after = children.get(ix + 1).is_some_and(Node::is_text);
                let text_before = ix > 0 && children[ix - 1].is_text();
                if !text_after {
                    container_ops.push(Op::InsertNode {
                        path: ops::child(path, ix + 1),
                        node: Node::text(""),
                    });
                }
                if !text_before {
                    container_ops.push(Op::InsertNode {
                        path: ops::child(path, ix),
                        node: Node::text(""),
                    });
                }
            }
            // Containers are visited in pre-order; emit deeper ones first.
            out.splice(0..0, container_ops);
        });
        out
    }
}

/// Adjacent text leaves with equal marks merge, and an empty leaf next to
/// another leaf goes away.
struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut out = Vec::new();
        walk_elements(doc, |path, parent, children| {
            if parent.is_none() || children.len() < 2 {
                return;
            }
            let mut working: Vec<Option<TextNode>> = children
                .iter()
                .map(|n| n.as_text().cloned())
                .collect();
            let mut container_ops = Vec::new();
            let mut ix = working.len() - 1;
            while ix > 0 {
                if let (Some(left), Some(right)) = (&working[ix - 1], &working[ix]) {
                    if left.marks == right.marks {
                        let merged = format!("{}{}", left.text, right.text);
                        container_ops.push(Op::MergeNode {
                            path: ops::child(path, ix),
                        });
                        working.remove(ix);
                        if let Some(Some(left)) = working.get_mut(ix - 1) {
                            left.text = merged;
                        }
                    } else if right.text.is_empty() {
                        container_ops.push(Op::RemoveNode {
                            path: ops::child(path, ix),
                        });
                        working.remove(ix);
                    } else if left.text.is_empty() {
                        container_ops.push(Op::RemoveNode {
                            path: ops::child(path, ix - 1),
                        });
                        working.remove(ix - 1);
                    }
                }
                ix -= 1;
            }
            out.splice(0..0, container_ops);
        });
        out
    }
}
