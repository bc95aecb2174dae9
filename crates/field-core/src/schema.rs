use thiserror::Error;

use crate::core::{Document, ElementKind, Node};
use crate::ops::Path;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{child} not allowed inside {parent} at {path:?}")]
    InvalidChild {
        path: Path,
        parent: &'static str,
        child: &'static str,
    },
    #[error("empty {kind} at {path:?}")]
    Empty { path: Path, kind: &'static str },
}

fn kind_name(node: &Node) -> &'static str {
    match node {
        Node::Text(_) => "text",
        Node::Element(el) => el.kind.name(),
    }
}

fn allowed(parent: Option<&ElementKind>, child: &Node) -> bool {
    let child_kind = child.as_element().map(|el| &el.kind);
    match (parent, child_kind) {
        (None, None) => false,
        (None, Some(kind)) => !kind.is_inline() && *kind != ElementKind::ListItem,
        (Some(ElementKind::List { .. }), kind) => kind == Some(&ElementKind::ListItem),
        (Some(_), None) => true,
        (Some(ElementKind::Link { .. }), Some(_)) => false,
        (Some(ElementKind::Heading { .. }), Some(kind)) => kind.is_inline(),
        (Some(ElementKind::Paragraph | ElementKind::ListItem), Some(kind)) => {
            kind.is_inline() || kind.is_heading()
        }
    }
}

impl Document {
    /// Reports the first violated structural rule, in document order.
    pub fn validate(&self) -> Result<(), SchemaError> {
        fn walk(
            parent: Option<&ElementKind>,
            children: &[Node],
            path: &mut Path,
        ) -> Result<(), SchemaError> {
            for (ix, child) in children.iter().enumerate() {
                path.push(ix);
                if !allowed(parent, child) {
                    return Err(SchemaError::InvalidChild {
                        path: path.clone(),
                        parent: parent.map_or("document", ElementKind::name),
                        child: kind_name(child),
                    });
                }
                if let Node::Element(el) = child {
                    if el.children.is_empty() {
                        return Err(SchemaError::Empty {
                            path: path.clone(),
                            kind: el.kind.name(),
                        });
                    }
                    walk(Some(&el.kind), &el.children, path)?;
                }
                path.pop();
            }
            Ok(())
        }

        if self.children.is_empty() {
            return Err(SchemaError::Empty {
                path: Vec::new(),
                kind: "document",
            });
        }
        walk(None, &self.children, &mut Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ListType;

    #[test]
    fn well_formed_documents_pass() {
        let doc = Document::new(vec![
            Node::heading(1, "Title"),
            Node::list(
                ListType::Ordered,
                vec![
                    Node::list_item("a"),
                    Node::element(ElementKind::ListItem, vec![Node::heading(2, "b")]),
                ],
            ),
            Node::element(
                ElementKind::Paragraph,
                vec![Node::text(""), Node::link("https://a.test", None, "x"), Node::text("")],
            ),
        ]);
        assert_eq!(doc.validate(), Ok(()));
    }

    #[test]
    fn reports_first_violation() {
        let doc = Document::new(vec![
            Node::paragraph("ok"),
            Node::list(ListType::Unordered, vec![Node::paragraph("bad")]),
        ]);
        assert_eq!(
            doc.validate(),
            Err(SchemaError::InvalidChild {
                path: vec![1, 0],
                parent: "list",
                child: "paragraph",
            })
        );

        let nested = Document::new(vec![Node::element(
            ElementKind::Paragraph,
            vec![Node::element(
                ElementKind::Link {
                    url: "u".into(),
                    target: None,
                },
                vec![Node::link("v", None, "x")],
            )],
        )]);
        assert!(matches!(
            nested.validate(),
            Err(SchemaError::InvalidChild { child: "link", parent: "link", .. })
        ));
    }
}
