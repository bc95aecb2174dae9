use pretty_assertions::assert_eq;
use richtext_field_core::{
    ActiveLink, Document, Editor, ElementKind, LinkDialogRequest, LinkDialogResponse, Node,
    PluginRegistry, Point, Selection, get_active_link, insert_link, is_link_active, remove_link,
};

fn editor(children: Vec<Node>, selection: Selection) -> Editor {
    Editor::new(Document::new(children), Some(selection), PluginRegistry::richtext())
}

fn paragraph(children: Vec<Node>) -> Node {
    Node::element(ElementKind::Paragraph, children)
}

fn linked_doc() -> Vec<Node> {
    vec![paragraph(vec![
        Node::text("go "),
        Node::link("https://a.test", None, "here"),
        Node::text(""),
    ])]
}

#[test]
fn collapsed_insert_splits_the_text() {
    let mut editor = editor(
        vec![Node::paragraph("abcd")],
        Selection::collapsed(Point::new(vec![0, 0], 2)),
    );

    insert_link(&mut editor, "https://x.test", "x", None).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![paragraph(vec![
            Node::text("ab"),
            Node::link("https://x.test", None, "x"),
            Node::text("cd"),
        ])]
    );
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 2], 0)))
    );
    assert!(!is_link_active(&editor));
}

#[test]
fn insert_over_an_active_link_replaces_it() {
    let mut editor = editor(linked_doc(), Selection::collapsed(Point::new(vec![0, 1, 0], 2)));
    assert_eq!(
        get_active_link(&editor),
        Some(ActiveLink {
            path: vec![0, 1],
            url: "https://a.test".into(),
            target: None,
            text: "here".into(),
        })
    );

    insert_link(&mut editor, "https://b.test", "there", Some("_blank")).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![paragraph(vec![
            Node::text("go "),
            Node::link("https://b.test", Some("_blank"), "there"),
            Node::text(""),
        ])]
    );
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 2], 0)))
    );
}

#[test]
fn expanded_insert_wraps_the_selection() {
    let mut editor = editor(
        vec![Node::paragraph("hello world")],
        Selection::new(Point::new(vec![0, 0], 6), Point::new(vec![0, 0], 11)),
    );

    insert_link(&mut editor, "https://w.test", "ignored", None).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![paragraph(vec![
            Node::text("hello "),
            Node::link("https://w.test", None, "world"),
            Node::text(""),
        ])]
    );
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 2], 0)))
    );
}

#[test]
fn remove_at_cursor_unwraps_the_link() {
    let mut editor = editor(linked_doc(), Selection::collapsed(Point::new(vec![0, 1, 0], 1)));
    remove_link(&mut editor).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("go here")]);
    assert!(!is_link_active(&editor));
}

#[test]
fn remove_over_part_of_a_link_keeps_the_rest_linked() {
    let mut editor = editor(
        linked_doc(),
        Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![0, 1, 0], 2)),
    );
    remove_link(&mut editor).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![paragraph(vec![
            Node::text("go he"),
            Node::link("https://a.test", None, "re"),
            Node::text(""),
        ])]
    );
}

#[test]
fn remove_without_a_link_changes_nothing() {
    let mut editor = editor(
        vec![Node::paragraph("plain")],
        Selection::collapsed(Point::new(vec![0, 0], 1)),
    );
    remove_link(&mut editor).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("plain")]);
    assert!(!editor.can_undo());
}

#[test]
fn dialog_request_for_plain_selection() {
    let editor = editor(
        vec![Node::paragraph("abcd")],
        Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![0, 0], 3)),
    );
    let request = LinkDialogRequest::for_selection(&editor).unwrap();
    assert_eq!(
        request,
        LinkDialogRequest {
            text: "bc".into(),
            url: String::new(),
            open_in_new_tab: false,
            editing: false,
        }
    );
    assert_eq!(request.title(), "Insert link");
}

#[test]
fn dialog_request_for_existing_link() {
    let editor = editor(
        vec![paragraph(vec![
            Node::text(""),
            Node::link("https://a.test", Some("_blank"), "docs"),
            Node::text(""),
        ])],
        Selection::collapsed(Point::new(vec![0, 1, 0], 1)),
    );
    let request = LinkDialogRequest::for_selection(&editor).unwrap();
    assert_eq!(request.text, "docs");
    assert_eq!(request.url, "https://a.test");
    assert!(request.open_in_new_tab);
    assert_eq!(request.title(), "Edit link");
}

#[test]
fn dialog_response_maps_new_tab_to_target() {
    let mut editor = editor(
        vec![Node::paragraph("ab")],
        Selection::collapsed(Point::new(vec![0, 0], 2)),
    );
    let response = LinkDialogResponse::Confirmed {
        url: " https://x.test ".into(),
        text: "x".into(),
        open_in_new_tab: false,
    };
    assert!(response.apply(&mut editor).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![paragraph(vec![
            Node::text("ab"),
            Node::link("https://x.test", Some("_self"), "x"),
            Node::text(""),
        ])]
    );
}

#[test]
fn blank_or_cancelled_dialog_inserts_nothing() {
    let mut editor = editor(
        vec![Node::paragraph("ab")],
        Selection::collapsed(Point::new(vec![0, 0], 1)),
    );
    let blank = LinkDialogResponse::Confirmed {
        url: "  ".into(),
        text: "x".into(),
        open_in_new_tab: true,
    };
    assert!(!blank.can_insert());
    assert!(!blank.apply(&mut editor).unwrap());
    assert!(!LinkDialogResponse::Cancelled.apply(&mut editor).unwrap());
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);

    let parsed: LinkDialogResponse = serde_json::from_value(serde_json::json!({
        "action": "confirmed",
        "url": "https://x.test",
        "text": "x",
        "open_in_new_tab": true,
    }))
    .unwrap();
    assert!(parsed.can_insert());
}
