use super::*;

#[test]
fn create_places_on_grid_and_reverts_tool() {
    let mut editor = editor_with(vec![], vec![]);
    select_tool(&mut editor, Tool::Create(ShapeKind::Rect));
    click(&mut editor, 233.0, 248.0);

    assert_eq!(editor.tool(), Tool::Select);
    assert_eq!(editor.shapes().len(), 1);
    let shape = &editor.shapes()[0];
    assert_eq!(shape.center(), Pos2::new(240.0, 240.0));
    assert_eq!((shape.width, shape.height), (80.0, 80.0));
    assert_eq!(shape.label, "Node 1");
    assert_eq!(editor.selection().shapes, vec![shape.id.clone()]);
}

#[test]
fn text_and_icon_defaults() {
    let mut editor = editor_with(vec![], vec![]);
    select_tool(&mut editor, Tool::Create(ShapeKind::Text));
    click(&mut editor, 100.0, 100.0);
    select_tool(&mut editor, Tool::Create(ShapeKind::Decorative));
    click(&mut editor, 600.0, 600.0);

    let text = &editor.shapes()[0];
    assert_eq!(text.kind, ShapeKind::Text);
    assert_eq!(text.label, "New Text");
    assert_eq!((text.width, text.height), (100.0, 30.0));
    assert_eq!(text.style.icon_name, None);

    let icon = &editor.shapes()[1];
    assert_eq!(icon.label, "New Icon");
    assert_eq!(icon.style.icon_name.as_deref(), Some("Box"));
}

#[test]
fn create_uses_node_defaults() {
    let mut editor = editor_with(vec![], vec![]);
    editor.node_defaults_mut().width = 120.0;
    editor.node_defaults_mut().height = 60.0;
    editor.node_defaults_mut().style.fill = "#123456".to_string();
    select_tool(&mut editor, Tool::Create(ShapeKind::Rect));
    click(&mut editor, 400.0, 400.0);

    let shape = &editor.shapes()[0];
    assert_eq!((shape.width, shape.height), (120.0, 60.0));
    assert_eq!(shape.style.fill, "#123456");
}

#[test]
fn click_on_shape_selects_instead_of_creating() {
    let mut editor = editor_with(vec![rect("a", 100.0, 100.0, 80.0, 80.0)], vec![]);
    select_tool(&mut editor, Tool::Create(ShapeKind::Circle));
    click(&mut editor, 100.0, 100.0);

    assert_eq!(editor.shapes().len(), 1);
    assert_eq!(editor.selection().shapes, vec!["a"]);
    assert_eq!(editor.tool(), Tool::Create(ShapeKind::Circle));
}

#[test]
fn create_skips_taken_ids() {
    let mut editor = editor_with(vec![rect("n-1", 100.0, 100.0, 80.0, 80.0)], vec![]);
    let id = editor.create_shape(ShapeKind::Rect, Pos2::new(500.0, 500.0));
    assert_eq!(id, "n-2");
    assert_eq!(editor.shapes()[1].label, "Node 2");
}

#[test]
fn create_records_checkpoint() {
    let mut editor = editor_with(vec![], vec![]);
    editor.create_shape(ShapeKind::Rect, Pos2::new(0.0, 0.0));
    let checkpoints = editor.take_checkpoints();
    assert_eq!(checkpoints.len(), 1);
    assert!(checkpoints[0].shapes.is_empty());
    assert!(editor.take_checkpoints().is_empty());
}
