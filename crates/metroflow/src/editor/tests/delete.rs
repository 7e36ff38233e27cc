use super::*;
use crate::model::{LinkPatch, ShapePatch};

fn chain() -> Editor {
    editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 400.0, 100.0, 80.0, 80.0),
            rect("c", 700.0, 100.0, 80.0, 80.0),
            rect("lonely", 400.0, 600.0, 80.0, 80.0),
        ],
        vec![link("l1", "a", "b"), link("l2", "b", "c")],
    )
}

fn link_ids(editor: &Editor) -> Vec<&str> {
    editor.links().iter().map(|l| l.id.as_str()).collect()
}

#[test]
fn deleting_shape_removes_its_links() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    let removed = editor.delete_selection();

    assert_eq!(removed, vec!["l1"]);
    assert_eq!(link_ids(&editor), vec!["l2"]);
    assert!(editor.shape("a").is_none());
    assert!(editor.selection().is_empty());
}

#[test]
fn deleting_unlinked_shape_keeps_links() {
    let mut editor = chain();
    click(&mut editor, 400.0, 600.0);
    let removed = editor.delete_selection();

    assert!(removed.is_empty());
    assert_eq!(link_ids(&editor), vec!["l1", "l2"]);
    assert_eq!(editor.shapes().len(), 3);
}

#[test]
fn deleting_selected_link_keeps_shapes() {
    let mut editor = chain();
    click(&mut editor, 550.0, 100.0);
    assert_eq!(editor.selection().links, vec!["l2"]);
    let removed = editor.delete_selection();

    assert_eq!(removed, vec!["l2"]);
    assert_eq!(editor.shapes().len(), 4);
}

#[test]
fn empty_selection_deletes_nothing() {
    let mut editor = chain();
    assert!(editor.delete_selection().is_empty());
    assert!(editor.take_checkpoints().is_empty());
}

#[test]
fn clear_removes_everything() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    editor.clear();
    assert!(editor.shapes().is_empty());
    assert!(editor.links().is_empty());
    assert!(editor.selection().is_empty());
    assert_eq!(editor.take_checkpoints().len(), 1);
}

#[test]
fn copy_and_paste_offsets_and_selects() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    assert!(editor.copy_selection());

    let pasted = editor.paste();
    let Some(id) = pasted else {
        panic!("nothing pasted");
    };
    assert_ne!(id, "a");
    assert_eq!(center_of(&editor, &id), Pos2::new(120.0, 120.0));
    assert_eq!(editor.selection().shapes, vec![id]);
}

#[test]
fn copy_needs_single_shape() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    shift_click(&mut editor, 400.0, 100.0);
    assert!(!editor.copy_selection());
    assert_eq!(editor.paste(), None);
}

#[test]
fn z_order_moves_selection() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    shift_click(&mut editor, 700.0, 100.0);

    editor.bring_to_front();
    let order: Vec<&str> = editor.shapes().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["b", "lonely", "a", "c"]);

    editor.send_to_back();
    let order: Vec<&str> = editor.shapes().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["a", "c", "b", "lonely"]);
}

#[test]
fn restore_recomputes_and_resets() {
    let mut editor = chain();
    let before = editor.snapshot();
    click(&mut editor, 100.0, 100.0);
    editor.delete_selection();

    let mut checkpoints = editor.take_checkpoints();
    assert_eq!(checkpoints.pop(), Some(before.clone()));

    editor.restore(before);
    assert_eq!(link_ids(&editor), vec!["l1", "l2"]);
    assert!(editor.links().iter().all(|l| l.path.is_some()));
    assert!(editor.selection().is_empty());
}

#[test]
fn stale_link_keeps_previous_path() {
    let mut editor = chain();
    let mut snapshot = editor.snapshot();
    let old = snapshot.links[0].path.clone();
    assert!(old.is_some());
    snapshot.shapes.retain(|s| s.id != "b");

    editor.replace_collections(snapshot);
    let stats = editor.recompute_paths();
    assert_eq!(stats.stale, 2);
    assert_eq!(editor.link("l1").and_then(|l| l.path.clone()), old);
}

#[test]
fn cosmetic_patch_does_not_reroute() {
    let mut editor = chain();
    editor.update_shape(
        "a",
        &ShapePatch {
            fill: Some("#000000".to_string()),
            ..Default::default()
        },
    );
    assert!(!editor.paths_dirty());

    editor.update_shape(
        "a",
        &ShapePatch {
            y: Some(300.0),
            ..Default::default()
        },
    );
    assert!(editor.paths_dirty());
    assert_eq!(editor.take_checkpoints().len(), 2);
}

#[test]
fn patch_applies_to_whole_selection() {
    let mut editor = chain();
    click(&mut editor, 100.0, 100.0);
    shift_click(&mut editor, 400.0, 100.0);
    editor.update_selected(
        Some(&ShapePatch {
            label: Some("Edge".to_string()),
            ..Default::default()
        }),
        Some(&LinkPatch {
            traffic_speed: Some(3.0),
            ..Default::default()
        }),
    );

    assert_eq!(editor.shape("a").map(|s| s.label.as_str()), Some("Edge"));
    assert_eq!(editor.shape("b").map(|s| s.label.as_str()), Some("Edge"));
    assert_eq!(editor.shape("c").map(|s| s.label.as_str()), Some("C"));
    assert!(editor.links().iter().all(|l| l.traffic_speed == 1.0));
}

#[test]
fn corner_radius_is_clamped() {
    let mut editor = chain();
    editor.set_corner_radius(250.0);
    assert_eq!(editor.corner_radius(), 100.0);
    assert!(editor.paths_dirty());
    editor.refresh_paths();

    editor.set_corner_radius(-5.0);
    assert_eq!(editor.corner_radius(), 0.0);
    editor.refresh_paths();

    editor.set_corner_radius(0.0);
    assert!(!editor.paths_dirty());
}
