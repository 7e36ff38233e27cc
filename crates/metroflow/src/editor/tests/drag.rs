use super::*;
use crate::editor::snap::{AlignmentGuide, GuideAxis};
use crate::editor::Gesture;

#[test]
fn drag_snaps_to_coarse_grid() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("far", 600.0, 600.0, 80.0, 80.0),
        ],
        vec![],
    );
    drag(&mut editor, (100.0, 100.0), (133.0, 147.0));
    assert_eq!(center_of(&editor, "a"), Pos2::new(130.0, 150.0));
}

#[test]
fn drag_keeps_grab_offset() {
    let mut editor = editor_with(vec![rect("a", 100.0, 100.0, 80.0, 80.0)], vec![]);
    // Grab 20 units right of centre.
    drag(&mut editor, (120.0, 100.0), (220.0, 100.0));
    assert_eq!(center_of(&editor, "a"), Pos2::new(200.0, 100.0));
}

#[test]
fn drag_aligns_within_threshold() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 300.0, 200.0, 80.0, 80.0),
        ],
        vec![],
    );
    let surface = surface();
    editor.pointer_down(PointerInput::new(Pos2::new(100.0, 100.0)), &surface);
    editor.pointer_move(PointerInput::new(Pos2::new(290.0, 400.0)), &surface);

    assert_eq!(center_of(&editor, "a"), Pos2::new(300.0, 400.0));
    assert_eq!(
        editor.guides(),
        &[AlignmentGuide {
            axis: GuideAxis::Vertical,
            pos: 300.0
        }]
    );

    editor.pointer_up(PointerInput::new(Pos2::new(290.0, 400.0)), &surface);
    assert!(editor.guides().is_empty());
    assert_eq!(editor.gesture(), &Gesture::Idle);
}

#[test]
fn drag_beyond_threshold_uses_grid_only() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 300.0, 200.0, 80.0, 80.0),
        ],
        vec![],
    );
    let surface = surface();
    editor.pointer_down(PointerInput::new(Pos2::new(100.0, 100.0)), &surface);
    editor.pointer_move(PointerInput::new(Pos2::new(268.0, 400.0)), &surface);
    assert_eq!(center_of(&editor, "a"), Pos2::new(270.0, 400.0));
    assert!(editor.guides().is_empty());
}

#[test]
fn drag_moves_whole_selection_by_same_delta() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 300.0, 300.0, 80.0, 80.0),
            rect("c", 800.0, 100.0, 80.0, 80.0),
        ],
        vec![],
    );
    click(&mut editor, 100.0, 100.0);
    shift_click(&mut editor, 300.0, 300.0);
    drag(&mut editor, (100.0, 100.0), (150.0, 130.0));

    assert_eq!(center_of(&editor, "a"), Pos2::new(150.0, 130.0));
    assert_eq!(center_of(&editor, "b"), Pos2::new(350.0, 330.0));
    assert_eq!(center_of(&editor, "c"), Pos2::new(800.0, 100.0));
}

#[test]
fn dragging_unselected_shape_collapses_selection() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 300.0, 300.0, 80.0, 80.0),
            rect("c", 800.0, 800.0, 80.0, 80.0),
        ],
        vec![],
    );
    click(&mut editor, 100.0, 100.0);
    shift_click(&mut editor, 300.0, 300.0);
    drag(&mut editor, (800.0, 800.0), (850.0, 800.0));

    assert_eq!(editor.selection().shapes, vec!["c"]);
    assert_eq!(center_of(&editor, "a"), Pos2::new(100.0, 100.0));
    assert_eq!(center_of(&editor, "c"), Pos2::new(850.0, 800.0));
}

#[test]
fn movement_below_threshold_does_not_move() {
    let mut editor = editor_with(vec![rect("a", 100.0, 100.0, 80.0, 80.0)], vec![]);
    drag(&mut editor, (100.0, 100.0), (103.0, 102.0));
    assert_eq!(center_of(&editor, "a"), Pos2::new(100.0, 100.0));
    assert!(editor.take_checkpoints().is_empty());
}

#[test]
fn drag_records_one_checkpoint() {
    let mut editor = editor_with(vec![rect("a", 100.0, 100.0, 80.0, 80.0)], vec![]);
    let surface = surface();
    editor.pointer_down(PointerInput::new(Pos2::new(100.0, 100.0)), &surface);
    for step in 1..10 {
        let p = Pos2::new(100.0 + step as f32 * 20.0, 100.0);
        editor.pointer_move(PointerInput::new(p), &surface);
    }
    editor.pointer_up(PointerInput::new(Pos2::new(280.0, 100.0)), &surface);

    let checkpoints = editor.take_checkpoints();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].shapes[0].x, 100.0);
}

#[test]
fn drag_reroutes_links() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 400.0, 100.0, 80.0, 80.0),
        ],
        vec![link("l", "a", "b")],
    );
    assert!(!editor.paths_dirty());
    drag(&mut editor, (400.0, 100.0), (400.0, 400.0));
    assert!(editor.paths_dirty());

    let stats = editor.refresh_paths();
    assert_eq!(stats.map(|s| s.routed), Some(1));
    let path = editor.link("l").and_then(|l| l.path.clone()).unwrap_or_default();
    // Right->top and bottom->left tie; right->top is enumerated first.
    assert_eq!(path.start(), Pos2::new(140.0, 100.0));
    assert_eq!(path.end(), Pos2::new(400.0, 360.0));
    assert_eq!(editor.refresh_paths(), None);
}

#[test]
fn drag_of_deleted_shape_is_ignored() {
    let mut editor = editor_with(
        vec![
            rect("a", 100.0, 100.0, 80.0, 80.0),
            rect("b", 400.0, 100.0, 80.0, 80.0),
        ],
        vec![],
    );
    let surface = surface();
    editor.pointer_down(PointerInput::new(Pos2::new(100.0, 100.0)), &surface);
    editor.delete_shape("a");
    editor.pointer_move(PointerInput::new(Pos2::new(200.0, 300.0)), &surface);
    editor.pointer_up(PointerInput::new(Pos2::new(200.0, 300.0)), &surface);

    assert_eq!(editor.shapes().len(), 1);
    assert_eq!(center_of(&editor, "b"), Pos2::new(400.0, 100.0));
}
