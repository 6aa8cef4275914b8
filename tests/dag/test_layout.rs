use dagboard::core::config::EditorConfig;
use dagboard::core::dag::{
    apply_layout, compute_layout, DagEditor, GraphModel, LayoutConfig, LayoutKind, Position,
    TaskFlag, TaskType,
};
use dagboard::core::{EditorMode, RecordingNotifier};
use std::sync::Arc;

fn chain(codes: &[i64], label: Option<&str>) -> GraphModel {
    let mut model = GraphModel::new();
    for code in codes {
        model
            .add_node(*code, TaskType::Shell, "t", TaskFlag::Yes, Position::default())
            .unwrap();
    }
    for pair in codes.windows(2) {
        model.add_edge(pair[0], pair[1], label).unwrap();
    }
    model
}

fn dagre() -> LayoutConfig {
    LayoutConfig::default()
}

fn grid(cols: Option<usize>) -> LayoutConfig {
    LayoutConfig {
        kind: LayoutKind::Grid,
        cols,
        ..LayoutConfig::default()
    }
}

#[test]
fn test_layered_layout_places_ranks_left_to_right() {
    let model = chain(&[1, 2, 3], None);
    let positions = compute_layout(&model, &dagre());
    assert_eq!(positions[&1], Position::new(50.0, 50.0));
    assert_eq!(positions[&2], Position::new(320.0, 50.0));
    assert_eq!(positions[&3], Position::new(590.0, 50.0));
}

#[test]
fn test_labelled_edges_widen_rank_separation() {
    let model = chain(&[1, 2], Some("success"));
    let positions = compute_layout(&model, &dagre());
    assert_eq!(positions[&2].x - positions[&1].x, 220.0 + 50.0 + 100.0);
}

#[test]
fn test_diamond_is_centred_and_deterministic() {
    let mut model = GraphModel::new();
    for code in 1..=4 {
        model
            .add_node(code, TaskType::Shell, "t", TaskFlag::Yes, Position::default())
            .unwrap();
    }
    for (pre, post) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
        model.add_edge(pre, post, None).unwrap();
    }

    let first = compute_layout(&model, &dagre());
    let second = compute_layout(&model, &dagre());
    assert_eq!(first, second);

    assert_eq!(first[&2].x, first[&3].x);
    assert_eq!(first[&1].y, first[&4].y);
    assert!(first[&3].y < first[&2].y);
    assert!(first[&1].y > first[&3].y && first[&1].y < first[&2].y);
}

#[test]
fn test_grid_respects_columns() {
    let model = chain(&[1, 2, 3, 4, 5], None);
    let positions = compute_layout(&model, &grid(Some(2)));
    assert_eq!(positions[&1], Position::new(50.0, 50.0));
    assert_eq!(positions[&2], Position::new(320.0, 50.0));
    assert_eq!(positions[&3], Position::new(50.0, 148.0));
    assert_eq!(positions[&5], Position::new(50.0, 246.0));
}

#[test]
fn test_cyclic_graph_falls_back_to_grid() {
    let mut model = chain(&[1, 2], None);
    // The model itself does not reject cycles; only the validator does.
    model.add_edge(2, 1, None).unwrap();
    assert_eq!(
        compute_layout(&model, &dagre()),
        compute_layout(&model, &grid(None))
    );
}

#[test]
fn test_apply_layout_writes_positions_back() {
    let mut model = chain(&[7, 8], None);
    apply_layout(&mut model, &dagre());
    assert_eq!(model.get_node(8).unwrap().position, Position::new(320.0, 50.0));
}

#[test]
fn test_readonly_editor_refuses_layout() {
    let mut editor = DagEditor::new(EditorConfig::default(), Arc::new(RecordingNotifier::new()))
        .with_mode(EditorMode::Readonly);
    let err = editor.layout(None).unwrap_err();
    assert_eq!(err.code, "READONLY");
}
