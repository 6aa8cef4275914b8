use dagboard::core::dag::{
    GraphEvent, GraphModel, ModelError, Position, TaskFlag, TaskType,
};
use std::sync::{Arc, Mutex};

fn add(model: &mut GraphModel, code: i64, name: &str) {
    model
        .add_node(code, TaskType::Shell, name, TaskFlag::Yes, Position::default())
        .unwrap();
}

fn recording(model: &mut GraphModel) -> Arc<Mutex<Vec<GraphEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    model.subscribe(move |event: &GraphEvent| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn test_listener_sees_every_mutation_in_order() {
    let mut model = GraphModel::new();
    let events = recording(&mut model);

    add(&mut model, 1, "extract");
    add(&mut model, 2, "load");
    model.add_edge(1, 2, None).unwrap();
    model.set_position(2, Position::new(300.0, 40.0)).unwrap();
    model.remove_node(1).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            GraphEvent::NodeAdded(1),
            GraphEvent::NodeAdded(2),
            GraphEvent::EdgeAdded { pre: 1, post: 2 },
            GraphEvent::NodeMoved {
                code: 2,
                position: Position::new(300.0, 40.0)
            },
            GraphEvent::EdgeRemoved { pre: 1, post: 2 },
            GraphEvent::NodeRemoved(1),
        ]
    );
}

#[test]
fn test_removing_a_node_drops_its_edges() {
    let mut model = GraphModel::new();
    for code in 1..=3 {
        add(&mut model, code, "t");
    }
    model.add_edge(1, 2, None).unwrap();
    model.add_edge(2, 3, None).unwrap();
    model.add_edge(1, 3, None).unwrap();

    model.remove_node(2).unwrap();

    assert_eq!(model.len(), 2);
    assert_eq!(model.edge_count(), 1);
    assert!(model.edge(1, 3).is_some());
    assert!(model.get_incoming(3).iter().all(|edge| edge.pre != 2));
}

#[test]
fn test_structural_refusals() {
    let mut model = GraphModel::new();
    add(&mut model, 1, "a");
    add(&mut model, 2, "b");
    model.add_edge(1, 2, None).unwrap();

    assert_eq!(
        model.add_node(1, TaskType::Sql, "dup", TaskFlag::Yes, Position::default()),
        Err(ModelError::DuplicateNode(1))
    );
    assert_eq!(model.add_edge(1, 1, None), Err(ModelError::SelfLoop(1)));
    assert_eq!(
        model.add_edge(1, 2, None),
        Err(ModelError::DuplicateEdge { pre: 1, post: 2 })
    );
    assert_eq!(model.add_edge(1, 9, None), Err(ModelError::UnknownNode(9)));
    assert_eq!(
        model.remove_edge(2, 1).unwrap_err(),
        ModelError::UnknownEdge { pre: 2, post: 1 }
    );
}

#[test]
fn test_queries_reflect_edges() {
    let mut model = GraphModel::new();
    add(&mut model, 10, "Extract Orders");
    add(&mut model, 20, "extract customers");
    add(&mut model, 30, "merge");
    model.add_edge(20, 30, None).unwrap();
    model.add_edge(10, 30, Some("success")).unwrap();

    let heads: Vec<i64> = model.head_nodes().iter().map(|node| node.code).collect();
    assert_eq!(heads, vec![10, 20]);

    let incoming: Vec<(i64, &str)> = model
        .get_incoming(30)
        .iter()
        .map(|edge| (edge.pre, edge.label.as_str()))
        .collect();
    assert_eq!(incoming, vec![(10, "success"), (20, "")]);

    let found: Vec<i64> = model
        .find_by_name("EXTRACT")
        .iter()
        .map(|node| node.code)
        .collect();
    assert_eq!(found, vec![10, 20]);
    assert!(model.find_by_name("   ").is_empty());
    assert!(model.is_acyclic());
}

#[test]
fn test_update_node_and_clear() {
    let mut model = GraphModel::new();
    let events = recording(&mut model);
    add(&mut model, 1, "");
    model
        .update_node(1, "gate", TaskFlag::No, TaskType::Conditions)
        .unwrap();

    let node = model.get_node(1).unwrap();
    assert_eq!(node.name, "gate");
    assert_eq!(node.flag, TaskFlag::No);
    assert!(node.task_type.is_conditions());

    model.clear();
    assert!(model.is_empty());
    assert_eq!(events.lock().unwrap().last(), Some(&GraphEvent::Cleared));
}
