use dagboard::core::config::EditorConfig;
use dagboard::core::dag::{
    backfill, get_connects, DagEditor, GraphModel, LayoutConfig, Location, Position, Relation,
    TaskCode, TaskDefinition, WorkflowDefinition,
};
use dagboard::core::{ErrorCategory, RecordingNotifier};
use indexmap::IndexMap;
use insta::assert_snapshot;
use std::sync::Arc;

const WORKFLOW: &str = include_str!("../fixtures/workflow.json");

fn workflow() -> WorkflowDefinition {
    serde_json::from_str(WORKFLOW).unwrap()
}

fn editor() -> DagEditor {
    DagEditor::new(EditorConfig::default(), Arc::new(RecordingNotifier::new()))
}

#[test]
fn test_unedited_workflow_saves_identically() {
    let original = workflow();
    let mut editor = editor();
    let report = editor.load(original.clone()).unwrap();
    assert_eq!(report.nodes, 4);
    assert_eq!(report.edges, 3);
    assert_eq!(report.head_relations, 1);
    assert!(report.labelled_relations);

    let payload = editor.save().unwrap();
    assert_eq!(payload.task_definitions, original.task_definition_list);
    assert_eq!(payload.connects, original.process_task_relation_list);
    assert_eq!(
        payload.locations,
        original.process_definition.parsed_locations().unwrap()
    );
    assert_eq!(payload.save_form.name, "nightly-orders");
    assert_eq!(payload.save_form.execution_type, "PARALLEL");
}

#[test]
fn test_payload_uses_wire_field_names() {
    let mut editor = editor();
    editor.load(workflow()).unwrap();
    let value = serde_json::to_value(editor.save().unwrap()).unwrap();

    for key in ["taskDefinitions", "saveForm", "connects", "locations"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["taskDefinitions"][1]["taskType"], "CONDITIONS");
    assert_eq!(
        value["taskDefinitions"][1]["taskParams"]["conditionResult"]["successNode"][0],
        103
    );
    assert_eq!(value["connects"][2]["name"], "success");
}

#[test]
fn test_every_head_node_gets_a_head_relation() {
    let definition: WorkflowDefinition = serde_json::from_value(serde_json::json!({
        "processDefinition": {"code": 1, "name": "wf", "locations": "[]"},
        "processTaskRelationList": [
            {"name": "", "preTaskCode": 5, "preTaskVersion": 1, "postTaskCode": 9, "postTaskVersion": 2}
        ],
        "taskDefinitionList": [
            {"code": 5, "name": "a", "version": 1, "taskType": "SHELL"},
            {"code": 9, "name": "b", "version": 2, "taskType": "SHELL"}
        ]
    }))
    .unwrap();
    let mut model = GraphModel::new();
    backfill(&mut model, &definition, &LayoutConfig::default()).unwrap();
    let definitions: IndexMap<TaskCode, TaskDefinition> = definition
        .task_definition_list
        .iter()
        .map(|task| (task.code, task.clone()))
        .collect();

    let connects = get_connects(&model, &definitions, false).unwrap();
    assert_snapshot!(serde_json::to_string_pretty(&connects).unwrap(), @r###"
    [
      {
        "name": "",
        "preTaskCode": 0,
        "preTaskVersion": 0,
        "postTaskCode": 5,
        "postTaskVersion": 1,
        "conditionType": "NONE",
        "conditionParams": {}
      },
      {
        "name": "",
        "preTaskCode": 5,
        "preTaskVersion": 1,
        "postTaskCode": 9,
        "postTaskVersion": 2,
        "conditionType": "NONE",
        "conditionParams": {}
      }
    ]
    "###);
}

#[test]
fn test_moves_are_persisted_in_locations() {
    let mut editor = editor();
    editor.load(workflow()).unwrap();
    editor.move_node(104, Position::new(700.0, 260.0)).unwrap();

    let payload = editor.save().unwrap();
    assert!(payload.locations.contains(&Location {
        task_code: 104,
        x: 700.0,
        y: 260.0
    }));
}

#[test]
fn test_removed_dependency_turns_task_into_head() {
    let mut editor = editor();
    editor.load(workflow()).unwrap();
    editor.remove_edge(101, 102).unwrap();

    let connects = editor.save().unwrap().connects;
    let heads: Vec<i64> = connects
        .iter()
        .filter(|relation| relation.is_head())
        .map(|relation| relation.post_task_code)
        .collect();
    assert_eq!(heads, vec![101, 102]);
    assert!(!connects.contains(&Relation::new("", 101, 1, 102, 1)));
}

#[test]
fn test_corrupt_graph_is_refused() {
    let definition = workflow();
    let definitions: IndexMap<TaskCode, TaskDefinition> = definition
        .task_definition_list
        .iter()
        .map(|task| (task.code, task.clone()))
        .collect();

    let err = get_connects(&GraphModel::new(), &definitions, true).unwrap_err();
    assert_eq!(err.category, ErrorCategory::CorruptGraph);
    assert_eq!(err.code, "CORRUPT_GRAPH");
}

#[test]
fn test_malformed_locations_fail_to_load() {
    let mut definition = workflow();
    definition.process_definition.locations = serde_json::json!("[{\"taskCode\": 101");
    let err = editor().load(definition).unwrap_err();
    assert_eq!(err.category, ErrorCategory::SerializationError);
    assert_eq!(err.code, "BAD_LOCATIONS");
}
