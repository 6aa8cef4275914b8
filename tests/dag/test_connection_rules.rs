use dagboard::core::dag::{
    ConnectRejection, ConnectionValidator, GraphModel, Position, TaskFlag, TaskType,
    CONDITIONS_MAX_OUTGOING,
};

fn model_of(types: &[(i64, TaskType)]) -> GraphModel {
    let mut model = GraphModel::new();
    for (code, task_type) in types {
        model
            .add_node(*code, task_type.clone(), format!("task-{code}"), TaskFlag::Yes, Position::default())
            .unwrap();
    }
    model
}

#[test]
fn test_duplicate_edge_rejected_and_model_unchanged() {
    let mut model = model_of(&[(1, TaskType::Shell), (2, TaskType::Shell)]);
    model.add_edge(1, 2, None).unwrap();

    let decision = ConnectionValidator::can_connect(&model, 1, 2);
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason,
        Some(ConnectRejection::DuplicateEdge { pre: 1, post: 2 })
    );
    assert_eq!(model.edge_count(), 1);
}

#[test]
fn test_conditions_task_limited_to_two_branches() {
    let mut model = model_of(&[
        (1, TaskType::Conditions),
        (2, TaskType::Shell),
        (3, TaskType::Shell),
        (4, TaskType::Shell),
    ]);
    model.add_edge(1, 2, Some("success")).unwrap();
    model.add_edge(1, 3, Some("failure")).unwrap();

    let decision = ConnectionValidator::can_connect(&model, 1, 4);
    assert_eq!(
        decision.reason,
        Some(ConnectRejection::ConditionsFanOut {
            code: 1,
            limit: CONDITIONS_MAX_OUTGOING
        })
    );
    // Incoming edges into a CONDITIONS task are not limited.
    assert!(ConnectionValidator::can_connect(&model, 4, 1).allowed);
}

#[test]
fn test_ordinary_tasks_have_no_fan_out_limit() {
    let mut model = model_of(&[
        (1, TaskType::Shell),
        (2, TaskType::Shell),
        (3, TaskType::Shell),
        (4, TaskType::Shell),
    ]);
    model.add_edge(1, 2, None).unwrap();
    model.add_edge(1, 3, None).unwrap();
    assert!(ConnectionValidator::can_connect(&model, 1, 4).allowed);
}

#[test]
fn test_rejection_converts_to_validation_error() {
    let model = model_of(&[(1, TaskType::Shell)]);
    let rejection = ConnectionValidator::can_connect(&model, 1, 1)
        .into_result()
        .unwrap_err();
    let error: dagboard::core::AppError = rejection.into();
    assert_eq!(error.category, dagboard::core::ErrorCategory::ValidationError);
    assert_eq!(error.code, "CONNECT_REJECTED");
}

#[test]
fn test_predecessor_replacement_detects_cycles() {
    let mut model = model_of(&[(1, TaskType::Shell), (2, TaskType::Shell), (3, TaskType::Shell)]);
    model.add_edge(1, 2, None).unwrap();
    model.add_edge(2, 3, None).unwrap();

    assert_eq!(
        ConnectionValidator::validate_predecessors(&model, 1, &[3]),
        Err(ConnectRejection::WouldCreateCycle { pre: 3, post: 1 })
    );
    // Replacing 3's predecessors with [1] is fine: 2 -> 3 is dropped in the process.
    assert!(ConnectionValidator::validate_predecessors(&model, 3, &[1, 1]).is_ok());
}

/// Replays a long pseudo-random sequence of connection attempts and checks that
/// accepting only what the validator allows keeps the graph acyclic and within
/// the CONDITIONS branch limit.
#[test]
fn test_validated_edits_preserve_dag_invariants() {
    let types: Vec<(i64, TaskType)> = (1..=12)
        .map(|code| {
            let task_type = if code % 4 == 0 {
                TaskType::Conditions
            } else {
                TaskType::Shell
            };
            (code, task_type)
        })
        .collect();
    let mut model = model_of(&types);

    let mut seed: u64 = 0x5eed_1234;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as i64
    };

    let mut accepted = 0;
    for _ in 0..2_000 {
        let pre = next() % 13;
        let post = next() % 13;
        if ConnectionValidator::can_connect(&model, pre, post).allowed {
            model.add_edge(pre, post, None).unwrap();
            accepted += 1;
        }
        if next() % 7 == 0 {
            if let Some(edge) = model.all_edges().first().map(|e| (e.pre, e.post)) {
                model.remove_edge(edge.0, edge.1).unwrap();
            }
        }

        assert!(model.is_acyclic());
        for (code, task_type) in &types {
            if task_type.is_conditions() {
                assert!(model.get_outgoing(*code).len() <= CONDITIONS_MAX_OUTGOING);
            }
        }
    }
    assert!(accepted > 0);
}
