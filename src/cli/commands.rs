use crate::{
    backend::{Backend, HttpBackend},
    cli::args::{CheckArgs, DotArgs, InspectArgs, LayoutArgs, StatusArgs},
    core::{
        config::{ConfigLoader, ConfigValidator, EditorConfig},
        dag::{
            graph_to_dot, BackfillReport, ConnectionValidator, DagEditor, DependencyEdge,
            GraphModel, OverlayEvent, OverlayPoller, Position, TaskFlag, TaskInstance, TaskNode,
            WorkflowDefinition,
        },
        error::TracingNotifier,
        types::EditorMode,
    },
    Result,
};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io::Write};

fn load_config(workspace: &Path) -> Result<EditorConfig> {
    let config = ConfigLoader::load_from_workspace(workspace)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn read_definition(path: &Path) -> Result<WorkflowDefinition> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read workflow definition {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse workflow definition {}", path.display()))
}

fn open_editor(config: EditorConfig, mode: EditorMode) -> DagEditor {
    DagEditor::new(config, Arc::new(TracingNotifier::new())).with_mode(mode)
}

#[derive(Serialize)]
struct InspectSummary<'a> {
    name: &'a str,
    code: i64,
    report: &'a BackfillReport,
    tasks: Vec<&'a TaskNode>,
    dependencies: Vec<&'a DependencyEdge>,
    start_tasks: Vec<i64>,
}

pub async fn inspect(args: InspectArgs, workspace: &Path) -> Result<()> {
    let config = load_config(workspace)?;
    let definition = read_definition(&args.file)?;
    let mut editor = open_editor(config, EditorMode::Readonly);
    let report = editor.load(definition)?;
    let process = editor.process();
    let model = editor.model();

    let summary = InspectSummary {
        name: &process.name,
        code: process.code,
        report: &report,
        tasks: model.all_nodes(),
        dependencies: model.all_edges(),
        start_tasks: model.head_nodes().iter().map(|node| node.code).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Workflow: {} ({})", summary.name, summary.code);
    println!(
        "Tasks: {}  Dependencies: {}  Start tasks: {}",
        summary.tasks.len(),
        summary.dependencies.len(),
        summary.start_tasks.len()
    );
    for node in &summary.tasks {
        println!(
            "  [{}] {} {}{} at ({}, {})",
            node.code,
            node.name,
            node.task_type,
            if node.flag == TaskFlag::No { " (disabled)" } else { "" },
            node.position.x,
            node.position.y
        );
    }
    for edge in &summary.dependencies {
        if edge.label.is_empty() {
            println!("  {} -> {}", edge.pre, edge.post);
        } else {
            println!("  {} -> {} [{}]", edge.pre, edge.post, edge.label);
        }
    }
    for (pre, post) in &report.skipped_relations {
        println!("  skipped {} -> {}: unknown task", pre, post);
    }
    Ok(())
}

pub async fn check(args: CheckArgs, workspace: &Path) -> Result<()> {
    // Config is loaded only to fail early on a broken workspace.
    load_config(workspace)?;
    let definition = read_definition(&args.file)?;

    let mut model = GraphModel::new();
    for task in &definition.task_definition_list {
        model.add_node(
            task.code,
            task.task_type.clone(),
            task.name.clone(),
            task.flag,
            Position::default(),
        )?;
    }

    let mut accepted = 0usize;
    let mut rejections = Vec::new();
    for relation in definition
        .process_task_relation_list
        .iter()
        .filter(|relation| !relation.is_head())
    {
        let (pre, post) = (relation.pre_task_code, relation.post_task_code);
        match ConnectionValidator::can_connect(&model, pre, post).into_result() {
            Ok(()) => {
                let label = Some(relation.name.as_str()).filter(|name| !name.is_empty());
                model.add_edge(pre, post, label)?;
                accepted += 1;
            }
            Err(rejection) => rejections.push(format!("{} -> {}: {}", pre, post, rejection)),
        }
    }

    if rejections.is_empty() {
        println!("OK: {} dependencies valid", accepted);
        return Ok(());
    }
    for line in &rejections {
        println!("REJECTED {}", line);
    }
    Err(anyhow!(
        "{} of {} dependencies rejected",
        rejections.len(),
        accepted + rejections.len()
    ))
}

pub async fn layout(args: LayoutArgs, workspace: &Path) -> Result<()> {
    let config = load_config(workspace)?;
    let mut layout = config.layout.clone();
    if let Some(kind) = args.kind {
        layout.kind = kind;
    }
    if args.cols.is_some() {
        layout.cols = args.cols;
    }
    if args.rows.is_some() {
        layout.rows = args.rows;
    }
    if layout.cols == Some(0) || layout.rows == Some(0) {
        return Err(anyhow!("--cols and --rows must be at least 1"));
    }

    let definition = read_definition(&args.file)?;
    let mut editor = open_editor(config, EditorMode::Edit);
    editor.load(definition)?;
    editor.layout(Some(&layout))?;
    let payload = editor.save()?;
    let json = serde_json::to_string_pretty(&payload)?;

    match args.output {
        Some(path) => {
            let mut file = fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            writeln!(file, "{}", json)?;
            tracing::info!(output = %path.display(), "save payload written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn dot(args: DotArgs, workspace: &Path) -> Result<()> {
    let config = load_config(workspace)?;
    let definition = read_definition(&args.file)?;
    let backend = match args.instance {
        Some(_) => Some(HttpBackend::from_config(&config.backend)?),
        None => None,
    };

    let mut editor = open_editor(config, EditorMode::Readonly);
    editor.load(definition)?;
    if let (Some(backend), Some(instance_id)) = (&backend, args.instance) {
        editor.refresh_status(backend, instance_id).await?;
    }
    print!("{}", graph_to_dot(editor.model(), Some(editor.overlay())));
    Ok(())
}

pub async fn status(args: StatusArgs, workspace: &Path) -> Result<()> {
    let config = load_config(workspace)?;
    let project_code = config.backend.project_code;
    let period = Duration::from_secs(config.overlay.poll_interval_seconds);
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config.backend)?);

    let mut editor = match args.definition {
        Some(definition_code) => {
            let definition = backend
                .load_definition(project_code, definition_code)
                .await?;
            let mut editor = open_editor(config, EditorMode::Readonly);
            editor.load(definition)?;
            Some(editor)
        }
        None => None,
    };

    if !args.watch {
        let instances = backend
            .query_task_list_by_instance(args.instance, project_code)
            .await?;
        render_snapshot(editor.as_mut(), instances);
        return Ok(());
    }

    let (poller, mut events) = OverlayPoller::spawn(backend, args.instance, project_code, period);
    tracing::info!(instance_id = args.instance, ?period, "watching task states");
    let mut last_snapshot: Option<Vec<TaskInstance>> = None;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(OverlayEvent::Snapshot(instances)) => {
                    if editor.is_none() && last_snapshot.as_ref() == Some(&instances) {
                        continue;
                    }
                    last_snapshot = Some(instances.clone());
                    render_snapshot(editor.as_mut(), instances);
                }
                Some(failed @ OverlayEvent::FetchFailed(_)) => {
                    if let Some(editor) = editor.as_mut() {
                        editor.apply_overlay_event(failed);
                    } else if let OverlayEvent::FetchFailed(message) = failed {
                        eprintln!("status refresh failed: {}", message);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping status polling");
                break;
            }
        }
    }
    poller.stop();
    Ok(())
}

/// Print task states, in graph order when a definition is loaded.
fn render_snapshot(editor: Option<&mut DagEditor>, instances: Vec<TaskInstance>) {
    let Some(editor) = editor else {
        for instance in &instances {
            println!(
                "  [{}] {} {}",
                instance.task_code, instance.name, instance.state
            );
        }
        return;
    };

    if !editor.apply_overlay_event(OverlayEvent::Snapshot(instances)) && !editor.overlay().is_empty()
    {
        return;
    }
    for node in editor.model().all_nodes() {
        match editor.status(node.code) {
            Some(badge) => println!(
                "  [{}] {} {} ({})",
                node.code, node.name, badge.state, badge.description
            ),
            None => println!("  [{}] {} -", node.code, node.name),
        }
    }
    println!();
}
