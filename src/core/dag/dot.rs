use crate::core::dag::model::GraphModel;
use crate::core::dag::overlay::StatusOverlay;
use crate::core::dag::schema::TaskFlag;
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;
use std::fmt;

/// Node weight carrying task display information.
struct DotNode {
    code: i64,
    name: String,
    task_type: String,
    disabled: bool,
    status: Option<String>,
}

impl fmt::Display for DotNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "(unnamed)"
        } else {
            &self.name
        };
        write!(f, "{}\n{} #{}", name, self.task_type, self.code)?;
        if self.disabled {
            write!(f, "\n[disabled]")?;
        }
        if let Some(status) = &self.status {
            write!(f, "\n{}", status)?;
        }
        Ok(())
    }
}

struct DotEdge {
    label: String,
}

impl fmt::Display for DotEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Render the graph as Graphviz DOT, annotated with status when an overlay is given.
/// Label line breaks come out as left-justified `\l` breaks.
pub fn graph_to_dot(model: &GraphModel, overlay: Option<&StatusOverlay>) -> String {
    let mut graph: StableDiGraph<DotNode, DotEdge> = StableDiGraph::new();
    let mut node_map = HashMap::new();
    for node in model.all_nodes() {
        let idx = graph.add_node(DotNode {
            code: node.code,
            name: node.name.clone(),
            task_type: node.task_type.to_string(),
            disabled: node.flag == TaskFlag::No,
            status: overlay
                .and_then(|o| o.state(node.code))
                .map(|state| state.to_string()),
        });
        node_map.insert(node.code, idx);
    }
    for edge in model.all_edges() {
        if let (Some(&from), Some(&to)) = (node_map.get(&edge.pre), node_map.get(&edge.post)) {
            graph.add_edge(
                from,
                to,
                DotEdge {
                    label: edge.label.clone(),
                },
            );
        }
    }
    format!(
        "{}",
        Dot::with_attr_getters(
            &graph,
            &[Config::GraphContentOnly],
            &|_, _| String::new(),
            &|_, _| "shape=box".to_string(),
        )
    )
    .lines()
    .fold(String::from("digraph {\n    rankdir=LR\n"), |mut out, line| {
        out.push_str(line);
        out.push('\n');
        out
    }) + "}\n"
}
