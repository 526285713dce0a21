use crate::{
    flow::visit_steps,
    model::{Method, Schema},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// NodeKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum NodeKind {
    #[display("entity")]
    Entity,
    #[display("method")]
    Method,
    #[display("service")]
    Service,
}

///
/// EdgeKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum EdgeKind {
    #[display("has")]
    Has,
    #[display("reads")]
    Reads,
    #[display("writes")]
    Writes,
}

///
/// GraphNode
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
}

///
/// GraphEdge
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

///
/// DependencyGraph
///
/// Derived view over entities, services and methods. Nodes keep schema
/// order; edges are deduplicated and sorted.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    #[must_use]
    pub fn entity_id(name: &str) -> String {
        format!("entity:{name}")
    }

    #[must_use]
    pub fn service_id(name: &str) -> String {
        format!("svc:{name}")
    }

    #[must_use]
    pub fn method_id(service: &str, method: &str) -> String {
        format!("method:{service}.{method}")
    }

    #[must_use]
    pub fn build(schema: &Schema) -> Self {
        let mut nodes = Vec::new();
        let mut edges = BTreeSet::new();
        let known = schema.entity_names();

        for entity in &schema.entities {
            nodes.push(GraphNode {
                id: Self::entity_id(&entity.name),
                kind: NodeKind::Entity,
                name: entity.name.clone(),
            });
        }

        for service in &schema.services {
            let svc_id = Self::service_id(&service.name);
            nodes.push(GraphNode {
                id: svc_id.clone(),
                kind: NodeKind::Service,
                name: service.name.clone(),
            });

            for method in &service.methods {
                let method_id = Self::method_id(&service.name, &method.name);
                nodes.push(GraphNode {
                    id: method_id.clone(),
                    kind: NodeKind::Method,
                    name: method.name.clone(),
                });
                edges.insert(GraphEdge {
                    from: svc_id.clone(),
                    to: method_id.clone(),
                    kind: EdgeKind::Has,
                });

                for (entity, kind) in method_touches(method) {
                    if known.contains(entity.as_str()) {
                        edges.insert(GraphEdge {
                            from: method_id.clone(),
                            to: Self::entity_id(&entity),
                            kind,
                        });
                    }
                }
            }
        }

        Self {
            nodes,
            edges: edges.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges leaving `from`, in sorted order.
    pub fn edges_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.from == from)
    }
}

// Entities a method reads or writes: declared sources are reads; repo
// actions in the flow are reads or writes by verb.
fn method_touches(method: &Method) -> Vec<(String, EdgeKind)> {
    let mut out: Vec<(String, EdgeKind)> = method
        .sources
        .iter()
        .filter(|s| !s.entity.is_empty())
        .map(|s| (s.entity.clone(), EdgeKind::Reads))
        .collect();

    visit_steps(&method.flow, &mut |step| {
        let kind = match step.action.as_str() {
            "repo.Find" | "repo.Get" | "repo.GetForUpdate" | "repo.List" | "repo.Query" => {
                EdgeKind::Reads
            }
            "repo.Save" | "repo.Delete" | "repo.Upsert" => EdgeKind::Writes,
            _ => return,
        };
        let source = step.arg_text("source");
        if !source.is_empty() {
            out.push((source.to_string(), kind));
        }
    });

    out
}
