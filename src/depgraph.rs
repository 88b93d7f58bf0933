//! Dependency-graph construction.
//!
//! The analysis result is a flat graph: a root node bearing the binary
//! name, one node per `package@version`, and an edge from the root to each
//! package. No inter-package edges are recovered.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::types::GoBinary;

/// Package-manager descriptor carried by every emitted graph.
pub const GOMODULES_PKG_MANAGER: &str = "gomodules";

/// Identifier of the predefined root node.
pub const ROOT_NODE_ID: &str = "root-node";

/// A package identity inside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PkgInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One graph node: package identity plus outgoing dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub node_id: String,
    pub pkg: PkgInfo,
    pub deps: Vec<String>,
}

/// A finalized dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepGraph {
    pub pkg_manager: String,
    pub root: PkgInfo,
    /// All nodes, root first, in insertion order.
    pub nodes: Vec<GraphNode>,
}

impl DepGraph {
    pub fn root_node(&self) -> &GraphNode {
        &self.nodes[0]
    }
}

/// Incrementally assembles a [`DepGraph`].
///
/// Node ids are arbitrary strings; the root node is pre-registered under
/// [`ROOT_NODE_ID`]. Adding a node twice or connecting the same edge twice
/// is a no-op.
pub struct DepGraphBuilder {
    pkg_manager: String,
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

impl DepGraphBuilder {
    pub fn new(pkg_manager: &str, root: PkgInfo) -> Self {
        let mut index = HashMap::new();
        index.insert(ROOT_NODE_ID.to_string(), 0);
        Self {
            pkg_manager: pkg_manager.to_string(),
            nodes: vec![GraphNode {
                node_id: ROOT_NODE_ID.to_string(),
                pkg: root,
                deps: Vec::new(),
            }],
            index,
        }
    }

    pub fn root_node_id(&self) -> &'static str {
        ROOT_NODE_ID
    }

    pub fn add_pkg_node(&mut self, pkg: PkgInfo, node_id: &str) {
        if self.index.contains_key(node_id) {
            return;
        }
        self.index.insert(node_id.to_string(), self.nodes.len());
        self.nodes.push(GraphNode {
            node_id: node_id.to_string(),
            pkg,
            deps: Vec::new(),
        });
    }

    pub fn connect_dep(&mut self, from: &str, to: &str) {
        if !self.index.contains_key(to) {
            return;
        }
        let Some(&from_idx) = self.index.get(from) else {
            return;
        };
        let deps = &mut self.nodes[from_idx].deps;
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    pub fn build(self) -> DepGraph {
        DepGraph {
            pkg_manager: self.pkg_manager,
            root: self.nodes[0].pkg.clone(),
            nodes: self.nodes,
        }
    }
}

/// Emit the dependency graph for an analyzed binary.
///
/// Nodes are emitted in module-declaration order and, within a module, in
/// package-insertion order, each keyed `package@version` and connected
/// directly to the root.
pub fn emit_dep_graph(binary: &GoBinary) -> DepGraph {
    let root = PkgInfo {
        name: binary.name.clone(),
        version: binary.main_module().map(|m| m.version.clone()),
    };
    let mut builder = DepGraphBuilder::new(GOMODULES_PKG_MANAGER, root);

    for module in &binary.modules {
        for package in &module.packages {
            let node_id = format!("{}@{}", package, module.version);
            builder.add_pkg_node(
                PkgInfo {
                    name: package.clone(),
                    version: Some(module.version.clone()),
                },
                &node_id,
            );
            builder.connect_dep(ROOT_NODE_ID, &node_id);
        }
    }

    let graph = builder.build();
    debug!(nodes = graph.nodes.len(), "emitted dependency graph");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Module;

    fn sample_binary() -> GoBinary {
        let mut a = Module::new("example.com/a", "v1.0.0");
        a.add_package("example.com/a/cmd".to_string());
        let mut b = Module::new("example.com/b", "v2.1.0");
        b.add_package("example.com/b/x".to_string());
        b.add_package("example.com/b/y".to_string());
        GoBinary {
            name: "example.com/a".to_string(),
            go_version: "go1.18.5".to_string(),
            modules: vec![a, b],
        }
    }

    #[test]
    fn test_builder_dedups_nodes_and_edges() {
        let mut builder = DepGraphBuilder::new(
            GOMODULES_PKG_MANAGER,
            PkgInfo {
                name: "root".to_string(),
                version: None,
            },
        );
        let pkg = PkgInfo {
            name: "example.com/b/x".to_string(),
            version: Some("v2.1.0".to_string()),
        };
        builder.add_pkg_node(pkg.clone(), "example.com/b/x@v2.1.0");
        builder.add_pkg_node(pkg, "example.com/b/x@v2.1.0");
        builder.connect_dep(ROOT_NODE_ID, "example.com/b/x@v2.1.0");
        builder.connect_dep(ROOT_NODE_ID, "example.com/b/x@v2.1.0");

        let graph = builder.build();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.root_node().deps.len(), 1);
    }

    #[test]
    fn test_connect_unknown_node_is_noop() {
        let mut builder = DepGraphBuilder::new(
            GOMODULES_PKG_MANAGER,
            PkgInfo {
                name: "root".to_string(),
                version: None,
            },
        );
        builder.connect_dep(ROOT_NODE_ID, "ghost@v0.0.0");
        assert!(builder.build().root_node().deps.is_empty());
    }

    #[test]
    fn test_emit_shape_and_order() {
        let graph = emit_dep_graph(&sample_binary());

        assert_eq!(graph.pkg_manager, "gomodules");
        assert_eq!(graph.root.name, "example.com/a");
        assert_eq!(graph.root.version.as_deref(), Some("v1.0.0"));

        let ids: Vec<_> = graph.nodes[1..]
            .iter()
            .map(|n| n.node_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "example.com/a/cmd@v1.0.0",
                "example.com/b/x@v2.1.0",
                "example.com/b/y@v2.1.0",
            ]
        );

        // Flat graph: every package hangs off the root.
        assert_eq!(graph.root_node().deps, ids);
        for node in &graph.nodes[1..] {
            assert!(node.deps.is_empty());
        }
    }

    #[test]
    fn test_emit_distribution_binary_root_without_version() {
        let graph = emit_dep_graph(&GoBinary {
            name: "go-distribution@cmd/vet".to_string(),
            go_version: "go1.18.5".to_string(),
            modules: vec![],
        });
        assert_eq!(graph.root.name, "go-distribution@cmd/vet");
        assert!(graph.root.version.is_none());
        assert_eq!(graph.nodes.len(), 1);
    }

    #[test]
    fn test_graph_serializes() {
        let graph = emit_dep_graph(&sample_binary());
        let json = serde_json::to_string(&graph).unwrap();
        assert!(json.contains("\"pkg_manager\":\"gomodules\""));
        assert!(json.contains("example.com/b/x@v2.1.0"));
    }
}
