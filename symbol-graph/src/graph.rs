//! Property graph of code symbols: nodes from [`SymbolInfo`], edges resolved
//! eagerly (both directions) through a `name -> [node_id]` index.

use crate::errors::Result;
use code_indexer::SymbolInfo;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub signature: String,
}

impl From<&SymbolInfo> for SymbolNode {
    fn from(info: &SymbolInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            kind: info.kind.clone(),
            file: info.file.clone(),
            line: info.line,
            signature: info.signature.clone(),
        }
    }
}

/// Adjacency entry: both forward and reverse edges are stored so callers
/// never need to scan the whole graph to answer "who calls me".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolEdges {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub called_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherited_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defined_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_by: Vec<String>,
    /// Raw module names from `module`-kind symbols; never a resolved node id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Calls,
    CalledBy,
    Inherits,
    InheritedBy,
    Defines,
    DefinedIn,
    References,
    ReferencedBy,
}

impl EdgeType {
    pub const ALL: [EdgeType; 8] = [
        EdgeType::Calls,
        EdgeType::CalledBy,
        EdgeType::Inherits,
        EdgeType::InheritedBy,
        EdgeType::Defines,
        EdgeType::DefinedIn,
        EdgeType::References,
        EdgeType::ReferencedBy,
    ];

    fn reverse(self) -> EdgeType {
        match self {
            EdgeType::Calls => EdgeType::CalledBy,
            EdgeType::CalledBy => EdgeType::Calls,
            EdgeType::Inherits => EdgeType::InheritedBy,
            EdgeType::InheritedBy => EdgeType::Inherits,
            EdgeType::Defines => EdgeType::DefinedIn,
            EdgeType::DefinedIn => EdgeType::Defines,
            EdgeType::References => EdgeType::ReferencedBy,
            EdgeType::ReferencedBy => EdgeType::References,
        }
    }

    fn get(self, edges: &SymbolEdges) -> &Vec<String> {
        match self {
            EdgeType::Calls => &edges.calls,
            EdgeType::CalledBy => &edges.called_by,
            EdgeType::Inherits => &edges.inherits,
            EdgeType::InheritedBy => &edges.inherited_by,
            EdgeType::Defines => &edges.defines,
            EdgeType::DefinedIn => &edges.defined_in,
            EdgeType::References => &edges.references,
            EdgeType::ReferencedBy => &edges.referenced_by,
        }
    }

    fn get_mut(self, edges: &mut SymbolEdges) -> &mut Vec<String> {
        match self {
            EdgeType::Calls => &mut edges.calls,
            EdgeType::CalledBy => &mut edges.called_by,
            EdgeType::Inherits => &mut edges.inherits,
            EdgeType::InheritedBy => &mut edges.inherited_by,
            EdgeType::Defines => &mut edges.defines,
            EdgeType::DefinedIn => &mut edges.defined_in,
            EdgeType::References => &mut edges.references,
            EdgeType::ReferencedBy => &mut edges.referenced_by,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            EdgeType::Calls => "calls",
            EdgeType::CalledBy => "called_by",
            EdgeType::Inherits => "inherits",
            EdgeType::InheritedBy => "inherited_by",
            EdgeType::Defines => "defines",
            EdgeType::DefinedIn => "defined_in",
            EdgeType::References => "references",
            EdgeType::ReferencedBy => "referenced_by",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_symbols: usize,
    pub total_edges: usize,
    pub symbol_types: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct PersistedGraph {
    nodes: HashMap<String, SymbolNode>,
    edges: HashMap<String, SymbolEdges>,
}

#[derive(Default)]
pub struct SymbolGraph {
    nodes: HashMap<String, SymbolNode>,
    edges: HashMap<String, SymbolEdges>,
    name_index: HashMap<String, Vec<String>>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the node, then resolves `calls`/`imports` against the name
    /// index and adds the relevant edge pair. Resolution prefers a candidate
    /// in the same file, falling back to any candidate with a matching name.
    /// A call that fails to resolve is simply dropped, not recorded anywhere.
    pub fn add_symbol(&mut self, info: &SymbolInfo) {
        self.nodes.insert(info.id.clone(), SymbolNode::from(info));
        self.edges.entry(info.id.clone()).or_default();
        let bucket = self.name_index.entry(info.name.clone()).or_default();
        if !bucket.contains(&info.id) {
            bucket.push(info.id.clone());
        }

        for callee in &info.calls {
            if let Some(target) = self.resolve_name(callee, &info.file) {
                if target != info.id {
                    self.add_edge(&info.id, &target, EdgeType::Calls);
                }
            }
        }

        match info.kind.as_str() {
            "class" => {
                for parent in &info.imports {
                    if let Some(target) = self.resolve_name(parent, &info.file) {
                        self.add_edge(&info.id, &target, EdgeType::Inherits);
                    }
                }
            }
            "module" => {
                let edges = self.edges.entry(info.id.clone()).or_default();
                for module in &info.imports {
                    edges.imports.push(module.clone());
                }
            }
            "table" | "view" | "procedure" | "function-sql" | "trigger" | "index" => {
                for table_ref in &info.imports {
                    if let Some(target) = self.resolve_name(table_ref, &info.file) {
                        self.add_edge(&info.id, &target, EdgeType::References);
                    }
                }
            }
            "method" => {
                if let Some(parent_class) = &info.parent_class {
                    if let Some(class_id) = self.resolve_name(parent_class, &info.file) {
                        self.add_edge(&class_id, &info.id, EdgeType::Defines);
                    }
                }
            }
            _ => {}
        }
    }

    fn resolve_name(&self, name: &str, source_file: &str) -> Option<String> {
        let candidates = self.name_index.get(name)?;
        if candidates.is_empty() {
            return None;
        }
        let prefix = format!("{source_file}:");
        candidates
            .iter()
            .find(|id| id.starts_with(&prefix))
            .or_else(|| candidates.first())
            .cloned()
    }

    fn add_edge(&mut self, source: &str, target: &str, kind: EdgeType) {
        let forward = self.edges.entry(source.to_string()).or_default();
        let list = kind.get_mut(forward);
        if !list.contains(&target.to_string()) {
            list.push(target.to_string());
        }
        let backward = self.edges.entry(target.to_string()).or_default();
        let list = kind.reverse().get_mut(backward);
        if !list.contains(&source.to_string()) {
            list.push(source.to_string());
        }
    }

    /// Removes every node whose id begins with `path + ":"`, purging it from
    /// every other node's edge lists and from the name index.
    pub fn remove_file(&mut self, path: &str) {
        let prefix = format!("{path}:");
        let removed: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect();
        if removed.is_empty() {
            return;
        }
        let removed_set: HashSet<&str> = removed.iter().map(|s| s.as_str()).collect();

        for id in &removed {
            self.nodes.remove(id);
            self.edges.remove(id);
        }

        for edges in self.edges.values_mut() {
            for kind in EdgeType::ALL {
                kind.get_mut(edges).retain(|id| !removed_set.contains(id.as_str()));
            }
        }

        for bucket in self.name_index.values_mut() {
            bucket.retain(|id| !removed_set.contains(id.as_str()));
        }
        self.name_index.retain(|_, bucket| !bucket.is_empty());
    }

    pub fn get_node(&self, id: &str) -> Option<&SymbolNode> {
        self.nodes.get(id)
    }

    pub fn get_edges(&self, id: &str) -> Option<&SymbolEdges> {
        self.edges.get(id)
    }

    pub fn get_signature(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.signature.as_str())
    }

    /// BFS over the selected edge kinds (default: all eight), returning
    /// distinct node ids excluding the start, in discovery order.
    pub fn get_neighbors(&self, id: &str, hops: usize, edge_types: Option<&[EdgeType]>) -> Vec<String> {
        let kinds: Vec<EdgeType> = edge_types.map(<[EdgeType]>::to_vec).unwrap_or_else(|| EdgeType::ALL.to_vec());
        let mut visited = HashSet::new();
        visited.insert(id.to_string());
        let mut order = Vec::new();
        let mut frontier = vec![id.to_string()];

        for _ in 0..hops {
            let mut next = Vec::new();
            for node_id in &frontier {
                let Some(edges) = self.edges.get(node_id) else { continue };
                for &kind in &kinds {
                    for neighbor in kind.get(edges) {
                        if visited.insert(neighbor.clone()) {
                            order.push(neighbor.clone());
                            next.push(neighbor.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        order
    }

    pub fn get_callers(&self, id: &str) -> Vec<String> {
        self.edges.get(id).map(|e| e.called_by.clone()).unwrap_or_default()
    }

    pub fn get_callees(&self, id: &str) -> Vec<String> {
        self.edges.get(id).map(|e| e.calls.clone()).unwrap_or_default()
    }

    /// Maps each of `ids` to a relation-name -> neighbor-NAME dict (not ids),
    /// for embedding directly into retrieval context.
    pub fn get_graph_context(&self, ids: &[String]) -> HashMap<String, HashMap<String, Vec<String>>> {
        let mut out = HashMap::new();
        for id in ids {
            let Some(edges) = self.edges.get(id) else { continue };
            let mut relations = HashMap::new();
            for kind in EdgeType::ALL {
                let names: Vec<String> = kind
                    .get(edges)
                    .iter()
                    .filter_map(|target| self.nodes.get(target).map(|n| n.name.clone()))
                    .collect();
                if !names.is_empty() {
                    relations.insert(kind.as_str().to_string(), names);
                }
            }
            out.insert(id.clone(), relations);
        }
        out
    }

    pub fn stats(&self) -> GraphStats {
        let directed_total: usize = self
            .edges
            .values()
            .map(|e| {
                e.calls.len()
                    + e.called_by.len()
                    + e.inherits.len()
                    + e.inherited_by.len()
                    + e.defines.len()
                    + e.defined_in.len()
                    + e.references.len()
                    + e.referenced_by.len()
            })
            .sum();
        let mut symbol_types: HashMap<String, usize> = HashMap::new();
        for node in self.nodes.values() {
            *symbol_types.entry(node.kind.clone()).or_insert(0) += 1;
        }
        GraphStats {
            total_symbols: self.nodes.len(),
            total_edges: directed_total / 2,
            symbol_types,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let doc = PersistedGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let doc: PersistedGraph = serde_json::from_str(&text)?;
        let mut graph = Self {
            nodes: doc.nodes,
            edges: doc.edges,
            name_index: HashMap::new(),
        };
        for (id, node) in &graph.nodes {
            graph.name_index.entry(node.name.clone()).or_default().push(id.clone());
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, name: &str, kind: &str, file: &str, calls: Vec<&str>, parent_class: Option<&str>) -> SymbolInfo {
        SymbolInfo {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            file: file.to_string(),
            line: 1,
            signature: format!("def {name}()"),
            calls: calls.into_iter().map(String::from).collect(),
            imports: vec![],
            parent_class: parent_class.map(String::from),
        }
    }

    #[test]
    fn resolves_calls_reciprocally() {
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:f", "f", "function", "a.py", vec![], None));
        graph.add_symbol(&info("a.py:A.m", "m", "method", "a.py", vec!["f"], Some("A")));

        assert_eq!(graph.get_callees("a.py:A.m"), vec!["a.py:f"]);
        assert_eq!(graph.get_callers("a.py:f"), vec!["a.py:A.m"]);
    }

    #[test]
    fn method_gets_defines_defined_in_pair() {
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:A", "A", "class", "a.py", vec![], None));
        graph.add_symbol(&info("a.py:A.m", "m", "method", "a.py", vec![], Some("A")));

        let class_edges = graph.get_edges("a.py:A").unwrap();
        assert_eq!(class_edges.defines, vec!["a.py:A.m"]);
        let method_edges = graph.get_edges("a.py:A.m").unwrap();
        assert_eq!(method_edges.defined_in, vec!["a.py:A"]);
    }

    #[test]
    fn remove_file_purges_reciprocal_edges() {
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:f", "f", "function", "a.py", vec![], None));
        graph.add_symbol(&info("b.py:g", "g", "function", "b.py", vec!["f"], None));

        graph.remove_file("a.py");
        assert!(graph.get_node("a.py:f").is_none());
        assert!(graph.get_edges("b.py:g").unwrap().calls.is_empty());
    }

    #[test]
    fn get_neighbors_respects_hop_count() {
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:f", "f", "function", "a.py", vec![], None));
        graph.add_symbol(&info("a.py:g", "g", "function", "a.py", vec!["f"], None));
        graph.add_symbol(&info("a.py:h", "h", "function", "a.py", vec!["g"], None));

        let one_hop = graph.get_neighbors("a.py:h", 1, None);
        assert_eq!(one_hop, vec!["a.py:g"]);
        let two_hops = graph.get_neighbors("a.py:h", 2, None);
        assert!(two_hops.contains(&"a.py:f".to_string()));
    }

    #[test]
    fn save_and_load_round_trips_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:f", "f", "function", "a.py", vec![], None));
        graph.add_symbol(&info("a.py:g", "g", "function", "a.py", vec!["f"], None));
        graph.save(&path).unwrap();

        let loaded = SymbolGraph::load(&path).unwrap();
        assert_eq!(loaded.get_callees("a.py:g"), vec!["a.py:f"]);
        assert_eq!(loaded.stats().total_symbols, 2);
    }

    #[test]
    fn module_imports_are_recorded_raw() {
        let mut graph = SymbolGraph::new();
        let module = SymbolInfo {
            id: "a.py:<module>".to_string(),
            name: "a".to_string(),
            kind: "module".to_string(),
            file: "a.py".to_string(),
            line: 1,
            signature: "a.py".to_string(),
            calls: vec![],
            imports: vec!["os".to_string(), "sys".to_string()],
            parent_class: None,
        };
        graph.add_symbol(&module);

        let edges = graph.get_edges("a.py:<module>").unwrap();
        assert_eq!(edges.imports, vec!["os", "sys"]);
    }

    #[test]
    fn unresolved_call_is_dropped_not_recorded() {
        let mut graph = SymbolGraph::new();
        graph.add_symbol(&info("a.py:f", "f", "function", "a.py", vec!["nonexistent"], None));

        let edges = graph.get_edges("a.py:f").unwrap();
        assert!(edges.calls.is_empty());
        assert!(edges.imports.is_empty());
    }
}
