use crate::forest::TaxonForest;
use petgraph::graph::{DiGraph, NodeIndex};
use phylotrack_data::{TaxonId, TaxonState};
use std::collections::HashMap;
use std::fmt::{self, Display, Write};

/// A node of the exported phylogeny.
pub struct PhyloNode {
    pub id: TaxonId,
    pub label: String,
    pub num_orgs: usize,
    pub origination_time: f64,
    pub state: TaxonState,
}

/// Graph view of every stored taxon, edges pointing from parent to child.
pub struct PhyloTree {
    pub graph: DiGraph<PhyloNode, ()>,
    id_map: HashMap<TaxonId, NodeIndex>,
}

impl PhyloTree {
    /// Builds the graph, labelling each node with `label(info)`.
    pub fn build<I>(forest: &TaxonForest<I>, label: impl Fn(&I) -> String) -> Self {
        let mut taxa: Vec<_> = forest.iter().collect();
        taxa.sort_by_key(|t| t.id());

        let mut graph = DiGraph::new();
        let mut id_map = HashMap::new();
        for taxon in &taxa {
            let idx = graph.add_node(PhyloNode {
                id: taxon.id(),
                label: label(taxon.info()),
                num_orgs: taxon.num_orgs(),
                origination_time: taxon.origination_time(),
                state: taxon.state(),
            });
            id_map.insert(taxon.id(), idx);
        }

        for taxon in &taxa {
            if let Some(parent) = forest.parent(taxon.id()) {
                if let (Some(&p_idx), Some(&c_idx)) = (id_map.get(&parent), id_map.get(&taxon.id()))
                {
                    graph.add_edge(p_idx, c_idx, ());
                }
            }
        }

        Self { graph, id_map }
    }

    pub fn node(&self, id: TaxonId) -> Option<&PhyloNode> {
        self.id_map.get(&id).map(|&idx| &self.graph[idx])
    }

    /// Export the tree to Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph Phylogeny {\n");
        dot.push_str("  node [shape=box, style=filled, fontname=\"Arial\"];\n");

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let color = match node.state {
                TaxonState::Active => "#e1f5fe",
                TaxonState::Ancestor => "#eeeeee",
                TaxonState::Outside => "#ffffff",
            };
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}: {}\\norgs: {} born: {}\", fillcolor=\"{}\"];",
                node.id,
                node.id,
                node.label.replace('"', "\\\""),
                node.num_orgs,
                node.origination_time,
                color
            );
        }

        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                let _ = writeln!(
                    dot,
                    "  \"{}\" -> \"{}\";",
                    self.graph[from].id, self.graph[to].id
                );
            }
        }

        dot.push_str("}\n");
        dot
    }
}

impl<I: Display> TaxonForest<I> {
    /// Graphviz rendering of every stored taxon.
    pub fn to_dot(&self) -> String {
        PhyloTree::build(self, |info| info.to_string()).to_dot()
    }

    /// One line per partition listing `id(info:num_orgs)` entries.
    pub fn status_report(&self) -> String {
        let mut out = String::new();
        let _ = self.write_status(&mut out);
        out
    }

    fn write_status(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            "Systematics: {} active, {} ancestors, {} outside, {} roots, mrca {}",
            self.num_active(),
            self.num_ancestors(),
            self.num_outside(),
            self.num_roots(),
            self.mrca().map_or_else(|| "none".to_string(), |id| id.to_string())
        )?;
        for (name, ids) in [
            ("Active", self.active_taxa()),
            ("Ancestors", self.ancestor_taxa()),
            ("Outside", self.outside_taxa()),
        ] {
            write!(out, "{name}:")?;
            for id in ids {
                let taxon = self.taxon(*id);
                write!(out, " {}({}:{})", id, taxon.info(), taxon.num_orgs())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// The lineage of `id` up to its root, one taxon per line.
    pub fn lineage_report(&self, id: TaxonId) -> String {
        let mut out = format!("Lineage of taxon {id}:\n");
        for ancestor in self.lineage(id) {
            let taxon = self.taxon(ancestor);
            let _ = writeln!(
                out,
                "  {} [{}] born {} orgs {}",
                ancestor,
                taxon.info(),
                taxon.origination_time(),
                taxon.num_orgs()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SystematicsConfig;
    use crate::forest::TaxonForest;
    use phylotrack_data::TaxonId;

    fn small() -> TaxonForest<String> {
        let mut forest = TaxonForest::new(SystematicsConfig::default());
        let root = forest.create("root".to_string(), None, 0.0, |_| {});
        forest.create("leaf".to_string(), Some(root), 1.0, |_| {});
        forest
    }

    #[test]
    fn test_to_dot_lists_nodes_and_edges() {
        let dot = small().to_dot();
        assert!(dot.starts_with("digraph Phylogeny {"));
        assert!(dot.contains("\"1\" -> \"2\";"));
        assert!(dot.contains("1: root"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_status_report() {
        let report = small().status_report();
        assert!(report.contains("2 active"));
        assert!(report.contains("Active: 1(root:1) 2(leaf:1)"));
        assert!(report.contains("Ancestors:\n"));
    }

    #[test]
    fn test_lineage_report() {
        let report = small().lineage_report(TaxonId(2));
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("2 [leaf]"));
        assert!(lines[2].contains("1 [root]"));
    }
}
