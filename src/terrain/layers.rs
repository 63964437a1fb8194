use ahash::AHashMap;
use serde::Serialize;

use super::tree::{NodeId, TreeNode};
use super::LAYER;

/// Name for the `ordinal`-th layer (pre-order, zero-based) when its header is unreadable
pub fn fallback_layer_name(ordinal: usize) -> String {
    format!("Layer {}", ordinal + 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerEntry {
    pub node_id: NodeId,
    pub name: String,
    /// Boundaries owned by this layer itself
    pub direct_count: usize,
    /// Boundaries in this layer and every nested layer
    pub total_count: usize,
    pub depth: usize,
    pub parent: Option<NodeId>,
}

/// Flatten the layer hierarchy in pre-order.
///
/// A layer's children are the run of following entries deeper than it, up to
/// the next entry at the same depth or shallower.
pub fn index_layers(root: &TreeNode) -> Vec<LayerEntry> {
    let mut entries = Vec::new();
    visit(root, 0, None, &mut entries);
    entries
}

/// Returns the number of boundaries found under `node` outside of nested layers,
/// and the total found inside nested layers.
fn visit(
    node: &TreeNode,
    depth: usize,
    parent: Option<NodeId>,
    entries: &mut Vec<LayerEntry>,
) -> (usize, usize) {
    let mut direct = 0;
    let mut nested = 0;
    for child in &node.children {
        if child.boundary_kind().is_some() {
            direct += 1;
        } else if child.is_form_of(LAYER) {
            let at = entries.len();
            entries.push(LayerEntry {
                node_id: child.id,
                name: child
                    .descendant_name()
                    .map_or_else(|| fallback_layer_name(at), str::to_string),
                direct_count: 0,
                total_count: 0,
                depth,
                parent,
            });
            let (own, inner) = visit(child, depth + 1, Some(child.id), entries);
            entries[at].direct_count = own;
            entries[at].total_count = own + inner;
            nested += own + inner;
        } else if child.is_form() {
            let (own, inner) = visit(child, depth, parent, entries);
            direct += own;
            nested += inner;
        }
    }
    (direct, nested)
}

/// Indices of the direct child layers of `entries[index]`
pub fn child_layers(entries: &[LayerEntry], index: usize) -> Vec<usize> {
    let Some(layer) = entries.get(index) else {
        return Vec::new();
    };
    entries[index + 1..]
        .iter()
        .enumerate()
        .take_while(|(_, e)| e.depth > layer.depth)
        .filter(|(_, e)| e.depth == layer.depth + 1)
        .map(|(i, _)| index + 1 + i)
        .collect()
}

/// Boundary counts per layer keyed by node id
pub fn counts_by_node(entries: &[LayerEntry]) -> AHashMap<NodeId, (usize, usize)> {
    entries
        .iter()
        .map(|e| (e.node_id, (e.direct_count, e.total_count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::walk::Walker;
    use crate::codec::writer::ChunkWriter;
    use crate::config::ParseOptions;
    use crate::terrain::tree::TreeBuilder;

    fn named_layer(w: &mut ChunkWriter, name: &str, body: impl FnOnce(&mut ChunkWriter)) {
        w.form(b"LAYR", |w| {
            w.form(b"0003", |w| {
                w.form(b"IHDR", |w| {
                    w.begin_chunk(b"DATA").write_u32_le(1).write_cstring(name);
                });
                body(w);
            });
        });
    }

    fn boundary(w: &mut ChunkWriter) {
        w.form(b"BCIR", |w| {
            w.chunk(b"DATA", &[0; 20]);
        });
    }

    fn layers_of(data: &[u8]) -> Vec<LayerEntry> {
        let options = ParseOptions::default();
        let mut builder = TreeBuilder::new(&options);
        Walker::new(data).walk_chunk(0, data.len(), 0, &mut builder);
        index_layers(&builder.finish().unwrap().root)
    }

    #[test]
    fn test_nested_counts() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            named_layer(w, "A", |w| {
                boundary(w);
                named_layer(w, "B", |w| {
                    boundary(w);
                    boundary(w);
                });
            });
        });
        let layers = layers_of(&w.into_vec());

        assert_eq!(layers.len(), 2);
        let (a, b) = (&layers[0], &layers[1]);
        assert_eq!(a.name, "A");
        assert_eq!(a.direct_count, 1);
        assert_eq!(a.total_count, 3);
        assert_eq!(a.depth, 0);
        assert_eq!(a.parent, None);
        assert_eq!(b.name, "B");
        assert_eq!(b.direct_count, 2);
        assert_eq!(b.total_count, 2);
        assert_eq!(b.depth, a.depth + 1);
        assert_eq!(b.parent, Some(a.node_id));
    }

    #[test]
    fn test_child_layers_by_depth() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            named_layer(w, "A", |w| {
                named_layer(w, "A1", |w| {
                    named_layer(w, "A1x", |_| {});
                });
                named_layer(w, "A2", |_| {});
            });
            named_layer(w, "B", |_| {});
        });
        let layers = layers_of(&w.into_vec());
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();

        assert_eq!(names, vec!["A", "A1", "A1x", "A2", "B"]);
        assert_eq!(child_layers(&layers, 0), vec![1, 3]);
        assert_eq!(child_layers(&layers, 1), vec![2]);
        assert!(child_layers(&layers, 4).is_empty());
        assert!(child_layers(&layers, 9).is_empty());

        let counts = counts_by_node(&layers);
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn test_fallback_names() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            named_layer(w, "first", |_| {});
            w.form(b"LAYR", |w| {
                boundary(w);
            });
        });
        let layers = layers_of(&w.into_vec());

        assert_eq!(layers[1].name, "Layer 2");
        assert_eq!(layers[1].direct_count, 1);
    }
}
