use std::collections::BTreeMap;

#[cfg(test)]
use crate::graph::NodeId;
use crate::graph::{EdgeId, Path};

/// Concrete ground paths backing abstract edges, keyed by the abstract
/// edge's stable id. Every persistent abstract edge owns exactly one entry;
/// transient entries come and go with endpoint insertion.
#[derive(Clone, Debug, Default)]
pub struct PathCache {
    paths: BTreeMap<EdgeId, Path>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `path` for `edge_id`, overwriting any prior entry. Invalid ids
    /// and empty paths are ignored.
    pub fn put(&mut self, edge_id: EdgeId, path: Path) {
        if edge_id.0 < 0 || path.is_empty() {
            return;
        }
        self.paths.insert(edge_id, path);
    }

    pub fn get(&self, edge_id: EdgeId) -> Option<&Path> {
        self.paths.get(&edge_id)
    }

    pub fn drop(&mut self, edge_id: EdgeId) {
        self.paths.remove(&edge_id);
    }

    pub fn size(&self) -> usize {
        self.paths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_drop_roundtrip() {
        let mut cache = PathCache::new();
        cache.put(EdgeId(3), Path::new(vec![NodeId(1), NodeId(2)]));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get(EdgeId(3)).unwrap().nodes(), &[NodeId(1), NodeId(2)]);
        assert!(cache.get(EdgeId(4)).is_none());

        cache.put(EdgeId(3), Path::new(vec![NodeId(1), NodeId(2), NodeId(5)]));
        assert_eq!(cache.size(), 1);
        assert_eq!(
            cache.get(EdgeId(3)).unwrap().nodes(),
            &[NodeId(1), NodeId(2), NodeId(5)]
        );

        cache.drop(EdgeId(3));
        assert_eq!(cache.size(), 0);
        assert!(cache.get(EdgeId(3)).is_none());
    }

    #[test]
    fn invalid_arguments_are_ignored() {
        let mut cache = PathCache::new();
        cache.put(EdgeId::NONE, Path::new(vec![NodeId(1)]));
        assert_eq!(cache.size(), 0);
    }
}
