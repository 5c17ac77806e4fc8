use log::info;

use crate::annotate::NodeLookup;
use crate::config::EngineConfig;
use crate::graph::{ClusterId, Graph, NodeId};
use crate::search::Corridor;

/// A rectangular map partition. Border clusters are clipped to the map, so
/// `width`/`height` may be smaller than the configured cluster size. The
/// cluster owns the abstract nodes whose ground parents lie inside it.
#[derive(Clone, Debug)]
pub struct Cluster {
    id: ClusterId,
    origin_x: i32,
    origin_y: i32,
    width: i32,
    height: i32,
    parents: Vec<NodeId>,
}

impl Cluster {
    pub fn new(id: ClusterId, origin_x: i32, origin_y: i32, width: i32, height: i32) -> Self {
        Self { id, origin_x, origin_y, width, height, parents: Vec::new() }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn origin_x(&self) -> i32 {
        self.origin_x
    }

    pub fn origin_y(&self) -> i32 {
        self.origin_y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.origin_x
            && x < self.origin_x + self.width
            && y >= self.origin_y
            && y < self.origin_y + self.height
    }

    /// Search corridor covering exactly this cluster's tiles.
    pub fn corridor(&self) -> Corridor {
        Corridor {
            min_x: self.origin_x,
            min_y: self.origin_y,
            max_x: self.origin_x + self.width - 1,
            max_y: self.origin_y + self.height - 1,
        }
    }

    /// Abstract nodes owned by this cluster, in registration order.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn add_parent(&mut self, abstract_id: NodeId) {
        if !self.parents.contains(&abstract_id) {
            self.parents.push(abstract_id);
        }
    }

    pub fn remove_parent(&mut self, abstract_id: NodeId) {
        self.parents.retain(|&p| p != abstract_id);
    }
}

/// Construction seam for cluster instances so tests can substitute doubles.
pub trait ClusterFactory {
    fn create(
        &mut self,
        id: ClusterId,
        origin: (i32, i32),
        size: (i32, i32),
        owner: &EngineConfig,
    ) -> Cluster;
}

/// The production factory: plain rectangles.
#[derive(Clone, Debug, Default)]
pub struct RectClusterFactory;

impl ClusterFactory for RectClusterFactory {
    fn create(
        &mut self,
        id: ClusterId,
        origin: (i32, i32),
        size: (i32, i32),
        _owner: &EngineConfig,
    ) -> Cluster {
        Cluster::new(id, origin.0, origin.1, size.0, size.1)
    }
}

#[derive(Clone, Debug, Default)]
pub struct BuildStats {
    pub clusters_created: usize,
}

/// Partition a `width` x `height` map into `ceil(W/S) * ceil(H/S)` clusters
/// in row-major order and label every ground node with its owning cluster.
pub fn build_clusters(
    graph: &mut Graph,
    lookup: &NodeLookup,
    width: i32,
    height: i32,
    cfg: &EngineConfig,
    factory: &mut dyn ClusterFactory,
) -> (Vec<Cluster>, BuildStats) {
    let s = cfg.cluster_size;
    debug_assert!(s >= 1);

    let mut clusters = Vec::new();
    let mut stats = BuildStats::default();

    for origin_y in (0..height).step_by(s as usize) {
        for origin_x in (0..width).step_by(s as usize) {
            let id = ClusterId(clusters.len() as i32);
            let cw = s.min(width - origin_x);
            let ch = s.min(height - origin_y);
            let cluster = factory.create(id, (origin_x, origin_y), (cw, ch), cfg);

            for y in origin_y..origin_y + ch {
                for x in origin_x..origin_x + cw {
                    let nid = lookup.get(x, y);
                    if nid != NodeId::NONE {
                        if let Some(n) = graph.node_mut(nid) {
                            n.parent_cluster = id;
                        }
                    }
                }
            }

            clusters.push(cluster);
            stats.clusters_created += 1;
        }
    }

    info!("built {} clusters (size {})", stats.clusters_created, s);
    (clusters, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::build_ground_graph;
    use crate::terrain::{capabilities, TerrainGrid, NUM_BASIC_CLASSES};

    fn decompose(width: i32, height: i32, cluster_size: i32) -> (Graph, Vec<Cluster>) {
        let mut rows = Vec::new();
        let row: String = std::iter::repeat('.').take(width as usize).collect();
        for _ in 0..height {
            rows.push(row.clone());
        }
        let refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let grid = TerrainGrid::from_rows(&refs).unwrap();
        let (mut graph, lookup, _) = build_ground_graph(&grid, &capabilities(NUM_BASIC_CLASSES));
        let cfg = EngineConfig { cluster_size, ..EngineConfig::default() };
        let (clusters, _) =
            build_clusters(&mut graph, &lookup, width, height, &cfg, &mut RectClusterFactory);
        (graph, clusters)
    }

    #[test]
    fn non_multiple_dimensions_clip_border_clusters() {
        let (_, clusters) = decompose(10, 6, 5);
        assert_eq!(clusters.len(), 4);
        let widths: Vec<i32> = clusters.iter().map(|c| c.width()).collect();
        let heights: Vec<i32> = clusters.iter().map(|c| c.height()).collect();
        assert_eq!(widths, vec![5, 5, 5, 5]);
        assert_eq!(heights, vec![5, 5, 1, 1]);
    }

    #[test]
    fn every_tile_is_assigned_to_exactly_one_cluster() {
        let (graph, clusters) = decompose(7, 5, 3);
        assert_eq!(clusters.len(), 3 * 2);
        for n in graph.nodes() {
            let owners: Vec<_> =
                clusters.iter().filter(|c| c.contains(n.x, n.y)).map(|c| c.id()).collect();
            assert_eq!(owners.len(), 1);
            assert_eq!(owners[0], n.parent_cluster);
        }
    }

    #[test]
    fn factory_receives_clipped_sizes() {
        struct Recording(Vec<(ClusterId, (i32, i32), (i32, i32))>);
        impl ClusterFactory for Recording {
            fn create(
                &mut self,
                id: ClusterId,
                origin: (i32, i32),
                size: (i32, i32),
                _owner: &EngineConfig,
            ) -> Cluster {
                self.0.push((id, origin, size));
                Cluster::new(id, origin.0, origin.1, size.0, size.1)
            }
        }

        let grid = TerrainGrid::from_rows(&["....", "....", "...."]).unwrap();
        let (mut graph, lookup, _) = build_ground_graph(&grid, &capabilities(NUM_BASIC_CLASSES));
        let cfg = EngineConfig { cluster_size: 3, ..EngineConfig::default() };
        let mut factory = Recording(Vec::new());
        let (clusters, stats) = build_clusters(&mut graph, &lookup, 4, 3, &cfg, &mut factory);

        assert_eq!(stats.clusters_created, 2);
        assert_eq!(clusters.len(), 2);
        assert_eq!(
            factory.0,
            vec![(ClusterId(0), (0, 0), (3, 3)), (ClusterId(1), (3, 0), (1, 3))]
        );
    }

    #[test]
    fn corridor_matches_cluster_rectangle() {
        let (_, clusters) = decompose(10, 6, 5);
        let c = clusters[3].corridor();
        assert_eq!((c.min_x, c.min_y, c.max_x, c.max_y), (5, 5, 9, 5));
    }
}
