use log::{debug, info};

use crate::annotate::{build_ground_graph, NodeLookup};
use crate::cluster_builder::{build_clusters, Cluster, ClusterFactory};
use crate::config::EngineConfig;
use crate::entrance_discovery::{discover_entrances, find_dominant_transition};
use crate::error::{Error, Result};
use crate::graph::{ClusterId, Edge, EdgeId, Graph, NodeId, Path};
use crate::intra_connector::{build_intra_edges, connect_endpoint};
use crate::path_cache::PathCache;
use crate::search::{octile, AnnotatedAStar, SearchStats};
use crate::terrain::{capabilities, Terrain, TerrainGrid, NUM_BASIC_CLASSES};

/// Two-level annotated abstraction of a terrain grid.
///
/// Construction is phased: the annotated ground graph is built eagerly, then
/// `build_clusters` partitions the map and `build_entrances` installs the
/// abstract transition graph with its path cache. Queries insert transient
/// start/goal nodes, search the abstract graph, and stitch cached segments
/// back into a concrete path; the abstract graph is restored before every
/// query returns.
///
/// The engine is single-threaded: queries mutate shared abstract state, so
/// concurrent use requires external serialization.
pub struct AbstractionEngine {
    config: EngineConfig,
    subsets: Vec<Terrain>,
    width: i32,
    height: i32,
    ground: Graph,
    abstract_graph: Graph,
    lookup: NodeLookup,
    clusters: Vec<Cluster>,
    cache: PathCache,
    start_id: NodeId,
    goal_id: NodeId,
    stats: SearchStats,
}

impl AbstractionEngine {
    pub fn new(grid: &TerrainGrid, config: EngineConfig) -> Self {
        let subsets = capabilities(NUM_BASIC_CLASSES);
        let (ground, lookup, _) = build_ground_graph(grid, &subsets);
        Self {
            config,
            subsets,
            width: grid.width(),
            height: grid.height(),
            ground,
            abstract_graph: Graph::new(),
            lookup,
            clusters: Vec::new(),
            cache: PathCache::new(),
            start_id: NodeId::NONE,
            goal_id: NodeId::NONE,
            stats: SearchStats::default(),
        }
    }

    pub fn get_cluster_size(&self) -> i32 {
        self.config.cluster_size
    }

    pub fn get_num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn get_cluster(&self, id: ClusterId) -> Option<&Cluster> {
        if id.0 < 0 {
            return None;
        }
        self.clusters.get(id.0 as usize)
    }

    /// The graph at an abstraction level: 0 is the annotated ground graph,
    /// 1 the cluster transition graph.
    pub fn get_abstract_graph(&self, level: i32) -> Option<&Graph> {
        match level {
            0 => Some(&self.ground),
            1 => Some(&self.abstract_graph),
            _ => None,
        }
    }

    /// Ground node at a tile, `NodeId::NONE` for obstacles and out-of-bounds
    /// tiles.
    pub fn get_node_from_map(&self, x: i32, y: i32) -> NodeId {
        self.lookup.get(x, y)
    }

    pub fn start_id(&self) -> NodeId {
        self.start_id
    }

    pub fn goal_id(&self) -> NodeId {
        self.goal_id
    }

    pub fn nodes_expanded(&self) -> usize {
        self.stats.nodes_expanded
    }

    pub fn nodes_touched(&self) -> usize {
        self.stats.nodes_touched
    }

    pub fn peak_memory(&self) -> usize {
        self.stats.peak_memory
    }

    pub fn search_time(&self) -> std::time::Duration {
        self.stats.search_time
    }

    /// Partition the map into clusters. Must run before `build_entrances`.
    pub fn build_clusters(&mut self, factory: &mut dyn ClusterFactory) {
        let (clusters, _) = build_clusters(
            &mut self.ground,
            &self.lookup,
            self.width,
            self.height,
            &self.config,
            factory,
        );
        self.clusters = clusters;
    }

    /// Install the persistent abstract graph: inter-cluster transitions per
    /// entrance (with dominated transitions pruned), then intra-cluster
    /// connections, each with a cached ground path.
    pub fn build_entrances(&mut self) {
        let stats = discover_entrances(
            &mut self.ground,
            &mut self.abstract_graph,
            &self.lookup,
            &mut self.clusters,
            &mut self.cache,
            &self.subsets,
            self.config.quality,
        );
        let intra = build_intra_edges(
            &self.ground,
            &mut self.abstract_graph,
            &self.clusters,
            &mut self.cache,
            &self.subsets,
            self.config.quality,
        );
        info!(
            "abstract graph: {} nodes, {} edges ({} inter, {} pruned, {} intra), {} cached paths",
            self.abstract_graph.num_nodes(),
            self.abstract_graph.num_edges(),
            stats.inter_edges_created,
            stats.transitions_pruned,
            intra.intra_edges_created,
            self.cache.size()
        );
    }

    /// Dominance relation between two inter-cluster transitions (see
    /// `entrance_discovery::find_dominant_transition`).
    pub fn find_dominant_transition(
        &self,
        e1: Option<&Edge>,
        e2: Option<&Edge>,
    ) -> Option<EdgeId> {
        find_dominant_transition(&self.abstract_graph, e1, e2)
    }

    pub fn get_path_from_cache(&self, edge_id: EdgeId) -> Option<&Path> {
        self.cache.get(edge_id)
    }

    pub fn add_path_to_cache(&mut self, edge_id: EdgeId, path: Path) {
        self.cache.put(edge_id, path);
    }

    pub fn get_path_cache_size(&self) -> usize {
        self.cache.size()
    }

    /// Sum of step weights along a ground path.
    pub fn distance(&self, path: &Path) -> f64 {
        self.ground.path_distance(path)
    }

    /// Octile heuristic between two nodes of the given level; abstract nodes
    /// are resolved to their ground parent's coordinates. Invalid ids are an
    /// error, never a silent zero.
    pub fn h(&self, level: i32, a: NodeId, b: NodeId) -> Result<f64> {
        let graph = match level {
            0 => &self.ground,
            1 => &self.abstract_graph,
            _ => return Err(Error::MissingNode(a.0)),
        };
        let resolve = |id: NodeId| -> Result<(i32, i32)> {
            let n = graph.node(id).ok_or(Error::MissingNode(id.0))?;
            if n.abstraction_level > 0 {
                let g = self.ground.node(n.parent).ok_or(Error::MissingNode(n.parent.0))?;
                Ok((g.x, g.y))
            } else {
                Ok((n.x, n.y))
            }
        };
        let (ax, ay) = resolve(a)?;
        let (bx, by) = resolve(b)?;
        Ok(octile(ax, ay, bx, by))
    }

    /// Ground-level reachability probe under `(capability, clearance)`.
    pub fn pathable(&self, from: NodeId, to: NodeId, capability: Terrain, clearance: i32) -> bool {
        let admissible = |id: NodeId| {
            self.ground
                .node(id)
                .map(|n| n.is_traversable(capability, clearance))
                .unwrap_or(false)
        };
        if !admissible(from) || !admissible(to) {
            return false;
        }
        AnnotatedAStar::new(capability, clearance)
            .find_path(&self.ground, from, to)
            .is_some()
    }

    /// Splice the query endpoints into the abstract graph as transient
    /// abstract nodes connected to their clusters' abstract nodes under the
    /// query profile. Endpoints already materialized by an entrance reuse the
    /// existing abstract node and leave the corresponding id at
    /// `NodeId::NONE`.
    pub fn insert_start_and_goal(
        &mut self,
        start: NodeId,
        goal: NodeId,
        capability: Terrain,
        clearance: i32,
    ) -> Result<()> {
        self.stats = SearchStats::default();

        // Validate both endpoints before touching any shared state.
        for id in [start, goal] {
            let n = self.ground.node(id).ok_or(Error::MissingNode(id.0))?;
            if n.abstraction_level != 0 {
                return Err(Error::NonZeroAbstractionLevel(id.0, n.abstraction_level));
            }
            if !n.is_traversable(capability, clearance) {
                return Err(Error::NotTraversable {
                    id: id.0,
                    x: n.x,
                    y: n.y,
                    capability: capability.0,
                    clearance,
                });
            }
        }

        let start_abs = self.insert_endpoint(start, capability, clearance);
        if let Some(id) = start_abs {
            self.start_id = id;
        }
        let goal_abs = self.insert_endpoint(goal, capability, clearance);
        if let Some(id) = goal_abs {
            self.goal_id = id;
        }
        debug!("inserted endpoints: start_id={:?} goal_id={:?}", self.start_id, self.goal_id);
        Ok(())
    }

    /// Returns the new abstract node id, or `None` when an existing abstract
    /// node already materializes this ground node.
    fn insert_endpoint(
        &mut self,
        ground_id: NodeId,
        capability: Terrain,
        clearance: i32,
    ) -> Option<NodeId> {
        let (x, y, terrain, parent, cluster_id) = {
            let n = self.ground.node(ground_id).expect("endpoint validated");
            (n.x, n.y, n.terrain, n.parent, n.parent_cluster)
        };
        if parent != NodeId::NONE {
            return None;
        }

        let abs_id = self.abstract_graph.add_node(x, y, terrain, 1);
        {
            let abs = self.abstract_graph.node_mut(abs_id).expect("node just added");
            abs.parent = ground_id;
            abs.parent_cluster = cluster_id;
        }
        self.ground.node_mut(ground_id).expect("endpoint validated").parent = abs_id;
        self.clusters[cluster_id.0 as usize].add_parent(abs_id);

        connect_endpoint(
            &self.ground,
            &mut self.abstract_graph,
            &self.clusters[cluster_id.0 as usize],
            &mut self.cache,
            abs_id,
            capability,
            clearance,
            &mut self.stats,
        );
        Some(abs_id)
    }

    /// Undo `insert_start_and_goal`: drop exactly the transient abstract
    /// nodes, their incident edges and cache entries, and restore the ground
    /// `parent` labels. Afterwards the abstract graph and cache match their
    /// pre-insertion state.
    pub fn remove_start_and_goal(&mut self) {
        // Transients sit at the arena tail; the goal (if new) was added last.
        for id in [self.goal_id, self.start_id] {
            if id == NodeId::NONE {
                continue;
            }
            let (ground_id, cluster_id) = {
                let n = self.abstract_graph.node(id).expect("transient node is live");
                (n.parent, n.parent_cluster)
            };
            let removed = self.abstract_graph.remove_last_node(id);
            for eid in removed {
                self.cache.drop(eid);
            }
            self.clusters[cluster_id.0 as usize].remove_parent(id);
            if let Some(g) = self.ground.node_mut(ground_id) {
                g.parent = NodeId::NONE;
            }
        }
        self.start_id = NodeId::NONE;
        self.goal_id = NodeId::NONE;
    }

    /// Full hierarchical query: returns the stitched concrete path, `None`
    /// when no admissible path exists. Endpoint removal runs on every exit
    /// path, including reconstruction failures.
    pub fn get_path(
        &mut self,
        start: NodeId,
        goal: NodeId,
        capability: Terrain,
        clearance: i32,
    ) -> Result<Option<Path>> {
        self.insert_start_and_goal(start, goal, capability, clearance)?;
        let result = self.search_and_reconstruct(start, goal, capability, clearance);
        self.remove_start_and_goal();
        result
    }

    fn search_and_reconstruct(
        &mut self,
        start: NodeId,
        goal: NodeId,
        capability: Terrain,
        clearance: i32,
    ) -> Result<Option<Path>> {
        let abs_start = self.ground.node(start).ok_or(Error::MissingNode(start.0))?.parent;
        let abs_goal = self.ground.node(goal).ok_or(Error::MissingNode(goal.0))?.parent;

        let mut astar = AnnotatedAStar::new(capability, clearance);
        let abstract_path = astar.find_path(&self.abstract_graph, abs_start, abs_goal);
        self.stats.accumulate(astar.stats());
        let Some(abstract_path) = abstract_path else {
            return Ok(None);
        };

        let hops = abstract_path.nodes();
        if hops.len() == 1 {
            // start and goal share an abstract node: a single ground tile
            let g = self.abstract_graph.node(hops[0]).ok_or(Error::MissingNode(hops[0].0))?;
            return Ok(Some(Path::new(vec![g.parent])));
        }

        let mut stitched: Option<Path> = None;
        for pair in hops.windows(2) {
            let (u, v) = (pair[0], pair[1]);
            let eid = self
                .abstract_graph
                .find_annotated_edge(u, v, capability, clearance, f64::INFINITY)
                .ok_or(Error::CacheMiss(EdgeId::NONE.0))?;
            let segment = self.cache.get(eid).ok_or(Error::CacheMiss(eid.0))?;
            let u_ground = self.abstract_graph.node(u).ok_or(Error::MissingNode(u.0))?.parent;

            // cached paths are canonical for the edge's own direction
            let mut segment = segment.clone();
            if segment.first() != u_ground {
                segment = segment.reversed();
            }
            match stitched {
                None => stitched = Some(segment),
                Some(ref mut tail) => {
                    if tail.last() != segment.first() {
                        return Err(Error::SegmentDiscontinuity(tail.last().0));
                    }
                    tail.splice(&segment);
                }
            }
        }
        Ok(stitched)
    }
}
