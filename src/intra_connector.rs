use log::{debug, info};

use crate::cluster_builder::Cluster;
use crate::config::Quality;
use crate::graph::{Graph, NodeId};
use crate::path_cache::PathCache;
use crate::search::{AnnotatedAStar, SearchStats};
use crate::terrain::Terrain;

#[derive(Clone, Debug, Default)]
pub struct IntraStats {
    pub clusters_processed: usize,
    pub intra_edges_created: usize,
    pub search: SearchStats,
}

/// Connect the abstract nodes inside each cluster: for every pair and every
/// `(capability, clearance)` admissible at both ground parents, run an
/// annotated A* restricted to the cluster rectangle and record the best
/// low-level path as an intra-cluster abstract edge. A combination whose
/// connection is already provided at the same or better weight adds nothing;
/// unreachable pairs are skipped without error.
///
/// Low quality keeps only the maximal-clearance connection per capability;
/// High and Medium also wire the smaller clearance values, whose paths may
/// shortcut through passages a bigger agent cannot use.
pub fn build_intra_edges(
    ground: &Graph,
    abstract_graph: &mut Graph,
    clusters: &[Cluster],
    cache: &mut PathCache,
    subsets: &[Terrain],
    quality: Quality,
) -> IntraStats {
    let mut stats = IntraStats::default();

    for cluster in clusters {
        let parents = cluster.parents();
        if parents.len() < 2 {
            continue;
        }
        let corridor = cluster.corridor();

        for i in 0..parents.len() {
            for j in i + 1..parents.len() {
                let u = parents[i];
                let v = parents[j];
                let (ug, vg) = {
                    let un = abstract_graph.node(u).expect("cluster parents are live");
                    let vn = abstract_graph.node(v).expect("cluster parents are live");
                    (un.parent, vn.parent)
                };

                for &c in subsets {
                    let k_max = {
                        let a = ground.node(ug).expect("abstract parent is a ground node");
                        let b = ground.node(vg).expect("abstract parent is a ground node");
                        a.clearance(c).min(b.clearance(c))
                    };
                    for k in (1..=k_max).rev() {
                        let mut astar = AnnotatedAStar::with_corridor(c, k, corridor);
                        let Some(path) = astar.find_path(ground, ug, vg) else {
                            stats.search.accumulate(astar.stats());
                            continue;
                        };
                        stats.search.accumulate(astar.stats());
                        let weight = ground.path_distance(&path);

                        // Skip when an existing edge already admits the
                        // combination at least as cheaply.
                        let existing = abstract_graph
                            .find_annotated_edge(u, v, c, k, f64::INFINITY)
                            .and_then(|eid| abstract_graph.edge(eid))
                            .map(|e| e.weight);
                        let subsumed = existing.map(|w| w <= weight + 1e-6).unwrap_or(false);
                        if !subsumed {
                            let eid = abstract_graph.add_edge(u, v, weight);
                            if let Some(e) = abstract_graph.edge_mut(eid) {
                                e.set_clearance(c, k);
                            }
                            cache.put(eid, path);
                            stats.intra_edges_created += 1;
                            debug!(
                                "intra edge {:?}<->{:?} cluster {:?} capability {:#x} clearance {} weight {:.3}",
                                u, v, cluster.id(), c.0, k, weight
                            );
                        }
                        if quality == Quality::Low {
                            // low quality: only the widest admissible variant
                            break;
                        }
                    }
                }
            }
        }
        stats.clusters_processed += 1;
    }

    info!(
        "intra wiring: {} clusters, {} edges",
        stats.clusters_processed, stats.intra_edges_created
    );
    stats
}

/// Connect a freshly inserted abstract endpoint to every other abstract node
/// of its cluster under the query's `(capability, clearance)`. Used by
/// endpoint insertion; one edge and one cached path per reachable node.
pub fn connect_endpoint(
    ground: &Graph,
    abstract_graph: &mut Graph,
    cluster: &Cluster,
    cache: &mut PathCache,
    endpoint: NodeId,
    capability: Terrain,
    clearance: i32,
    stats: &mut SearchStats,
) -> usize {
    let corridor = cluster.corridor();
    let endpoint_ground = abstract_graph
        .node(endpoint)
        .expect("endpoint was just registered")
        .parent;
    let mut created = 0;

    let others: Vec<NodeId> =
        cluster.parents().iter().copied().filter(|&q| q != endpoint).collect();
    for q in others {
        let qg = abstract_graph.node(q).expect("cluster parents are live").parent;
        let mut astar = AnnotatedAStar::with_corridor(capability, clearance, corridor);
        let found = astar.find_path(ground, endpoint_ground, qg);
        stats.accumulate(astar.stats());
        let Some(path) = found else { continue };

        let weight = ground.path_distance(&path);
        let eid = abstract_graph.add_edge(endpoint, q, weight);
        if let Some(e) = abstract_graph.edge_mut(eid) {
            e.set_clearance(capability, clearance);
        }
        cache.put(eid, path);
        created += 1;
    }
    created
}
