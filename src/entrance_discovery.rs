use log::{debug, info};

use crate::annotate::NodeLookup;
use crate::cluster_builder::Cluster;
use crate::config::Quality;
use crate::graph::{Edge, EdgeId, Graph, NodeId, Path};
use crate::path_cache::PathCache;
use crate::terrain::Terrain;

#[derive(Clone, Debug, Default)]
pub struct EntrancesStats {
    pub entrances_found: usize,
    pub abstract_nodes_created: usize,
    pub inter_edges_created: usize,
    pub transitions_pruned: usize,
}

/// One maximal run of mutually-traversable tile pairs straddling the shared
/// border of two adjacent clusters.
struct Entrance {
    /// `(inside, outside)` ground node pairs along the run, in border order.
    pairs: Vec<(NodeId, NodeId)>,
}

/// Discover entrances between every pair of horizontally or vertically
/// adjacent clusters and install the inter-cluster transitions: abstract
/// nodes for the chosen endpoints, annotated single-step edges between them,
/// and a cached two-node ground path per edge. Transitions weakly dominated
/// by a sibling across the same cluster pair are pruned before intra wiring
/// begins.
pub fn discover_entrances(
    ground: &mut Graph,
    abstract_graph: &mut Graph,
    lookup: &NodeLookup,
    clusters: &mut [Cluster],
    cache: &mut PathCache,
    subsets: &[Terrain],
    quality: Quality,
) -> EntrancesStats {
    let mut stats = EntrancesStats::default();

    for ci in 0..clusters.len() {
        let (ox, oy, w, h) = {
            let c = &clusters[ci];
            (c.origin_x(), c.origin_y(), c.width(), c.height())
        };

        // Border with the cluster to the right: pairs ((bx,y),(bx+1,y)).
        let bx = ox + w - 1;
        let right: Vec<(NodeId, NodeId)> =
            (oy..oy + h).map(|y| (lookup.get(bx, y), lookup.get(bx + 1, y))).collect();
        for entrance in maximal_runs(&right) {
            stats.entrances_found += 1;
            install_transitions(
                ground,
                abstract_graph,
                clusters,
                cache,
                subsets,
                quality,
                &entrance,
                &mut stats,
            );
        }

        // Border with the cluster below: pairs ((x,by),(x,by+1)).
        let by = oy + h - 1;
        let below: Vec<(NodeId, NodeId)> =
            (ox..ox + w).map(|x| (lookup.get(x, by), lookup.get(x, by + 1))).collect();
        for entrance in maximal_runs(&below) {
            stats.entrances_found += 1;
            install_transitions(
                ground,
                abstract_graph,
                clusters,
                cache,
                subsets,
                quality,
                &entrance,
                &mut stats,
            );
        }
    }

    stats.transitions_pruned = prune_dominated_transitions(abstract_graph, cache);

    info!(
        "entrances: {} found, {} abstract nodes, {} inter edges, {} pruned",
        stats.entrances_found,
        stats.abstract_nodes_created,
        stats.inter_edges_created,
        stats.transitions_pruned
    );
    stats
}

/// Split a border walk into maximal runs where both sides are traversable
/// under at least one capability (i.e. both tiles carry nodes).
fn maximal_runs(pairs: &[(NodeId, NodeId)]) -> Vec<Entrance> {
    let mut runs = Vec::new();
    let mut current: Vec<(NodeId, NodeId)> = Vec::new();
    for &(a, b) in pairs {
        if a != NodeId::NONE && b != NodeId::NONE {
            current.push((a, b));
        } else if !current.is_empty() {
            runs.push(Entrance { pairs: std::mem::take(&mut current) });
        }
    }
    if !current.is_empty() {
        runs.push(Entrance { pairs: current });
    }
    runs
}

/// Choose transitions for one entrance under every capability and candidate
/// clearance, and install the surviving ones.
#[allow(clippy::too_many_arguments)]
fn install_transitions(
    ground: &mut Graph,
    abstract_graph: &mut Graph,
    clusters: &mut [Cluster],
    cache: &mut PathCache,
    subsets: &[Terrain],
    quality: Quality,
    entrance: &Entrance,
    stats: &mut EntrancesStats,
) {
    let length = entrance.pairs.len() as i32;

    for &c in subsets {
        // Pair admissibility follows the ground edge across the border.
        let pair_clearance: Vec<i32> = entrance
            .pairs
            .iter()
            .map(|&(a, b)| {
                ground
                    .find_edge(a, b)
                    .and_then(|eid| ground.edge(eid))
                    .map(|e| e.clearance(c))
                    .unwrap_or(0)
            })
            .collect();
        let max_useful = pair_clearance.iter().copied().max().unwrap_or(0);

        for k in (1..=max_useful).rev() {
            let eligible: Vec<usize> = (0..entrance.pairs.len())
                .filter(|&i| pair_clearance[i] >= k)
                .collect();
            if eligible.is_empty() {
                continue;
            }

            let chosen: Vec<usize> = match quality {
                Quality::High | Quality::Medium => {
                    if length >= 2 * k {
                        let first = eligible[0];
                        let last = eligible[eligible.len() - 1];
                        if first == last { vec![first] } else { vec![first, last] }
                    } else {
                        vec![eligible[eligible.len() / 2]]
                    }
                }
                Quality::Low => vec![eligible[eligible.len() / 2]],
            };

            for i in chosen {
                let (a, b) = entrance.pairs[i];
                install_transition(ground, abstract_graph, clusters, cache, a, b, c, k, stats);
            }
        }
    }
}

/// Promote the tile pair `(a, b)` to an inter-cluster transition under
/// `(capability, clearance)`, unless an existing transition between the same
/// abstract nodes already admits it.
#[allow(clippy::too_many_arguments)]
fn install_transition(
    ground: &mut Graph,
    abstract_graph: &mut Graph,
    clusters: &mut [Cluster],
    cache: &mut PathCache,
    a: NodeId,
    b: NodeId,
    capability: Terrain,
    clearance: i32,
    stats: &mut EntrancesStats,
) {
    let abs_a = ensure_abstract_node(ground, abstract_graph, clusters, a, stats);
    let abs_b = ensure_abstract_node(ground, abstract_graph, clusters, b, stats);

    if abstract_graph
        .find_annotated_edge(abs_a, abs_b, capability, clearance, f64::INFINITY)
        .is_some()
    {
        return; // exact-pair dedup: an existing edge already admits this profile
    }

    let eid = abstract_graph.add_edge(abs_a, abs_b, 1.0);
    if let Some(e) = abstract_graph.edge_mut(eid) {
        e.set_clearance(capability, clearance);
    }
    cache.put(eid, Path::new(vec![a, b]));
    stats.inter_edges_created += 1;
    debug!(
        "transition {:?}<->{:?} capability {:#x} clearance {}",
        a, b, capability.0, clearance
    );
}

/// Abstract node materializing the ground node, creating and registering it
/// with its owning cluster on first use.
fn ensure_abstract_node(
    ground: &mut Graph,
    abstract_graph: &mut Graph,
    clusters: &mut [Cluster],
    ground_id: NodeId,
    stats: &mut EntrancesStats,
) -> NodeId {
    let (x, y, terrain, parent, cluster_id) = {
        let n = ground.node(ground_id).expect("transition tile has a node");
        (n.x, n.y, n.terrain, n.parent, n.parent_cluster)
    };
    if parent != NodeId::NONE {
        return parent;
    }
    let abs_id = abstract_graph.add_node(x, y, terrain, 1);
    {
        let abs = abstract_graph.node_mut(abs_id).expect("node just added");
        abs.parent = ground_id;
        abs.parent_cluster = cluster_id;
    }
    if let Some(n) = ground.node_mut(ground_id) {
        n.parent = abs_id;
    }
    clusters[cluster_id.0 as usize].add_parent(abs_id);
    stats.abstract_nodes_created += 1;
    abs_id
}

/// Sweep the freshly installed transitions and drop every edge a sibling
/// across the same cluster pair weakly dominates, tearing down its cache
/// entry with it. Runs before intra wiring, so the equivalent-detour
/// condition of the dominance relation is met by transitions that share
/// endpoints (or whenever earlier pruning rounds left a detour in place);
/// each removal restarts the scan since it can change later verdicts.
fn prune_dominated_transitions(abstract_graph: &mut Graph, cache: &mut PathCache) -> usize {
    let mut pruned = 0;
    loop {
        let edges: Vec<Edge> = abstract_graph.edges().cloned().collect();
        let mut dominated = EdgeId::NONE;
        'scan: for i in 0..edges.len() {
            for j in i + 1..edges.len() {
                if let Some(dominant) =
                    find_dominant_transition(abstract_graph, Some(&edges[i]), Some(&edges[j]))
                {
                    dominated = if dominant == edges[i].id { edges[j].id } else { edges[i].id };
                    break 'scan;
                }
            }
        }
        if dominated == EdgeId::NONE {
            break;
        }
        abstract_graph.remove_edge(dominated);
        cache.drop(dominated);
        debug!("pruned dominated transition {:?}", dominated);
        pruned += 1;
    }
    pruned
}

/// Weak dominance between two inter-cluster transitions across the same pair
/// of clusters: `e1` dominates `e2` when every `(c2, k2)` annotation of `e2`
/// is covered by an annotation `(c1, k1)` of `e1` with `c1 ⊆ c2` and
/// `k1 >= k2`, and the abstract graph already connects `e2`'s endpoints to
/// `e1`'s on both sides under `(c2, k2)`. Returns the dominant edge id, in
/// either argument order; any null, invalid, or cluster-mismatched input
/// yields `None`. When both edges dominate each other the transition whose
/// `from` endpoint sits at the lower boundary offset wins.
pub fn find_dominant_transition(
    abstract_graph: &Graph,
    e1: Option<&Edge>,
    e2: Option<&Edge>,
) -> Option<EdgeId> {
    let e1 = e1?;
    let e2 = e2?;

    let cluster_of = |id: NodeId| abstract_graph.node(id).map(|n| n.parent_cluster);
    let c1f = cluster_of(e1.from)?;
    let c1t = cluster_of(e1.to)?;
    let c2f = cluster_of(e2.from)?;
    let c2t = cluster_of(e2.to)?;

    // Both transitions must straddle the same cluster pair.
    let same = (c1f == c2f && c1t == c2t) || (c1f == c2t && c1t == c2f);
    if !same || c1f == c1t {
        return None;
    }

    let d1 = dominates(abstract_graph, e1, e2);
    let d2 = dominates(abstract_graph, e2, e1);
    match (d1, d2) {
        (true, true) => {
            // equal profiles: lower boundary offset wins
            let p1 = offset_key(abstract_graph, e1);
            let p2 = offset_key(abstract_graph, e2);
            Some(if p1 <= p2 { e1.id } else { e2.id })
        }
        (true, false) => Some(e1.id),
        (false, true) => Some(e2.id),
        (false, false) => None,
    }
}

fn offset_key(graph: &Graph, e: &Edge) -> (i32, i32) {
    graph.node(e.from).map(|n| (n.x, n.y)).unwrap_or((i32::MAX, i32::MAX))
}

fn dominates(graph: &Graph, e1: &Edge, e2: &Edge) -> bool {
    if e2.clearance_entries().is_empty() {
        return false;
    }
    for &(c2, k2) in e2.clearance_entries() {
        let covered = e1
            .clearance_entries()
            .iter()
            .any(|&(c1, k1)| c1.is_subset_of(c2) && k1 >= k2);
        if !covered {
            return false;
        }
        // Orient e1's endpoints to e2's cluster sides.
        let side = |id: NodeId| graph.node(id).map(|n| n.parent_cluster);
        let (m1, m2) = if side(e1.from) == side(e2.from) {
            (e1.from, e1.to)
        } else {
            (e1.to, e1.from)
        };
        let linked = |a: NodeId, b: NodeId| {
            a == b || graph.find_annotated_edge(a, b, c2, k2, f64::INFINITY).is_some()
        };
        if !linked(e2.from, m1) || !linked(e2.to, m2) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ClusterId;
    use crate::terrain::{GROUND, TREES};

    /// Abstract graph with two transitions across the same cluster pair plus
    /// the circuit edges connecting their endpoints, mirroring the dominance
    /// setup used when pruning redundant entrance transitions.
    fn dominance_fixture(
        dm: (Terrain, i32),
        dt: (Terrain, i32),
    ) -> (Graph, EdgeId, EdgeId) {
        let mut g = Graph::new();
        let n1 = g.add_node(0, 0, GROUND, 1);
        let n2 = g.add_node(1, 0, GROUND, 1);
        let n3 = g.add_node(0, 3, GROUND, 1);
        let n4 = g.add_node(1, 3, GROUND, 1);
        for (id, cluster) in [(n1, 0), (n2, 1), (n3, 0), (n4, 1)] {
            g.node_mut(id).unwrap().parent_cluster = ClusterId(cluster);
        }
        let e1 = g.add_edge(n1, n2, 1.0);
        g.edge_mut(e1).unwrap().set_clearance(dm.0, dm.1);
        let e2 = g.add_edge(n3, n4, 1.0);
        g.edge_mut(e2).unwrap().set_clearance(dt.0, dt.1);

        // circuit between the endpoints, annotated at the dominated profile
        let c1 = g.add_edge(n1, n3, 1.0);
        g.edge_mut(c1).unwrap().set_clearance(dt.0, dt.1);
        let c2 = g.add_edge(n2, n4, 1.0);
        g.edge_mut(c2).unwrap().set_clearance(dt.0, dt.1);

        (g, e1, e2)
    }

    #[test]
    fn null_arguments_yield_no_dominant_edge() {
        let (g, e1, _) = dominance_fixture((GROUND, 3), (GROUND, 1));
        let edge = g.edge(e1).cloned();
        assert_eq!(find_dominant_transition(&g, None, None), None);
        assert_eq!(find_dominant_transition(&g, edge.as_ref(), None), None);
        assert_eq!(find_dominant_transition(&g, None, edge.as_ref()), None);
    }

    #[test]
    fn invalid_endpoints_yield_no_dominant_edge() {
        let (g, e1, _) = dominance_fixture((GROUND, 3), (GROUND, 1));
        let mut other = Graph::new();
        let a = other.add_node(0, 0, GROUND, 1);
        let b = other.add_node(1, 0, GROUND, 1);
        let bogus = other.add_edge(a, b, 1.0);
        // endpoints 97/98 do not exist in `g`
        let mut fake = other.edge(bogus).cloned().unwrap();
        fake.from = NodeId(97);
        fake.to = NodeId(98);
        let real = g.edge(e1).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&real), Some(&fake)), None);
    }

    #[test]
    fn mismatched_cluster_pairs_yield_no_dominant_edge() {
        let (mut g, e1, e2) = dominance_fixture((GROUND, 3), (GROUND, 1));
        g.node_mut(NodeId(2)).unwrap().parent_cluster = ClusterId(2);
        g.node_mut(NodeId(3)).unwrap().parent_cluster = ClusterId(3);
        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), None);
    }

    #[test]
    fn same_capability_larger_clearance_dominates_in_either_order() {
        let (g, e1, e2) = dominance_fixture((GROUND, 3), (GROUND, 1));
        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), Some(e1));
        assert_eq!(find_dominant_transition(&g, Some(&b), Some(&a)), Some(e1));
    }

    #[test]
    fn simpler_capability_dominates_intersecting_capability() {
        let (g, e1, e2) = dominance_fixture((GROUND, 3), (GROUND | TREES, 3));
        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), Some(e1));
        assert_eq!(find_dominant_transition(&g, Some(&b), Some(&a)), Some(e1));
    }

    #[test]
    fn narrower_corridor_does_not_dominate() {
        // e1 has the simpler capability but smaller clearance: no dominance.
        let (g, e1, e2) = dominance_fixture((GROUND, 2), (GROUND | TREES, 3));
        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), None);
        assert_eq!(find_dominant_transition(&g, Some(&b), Some(&a)), None);
    }

    #[test]
    fn equal_profiles_break_ties_on_boundary_offset() {
        let (g, e1, e2) = dominance_fixture((GROUND, 2), (GROUND, 2));
        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        // e1's from endpoint is at (0,0), e2's at (0,3): e1 wins either way.
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), Some(e1));
        assert_eq!(find_dominant_transition(&g, Some(&b), Some(&a)), Some(e1));
    }

    #[test]
    fn missing_circuit_prevents_dominance() {
        let mut g = Graph::new();
        let n1 = g.add_node(0, 0, GROUND, 1);
        let n2 = g.add_node(1, 0, GROUND, 1);
        let n3 = g.add_node(0, 3, GROUND, 1);
        let n4 = g.add_node(1, 3, GROUND, 1);
        for (id, cluster) in [(n1, 0), (n2, 1), (n3, 0), (n4, 1)] {
            g.node_mut(id).unwrap().parent_cluster = ClusterId(cluster);
        }
        let e1 = g.add_edge(n1, n2, 1.0);
        g.edge_mut(e1).unwrap().set_clearance(GROUND, 3);
        let e2 = g.add_edge(n3, n4, 1.0);
        g.edge_mut(e2).unwrap().set_clearance(GROUND, 1);

        let a = g.edge(e1).cloned().unwrap();
        let b = g.edge(e2).cloned().unwrap();
        assert_eq!(find_dominant_transition(&g, Some(&a), Some(&b)), None);
    }

    #[test]
    fn build_pruning_drops_a_transition_dominated_at_the_same_endpoints() {
        // two parallel transitions between the same abstract nodes; the
        // Ground one covers the wider-capability profile at equal clearance
        let mut g = Graph::new();
        let n1 = g.add_node(0, 0, GROUND, 1);
        let n2 = g.add_node(1, 0, GROUND, 1);
        g.node_mut(n1).unwrap().parent_cluster = ClusterId(0);
        g.node_mut(n2).unwrap().parent_cluster = ClusterId(1);
        let wide_cap = g.add_edge(n1, n2, 1.0);
        g.edge_mut(wide_cap).unwrap().set_clearance(GROUND | TREES, 2);
        let ground_only = g.add_edge(n1, n2, 1.0);
        g.edge_mut(ground_only).unwrap().set_clearance(GROUND, 2);

        let mut cache = PathCache::new();
        cache.put(wide_cap, Path::new(vec![NodeId(5), NodeId(6)]));
        cache.put(ground_only, Path::new(vec![NodeId(5), NodeId(6)]));

        let pruned = prune_dominated_transitions(&mut g, &mut cache);

        assert_eq!(pruned, 1);
        assert!(g.edge(ground_only).is_some());
        assert!(g.edge(wide_cap).is_none());
        assert_eq!(cache.size(), 1);
        assert!(cache.get(wide_cap).is_none());
    }

    #[test]
    fn build_pruning_uses_detours_through_the_dominant_transition() {
        let (mut g, e1, e2) = dominance_fixture((GROUND, 3), (GROUND, 1));
        let mut cache = PathCache::new();
        cache.put(e1, Path::new(vec![NodeId(10), NodeId(11)]));
        cache.put(e2, Path::new(vec![NodeId(12), NodeId(13)]));

        let pruned = prune_dominated_transitions(&mut g, &mut cache);

        assert_eq!(pruned, 1);
        assert!(g.edge(e1).is_some());
        assert!(g.edge(e2).is_none());
        assert!(cache.get(e2).is_none());
        assert!(cache.get(e1).is_some());
    }
}
