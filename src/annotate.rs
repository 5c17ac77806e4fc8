use log::info;

use crate::graph::{EdgeId, Graph, NodeId, SQRT_2};
use crate::terrain::{Terrain, TerrainGrid};

#[derive(Clone, Debug, Default)]
pub struct AnnotateStats {
    pub nodes_created: usize,
    pub edges_created: usize,
}

/// Tile -> ground-node index for a grid.
#[derive(Clone, Debug)]
pub struct NodeLookup {
    width: i32,
    height: i32,
    ids: Vec<NodeId>,
}

impl NodeLookup {
    fn new(width: i32, height: i32) -> Self {
        Self { width, height, ids: vec![NodeId::NONE; (width * height) as usize] }
    }

    pub fn get(&self, x: i32, y: i32) -> NodeId {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return NodeId::NONE;
        }
        self.ids[(y * self.width + x) as usize]
    }

    fn set(&mut self, x: i32, y: i32, id: NodeId) {
        self.ids[(y * self.width + x) as usize] = id;
    }
}

/// Build the annotated ground graph for a terrain grid: one node per
/// non-obstacle tile, edges between all 4- and 8-neighbours (including across
/// terrain boundaries), per-subset clearance on every node and per-capability
/// clearance on every edge.
pub fn build_ground_graph(
    grid: &TerrainGrid,
    subsets: &[Terrain],
) -> (Graph, NodeLookup, AnnotateStats) {
    let mut graph = Graph::new();
    let mut lookup = NodeLookup::new(grid.width(), grid.height());
    let mut stats = AnnotateStats::default();

    // Nodes in row-major order so ids are reproducible across builds.
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(terrain) = grid.terrain_at(x, y) {
                let id = graph.add_node(x, y, terrain, 0);
                lookup.set(x, y, id);
                stats.nodes_created += 1;
            }
        }
    }

    annotate_clearance(&mut graph, &lookup, grid, subsets);

    // Edges to the four already-visited neighbours cover all eight directions
    // exactly once. Terrain boundaries do not block an edge; admissibility is
    // decided per capability below.
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let id = lookup.get(x, y);
            if id == NodeId::NONE {
                continue;
            }
            let earlier = [(x - 1, y, 1.0), (x, y - 1, 1.0), (x - 1, y - 1, SQRT_2), (x + 1, y - 1, SQRT_2)];
            for (nx, ny, weight) in earlier {
                let nid = lookup.get(nx, ny);
                if nid == NodeId::NONE {
                    continue;
                }
                let eid = graph.add_edge(id, nid, weight);
                annotate_edge(&mut graph, &lookup, eid, subsets);
                stats.edges_created += 1;
            }
        }
    }

    info!(
        "ground graph: {} nodes, {} edges, {} subsets",
        stats.nodes_created,
        stats.edges_created,
        subsets.len()
    );
    (graph, lookup, stats)
}

/// Bottom-up clearance sweep. The clearance of a tile under subset `s` is the
/// side of the largest square anchored at the tile whose every member tile
/// has terrain within `s`; the bottom-right corner of the grid is the
/// recursive base.
fn annotate_clearance(graph: &mut Graph, lookup: &NodeLookup, grid: &TerrainGrid, subsets: &[Terrain]) {
    for x in (0..grid.width()).rev() {
        for y in (0..grid.height()).rev() {
            let id = lookup.get(x, y);
            if id == NodeId::NONE {
                continue;
            }
            let adj = [lookup.get(x + 1, y + 1), lookup.get(x + 1, y), lookup.get(x, y + 1)];
            for &s in subsets {
                let terrain = graph.node(id).map(|n| n.terrain).unwrap_or(Terrain(0));
                let value = if !terrain.is_subset_of(s) {
                    0
                } else if adj.iter().any(|&a| a == NodeId::NONE) {
                    // border or perimeter tile
                    1
                } else {
                    let min = adj
                        .iter()
                        .map(|&a| graph.node(a).map(|n| n.clearance(s)).unwrap_or(0))
                        .min()
                        .unwrap_or(0);
                    min + 1
                };
                if let Some(n) = graph.node_mut(id) {
                    n.set_clearance(s, value);
                }
            }
        }
    }
}

/// Derive per-capability edge clearance from endpoint clearances. A diagonal
/// edge additionally requires both flanking cardinal tiles to admit the
/// capability, so agents never cut a corner across forbidden terrain.
fn annotate_edge(graph: &mut Graph, lookup: &NodeLookup, eid: EdgeId, subsets: &[Terrain]) {
    let (from, to) = {
        let e = graph.edge(eid).expect("edge just added");
        (e.from, e.to)
    };
    let (ax, ay, bx, by) = {
        let a = graph.node(from).expect("endpoint exists");
        let b = graph.node(to).expect("endpoint exists");
        (a.x, a.y, b.x, b.y)
    };
    let diagonal = ax != bx && ay != by;

    for &c in subsets {
        if diagonal {
            let flank1 = lookup.get(ax, by);
            let flank2 = lookup.get(bx, ay);
            let admits = |id: NodeId| {
                graph.node(id).map(|n| n.terrain.is_subset_of(c)).unwrap_or(false)
            };
            if !admits(flank1) || !admits(flank2) {
                continue;
            }
        }
        let value = graph
            .node(from)
            .map(|n| n.clearance(c))
            .unwrap_or(0)
            .min(graph.node(to).map(|n| n.clearance(c)).unwrap_or(0));
        if value > 0 {
            if let Some(e) = graph.edge_mut(eid) {
                e.set_clearance(c, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{capabilities, GROUND, NUM_BASIC_CLASSES, TREES};

    fn build(rows: &[&str]) -> (Graph, NodeLookup) {
        let grid = TerrainGrid::from_rows(rows).unwrap();
        let (g, l, _) = build_ground_graph(&grid, &capabilities(NUM_BASIC_CLASSES));
        (g, l)
    }

    #[test]
    fn clearance_is_zero_iff_terrain_outside_subset() {
        let (g, l) = build(&["..", ".T"]);
        let trees = g.node(l.get(1, 1)).unwrap();
        assert_eq!(trees.clearance(GROUND), 0);
        assert!(trees.clearance(TREES) >= 1);
        assert!(trees.clearance(GROUND | TREES) >= 1);

        let ground = g.node(l.get(0, 0)).unwrap();
        assert_eq!(ground.clearance(TREES), 0);
        assert!(ground.clearance(GROUND) >= 1);
    }

    #[test]
    fn clearance_recursion_matches_largest_admissible_square() {
        // 4x4 all ground: top-left tile anchors the full square.
        let (g, l) = build(&["....", "....", "....", "...."]);
        assert_eq!(g.node(l.get(0, 0)).unwrap().clearance(GROUND), 4);
        assert_eq!(g.node(l.get(2, 2)).unwrap().clearance(GROUND), 2);
        // bottom/right boundary is always 1 where applicable
        assert_eq!(g.node(l.get(3, 1)).unwrap().clearance(GROUND), 1);
        assert_eq!(g.node(l.get(1, 3)).unwrap().clearance(GROUND), 1);
    }

    #[test]
    fn obstacle_caps_clearance_like_a_border() {
        let (g, l) = build(&["...", ".@.", "..."]);
        // successor (1,1) missing: clearance falls back to 1
        assert_eq!(g.node(l.get(0, 0)).unwrap().clearance(GROUND), 1);
        assert_eq!(g.node(l.get(2, 0)).unwrap().clearance(GROUND), 1);
    }

    #[test]
    fn mixed_terrain_raises_combined_subset_clearance() {
        let (g, l) = build(&["T.", ".."]);
        let n = g.node(l.get(0, 0)).unwrap();
        assert_eq!(n.clearance(GROUND), 0);
        assert_eq!(n.clearance(TREES), 1);
        assert_eq!(n.clearance(GROUND | TREES), 2);
    }

    #[test]
    fn edges_cross_terrain_boundaries_with_capability_clearance() {
        let (g, l) = build(&["T."]);
        let a = l.get(0, 0);
        let b = l.get(1, 0);
        let eid = g.find_edge(a, b).expect("boundary edge exists");
        let e = g.edge(eid).unwrap();
        assert_eq!(e.clearance(GROUND), 0);
        assert_eq!(e.clearance(TREES), 0);
        assert!(e.clearance(GROUND | TREES) >= 1);
    }

    #[test]
    fn diagonal_edges_respect_corner_cutting() {
        // Diagonal from (0,0) to (1,1) flanked by a tree at (1,0): no Ground
        // passage, but a Ground|Trees agent may cross.
        let (g, l) = build(&[".T", ".."]);
        let a = l.get(0, 0);
        let b = l.get(1, 1);
        let eid = g.find_edge(a, b).expect("diagonal edge exists");
        let e = g.edge(eid).unwrap();
        assert_eq!(e.clearance(GROUND), 0);
        assert!(e.clearance(GROUND | TREES) >= 1);

        let c = l.get(0, 1);
        let d = l.get(1, 0);
        let eid2 = g.find_edge(c, d).expect("other diagonal exists");
        assert_eq!(g.edge(eid2).unwrap().clearance(GROUND), 0);
    }

    #[test]
    fn eight_neighbour_edge_count() {
        // 2x2 open block: 4 cardinal + 2 diagonal edges.
        let (g, _) = build(&["..", ".."]);
        assert_eq!(g.num_edges(), 6);
    }
}
