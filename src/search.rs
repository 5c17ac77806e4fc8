use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use log::trace;
use ordered_float::OrderedFloat;

use crate::graph::{Graph, NodeId, Path, SQRT_2};
use crate::terrain::Terrain;

/// Per-query search effort counters. Monotone while a query runs; reset at
/// the start of every `find_path` call.
#[derive(Clone, Debug, Default)]
pub struct SearchStats {
    pub nodes_expanded: usize,
    pub nodes_touched: usize,
    pub peak_memory: usize,
    pub search_time: Duration,
}

impl SearchStats {
    pub fn accumulate(&mut self, other: &SearchStats) {
        self.nodes_expanded += other.nodes_expanded;
        self.nodes_touched += other.nodes_touched;
        self.peak_memory = self.peak_memory.max(other.peak_memory);
        self.search_time += other.search_time;
    }
}

/// Inclusive tile rectangle a search may be restricted to. Builders and
/// endpoint insertion confine intra-cluster searches to the owning cluster.
#[derive(Copy, Clone, Debug)]
pub struct Corridor {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Corridor {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Copy, Clone, Debug)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    node: NodeId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.node == other.node
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // ties broken on node id for reproducible expansions
        self.f.cmp(&other.f).then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Octile distance: admissible on 8-connected grids with unit cardinal and
/// sqrt(2) diagonal steps.
pub fn octile(ax: i32, ay: i32, bx: i32, by: i32) -> f64 {
    let dx = (ax - bx).abs() as f64;
    let dy = (ay - by).abs() as f64;
    (dx + dy) + (SQRT_2 - 2.0) * dx.min(dy)
}

/// A* over an annotated graph, expanding only edges admissible under the
/// fixed `(capability, clearance)` pair.
#[derive(Clone, Debug)]
pub struct AnnotatedAStar {
    capability: Terrain,
    clearance: i32,
    corridor: Option<Corridor>,
    stats: SearchStats,
}

impl AnnotatedAStar {
    pub fn new(capability: Terrain, clearance: i32) -> Self {
        Self { capability, clearance, corridor: None, stats: SearchStats::default() }
    }

    pub fn with_corridor(capability: Terrain, clearance: i32, corridor: Corridor) -> Self {
        Self { capability, clearance, corridor: Some(corridor), stats: SearchStats::default() }
    }

    pub fn capability(&self) -> Terrain {
        self.capability
    }

    pub fn clearance(&self) -> i32 {
        self.clearance
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Shortest admissible path from `from` to `to`, or `None` when no such
    /// path exists. Never an error: callers treat failure as "unreachable".
    pub fn find_path(&mut self, graph: &Graph, from: NodeId, to: NodeId) -> Option<Path> {
        let started = Instant::now();
        self.stats = SearchStats::default();

        let (goal_x, goal_y) = {
            let n = graph.node(to)?;
            (n.x, n.y)
        };
        let start = graph.node(from)?;
        if let Some(c) = &self.corridor {
            if !c.contains(start.x, start.y) || !c.contains(goal_x, goal_y) {
                self.stats.search_time = started.elapsed();
                return None;
            }
        }
        if from == to {
            self.stats.search_time = started.elapsed();
            return Some(Path::new(vec![from]));
        }

        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<NodeId, f64> = HashMap::new();
        let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
        let mut closed: HashSet<NodeId> = HashSet::new();

        g_score.insert(from, 0.0);
        open.push(Reverse(OpenEntry {
            f: OrderedFloat(octile(start.x, start.y, goal_x, goal_y)),
            node: from,
        }));
        self.stats.nodes_touched += 1;

        let mut found = false;
        while let Some(Reverse(entry)) = open.pop() {
            let current = entry.node;
            if closed.contains(&current) {
                continue;
            }
            if current == to {
                found = true;
                break;
            }
            closed.insert(current);
            self.stats.nodes_expanded += 1;

            let current_g = g_score[&current];
            for &eid in graph.edges_of(current) {
                let edge = graph.edge(eid).expect("adjacency is consistent");
                if edge.clearance(self.capability) < self.clearance {
                    continue;
                }
                let neighbor = edge.other(current);
                if closed.contains(&neighbor) {
                    continue;
                }
                let n = graph.node(neighbor).expect("edge endpoints exist");
                if let Some(c) = &self.corridor {
                    if !c.contains(n.x, n.y) {
                        continue;
                    }
                }
                self.stats.nodes_touched += 1;
                let tentative = current_g + edge.weight;
                if tentative < *g_score.get(&neighbor).unwrap_or(&f64::INFINITY) {
                    g_score.insert(neighbor, tentative);
                    came_from.insert(neighbor, current);
                    open.push(Reverse(OpenEntry {
                        f: OrderedFloat(tentative + octile(n.x, n.y, goal_x, goal_y)),
                        node: neighbor,
                    }));
                }
            }
            self.stats.peak_memory = self.stats.peak_memory.max(open.len() + closed.len());
        }

        self.stats.search_time = started.elapsed();
        if !found {
            trace!(
                "no path {:?}->{:?} under capability {:#x} clearance {}",
                from,
                to,
                self.capability.0,
                self.clearance
            );
            return None;
        }

        let mut nodes = vec![to];
        let mut cur = to;
        while cur != from {
            cur = came_from[&cur];
            nodes.push(cur);
        }
        nodes.reverse();
        Some(Path::new(nodes))
    }
}
