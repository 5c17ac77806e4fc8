//! Annotated hierarchical pathfinding over tile grids.
//!
//! The engine precomputes a two-level abstraction of a terrain grid — a
//! ground graph annotated with per-capability clearance values, plus a
//! cluster graph of inter-cluster transitions with cached low-level paths —
//! and answers shortest-path queries for agents with a size (required
//! clearance) and a capability (set of passable terrain types).

pub mod annotate;
pub mod cluster_builder;
pub mod config;
pub mod engine;
pub mod entrance_discovery;
pub mod error;
pub mod graph;
pub mod intra_connector;
pub mod logging;
pub mod path_cache;
pub mod search;
pub mod terrain;

pub use cluster_builder::{Cluster, ClusterFactory, RectClusterFactory};
pub use config::{EngineConfig, Quality};
pub use engine::AbstractionEngine;
pub use error::{Error, Result};
pub use graph::{ClusterId, Edge, EdgeId, Graph, Node, NodeId, Path};
pub use path_cache::PathCache;
pub use search::{AnnotatedAStar, Corridor, SearchStats};
pub use terrain::{Terrain, TerrainGrid, GROUND, TREES};
