use std::env;

/// Controls how many transitions each entrance contributes to the abstract
/// graph. High and Medium place a transition at each end of a wide entrance;
/// Low always uses a single midpoint transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Default for Quality {
    fn default() -> Self {
        Quality::High
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub cluster_size: i32,
    pub quality: Quality,
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { cluster_size: 10, quality: Quality::High, log_level: None }
    }
}

impl EngineConfig {
    /// Overlay from environment (env > caller when set).
    pub fn from_env_defaults() -> Self {
        let mut cfg = Self::default();
        if let Some(s) = env::var("TILEPATH_CLUSTER_SIZE").ok().and_then(|s| parse_cluster_size(&s)) {
            cfg.cluster_size = s;
        }
        if let Some(q) = env::var("TILEPATH_QUALITY").ok().and_then(|s| parse_quality(&s)) {
            cfg.quality = q;
        }
        cfg.log_level = env::var("TILEPATH_LOG_LEVEL").ok();
        cfg
    }
}

fn parse_cluster_size(input: &str) -> Option<i32> {
    let v = input.trim().parse::<i32>().ok()?;
    if v >= 1 { Some(v) } else { None }
}

fn parse_quality(input: &str) -> Option<Quality> {
    match input.trim().to_ascii_lowercase().as_str() {
        "high" => Some(Quality::High),
        "medium" => Some(Quality::Medium),
        "low" => Some(Quality::Low),
        _ => None,
    }
}
