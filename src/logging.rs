use env_logger::Env;

use crate::config::EngineConfig;

/// Initialise the process-wide logger from the engine configuration: the
/// config's `log_level` (or "info") becomes the default filter, with the
/// usual `RUST_LOG` override on top. Repeated calls are no-ops, so embedding
/// applications that already installed a logger keep theirs.
pub fn init(cfg: &EngineConfig) {
    let default = cfg.log_level.as_deref().unwrap_or("info");
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default));
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let cfg = EngineConfig { log_level: Some("debug".into()), ..EngineConfig::default() };
        init(&cfg);
        // a second init must not panic even though a logger is installed
        init(&EngineConfig::default());
        log::debug!("logger initialised");
    }
}
