//! Environment-driven configuration.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::Revision;
use crate::engine::reducer::ReducerConfig;
use crate::terminal::ClockZone;

#[derive(Debug, Clone)]
pub struct Config {
    pub revision: Revision,
    /// Fixed RNG seed; fresh entropy when unset
    pub seed: Option<u64>,
    pub reducer: ReducerConfig,
    /// Where terminal journals go; no journal when unset
    pub journal_dir: Option<PathBuf>,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = ReducerConfig::default();
        Self {
            revision: Revision::from_env(),
            seed: std::env::var("SEED").ok().and_then(|v| v.parse().ok()),
            reducer: ReducerConfig {
                generate_ms: env_u64("GENERATE_MS", defaults.generate_ms),
                simulate_ms: env_u64("SIMULATE_MS", defaults.simulate_ms),
                evolve_ms: env_u64("EVOLVE_MS", defaults.evolve_ms),
                deploy_ms: env_u64("DEPLOY_MS", defaults.deploy_ms),
                chatter_interval_ms: env_u64("CHATTER_MS", defaults.chatter_interval_ms),
                clock: ClockZone::from_env(),
            },
            journal_dir: std::env::var("JOURNAL_DIR").ok().map(PathBuf::from),
        }
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
