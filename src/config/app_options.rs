// Application options - Explicit set of options the embedded app recognises
use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Options passed to the application server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOptions {
    /// State pruning policy
    pub pruning: PruningStrategy,

    /// Take a state snapshot every N blocks (0 = disabled)
    pub snapshot_interval: u64,
}

impl AppOptions {
    /// Options used by the test harness: never discard historical state
    pub fn testnode() -> Self {
        Self {
            pruning: PruningStrategy::Nothing,
            snapshot_interval: 0,
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            pruning: PruningStrategy::Default,
            snapshot_interval: 0,
        }
    }
}

/// Which committed state versions the application keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruningStrategy {
    /// Keep the last 362880 versions, pruning every 10 blocks
    Default,
    /// Keep every version
    Nothing,
    /// Keep only the 2 most recent versions, pruning every 10 blocks
    Everything,
    /// Keep `keep_recent` versions, pruning every `interval` blocks
    Custom { keep_recent: u64, interval: u64 },
}

impl PruningStrategy {
    /// `(keep_recent, interval)`, or `None` when nothing is ever pruned
    pub fn schedule(&self) -> Option<(u64, u64)> {
        match *self {
            PruningStrategy::Default => Some((362_880, 10)),
            PruningStrategy::Nothing => None,
            PruningStrategy::Everything => Some((2, 10)),
            PruningStrategy::Custom {
                keep_recent,
                interval,
            } => Some((keep_recent, interval.max(1))),
        }
    }

    /// Version that may be deleted after committing `height`, if any
    pub fn prune_target(&self, height: u64) -> Option<u64> {
        let (keep_recent, interval) = self.schedule()?;
        if height % interval != 0 || height <= keep_recent {
            return None;
        }
        Some(height - keep_recent)
    }
}

impl FromStr for PruningStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(PruningStrategy::Default),
            "nothing" => Ok(PruningStrategy::Nothing),
            "everything" => Ok(PruningStrategy::Everything),
            other => {
                // "custom:<keep_recent>:<interval>"
                let parts: Vec<&str> = other.split(':').collect();
                match parts.as_slice() {
                    ["custom", keep, interval] => {
                        let keep_recent = keep
                            .parse::<u64>()
                            .map_err(|_| ConfigError::InvalidPruningStrategy(s.to_string()))?;
                        let interval = interval
                            .parse::<u64>()
                            .map_err(|_| ConfigError::InvalidPruningStrategy(s.to_string()))?;
                        Ok(PruningStrategy::Custom {
                            keep_recent,
                            interval,
                        })
                    }
                    _ => Err(ConfigError::InvalidPruningStrategy(s.to_string())),
                }
            }
        }
    }
}
