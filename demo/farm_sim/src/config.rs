// Farm simulator configuration

/// High-level configuration for the demo producer and pipeline wiring.
/// Library components load their own env-driven configs; only demo
/// concerns live here.
#[derive(Clone, Debug)]
pub struct FarmSimConfig {
    /// Synthetic farms to rotate through (`FARM_1..=FARM_{n}`)
    pub farm_count: u32,
    /// Seconds between synthetic readings
    pub send_interval_secs: u64,
    /// RocksDB path for the insight store; in-memory when unset
    pub store_path: Option<String>,
}

impl FarmSimConfig {
    pub fn load() -> Self {
        Self {
            farm_count: std::env::var("FARM_SIM_FARMS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(3),
            send_interval_secs: std::env::var("FARM_SIM_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10),
            store_path: std::env::var("FARM_SIM_STORE_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}
