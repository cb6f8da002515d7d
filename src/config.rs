use configparser::ini::Ini;
use log::{info, warn};
use std::fs;
use std::path::Path;

// Gameplay Constants
pub const LANE_COUNT: usize = 5;
pub const FALL_SPEED_PER_TICK: f32 = 0.05;
pub const HIT_WINDOW_LOW: f32 = 0.85; // exclusive
pub const MISS_BOUNDARY: f32 = 1.0; // inclusive upper bound of the hit window
pub const HIT_REWARD: u32 = 10;
pub const HIGH_SCORE_LIMIT: usize = 10;

// Timing
pub const MS_PER_MINUTE: u64 = 60_000;

// Save Paths
pub const CONFIG_INI_PATH: &str = "save/starbeat.ini";
pub const SCORES_JSON_PATH: &str = "save/scores.json";

const GAMEPLAY_SECTION: &str = "Gameplay";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub lanes: usize,
    pub fall_speed_per_tick: f32,
    pub hit_reward: u32,
    /// Fixed seed for lane selection. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lanes: LANE_COUNT,
            fall_speed_per_tick: FALL_SPEED_PER_TICK,
            hit_reward: HIT_REWARD,
            rng_seed: None,
        }
    }
}

fn write_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Config file not found, creating defaults at '{}'.", path.display());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let defaults = EngineConfig::default();
    let mut conf = Ini::new();
    conf.set(GAMEPLAY_SECTION, "Lanes", Some(defaults.lanes.to_string()));
    conf.set(GAMEPLAY_SECTION, "FallSpeedPerTick", Some(defaults.fall_speed_per_tick.to_string()));
    conf.set(GAMEPLAY_SECTION, "HitReward", Some(defaults.hit_reward.to_string()));
    conf.set(GAMEPLAY_SECTION, "RngSeed", Some(String::new()));
    conf.write(path)
}

/// Parses an INI document into a config, falling back to defaults per key.
pub fn parse(conf: &Ini) -> EngineConfig {
    let defaults = EngineConfig::default();

    let lanes = match conf.get(GAMEPLAY_SECTION, "Lanes").map(|v| v.trim().parse::<usize>()) {
        Some(Ok(n)) if n > 0 => n,
        None => defaults.lanes,
        Some(_) => {
            warn!("Invalid Lanes value in config, using {}.", defaults.lanes);
            defaults.lanes
        }
    };

    let fall_speed_per_tick = match conf
        .get(GAMEPLAY_SECTION, "FallSpeedPerTick")
        .map(|v| v.trim().parse::<f32>())
    {
        Some(Ok(speed)) if speed.is_finite() && speed > 0.0 && speed <= MISS_BOUNDARY => speed,
        None => defaults.fall_speed_per_tick,
        Some(_) => {
            warn!("Invalid FallSpeedPerTick value in config, using {}.", defaults.fall_speed_per_tick);
            defaults.fall_speed_per_tick
        }
    };

    let hit_reward = match conf.get(GAMEPLAY_SECTION, "HitReward").map(|v| v.trim().parse::<u32>()) {
        Some(Ok(points)) if points > 0 => points,
        None => defaults.hit_reward,
        Some(_) => {
            warn!("Invalid HitReward value in config, using {}.", defaults.hit_reward);
            defaults.hit_reward
        }
    };

    // An empty RngSeed means "seed from the OS".
    let rng_seed = conf
        .get(GAMEPLAY_SECTION, "RngSeed")
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| match v.trim().parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!("Invalid RngSeed '{}' in config, ignoring.", v);
                None
            }
        });

    EngineConfig { lanes, fall_speed_per_tick, hit_reward, rng_seed }
}

/// Loads the config at `path`, creating a default file if missing.
pub fn load(path: &Path) -> EngineConfig {
    if !path.exists() {
        if let Err(e) = write_default_file(path) {
            warn!("Failed to create default config file: {}", e);
        }
    }

    let mut conf = Ini::new();
    match conf.load(path) {
        Ok(_) => parse(&conf),
        Err(e) => {
            warn!("Failed to load '{}', using defaults: {}", path.display(), e);
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini_from(text: &str) -> Ini {
        let mut conf = Ini::new();
        conf.read(text.to_string()).unwrap();
        conf
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        assert_eq!(parse(&Ini::new()), EngineConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let conf = ini_from(
            "[Gameplay]\nLanes=4\nFallSpeedPerTick=0.1\nHitReward=25\nRngSeed=42\n",
        );
        let cfg = parse(&conf);
        assert_eq!(cfg.lanes, 4);
        assert_eq!(cfg.fall_speed_per_tick, 0.1);
        assert_eq!(cfg.hit_reward, 25);
        assert_eq!(cfg.rng_seed, Some(42));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let conf = ini_from("[Gameplay]\nLanes=0\nFallSpeedPerTick=-3\nHitReward=lots\nRngSeed=abc\n");
        let cfg = parse(&conf);
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_load_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("starbeat.ini");
        let cfg = load(&path);
        assert!(path.exists());
        assert_eq!(cfg, EngineConfig::default());
        // Second load reads the file just written.
        assert_eq!(load(&path), cfg);
    }
}
