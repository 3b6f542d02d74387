//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Smallest and largest allowed world side lengths.
pub const MIN_WORLD_SIZE: f32 = 1_000.0;
pub const MAX_WORLD_SIZE: f32 = 10_000.0;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub power_up: PowerUpConfig,
    #[serde(default)]
    pub obstacle: ObstacleConfig,
    #[serde(default)]
    pub combo: ComboConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.clamp();
        Ok(config)
    }

    /// Clamp values to their supported ranges.
    pub fn clamp(&mut self) {
        let requested = self.world.size;
        self.world.size = requested.clamp(MIN_WORLD_SIZE, MAX_WORLD_SIZE);
        if self.world.size != requested {
            warn!(
                requested,
                clamped = self.world.size,
                "World size out of range, clamping"
            );
        }
        if self.server.tick_rate == 0 {
            self.server.tick_rate = default_tick_rate();
        }
        self.food.spawn_batch_limit = self.food.spawn_batch_limit.clamp(1, 5);
    }

    /// Tick interval derived from the configured rate.
    pub fn tick_interval_ms(&self) -> u64 {
        1_000 / self.server.tick_rate as u64
    }
}

/// Networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// WebSocket port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Ops HTTP port (metrics/health).
    #[serde(default = "default_ops_port")]
    pub ops_port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Server name shown to clients.
    #[serde(default = "default_name")]
    pub name: String,
    /// Simulation rate in Hz.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            ops_port: default_ops_port(),
            bind: default_bind(),
            name: default_name(),
            tick_rate: default_tick_rate(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
        }
    }
}

fn default_port() -> u16 {
    9002
}
fn default_ops_port() -> u16 {
    9090
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_name() -> String {
    "Blob Arena".to_string()
}
fn default_tick_rate() -> u32 {
    60
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    10
}

/// World settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Square world side length, clamped to [1000, 10000].
    #[serde(default = "default_world_size")]
    pub size: f32,
    /// Room id this instance hosts.
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// AI backfill keeps at least this many players in the world.
    #[serde(default = "default_min_players")]
    pub min_players: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: default_world_size(),
            room: default_room(),
            max_players: default_max_players(),
            min_players: default_min_players(),
        }
    }
}

fn default_world_size() -> f32 {
    4_000.0
}
fn default_room() -> String {
    "arena".to_string()
}
fn default_max_players() -> usize {
    64
}
fn default_min_players() -> usize {
    4
}

/// Player blob settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_start_mass")]
    pub start_mass: f32,
    /// Floor below which a blob cannot be reduced by damage.
    #[serde(default = "default_min_mass")]
    pub min_mass: f32,
    /// Minimum mass required to split.
    #[serde(default = "default_min_split_mass")]
    pub min_split_mass: f32,
    /// Minimum mass required to eject.
    #[serde(default = "default_min_eject_mass")]
    pub min_eject_mass: f32,
    /// Mass lost per ejection.
    #[serde(default = "default_eject_mass_cost")]
    pub eject_mass_cost: f32,
    /// Maximum blobs a single player can split into.
    #[serde(default = "default_max_blobs")]
    pub max_blobs: usize,
    /// Base movement speed in units per second.
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_split_cooldown_ms")]
    pub split_cooldown_ms: u64,
    #[serde(default = "default_eject_cooldown_ms")]
    pub eject_cooldown_ms: u64,
    /// Collision immunity window for freshly created blobs.
    #[serde(default = "default_spawn_grace_ms")]
    pub spawn_grace_ms: u64,
    /// Impulse applied when two blobs bounce instead of consuming.
    #[serde(default = "default_bounce_force")]
    pub bounce_force: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_mass: default_start_mass(),
            min_mass: default_min_mass(),
            min_split_mass: default_min_split_mass(),
            min_eject_mass: default_min_eject_mass(),
            eject_mass_cost: default_eject_mass_cost(),
            max_blobs: default_max_blobs(),
            base_speed: default_base_speed(),
            split_cooldown_ms: default_split_cooldown_ms(),
            eject_cooldown_ms: default_eject_cooldown_ms(),
            spawn_grace_ms: default_spawn_grace_ms(),
            bounce_force: default_bounce_force(),
        }
    }
}

fn default_start_mass() -> f32 {
    10.0
}
fn default_min_mass() -> f32 {
    5.0
}
fn default_min_split_mass() -> f32 {
    20.0
}
fn default_min_eject_mass() -> f32 {
    10.0
}
fn default_eject_mass_cost() -> f32 {
    2.0
}
fn default_max_blobs() -> usize {
    8
}
fn default_base_speed() -> f32 {
    200.0
}
fn default_split_cooldown_ms() -> u64 {
    1_000
}
fn default_eject_cooldown_ms() -> u64 {
    500
}
fn default_spawn_grace_ms() -> u64 {
    2_000
}
fn default_bounce_force() -> f32 {
    300.0
}

/// Food settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Target food per player.
    #[serde(default = "default_min_per_player")]
    pub min_per_player: usize,
    /// Global cap.
    #[serde(default = "default_max_total_food")]
    pub max_total: usize,
    /// Cooldown window between spawn batches.
    #[serde(default = "default_food_spawn_interval_ms")]
    pub spawn_interval_ms: u64,
    /// New items per batch, at most 5.
    #[serde(default = "default_spawn_batch_limit")]
    pub spawn_batch_limit: usize,
    /// Ejected mass decays after this long.
    #[serde(default = "default_ejected_decay_ms")]
    pub ejected_decay_ms: u64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            min_per_player: default_min_per_player(),
            max_total: default_max_total_food(),
            spawn_interval_ms: default_food_spawn_interval_ms(),
            spawn_batch_limit: default_spawn_batch_limit(),
            ejected_decay_ms: default_ejected_decay_ms(),
        }
    }
}

fn default_min_per_player() -> usize {
    10
}
fn default_max_total_food() -> usize {
    300
}
fn default_food_spawn_interval_ms() -> u64 {
    500
}
fn default_spawn_batch_limit() -> usize {
    5
}
fn default_ejected_decay_ms() -> u64 {
    30_000
}

/// Power-up settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerUpConfig {
    #[serde(default = "default_power_up_spawn_interval_ms")]
    pub spawn_interval_ms: u64,
    #[serde(default = "default_max_total_power_ups")]
    pub max_total: usize,
    /// Despawn policy: 0 means power-ups persist until collected.
    #[serde(default)]
    pub lifetime_ms: u64,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: default_power_up_spawn_interval_ms(),
            max_total: default_max_total_power_ups(),
            lifetime_ms: 0,
        }
    }
}

fn default_power_up_spawn_interval_ms() -> u64 {
    10_000
}
fn default_max_total_power_ups() -> usize {
    20
}

/// Obstacle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    /// Procedural density: obstacles per 1000 world units of side length.
    #[serde(default = "default_obstacles_per_1000")]
    pub per_1000_units: usize,
    #[serde(default = "default_breakable_health")]
    pub breakable_health: f32,
    #[serde(default = "default_spike_damage")]
    pub spike_damage: f32,
    #[serde(default = "default_obstacle_bounce_force")]
    pub bounce_force: f32,
    #[serde(default = "default_slime_slow_factor")]
    pub slime_slow_factor: f32,
    #[serde(default = "default_slime_slow_ms")]
    pub slime_slow_ms: u64,
    #[serde(default = "default_teleporter_cooldown_ms")]
    pub teleporter_cooldown_ms: u64,
    /// Minimum distance between linked teleporters.
    #[serde(default = "default_teleporter_min_separation")]
    pub teleporter_min_separation: f32,
    /// Declarative map layout; empty means procedural generation.
    #[serde(default)]
    pub template: Vec<ObstacleSpec>,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            per_1000_units: default_obstacles_per_1000(),
            breakable_health: default_breakable_health(),
            spike_damage: default_spike_damage(),
            bounce_force: default_obstacle_bounce_force(),
            slime_slow_factor: default_slime_slow_factor(),
            slime_slow_ms: default_slime_slow_ms(),
            teleporter_cooldown_ms: default_teleporter_cooldown_ms(),
            teleporter_min_separation: default_teleporter_min_separation(),
            template: Vec::new(),
        }
    }
}

/// One declarative obstacle entry. The kind is validated at generation time
/// and unknown names fail fast.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleSpec {
    pub kind: String,
    pub x: f32,
    pub y: f32,
    /// Explicit id, required when other entries link to this one.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub rotation: Option<f32>,
    /// Id of the linked teleporter, when pairing explicitly.
    #[serde(default)]
    pub link: Option<String>,
}

fn default_obstacles_per_1000() -> usize {
    4
}
fn default_breakable_health() -> f32 {
    100.0
}
fn default_spike_damage() -> f32 {
    10.0
}
fn default_obstacle_bounce_force() -> f32 {
    300.0
}
fn default_slime_slow_factor() -> f32 {
    0.5
}
fn default_slime_slow_ms() -> u64 {
    3_000
}
fn default_teleporter_cooldown_ms() -> u64 {
    5_000
}
fn default_teleporter_min_separation() -> f32 {
    500.0
}

/// Consumption combo settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComboConfig {
    /// Streak window; a consumption later than this resets the streak.
    #[serde(default = "default_combo_window_ms")]
    pub window_ms: u64,
    /// Bonus multiplier cap.
    #[serde(default = "default_combo_max_multiplier")]
    pub max_multiplier: u32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            window_ms: default_combo_window_ms(),
            max_multiplier: default_combo_max_multiplier(),
        }
    }
}

fn default_combo_window_ms() -> u64 {
    4_000
}
fn default_combo_max_multiplier() -> u32 {
    5
}

/// AI backfill settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// How often a wandering bot picks a new direction.
    #[serde(default = "default_wander_interval_ms")]
    pub wander_interval_ms: u64,
    /// Food chase radius.
    #[serde(default = "default_chase_range")]
    pub chase_range: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            wander_interval_ms: default_wander_interval_ms(),
            chase_range: default_chase_range(),
        }
    }
}

fn default_wander_interval_ms() -> u64 {
    2_000
}
fn default_chase_range() -> f32 {
    600.0
}
