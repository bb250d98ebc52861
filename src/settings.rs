//! Game tuning and configuration
//!
//! Every tunable of the simulation lives here. Settings load from a JSON file;
//! missing fields fall back to the defaults below.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::END_SCENE;
use crate::sim::collision::{Aabb, Boundary, BoundaryTags, MAX_BOUNDARIES};

/// Per-unit movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Distance covered by one DESCEND run
    pub descend_step: f32,
    /// Waypoints on the breakaway circle
    pub waypoint_count: usize,
    /// Radius of the breakaway circle
    pub breakaway_radius: f32,
    /// Straight-line speed once the breakaway circle is done
    pub breakaway_speed: f32,
    /// Fraction of a waypoint segment covered per tick
    pub interpolation_step: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            descend_step: 100.0,
            waypoint_count: 5,
            breakaway_radius: 300.0,
            breakaway_speed: 1000.0,
            interpolation_step: 1.0 / 30.0,
        }
    }
}

/// Prototype for projectiles fired by an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTemplate {
    pub speed: f32,
    pub radius: f32,
}

impl Default for ProjectileTemplate {
    fn default() -> Self {
        Self {
            speed: 3000.0,
            radius: 10.0,
        }
    }
}

/// Prototype configuration for a squad member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTemplate {
    /// Firing hazard per second since the last shot
    pub fire_rate: f32,
    /// Fire-rate multiplier applied when the unit breaks away
    pub breakaway_fire_boost: f32,
    /// Bounding radius, used for roster spacing and overlap tests
    pub bound_radius: f32,
    /// Seconds the destruction sequence plays before removal
    pub destroy_delay: f32,
    /// Projectile prototype (default projectile when absent)
    pub projectile: Option<ProjectileTemplate>,
    pub movement: MovementSettings,
}

impl Default for UnitTemplate {
    fn default() -> Self {
        Self {
            fire_rate: 0.001,
            breakaway_fire_boost: 100.0,
            bound_radius: 50.0,
            destroy_delay: 2.0,
            projectile: Some(ProjectileTemplate::default()),
            movement: MovementSettings::default(),
        }
    }
}

/// Squad layout and shared motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadSettings {
    /// Rows, stacked along the advance axis
    pub rows: usize,
    /// Columns, spread along the lateral axis
    pub cols: usize,
    /// Gap added between neighbouring bounding spheres
    pub extra_separation: f32,
    pub horizontal_speed: f32,
    pub vertical_speed: f32,
    /// Added to both speeds every time a squad is regenerated
    pub speed_increment: f32,
    /// Breakaway trigger hazard per second
    pub breakaway_rate: f32,
    /// Position of roster slot 0
    pub spawn_origin: Vec3,
    /// Unit prototype (default unit when absent)
    pub template: Option<UnitTemplate>,
}

impl Default for SquadSettings {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 11,
            extra_separation: 20.0,
            horizontal_speed: 300.0,
            vertical_speed: 300.0,
            speed_increment: 50.0,
            breakaway_rate: 0.05,
            spawn_origin: Vec3::new(2600.0, -1300.0, 0.0),
            template: Some(UnitTemplate::default()),
        }
    }
}

/// Player tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenderSettings {
    pub lives: u32,
    pub points_per_unit: u64,
    pub points_per_squad: u64,
    /// Lateral speed
    pub speed: f32,
    pub bound_radius: f32,
    /// Seconds the destruction sequence plays before respawn
    pub respawn_delay: f32,
    /// Minimum seconds between shots
    pub fire_cooldown: f32,
    pub start: Vec3,
    pub projectile: Option<ProjectileTemplate>,
}

impl Default for DefenderSettings {
    fn default() -> Self {
        Self {
            lives: 3,
            points_per_unit: 100,
            points_per_squad: 1000,
            speed: 1000.0,
            bound_radius: 50.0,
            respawn_delay: 3.0,
            fire_cooldown: 0.25,
            start: Vec3::ZERO,
            projectile: Some(ProjectileTemplate::default()),
        }
    }
}

/// Play area, boundary markers and match-end scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Anything leaving this box is culled
    pub play_area: Aabb,
    pub boundaries: Vec<Boundary>,
    pub tags: BoundaryTags,
    pub end_scene: String,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        let tags = BoundaryTags::default();
        let sink = tags.projectile_sink[0].clone();
        let boundaries = vec![
            Boundary::new(
                "left_wall",
                [tags.left[0].clone(), sink.clone()],
                Aabb::new(Vec3::new(-200.0, -1700.0, -100.0), Vec3::new(3400.0, -1500.0, 100.0)),
            ),
            Boundary::new(
                "right_wall",
                [tags.right[0].clone(), sink.clone()],
                Aabb::new(Vec3::new(-200.0, 1500.0, -100.0), Vec3::new(3400.0, 1700.0, 100.0)),
            ),
            Boundary::new(
                "defender_line",
                [tags.bottom[0].clone()],
                Aabb::new(Vec3::new(150.0, -1500.0, -100.0), Vec3::new(250.0, 1500.0, 100.0)),
            ),
            Boundary::new(
                "floor",
                [sink.clone()],
                Aabb::new(Vec3::new(-300.0, -1700.0, -100.0), Vec3::new(-200.0, 1700.0, 100.0)),
            ),
            Boundary::new(
                "ceiling",
                [sink],
                Aabb::new(Vec3::new(3400.0, -1700.0, -100.0), Vec3::new(3500.0, 1700.0, 100.0)),
            ),
        ];

        Self {
            play_area: Aabb::new(Vec3::new(-300.0, -1700.0, -500.0), Vec3::new(3500.0, 1700.0, 500.0)),
            boundaries,
            tags,
            end_scene: END_SCENE.to_string(),
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Match seed; every squad generation derives its RNG from it
    pub seed: u64,
    pub squad: SquadSettings,
    pub defender: DefenderSettings,
    pub arena: ArenaSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            squad: SquadSettings::default(),
            defender: DefenderSettings::default(),
            arena: ArenaSettings::default(),
        }
    }
}

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Settings {
    /// Parse and validate settings from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load settings from `path` if given, falling back to defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };

        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Reject configurations the simulation cannot run
    pub fn validate(&self) -> Result<(), SettingsError> {
        let squad = &self.squad;
        if squad.rows == 0 || squad.cols == 0 {
            return Err(SettingsError::Invalid(format!(
                "squad must have at least one unit (rows={}, cols={})",
                squad.rows, squad.cols
            )));
        }
        if squad.speed_increment < 0.0 {
            return Err(SettingsError::Invalid(
                "speed_increment must not be negative".to_string(),
            ));
        }
        if let Some(template) = &squad.template {
            let step = template.movement.interpolation_step;
            if !(step > 0.0 && step <= 1.0) {
                return Err(SettingsError::Invalid(format!(
                    "interpolation_step must be in (0, 1], got {step}"
                )));
            }
            if template.movement.descend_step <= 0.0 {
                return Err(SettingsError::Invalid(
                    "descend_step must be positive".to_string(),
                ));
            }
        }
        if self.arena.boundaries.len() > MAX_BOUNDARIES {
            return Err(SettingsError::Invalid(format!(
                "at most {MAX_BOUNDARIES} arena boundaries are supported, got {}",
                self.arena.boundaries.len()
            )));
        }
        if self.defender.lives == 0 {
            return Err(SettingsError::Invalid(
                "defender needs at least one life".to_string(),
            ));
        }
        Ok(())
    }
}
