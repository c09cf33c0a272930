//! Configuration models and loaders for swingby missions.
//!
//! Files are parsed into plain serde records here; conversion into typed
//! domain values (and the associated validation) happens in the mission crate.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use swingby_core::constants::GRAVITATIONAL_CONSTANT_KM3_KG_S2;
use thiserror::Error;

/// Gravitational parameters and radii for one body of the constants table.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    /// GM in km³/s². Takes precedence over `mass_kg`.
    #[serde(default)]
    pub mu_km3_s2: Option<f64>,
    #[serde(default)]
    pub mass_kg: Option<f64>,
    pub radius_km: f64,
    /// Marks the body every other one orbits (exactly one per table).
    #[serde(default)]
    pub central: bool,
}

impl BodyConfig {
    fn with_mu(name: &str, mu_km3_s2: f64, radius_km: f64, central: bool) -> Self {
        Self {
            name: name.to_string(),
            mu_km3_s2: Some(mu_km3_s2),
            mass_kg: None,
            radius_km,
            central,
        }
    }

    /// GM for the body, derived from the mass when no GM is given.
    pub fn gravitational_parameter(&self) -> Option<f64> {
        self.mu_km3_s2
            .or_else(|| self.mass_kg.map(|m| m * GRAVITATIONAL_CONSTANT_KM3_KG_S2))
    }
}

/// Built-in constants table (Sun plus the nine classical planets).
pub fn builtin_bodies() -> Vec<BodyConfig> {
    vec![
        BodyConfig::with_mu("sun", 1.327_124_400_18e11, 696_000.0, true),
        BodyConfig::with_mu("mercury", 22_031.868_551, 2_439.7, false),
        BodyConfig::with_mu("venus", 324_858.592, 6_051.8, false),
        BodyConfig::with_mu("earth", 398_600.435_436_095_9, 6_371.0, false),
        BodyConfig::with_mu("mars", 42_828.375_214, 3_390.0, false),
        BodyConfig::with_mu("jupiter", 126_712_764.1, 69_911.0, false),
        BodyConfig::with_mu("saturn", 37_940_584.841_8, 58_232.0, false),
        BodyConfig::with_mu("uranus", 5_794_556.4, 25_362.0, false),
        BodyConfig::with_mu("neptune", 6_836_527.100_58, 24_622.0, false),
        BodyConfig::with_mu("pluto", 975.5, 1_185.0, false),
    ]
}

/// Mission description as written on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct MissionFile {
    #[serde(default = "default_mission_name")]
    pub name: String,
    /// Calendar start epoch, e.g. `2022-09-01`.
    pub start: String,
    /// Planets whose states are tracked in the integrated state vector.
    pub planets: Vec<String>,
    /// Body the distance series is measured against (defaults to Earth).
    #[serde(default)]
    pub distance_reference: Option<String>,
    /// Upper bound on the summed impulse magnitudes (km/s).
    #[serde(default)]
    pub delta_v_budget_km_s: Option<f64>,
    pub launch: LaunchFile,
    #[serde(default)]
    pub integrator: IntegratorFile,
    pub segments: Vec<SegmentFile>,
}

/// Launch geometry relative to the home body.
#[derive(Debug, Deserialize, Clone)]
pub struct LaunchFile {
    #[serde(default = "default_home")]
    pub home: String,
    pub v_inf_km_s: f64,
    #[serde(default)]
    pub direction: DirectionFile,
    #[serde(default)]
    pub offset_km: f64,
}

/// Launch direction: a named direction relative to the home body's
/// heliocentric motion, or an explicit vector in the simulation frame.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DirectionFile {
    Named(String),
    Vector([f64; 3]),
}

impl Default for DirectionFile {
    fn default() -> Self {
        DirectionFile::Named("retrograde".to_string())
    }
}

/// Integrator settings; every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IntegratorFile {
    pub method: String,
    pub rtol: f64,
    pub atol: f64,
    pub initial_step_s: f64,
    pub min_step_s: f64,
    pub max_step_s: f64,
    pub max_steps: usize,
    /// Output sampling interval; `0` samples every accepted step.
    pub sample_interval_days: f64,
    pub event_tolerance_s: f64,
}

impl Default for IntegratorFile {
    fn default() -> Self {
        Self {
            method: "dormand-prince45".to_string(),
            rtol: 1e-12,
            atol: 1e-12,
            initial_step_s: 60.0,
            min_step_s: 1e-6,
            max_step_s: 5.0 * 86_400.0,
            max_steps: 1_000_000,
            sample_interval_days: 1.0,
            event_tolerance_s: 1e-3,
        }
    }
}

/// One leg of the mission.
#[derive(Debug, Deserialize, Clone)]
pub struct SegmentFile {
    pub travel_days: f64,
    /// Impulse applied at the start of the segment (km/s).
    #[serde(default)]
    pub delta_v_km_s: [f64; 3],
    /// Overrides the active perturbers for this segment.
    #[serde(default)]
    pub planets: Option<Vec<String>>,
}

fn default_mission_name() -> String {
    "mission".to_string()
}

fn default_home() -> String {
    "earth".to_string()
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Load body records from a YAML list, a single TOML file, or a directory of TOML files.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    load_records(path)
}

/// Load a mission file (TOML by extension, YAML otherwise).
pub fn load_mission<P: AsRef<Path>>(path: P) -> Result<MissionFile, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    if is_toml(path) {
        parse_mission_toml(&contents)
    } else {
        parse_mission_yaml(&contents)
    }
}

pub fn parse_mission_toml(contents: &str) -> Result<MissionFile, ConfigError> {
    Ok(toml::from_str(contents)?)
}

pub fn parse_mission_yaml(contents: &str) -> Result<MissionFile, ConfigError> {
    Ok(serde_yaml::from_str(contents)?)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_defaults_fill_in() {
        let mission = parse_mission_toml(
            r#"
            start = "2022-09-01"
            planets = ["venus", "earth"]

            [launch]
            v_inf_km_s = 5.0

            [[segments]]
            travel_days = 73
            "#,
        )
        .expect("parse mission");
        assert_eq!(mission.name, "mission");
        assert_eq!(mission.launch.home, "earth");
        assert_eq!(mission.launch.direction, DirectionFile::default());
        assert_eq!(mission.integrator, IntegratorFile::default());
        assert_eq!(mission.segments[0].delta_v_km_s, [0.0; 3]);
        assert!(mission.segments[0].planets.is_none());
    }

    #[test]
    fn direction_accepts_vectors() {
        let mission = parse_mission_yaml(
            r#"
start: "2022-09-01"
planets: [earth]
launch:
  v_inf_km_s: 1.0
  direction: [0.0, 0.0, 1.0]
segments:
  - travel_days: 10
    delta_v_km_s: [0.0055, 0.0, 0.0]
    planets: [earth]
"#,
        )
        .expect("parse mission");
        assert_eq!(mission.launch.direction, DirectionFile::Vector([0.0, 0.0, 1.0]));
        assert_eq!(mission.segments[0].planets.as_deref(), Some(&["earth".to_string()][..]));
    }

    #[test]
    fn mass_fallback_for_gm() {
        let body = BodyConfig {
            name: "ceres".into(),
            mu_km3_s2: None,
            mass_kg: Some(9.38e20),
            radius_km: 470.0,
            central: false,
        };
        let mu = body.gravitational_parameter().expect("mu from mass");
        assert!((mu - 62.6).abs() < 0.1, "unexpected GM {mu}");
    }

    #[test]
    fn builtins_have_one_central_body() {
        let bodies = builtin_bodies();
        assert_eq!(bodies.iter().filter(|b| b.central).count(), 1);
        assert!(bodies.iter().all(|b| b.gravitational_parameter().is_some()));
    }

    #[test]
    fn directory_records_load_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("02_earth.toml"),
            "name = \"earth\"\nmu_km3_s2 = 398600.4354360959\nradius_km = 6371.0\n",
        )
        .expect("write earth");
        std::fs::write(
            dir.path().join("01_sun.toml"),
            "name = \"sun\"\nmu_km3_s2 = 1.32712440018e11\nradius_km = 696000.0\ncentral = true\n",
        )
        .expect("write sun");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

        let bodies = load_bodies(dir.path()).expect("load bodies");
        let names: Vec<&str> = bodies.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["sun", "earth"]);
        assert!(bodies[0].central);
    }
}
