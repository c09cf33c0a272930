//! Typed, validated mission plans.

use serde::Serialize;
use swingby_config::{DirectionFile, IntegratorFile, MissionFile};
use swingby_core::time::{Epoch, EpochParseError, days_to_seconds};
use swingby_core::vector::{self, Vector3};
use swingby_dynamics::{BodyTable, IntegratorOptions, Method, OptionsError, Sampling, StateLayout};
use swingby_ephem::{BodyId, BodyState};
use thiserror::Error;

/// Configuration errors, each naming the offending field.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("mission has no segments")]
    EmptySegments,
    #[error("segments[{segment}].travel_days must be positive (got {value})")]
    NonPositiveDuration { segment: usize, value: f64 },
    #[error("segments[{segment}].delta_v_km_s must be finite")]
    NonFiniteDeltaV { segment: usize },
    #[error("{field}: unsupported planet `{name}`")]
    UnsupportedPlanet { field: String, name: String },
    #[error("{field}: the central body cannot be listed as a planet")]
    CentralBodyAsPlanet { field: String },
    #[error("planets: `{name}` is listed more than once")]
    DuplicatePlanet { name: String },
    #[error("segments[{segment}].planets: `{name}` is not one of the mission's tracked planets")]
    PlanetNotTracked { segment: usize, name: String },
    #[error("{field}: {reason}")]
    InvalidLaunch { field: &'static str, reason: String },
    #[error(transparent)]
    InvalidIntegrator(#[from] OptionsError),
    #[error("start: {0}")]
    InvalidEpoch(#[from] EpochParseError),
    #[error("total delta-v {total_km_s:.4} km/s exceeds the budget of {budget_km_s:.4} km/s")]
    DeltaVBudgetExceeded { total_km_s: f64, budget_km_s: f64 },
}

/// Direction the spacecraft leaves the home body in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LaunchDirection {
    /// Along the home body's heliocentric velocity.
    Prograde,
    /// Against the home body's heliocentric velocity.
    Retrograde,
    /// Away from the Sun.
    Outward,
    /// Toward the Sun.
    Inward,
    /// Explicit simulation-frame vector (normalized on use).
    Fixed(Vector3),
}

impl LaunchDirection {
    /// Unit vector for the given home-body state, `None` when degenerate.
    pub fn resolve(&self, home: &BodyState) -> Option<Vector3> {
        match self {
            LaunchDirection::Prograde => vector::unit(&home.velocity_km_s),
            LaunchDirection::Retrograde => {
                vector::unit(&home.velocity_km_s).map(|u| vector::scale(&u, -1.0))
            }
            LaunchDirection::Outward => vector::unit(&home.position_km),
            LaunchDirection::Inward => {
                vector::unit(&home.position_km).map(|u| vector::scale(&u, -1.0))
            }
            LaunchDirection::Fixed(v) => vector::unit(v),
        }
    }

    fn parse(direction: &DirectionFile) -> Result<Self, PlanError> {
        match direction {
            DirectionFile::Vector(v) => Ok(LaunchDirection::Fixed(*v)),
            DirectionFile::Named(name) => match name.trim().to_ascii_lowercase().as_str() {
                "prograde" => Ok(LaunchDirection::Prograde),
                "retrograde" => Ok(LaunchDirection::Retrograde),
                "outward" | "radial-out" => Ok(LaunchDirection::Outward),
                "inward" | "radial-in" => Ok(LaunchDirection::Inward),
                other => Err(PlanError::InvalidLaunch {
                    field: "launch.direction",
                    reason: format!("unknown direction `{other}`"),
                }),
            },
        }
    }
}

/// Launch geometry relative to the home body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Launch {
    pub home: BodyId,
    /// Hyperbolic excess speed added along the launch direction.
    pub v_inf_km_s: f64,
    pub direction: LaunchDirection,
    /// Position offset from the home body's center along the launch direction.
    pub offset_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    pub duration_s: f64,
    /// Impulse applied to the spacecraft at the segment start.
    pub delta_v_km_s: Vector3,
    /// Active perturbers for this segment; `None` means every tracked planet.
    pub planets: Option<Vec<BodyId>>,
}

/// Everything needed to run a mission, in domain types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionPlan {
    pub name: String,
    pub start: Epoch,
    /// Planets carried in the state vector, in layout order.
    pub planets: Vec<BodyId>,
    pub distance_reference: BodyId,
    pub launch: Launch,
    pub segments: Vec<SegmentPlan>,
    pub integrator: IntegratorOptions,
    pub delta_v_budget_km_s: Option<f64>,
}

impl MissionPlan {
    /// Convert a parsed mission file. Structural checks run here; checks that
    /// need the body table run in [`validate`](Self::validate).
    pub fn from_file(file: &MissionFile) -> Result<Self, PlanError> {
        let start = Epoch::parse(&file.start)?;
        let planets = parse_planets("planets", &file.planets)?;
        for (i, body) in planets.iter().enumerate() {
            if planets[..i].contains(body) {
                return Err(PlanError::DuplicatePlanet {
                    name: body.name().to_string(),
                });
            }
        }
        let distance_reference = match &file.distance_reference {
            Some(name) => parse_body("distance_reference", name)?,
            None => BodyId::Earth,
        };
        let launch = Launch {
            home: parse_body("launch.home", &file.launch.home)?,
            v_inf_km_s: file.launch.v_inf_km_s,
            direction: LaunchDirection::parse(&file.launch.direction)?,
            offset_km: file.launch.offset_km,
        };
        let segments = file
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let planets = segment
                    .planets
                    .as_ref()
                    .map(|names| parse_planets(&format!("segments[{index}].planets"), names))
                    .transpose()?;
                Ok(SegmentPlan {
                    duration_s: days_to_seconds(segment.travel_days),
                    delta_v_km_s: segment.delta_v_km_s,
                    planets,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        let plan = MissionPlan {
            name: file.name.clone(),
            start,
            planets,
            distance_reference,
            launch,
            segments,
            integrator: integrator_options(&file.integrator)?,
            delta_v_budget_km_s: file.delta_v_budget_km_s,
        };
        plan.check_structure()?;
        Ok(plan)
    }

    /// Full validation against the constants table.
    pub fn validate(&self, bodies: &BodyTable) -> Result<(), PlanError> {
        self.check_structure()?;
        for body in &self.planets {
            if bodies.get(*body).is_none() {
                return Err(PlanError::UnsupportedPlanet {
                    field: "planets".to_string(),
                    name: body.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_structure(&self) -> Result<(), PlanError> {
        if self.segments.is_empty() {
            return Err(PlanError::EmptySegments);
        }
        if self.planets.contains(&BodyId::Sun) {
            return Err(PlanError::CentralBodyAsPlanet {
                field: "planets".to_string(),
            });
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if !(segment.duration_s > 0.0 && segment.duration_s.is_finite()) {
                return Err(PlanError::NonPositiveDuration {
                    segment: index,
                    value: segment.duration_s / 86_400.0,
                });
            }
            if !vector::is_finite(&segment.delta_v_km_s) {
                return Err(PlanError::NonFiniteDeltaV { segment: index });
            }
            if let Some(active) = &segment.planets {
                if let Some(missing) = active.iter().find(|b| !self.planets.contains(*b)) {
                    return Err(PlanError::PlanetNotTracked {
                        segment: index,
                        name: missing.name().to_string(),
                    });
                }
            }
        }
        if self.launch.home == BodyId::Sun {
            return Err(PlanError::InvalidLaunch {
                field: "launch.home",
                reason: "the spacecraft cannot launch from the central body".to_string(),
            });
        }
        if !(self.launch.v_inf_km_s >= 0.0 && self.launch.v_inf_km_s.is_finite()) {
            return Err(PlanError::InvalidLaunch {
                field: "launch.v_inf_km_s",
                reason: format!("must be non-negative (got {})", self.launch.v_inf_km_s),
            });
        }
        if !(self.launch.offset_km >= 0.0 && self.launch.offset_km.is_finite()) {
            return Err(PlanError::InvalidLaunch {
                field: "launch.offset_km",
                reason: format!("must be non-negative (got {})", self.launch.offset_km),
            });
        }
        if let LaunchDirection::Fixed(v) = self.launch.direction {
            if vector::unit(&v).is_none() {
                return Err(PlanError::InvalidLaunch {
                    field: "launch.direction",
                    reason: "direction vector must be non-zero and finite".to_string(),
                });
            }
        }
        self.integrator.validate()?;
        if let Some(budget_km_s) = self.delta_v_budget_km_s {
            let total_km_s = self.total_delta_v_km_s();
            if total_km_s > budget_km_s {
                return Err(PlanError::DeltaVBudgetExceeded {
                    total_km_s,
                    budget_km_s,
                });
            }
        }
        Ok(())
    }

    /// Sum of the impulse magnitudes over all segments.
    pub fn total_delta_v_km_s(&self) -> f64 {
        self.segments
            .iter()
            .map(|segment| vector::norm(&segment.delta_v_km_s))
            .sum()
    }

    pub fn total_duration_s(&self) -> f64 {
        self.segments.iter().map(|segment| segment.duration_s).sum()
    }

    /// Layout of the integrated state for this plan.
    pub fn layout(&self) -> Result<StateLayout, PlanError> {
        StateLayout::new(self.planets.clone()).map_err(|_| PlanError::DuplicatePlanet {
            name: self
                .planets
                .iter()
                .map(|b| b.name())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

fn parse_body(field: &str, name: &str) -> Result<BodyId, PlanError> {
    name.parse().map_err(|_| PlanError::UnsupportedPlanet {
        field: field.to_string(),
        name: name.to_string(),
    })
}

fn parse_planets(field: &str, names: &[String]) -> Result<Vec<BodyId>, PlanError> {
    names
        .iter()
        .map(|name| {
            let body = parse_body(field, name)?;
            if body == BodyId::Sun {
                return Err(PlanError::CentralBodyAsPlanet {
                    field: field.to_string(),
                });
            }
            Ok(body)
        })
        .collect()
}

fn integrator_options(file: &IntegratorFile) -> Result<IntegratorOptions, PlanError> {
    let method: Method = file.method.parse().map_err(|reason| OptionsError {
        field: "method",
        reason,
    })?;
    let sampling = if file.sample_interval_days == 0.0 {
        Sampling::EveryStep
    } else {
        Sampling::Interval(days_to_seconds(file.sample_interval_days))
    };
    Ok(IntegratorOptions {
        method,
        rtol: file.rtol,
        atol: file.atol,
        initial_step_s: file.initial_step_s,
        min_step_s: file.min_step_s,
        max_step_s: file.max_step_s,
        max_steps: file.max_steps,
        sampling,
        event_tolerance_s: file.event_tolerance_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swingby_config::parse_mission_toml;

    const BASE: &str = r#"
        name = "venus-swingby"
        start = "2022-09-01"
        planets = ["venus", "earth", "mars"]

        [launch]
        v_inf_km_s = 5.0

        [[segments]]
        travel_days = 73

        [[segments]]
        travel_days = 110
        delta_v_km_s = [0.0055, 0.0, 0.0]
    "#;

    fn plan_from(text: &str) -> Result<MissionPlan, PlanError> {
        MissionPlan::from_file(&parse_mission_toml(text).expect("toml"))
    }

    #[test]
    fn converts_units_and_defaults() {
        let plan = plan_from(BASE).expect("plan");
        assert_eq!(plan.planets, [BodyId::Venus, BodyId::Earth, BodyId::Mars]);
        assert_eq!(plan.segments[0].duration_s, 73.0 * 86_400.0);
        assert_eq!(plan.launch.home, BodyId::Earth);
        assert_eq!(plan.launch.direction, LaunchDirection::Retrograde);
        assert_eq!(plan.distance_reference, BodyId::Earth);
        assert_eq!(plan.integrator.sampling, Sampling::Interval(86_400.0));
        assert!((plan.total_delta_v_km_s() - 0.0055).abs() < 1e-15);
    }

    #[test]
    fn unknown_planet_names_the_field() {
        let err = plan_from(&BASE.replace("\"mars\"", "\"vulcan\"")).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnsupportedPlanet {
                field: "planets".to_string(),
                name: "vulcan".to_string()
            }
        );
    }

    #[test]
    fn segment_planets_must_be_tracked() {
        let text = format!("{BASE}\n[[segments]]\ntravel_days = 5\nplanets = [\"jupiter\"]\n");
        assert_eq!(
            plan_from(&text).unwrap_err(),
            PlanError::PlanetNotTracked {
                segment: 2,
                name: "jupiter".to_string()
            }
        );
    }

    #[test]
    fn budget_is_enforced() {
        let text = BASE.replace(
            "[launch]",
            "delta_v_budget_km_s = 0.001\n\n        [launch]",
        );
        assert!(matches!(
            plan_from(&text).unwrap_err(),
            PlanError::DeltaVBudgetExceeded { .. }
        ));
    }

    #[test]
    fn unknown_method_is_an_integrator_error() {
        let text = format!("{BASE}\n[integrator]\nmethod = \"euler\"\n");
        match plan_from(&text).unwrap_err() {
            PlanError::InvalidIntegrator(err) => assert_eq!(err.field, "method"),
            other => panic!("unexpected error {other}"),
        }
    }
}
