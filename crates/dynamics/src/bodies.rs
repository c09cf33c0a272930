//! Gravitational parameters and radii of the bodies in a simulation.

use serde::Serialize;
use swingby_config::BodyConfig;
use swingby_ephem::{BodyId, UnknownBody};
use thiserror::Error;

use crate::DynamicsError;

/// Whether a body anchors the frame or perturbs the spacecraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyRole {
    Central,
    Perturbing,
}

/// One row of the constants table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Body {
    pub id: BodyId,
    pub mu_km3_s2: f64,
    pub radius_km: f64,
    pub role: BodyRole,
}

#[derive(Debug, Error, PartialEq)]
pub enum BodyTableError {
    #[error(transparent)]
    UnknownName(#[from] UnknownBody),
    #[error("body `{name}` needs mu_km3_s2 or mass_kg")]
    MissingGravity { name: String },
    #[error("body `{name}` has invalid {field} ({value})")]
    InvalidValue {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("expected exactly one central body, found {count}")]
    CentralCount { count: usize },
    #[error("the central body must be the Sun, found {0}")]
    CentralNotSun(BodyId),
    #[error("{0} appears more than once")]
    Duplicate(BodyId),
}

/// Immutable constants table: the central body plus every perturbing body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyTable {
    central: Body,
    perturbing: Vec<Body>,
}

impl BodyTable {
    /// Build a table from explicit bodies. Roles are assigned here.
    pub fn new(central: Body, perturbing: Vec<Body>) -> Result<Self, BodyTableError> {
        if central.id != BodyId::Sun {
            return Err(BodyTableError::CentralNotSun(central.id));
        }
        let mut seen = vec![central.id];
        for body in &perturbing {
            if seen.contains(&body.id) {
                return Err(BodyTableError::Duplicate(body.id));
            }
            seen.push(body.id);
        }
        for body in std::iter::once(&central).chain(&perturbing) {
            check_positive(body.id.name(), "mu_km3_s2", body.mu_km3_s2)?;
            check_positive(body.id.name(), "radius_km", body.radius_km)?;
        }
        Ok(Self {
            central: Body {
                role: BodyRole::Central,
                ..central
            },
            perturbing: perturbing
                .into_iter()
                .map(|body| Body {
                    role: BodyRole::Perturbing,
                    ..body
                })
                .collect(),
        })
    }

    /// Build a table from configuration records.
    pub fn from_configs(configs: &[BodyConfig]) -> Result<Self, BodyTableError> {
        let mut central = Vec::new();
        let mut perturbing = Vec::new();
        for config in configs {
            let id: BodyId = config.name.parse()?;
            let mu_km3_s2 = config
                .gravitational_parameter()
                .ok_or_else(|| BodyTableError::MissingGravity {
                    name: config.name.clone(),
                })?;
            let role = if config.central {
                BodyRole::Central
            } else {
                BodyRole::Perturbing
            };
            let body = Body {
                id,
                mu_km3_s2,
                radius_km: config.radius_km,
                role,
            };
            match role {
                BodyRole::Central => central.push(body),
                BodyRole::Perturbing => perturbing.push(body),
            }
        }
        if central.len() != 1 {
            return Err(BodyTableError::CentralCount {
                count: central.len(),
            });
        }
        Self::new(central[0], perturbing)
    }

    /// Table built from the compiled-in constants.
    pub fn builtin() -> Result<Self, BodyTableError> {
        Self::from_configs(&swingby_config::builtin_bodies())
    }

    pub fn central(&self) -> &Body {
        &self.central
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        if id == self.central.id {
            return Some(&self.central);
        }
        self.perturbing.iter().find(|body| body.id == id)
    }

    /// Like [`get`](Self::get) but as a dynamics error.
    pub fn require(&self, id: BodyId) -> Result<&Body, DynamicsError> {
        self.get(id).ok_or(DynamicsError::UnknownBody(id))
    }

    pub fn perturbing(&self) -> &[Body] {
        &self.perturbing
    }
}

fn check_positive(name: &str, field: &'static str, value: f64) -> Result<(), BodyTableError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(BodyTableError::InvalidValue {
            name: name.to_string(),
            field,
            value,
        })
    }
}
