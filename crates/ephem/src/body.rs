//! Identifiers for the bodies the engine knows how to look up.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Solar-system body understood by the ephemeris providers and the body table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyId {
    Sun,
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

/// Name that does not map to any [`BodyId`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown body `{0}`")]
pub struct UnknownBody(pub String);

impl BodyId {
    pub const ALL: [BodyId; 10] = [
        BodyId::Sun,
        BodyId::Mercury,
        BodyId::Venus,
        BodyId::Earth,
        BodyId::Mars,
        BodyId::Jupiter,
        BodyId::Saturn,
        BodyId::Uranus,
        BodyId::Neptune,
        BodyId::Pluto,
    ];

    /// Lowercase identifier used in configuration files and exports.
    pub fn name(self) -> &'static str {
        match self {
            BodyId::Sun => "sun",
            BodyId::Mercury => "mercury",
            BodyId::Venus => "venus",
            BodyId::Earth => "earth",
            BodyId::Mars => "mars",
            BodyId::Jupiter => "jupiter",
            BodyId::Saturn => "saturn",
            BodyId::Uranus => "uranus",
            BodyId::Neptune => "neptune",
            BodyId::Pluto => "pluto",
        }
    }

    /// Heliocentric SPICE target. Planets resolve to their system barycenters.
    pub fn spice_target(self) -> &'static str {
        match self {
            BodyId::Sun => "SUN",
            BodyId::Mercury => "MERCURY BARYCENTER",
            BodyId::Venus => "VENUS BARYCENTER",
            BodyId::Earth => "EARTH BARYCENTER",
            BodyId::Mars => "MARS BARYCENTER",
            BodyId::Jupiter => "JUPITER BARYCENTER",
            BodyId::Saturn => "SATURN BARYCENTER",
            BodyId::Uranus => "URANUS BARYCENTER",
            BodyId::Neptune => "NEPTUNE BARYCENTER",
            BodyId::Pluto => "PLUTO BARYCENTER",
        }
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyId {
    type Err = UnknownBody;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lower = lower.strip_suffix(" barycenter").unwrap_or(&lower);
        BodyId::ALL
            .into_iter()
            .find(|body| body.name() == lower)
            .ok_or_else(|| UnknownBody(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Venus".parse::<BodyId>(), Ok(BodyId::Venus));
        assert_eq!(" EARTH ".parse::<BodyId>(), Ok(BodyId::Earth));
        assert_eq!("mars barycenter".parse::<BodyId>(), Ok(BodyId::Mars));
        assert_eq!(
            "vulcan".parse::<BodyId>(),
            Err(UnknownBody("vulcan".to_string()))
        );
    }

    #[test]
    fn names_round_trip() {
        for body in BodyId::ALL {
            assert_eq!(body.name().parse::<BodyId>(), Ok(body));
        }
    }
}
