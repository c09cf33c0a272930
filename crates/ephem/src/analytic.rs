//! Keplerian mean-element ephemeris.
//!
//! Elements and secular rates come from JPL's "Approximate Positions of the
//! Major Planets" (Standish), table 1, valid 1800 AD to 2050 AD, referred to the
//! mean ecliptic and equinox of J2000. Earth is represented by the Earth-Moon
//! barycenter, which is what the table tabulates.

use swingby_core::time::Epoch;
use swingby_core::units::{au_to_km, deg_to_rad};
use swingby_orbits::{ConicElements, elements_to_state, mean_motion, wrap_pi};

use crate::frames::Frame;
use crate::{BodyId, BodyState, EphemerisError, EphemerisProvider};

/// Mean elements: a (AU), e, I, L, long. perihelion, long. ascending node (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanElements {
    pub semi_major_axis_au: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub mean_longitude_deg: f64,
    pub perihelion_longitude_deg: f64,
    pub node_longitude_deg: f64,
}

#[derive(Debug, Clone, Copy)]
struct ElementRow {
    body: BodyId,
    at_j2000: MeanElements,
    per_century: MeanElements,
}

const fn elements(a: f64, e: f64, i: f64, l: f64, w: f64, o: f64) -> MeanElements {
    MeanElements {
        semi_major_axis_au: a,
        eccentricity: e,
        inclination_deg: i,
        mean_longitude_deg: l,
        perihelion_longitude_deg: w,
        node_longitude_deg: o,
    }
}

const APPROXIMATE_ELEMENTS: [ElementRow; 9] = [
    ElementRow {
        body: BodyId::Mercury,
        at_j2000: elements(0.38709927, 0.20563593, 7.00497902, 252.25032350, 77.45779628, 48.33076593),
        per_century: elements(0.00000037, 0.00001906, -0.00594749, 149472.67411175, 0.16047689, -0.12534081),
    },
    ElementRow {
        body: BodyId::Venus,
        at_j2000: elements(0.72333566, 0.00677672, 3.39467605, 181.97909950, 131.60246718, 76.67984255),
        per_century: elements(0.00000390, -0.00004107, -0.00078890, 58517.81538729, 0.00268329, -0.27769418),
    },
    ElementRow {
        body: BodyId::Earth,
        at_j2000: elements(1.00000261, 0.01671123, -0.00001531, 100.46457166, 102.93768193, 0.0),
        per_century: elements(0.00000562, -0.00004392, -0.01294668, 35999.37244981, 0.32327364, 0.0),
    },
    ElementRow {
        body: BodyId::Mars,
        at_j2000: elements(1.52371034, 0.09339410, 1.84969142, -4.55343205, -23.94362959, 49.55953891),
        per_century: elements(0.00001847, 0.00007882, -0.00813131, 19140.30268499, 0.44441088, -0.29257343),
    },
    ElementRow {
        body: BodyId::Jupiter,
        at_j2000: elements(5.20288700, 0.04838624, 1.30439695, 34.39644051, 14.72847983, 100.47390909),
        per_century: elements(-0.00011607, -0.00013253, -0.00183714, 3034.74612775, 0.21252668, 0.20469106),
    },
    ElementRow {
        body: BodyId::Saturn,
        at_j2000: elements(9.53667594, 0.05386179, 2.48599187, 49.95424423, 92.59887831, 113.66242448),
        per_century: elements(-0.00125060, -0.00050991, 0.00193609, 1222.49362201, -0.41897216, -0.28867794),
    },
    ElementRow {
        body: BodyId::Uranus,
        at_j2000: elements(19.18916464, 0.04725744, 0.77263783, 313.23810451, 170.95427630, 74.01692503),
        per_century: elements(-0.00196176, -0.00004397, -0.00242939, 428.48202785, 0.40805281, 0.04240589),
    },
    ElementRow {
        body: BodyId::Neptune,
        at_j2000: elements(30.06992276, 0.00859048, 1.77004347, -55.12002969, 44.96476227, 131.78422574),
        per_century: elements(0.00026291, 0.00005105, 0.00035372, 218.45945325, -0.32241464, -0.00508664),
    },
    ElementRow {
        body: BodyId::Pluto,
        at_j2000: elements(39.48211675, 0.24882730, 17.14001206, 238.92903833, 224.06891629, 110.30393684),
        per_century: elements(-0.00031596, 0.00005170, 0.00004818, 145.20780515, -0.04062942, -0.01183482),
    },
];

/// 1800-01-01T00:00:00 in seconds past J2000.
const TABLE_START_S: f64 = -6_311_390_400.0;
/// 2051-01-01T00:00:00 in seconds past J2000.
const TABLE_END_S: f64 = 1_609_416_000.0;

/// How the elements evolve with time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementModel {
    /// Tabulated secular rates (the published approximation).
    Secular,
    /// Elements frozen at J2000, mean anomaly advanced with `sqrt(mu/a^3)`.
    ///
    /// Planet motion is then an exact two-body solution for the configured
    /// central GM, which matches what the integrator does with planets.
    TwoBody,
}

/// Analytic heliocentric ephemeris built from mean orbital elements.
#[derive(Debug, Clone)]
pub struct KeplerianEphemeris {
    mu_central_km3_s2: f64,
    model: ElementModel,
    validity: Option<(Epoch, Epoch)>,
}

impl KeplerianEphemeris {
    /// The published approximation, rejecting epochs outside 1800-2050.
    pub fn approximate(mu_central_km3_s2: f64) -> Self {
        Self {
            mu_central_km3_s2,
            model: ElementModel::Secular,
            validity: Some((
                Epoch::from_seconds_past_j2000(TABLE_START_S),
                Epoch::from_seconds_past_j2000(TABLE_END_S),
            )),
        }
    }

    /// Pure two-body motion from the J2000 elements, with no validity window.
    pub fn two_body(mu_central_km3_s2: f64) -> Self {
        Self {
            mu_central_km3_s2,
            model: ElementModel::TwoBody,
            validity: None,
        }
    }

    pub fn model(&self) -> ElementModel {
        self.model
    }

    pub fn validity(&self) -> Option<(Epoch, Epoch)> {
        self.validity
    }

    fn check_epoch(&self, epoch: Epoch) -> Result<(), EphemerisError> {
        match self.validity {
            Some((start, end)) if epoch < start || epoch > end => {
                Err(EphemerisError::EpochOutOfRange { epoch, start, end })
            }
            _ if !epoch.seconds_past_j2000().is_finite() => Err(EphemerisError::EpochOutOfRange {
                epoch,
                start: Epoch::from_seconds_past_j2000(f64::NEG_INFINITY),
                end: Epoch::from_seconds_past_j2000(f64::INFINITY),
            }),
            _ => Ok(()),
        }
    }

    /// Osculating conic elements for `body` at `epoch`.
    pub fn conic_elements(&self, body: BodyId, epoch: Epoch) -> Result<ConicElements, EphemerisError> {
        self.check_epoch(epoch)?;
        let row = APPROXIMATE_ELEMENTS
            .iter()
            .find(|row| row.body == body)
            .ok_or(EphemerisError::UnsupportedBody { body })?;

        let (current, mean_anomaly_rad) = match self.model {
            ElementModel::Secular => {
                let t = epoch.centuries_past_j2000();
                let el = propagate_secular(&row.at_j2000, &row.per_century, t);
                let m = deg_to_rad(el.mean_longitude_deg - el.perihelion_longitude_deg);
                (el, m)
            }
            ElementModel::TwoBody => {
                let el = row.at_j2000;
                let n = mean_motion(self.mu_central_km3_s2, au_to_km(el.semi_major_axis_au));
                let m0 = deg_to_rad(el.mean_longitude_deg - el.perihelion_longitude_deg);
                (el, m0 + n * epoch.seconds_past_j2000())
            }
        };

        Ok(ConicElements {
            semi_major_axis_km: au_to_km(current.semi_major_axis_au),
            eccentricity: current.eccentricity,
            inclination_rad: deg_to_rad(current.inclination_deg),
            raan_rad: deg_to_rad(current.node_longitude_deg),
            arg_periapsis_rad: deg_to_rad(
                current.perihelion_longitude_deg - current.node_longitude_deg,
            ),
            mean_anomaly_rad: wrap_pi(mean_anomaly_rad),
        })
    }
}

fn propagate_secular(base: &MeanElements, rate: &MeanElements, centuries: f64) -> MeanElements {
    MeanElements {
        semi_major_axis_au: base.semi_major_axis_au + rate.semi_major_axis_au * centuries,
        eccentricity: base.eccentricity + rate.eccentricity * centuries,
        inclination_deg: base.inclination_deg + rate.inclination_deg * centuries,
        mean_longitude_deg: base.mean_longitude_deg + rate.mean_longitude_deg * centuries,
        perihelion_longitude_deg: base.perihelion_longitude_deg
            + rate.perihelion_longitude_deg * centuries,
        node_longitude_deg: base.node_longitude_deg + rate.node_longitude_deg * centuries,
    }
}

impl EphemerisProvider for KeplerianEphemeris {
    fn state(&self, body: BodyId, epoch: Epoch) -> Result<BodyState, EphemerisError> {
        if body == BodyId::Sun {
            self.check_epoch(epoch)?;
            return Ok(BodyState {
                position_km: [0.0; 3],
                velocity_km_s: [0.0; 3],
                frame: Frame::EclipticJ2000,
            });
        }
        let elements = self.conic_elements(body, epoch)?;
        let (position_km, velocity_km_s) = elements_to_state(&elements, self.mu_central_km3_s2)?;
        Ok(BodyState {
            position_km,
            velocity_km_s,
            frame: Frame::EclipticJ2000,
        })
    }

    fn name(&self) -> &str {
        match self.model {
            ElementModel::Secular => "approximate mean elements",
            ElementModel::TwoBody => "two-body mean elements",
        }
    }
}
