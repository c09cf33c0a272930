//! Core units, constants, epochs, and shared primitives for the swingby workspace.

/// Physical constants. Distances in kilometres, times in seconds.
pub mod constants {
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Days per Julian century.
    pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
    /// Julian date of the J2000 reference epoch (2000-01-01T12:00:00).
    pub const J2000_JULIAN_DATE: f64 = 2_451_545.0;
    /// Newtonian constant of gravitation in km³/(kg·s²).
    pub const GRAVITATIONAL_CONSTANT_KM3_KG_S2: f64 = 6.6743e-20;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::AU_KM;

    /// Convert astronomical units to kilometres.
    #[inline]
    pub fn au_to_km(v: f64) -> f64 {
        v * AU_KM
    }

    /// Convert kilometres to astronomical units.
    #[inline]
    pub fn km_to_au(v: f64) -> f64 {
        v / AU_KM
    }

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }

    /// Convert arcseconds to radians.
    #[inline]
    pub fn arcsec_to_rad(v: f64) -> f64 {
        (v / 3_600.0).to_radians()
    }

}

/// Time conversions and the absolute [`Epoch`](time::Epoch) type.
pub mod time {
    use std::fmt;
    use std::ops::{Add, Sub};

    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use super::constants::{DAYS_PER_JULIAN_CENTURY, J2000_JULIAN_DATE, SECONDS_PER_DAY};

    /// Unix timestamp (milliseconds) of 2000-01-01T12:00:00.
    const J2000_UNIX_MILLIS: i64 = 946_728_000_000;

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    /// Convert days to seconds.
    #[inline]
    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Calendar string that could not be turned into an epoch.
    #[derive(Debug, Clone, Error, PartialEq)]
    #[error("invalid epoch string `{input}` (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    pub struct EpochParseError {
        pub input: String,
    }

    /// Absolute instant expressed as seconds past J2000 on a uniform time scale.
    ///
    /// Calendar conversions treat the scale as TDB-like: leap seconds and the
    /// UTC/TT offset are ignored, so one calendar day is always 86 400 s.
    #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Epoch(f64);

    impl Epoch {
        /// The J2000 reference epoch.
        pub const J2000: Epoch = Epoch(0.0);

        pub fn from_seconds_past_j2000(seconds: f64) -> Self {
            Self(seconds)
        }

        pub fn seconds_past_j2000(self) -> f64 {
            self.0
        }

        /// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (optionally `Z`-suffixed).
        pub fn parse(text: &str) -> Result<Self, EpochParseError> {
            let trimmed = text.trim();
            let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
            for format in DATETIME_FORMATS {
                if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
                    return Ok(Self::from_datetime(datetime));
                }
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(Self::from_datetime)
                .ok_or_else(|| EpochParseError {
                    input: text.to_string(),
                })
        }

        pub fn from_datetime(datetime: NaiveDateTime) -> Self {
            let millis = datetime.and_utc().timestamp_millis() - J2000_UNIX_MILLIS;
            Self(millis as f64 / 1_000.0)
        }

        /// Calendar representation, or `None` when the epoch is outside chrono's range.
        pub fn to_datetime(self) -> Option<NaiveDateTime> {
            let millis = (self.0 * 1_000.0).round();
            if !millis.is_finite() || millis.abs() > 8.0e15 {
                return None;
            }
            DateTime::from_timestamp_millis(millis as i64 + J2000_UNIX_MILLIS)
                .map(|datetime| datetime.naive_utc())
        }

        pub fn julian_date(self) -> f64 {
            J2000_JULIAN_DATE + self.0 / SECONDS_PER_DAY
        }

        /// Julian centuries elapsed since J2000.
        pub fn centuries_past_j2000(self) -> f64 {
            self.0 / SECONDS_PER_DAY / DAYS_PER_JULIAN_CENTURY
        }

        pub fn add_seconds(self, seconds: f64) -> Self {
            Self(self.0 + seconds)
        }

        pub fn add_days(self, days: f64) -> Self {
            self.add_seconds(days_to_seconds(days))
        }
    }

    impl Add<f64> for Epoch {
        type Output = Epoch;

        fn add(self, seconds: f64) -> Epoch {
            self.add_seconds(seconds)
        }
    }

    impl Sub for Epoch {
        type Output = f64;

        /// Seconds between two epochs.
        fn sub(self, other: Epoch) -> f64 {
            self.0 - other.0
        }
    }

    impl fmt::Display for Epoch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.to_datetime() {
                Some(datetime) => write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.3f")),
                None => write!(f, "J2000{:+.3}s", self.0),
            }
        }
    }

    impl std::str::FromStr for Epoch {
        type Err = EpochParseError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::parse(s)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use approx::assert_abs_diff_eq;

        #[test]
        fn j2000_noon_is_zero() {
            let epoch = Epoch::parse("2000-01-01T12:00:00").expect("parse");
            assert_eq!(epoch, Epoch::J2000);
            assert_abs_diff_eq!(epoch.julian_date(), 2_451_545.0);
        }

        #[test]
        fn date_only_means_midnight() {
            let epoch = Epoch::parse("2022-09-01").expect("parse");
            let explicit = Epoch::parse("2022-09-01T00:00:00Z").expect("parse");
            assert_eq!(epoch, explicit);
            assert_eq!(epoch.to_string(), "2022-09-01T00:00:00.000");
        }

        #[test]
        fn days_are_uniform() {
            let start = Epoch::parse("2016-12-31").expect("parse");
            let end = Epoch::parse("2017-01-01").expect("parse");
            assert_abs_diff_eq!(end - start, 86_400.0);
            assert_eq!(start.add_days(1.0), end);
        }

        #[test]
        fn rejects_garbage() {
            let err = Epoch::parse("next tuesday").unwrap_err();
            assert_eq!(err.input, "next tuesday");
        }
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Unit vector along `v`, or `None` for a zero or non-finite vector.
    pub fn unit(v: &Vector3) -> Option<Vector3> {
        let n = norm(v);
        if n > 0.0 && n.is_finite() {
            Some(scale(v, 1.0 / n))
        } else {
            None
        }
    }

    /// Distance between two points.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(v: &Vector3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}
