//! Embedded Runge-Kutta pairs.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// An explicit embedded Runge-Kutta method.
///
/// `A_COEFFS` is the strictly lower triangle of the Butcher matrix, row by
/// row starting with the second stage, so it holds `STAGES * (STAGES - 1) / 2`
/// entries; the nodes are recovered as row sums. `B_COEFFS` holds the `b_i`
/// weights of the propagated solution followed by the `b*_i` weights of the
/// embedded estimate.
#[allow(clippy::upper_case_acronyms)]
pub trait RK {
    /// Order of the propagated solution. Drives the step-size exponent.
    const ORDER: u8;
    const STAGES: usize;
    /// The last stage is evaluated at the propagated state ("first same as last").
    const FSAL: bool = false;
    const A_COEFFS: &'static [f64];
    const B_COEFFS: &'static [f64];
}

/// Dormand-Prince 5(4), propagating the fifth-order solution.
pub struct Dormand45;

impl RK for Dormand45 {
    const ORDER: u8 = 5;
    const STAGES: usize = 7;
    const FSAL: bool = true;
    const A_COEFFS: &'static [f64] = &[
        1.0 / 5.0,
        3.0 / 40.0,
        9.0 / 40.0,
        44.0 / 45.0,
        -56.0 / 15.0,
        32.0 / 9.0,
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ];
    const B_COEFFS: &'static [f64] = &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ];
}

/// Runge-Kutta-Fehlberg 4(5), propagating the fifth-order solution.
pub struct Fehlberg45;

impl RK for Fehlberg45 {
    const ORDER: u8 = 5;
    const STAGES: usize = 6;
    const A_COEFFS: &'static [f64] = &[
        1.0 / 4.0,
        3.0 / 32.0,
        9.0 / 32.0,
        1932.0 / 2197.0,
        -7200.0 / 2197.0,
        7296.0 / 2197.0,
        439.0 / 216.0,
        -8.0,
        3680.0 / 513.0,
        -845.0 / 4104.0,
        -8.0 / 27.0,
        2.0,
        -3544.0 / 2565.0,
        1859.0 / 4104.0,
        -11.0 / 40.0,
    ];
    const B_COEFFS: &'static [f64] = &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -1.0 / 5.0,
        0.0,
    ];
}

/// Runtime view of an [`RK`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct Tableau {
    pub order: u8,
    pub stages: usize,
    pub fsal: bool,
    pub a: &'static [f64],
    pub b: &'static [f64],
    pub b_star: &'static [f64],
}

impl Tableau {
    pub fn of<T: RK>() -> Self {
        Self {
            order: T::ORDER,
            stages: T::STAGES,
            fsal: T::FSAL,
            a: T::A_COEFFS,
            b: &T::B_COEFFS[..T::STAGES],
            b_star: &T::B_COEFFS[T::STAGES..],
        }
    }

    /// Coefficients `a_ij` for stage `i` (`i >= 1`), `j < i`.
    pub fn row(&self, stage: usize) -> &'static [f64] {
        let start = stage * (stage - 1) / 2;
        &self.a[start..start + stage]
    }

    /// Node `c_i` of stage `i`.
    pub fn node(&self, stage: usize) -> f64 {
        if stage == 0 {
            0.0
        } else {
            self.row(stage).iter().sum()
        }
    }
}

/// Integration method selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    #[default]
    DormandPrince45,
    Fehlberg45,
}

impl Method {
    pub fn tableau(self) -> Tableau {
        match self {
            Method::DormandPrince45 => Tableau::of::<Dormand45>(),
            Method::Fehlberg45 => Tableau::of::<Fehlberg45>(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::DormandPrince45 => "dormand-prince45",
            Method::Fehlberg45 => "fehlberg45",
        })
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dormand-prince45" | "dopri5" | "rk45" => Ok(Method::DormandPrince45),
            "fehlberg45" | "rkf45" => Ok(Method::Fehlberg45),
            other => Err(format!("unknown integration method `{other}`")),
        }
    }
}
