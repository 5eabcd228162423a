//! Battery discharge curves

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::{clamp, lin_map};
use crate::params::PowerParams;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Terminal voltage of the battery as a function of its state of charge.
///
/// Implementations must not give a higher voltage for a lower charge, so that the voltage never
/// rises while the battery discharges.
pub trait DischargeCurve {
    /// Voltage at the given charge in [0, 100].
    fn voltage(&self, percent: f64) -> f64;
}

impl<F> DischargeCurve for F
where
    F: Fn(f64) -> f64,
{
    fn voltage(&self, percent: f64) -> f64 {
        self(percent)
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Curve interpolating linearly between `(percent, voltage)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinearCurve {
    points: Vec<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PiecewiseLinearCurve {
    /// Build a curve from points.
    ///
    /// Returns `None` if there are no points or if the voltage drops as the charge rises.
    pub fn new(mut points: Vec<(f64, f64)>) -> Option<Self> {
        if points.is_empty() || points.iter().any(|(p, v)| !p.is_finite() || !v.is_finite()) {
            return None;
        }

        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        if points.windows(2).any(|w| w[1].1 < w[0].1) {
            return None;
        }

        Some(Self { points })
    }

    /// Default curve of a lithium pack: a steep drop near empty, a flat plateau, and a steep rise
    /// near full.
    pub fn from_params(params: &PowerParams) -> Self {
        Self {
            points: vec![
                (0.0, params.cutoff_voltage),
                (10.0, params.plateau_low_voltage),
                (90.0, params.plateau_high_voltage),
                (100.0, params.full_voltage),
            ],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

impl DischargeCurve for PiecewiseLinearCurve {
    fn voltage(&self, percent: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return 0.0,
        };

        let percent = clamp(percent, first.0, last.0);

        for w in self.points.windows(2) {
            let (p0, v0) = w[0];
            let (p1, v1) = w[1];

            if percent <= p1 {
                if p1 == p0 {
                    return v1;
                }
                return lin_map((p0, p1), (v0, v1), percent);
            }
        }

        last.1
    }
}
