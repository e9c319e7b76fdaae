//! Distance along a meridian of an ellipsoid.

use log::warn;

use crate::error::{GeoTableError, Result};

const C00: f64 = 1.;
const C02: f64 = 0.25;
const C04: f64 = 0.046875;
const C06: f64 = 0.01953125;
const C08: f64 = 0.01068115234375;
const C22: f64 = 0.75;
const C44: f64 = 0.46875;
const C46: f64 = 0.01302083333333333333;
const C48: f64 = 0.00712076822916666666;
const C66: f64 = 0.36458333333333333333;
const C68: f64 = 0.00569661458333333333;
const C88: f64 = 0.3076171875;

const TOLERANCE: f64 = 1e-11;
const MAX_ITERATIONS: usize = 10;

/// Series expansion of the meridian arc length, for an ellipsoid with eccentricity squared `es`.
///
/// Lengths are normalized: multiply by the semi-major axis to get meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeridianDistance {
    en: [f64; 5],
    es: f64,
}

impl MeridianDistance {
    pub fn new(es: f64) -> Self {
        let es2 = es * es;
        let es3 = es2 * es;
        Self {
            en: [
                C00 - es * (C02 + es * (C04 + es * (C06 + es * C08))),
                es * (C22 - es * (C04 + es * (C06 + es * C08))),
                es2 * (C44 - es * (C46 + es * C48)),
                es3 * (C66 - es * C68),
                es3 * es * C88,
            ],
            es,
        }
    }

    /// Arc length from the equator to latitude `phi` (radians).
    pub fn length(&self, phi: f64) -> f64 {
        let (sin_phi, cos_phi) = phi.sin_cos();
        self.length_with(phi, sin_phi, cos_phi)
    }

    /// Like [`length`][Self::length], with the sine and cosine of `phi` already at hand.
    pub fn length_with(&self, phi: f64, sin_phi: f64, cos_phi: f64) -> f64 {
        let cs = cos_phi * sin_phi;
        let ss = sin_phi * sin_phi;
        let en = &self.en;
        en[0] * phi - cs * (en[1] + ss * (en[2] + ss * (en[3] + ss * en[4])))
    }

    /// The latitude (radians) whose arc length is `arg`, by Newton iteration.
    pub fn phi1(&self, arg: f64) -> Result<f64> {
        let k = 1. / (1. - self.es);
        let mut phi = arg;
        for _ in 0..MAX_ITERATIONS {
            let (sin_phi, cos_phi) = phi.sin_cos();
            let t = 1. - self.es * sin_phi * sin_phi;
            let step = (self.length_with(phi, sin_phi, cos_phi) - arg) * (t * t.sqrt()) * k;
            phi -= step;
            if step.abs() < TOLERANCE {
                return Ok(phi);
            }
        }

        warn!("Inverse meridian distance of {arg} did not converge");
        Err(GeoTableError::NoConvergence {
            operation: "inverse meridian distance",
            iterations: MAX_ITERATIONS,
        })
    }
}
