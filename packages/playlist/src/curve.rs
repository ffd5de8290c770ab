//! Energy-flow curves
//!
//! A curve prescribes the target energy at each playlist position.
//! All four shapes are piecewise linear over `t = position / (len - 1)`
//! starting from the seed energy `e0`: flat holds `e0`; ascending rises
//! to `min(1, e0 + 0.3)`; descending falls to `max(0, e0 - 0.3)`; arc
//! rises to the ascending ceiling at the midpoint and returns to `e0`.

use serde::{Deserialize, Serialize};

/// Energy spread the non-flat curves traverse
const ENERGY_SPAN: f64 = 0.3;

/// Target energy-vs-position schedule for a playlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyCurve {
    #[default]
    Flat,
    Ascending,
    Descending,
    Arc,
}

impl EnergyCurve {
    /// Target energy for `position` in a playlist of `len` tracks
    pub fn target(&self, position: usize, len: usize, seed_energy: f64) -> f64 {
        let e0 = seed_energy.clamp(0.0, 1.0);
        if len <= 1 {
            return e0;
        }
        let t = position as f64 / (len - 1) as f64;
        let ceiling = (e0 + ENERGY_SPAN).min(1.0);
        let floor = (e0 - ENERGY_SPAN).max(0.0);

        match self {
            Self::Flat => e0,
            Self::Ascending => e0 + (ceiling - e0) * t,
            Self::Descending => e0 - (e0 - floor) * t,
            Self::Arc => {
                if t <= 0.5 {
                    e0 + (ceiling - e0) * (t * 2.0)
                } else {
                    ceiling - (ceiling - e0) * ((t - 0.5) * 2.0)
                }
            }
        }
    }
}
