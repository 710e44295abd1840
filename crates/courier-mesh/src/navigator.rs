//! Simulated straight-line movement between two coordinates.

use std::future::Future;
use std::time::Duration;

use cmn_types::Coordinate;
use log::debug;
use tokio::time::sleep;

use crate::geo;

/// Distance covered per interpolation step, in miles.
const STEP_MILES: f64 = 0.01;

/// Kilometers per statute mile.
const KM_PER_MILE: f64 = 1.609344;

/// Interpolates the agent's position toward a target at a fixed speed.
///
/// The position is held as floating-point degrees so fractional steps
/// accumulate without loss; callers only ever see the rounded fixed-point
/// coordinate.
pub struct Navigator {
    lat_deg: f64,
    lon_deg: f64,
    speed_mph: f64,
}

impl Navigator {
    pub fn new(start: Coordinate, speed_mph: f64) -> Self {
        Self {
            lat_deg: start.lat_degrees(),
            lon_deg: start.lon_degrees(),
            speed_mph,
        }
    }

    /// Current position rounded to fixed point.
    pub fn position(&self) -> Coordinate {
        Coordinate::from_degrees(self.lat_deg, self.lon_deg)
    }

    /// Walk to `target`, invoking `on_update` after every step and pausing
    /// for the wall-clock time the step would take at the configured speed.
    ///
    /// The displacement is split evenly over `ceil(total / step)` steps and
    /// the last step lands exactly on `target`, so the final invocation of
    /// `on_update` always carries the target coordinate. A zero-distance
    /// move emits a single update with no pause.
    pub async fn move_to<F, Fut>(&mut self, target: Coordinate, mut on_update: F)
    where
        F: FnMut(Coordinate) -> Fut,
        Fut: Future<Output = ()>,
    {
        let from = self.position();
        let total_miles = geo::distance_km(from, target) / KM_PER_MILE;

        if total_miles == 0.0 {
            self.lat_deg = target.lat_degrees();
            self.lon_deg = target.lon_degrees();
            on_update(target).await;
            return;
        }

        let steps = (total_miles / STEP_MILES).ceil().max(1.0) as u64;
        let lat_step = (target.lat_degrees() - self.lat_deg) / steps as f64;
        let lon_step = (target.lon_degrees() - self.lon_deg) / steps as f64;
        let step_miles = total_miles / steps as f64;
        let pause = Duration::from_secs_f64(step_miles / self.speed_mph * 3600.0);

        debug!(
            "navigator: {} -> {} in {} steps of {:.4} mi",
            from, target, steps, step_miles
        );

        for step in 1..=steps {
            if step == steps {
                // Land exactly on the target, absorbing accumulated
                // floating-point drift.
                self.lat_deg = target.lat_degrees();
                self.lon_deg = target.lon_degrees();
            } else {
                self.lat_deg += lat_step;
                self.lon_deg += lon_step;
            }
            on_update(self.position()).await;
            sleep(pause).await;
        }
    }
}
