//! Fixed rate loop timing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Keeps a loop running at a fixed rate.
///
/// Call [`Rate::sleep`] at the end of each pass of the loop. The call blocks
/// until the next tick boundary, so that successive passes start one period
/// apart regardless of how long the work in between took. If a pass overruns
/// its period no sleep occurs and the tick schedule is restarted from now.
pub struct Rate {
    period: Duration,
    last_tick: Option<Instant>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with creating a [`Rate`].
#[derive(Debug, Error)]
pub enum RateError {
    #[error("Rate frequency must be finite and positive, got {0} Hz")]
    InvalidFrequency(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Rate {
    /// Create a new rate of the given frequency.
    pub fn new(frequency_hz: f64) -> Result<Self, RateError> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(RateError::InvalidFrequency(frequency_hz));
        }

        Ok(Rate {
            period: Duration::from_secs_f64(1.0 / frequency_hz),
            last_tick: None,
        })
    }

    /// Block until the next tick boundary.
    ///
    /// Returns `true` if the tick was met, or `false` if the loop overran the
    /// period and no sleep was performed. The first call establishes the tick
    /// phase and returns immediately.
    pub fn sleep(&mut self) -> bool {
        let now = Instant::now();

        let last = match self.last_tick {
            Some(t) => t,
            None => {
                self.last_tick = Some(now);
                return true;
            }
        };

        match self.period.checked_sub(now.duration_since(last)) {
            Some(remaining) => {
                thread::sleep(remaining);
                self.last_tick = Some(last + self.period);
                true
            }
            None => {
                warn!(
                    "Tick overran by {:.06} s",
                    (now.duration_since(last) - self.period).as_secs_f64()
                );
                self.last_tick = Some(now);
                false
            }
        }
    }
}
