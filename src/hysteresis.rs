//! Crossing detection with a fixed recovery band
//!
//! ```text
//! value >= threshold + 0.5             → Armed (latch cleared)
//! value <= threshold, state == Armed   → Alerted, fire once
//! otherwise                            → unchanged, no fire
//! ```
//!
//! Readings oscillating just around the threshold therefore raise a single
//! alert until the value has recovered past the band.

use serde::{Deserialize, Serialize};

/// Gap above the threshold a reading must reach to re-arm the alert
pub const RECOVERY_MARGIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    /// No alert currently active
    #[default]
    Armed,

    /// An alert fired and has not been cleared yet
    Alerted,
}

/// Result of feeding one reading into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: AlertState,
    pub fire: bool,
}

impl AlertState {
    pub fn evaluate(self, value: f64, threshold: f64) -> Evaluation {
        if value >= threshold + RECOVERY_MARGIN {
            return Evaluation {
                state: AlertState::Armed,
                fire: false,
            };
        }

        if value <= threshold && self == AlertState::Armed {
            return Evaluation {
                state: AlertState::Alerted,
                fire: true,
            };
        }

        Evaluation {
            state: self,
            fire: false,
        }
    }
}
