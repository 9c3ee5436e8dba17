use std::fmt;

use property_client::{LinearScale, PollState, PollingStats};

/// One sensor sample as delivered to gauge observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeReading {
    /// Value read from the sensor property
    pub raw: i32,
    /// `raw` rescaled onto the display range, unclamped
    pub mapped: i32,
    /// `mapped` clamped to `0..=100` for a progress indicator
    pub percent: u8,
}

impl GaugeReading {
    pub fn new(raw: i32, scale: LinearScale) -> Self {
        let mapped = scale.apply(raw);
        Self {
            raw,
            mapped,
            percent: LinearScale::display_percent(mapped),
        }
    }
}

impl fmt::Display for GaugeReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% (raw {})", self.percent, self.raw)
    }
}

/// Health of the gauge polling session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GaugeStatus {
    /// Never started
    Idle,
    Healthy,
    /// Running, but the latest reads failed
    Faulted {
        consecutive_errors: u32,
        last_error: String,
    },
    Stopped,
}

impl GaugeStatus {
    pub(crate) fn from_stats(stats: Option<PollingStats>) -> Self {
        let Some(stats) = stats else {
            return GaugeStatus::Idle;
        };

        match stats.state {
            PollState::Idle => GaugeStatus::Idle,
            PollState::Stopped => GaugeStatus::Stopped,
            PollState::Running if stats.consecutive_errors > 0 => GaugeStatus::Faulted {
                consecutive_errors: stats.consecutive_errors,
                last_error: stats.last_error.unwrap_or_default(),
            },
            PollState::Running => GaugeStatus::Healthy,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, GaugeStatus::Healthy | GaugeStatus::Faulted { .. })
    }
}
