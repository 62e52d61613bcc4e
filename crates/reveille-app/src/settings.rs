use chrono::Duration;
use chrono_tz::Tz;

use reveille_core::schedule::{DEFAULT_LOOK_AHEAD_MINUTES, DEFAULT_SNOOZE_MINUTES};

pub const DEFAULT_FALLBACK_BODY: &str = "Alarm time!";

/// Scheduling knobs shared by the reconciler and the service.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSettings {
    /// Device timezone; weekday boundaries follow its local midnight.
    pub timezone: Tz,
    pub look_ahead: Duration,
    pub snooze: Duration,
    /// Notification body when neither alarm nor event has a description.
    pub fallback_body: String,
}

impl AlarmSettings {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    pub fn with_look_ahead_minutes(mut self, minutes: i64) -> Self {
        self.look_ahead = Duration::minutes(minutes.max(0));
        self
    }

    pub fn with_snooze_minutes(mut self, minutes: i64) -> Self {
        self.snooze = Duration::minutes(minutes.max(1));
        self
    }
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            look_ahead: Duration::minutes(DEFAULT_LOOK_AHEAD_MINUTES),
            snooze: Duration::minutes(DEFAULT_SNOOZE_MINUTES),
            fallback_body: DEFAULT_FALLBACK_BODY.to_string(),
        }
    }
}
