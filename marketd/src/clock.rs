//! Wall-clock season calendar.

use chrono::{DateTime, Utc};
use market_engine::{SeasonClock, SeasonPhase};

/// Real-time clock with a fixed season end.
///
/// The phase is derived: once the season end passes, the marketplace is
/// in the off-season.
pub struct WallClock {
    season_end: DateTime<Utc>,
}

impl WallClock {
    /// Clock for a season ending at `season_end`.
    pub fn new(season_end: DateTime<Utc>) -> Self {
        Self { season_end }
    }
}

impl SeasonClock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn current_phase(&self) -> SeasonPhase {
        if Utc::now() < self.season_end {
            SeasonPhase::Regular
        } else {
            SeasonPhase::OffSeason
        }
    }

    fn season_end(&self) -> DateTime<Utc> {
        self.season_end
    }
}
