use crate::domain::checkin::CheckIn;
use serde::{Deserialize, Serialize};

/// Minimum history needed before halves are compared.
pub const MIN_TREND_RECORDS: usize = 3;

/// Averages must move by more than this to count as a trend.
const TREND_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendReport {
    pub mood: Trend,
    pub stress: Trend,
    pub energy: Trend,
}

impl TrendReport {
    pub fn stable() -> Self {
        Self {
            mood: Trend::Stable,
            stress: Trend::Stable,
            energy: Trend::Stable,
        }
    }
}

/// Compares the older half of the history with the newer half.
/// Input order does not matter; records are sorted by date first.
pub fn analyze_trend(checkins: &[CheckIn]) -> TrendReport {
    if checkins.len() < MIN_TREND_RECORDS {
        return TrendReport::stable();
    }

    let mut ordered: Vec<&CheckIn> = checkins.iter().collect();
    ordered.sort_by_key(|c| c.recorded_at());

    // odd counts leave the extra record in the newer half
    let (older, newer) = ordered.split_at(ordered.len() / 2);

    let avg = |half: &[&CheckIn], value: fn(&CheckIn) -> i16| -> f64 {
        half.iter().map(|c| f64::from(value(*c))).sum::<f64>() / half.len() as f64
    };

    TrendReport {
        mood: classify(avg(older, CheckIn::mood), avg(newer, CheckIn::mood)),
        // lower stress is better, so the halves go in swapped
        stress: classify(avg(newer, CheckIn::stress), avg(older, CheckIn::stress)),
        energy: classify(avg(older, CheckIn::energy), avg(newer, CheckIn::energy)),
    }
}

fn classify(previous: f64, current: f64) -> Trend {
    let delta = current - previous;
    if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Worsening
    } else {
        Trend::Stable
    }
}
