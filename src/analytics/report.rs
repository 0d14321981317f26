use crate::analytics::trend::{analyze_trend, TrendReport};
use crate::domain::checkin::{CheckIn, ConcernArea, HealthStatus, GOOD_HABITS};
use serde::Serialize;
use uuid::Uuid;

/// How many consecutive latest check-ins must trip the burnout rule.
pub const BURNOUT_STREAK: usize = 3;

const BURNOUT_WARNING: &str =
    "ALERT: critical burnout signs detected. Seek professional support right away.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Averages {
    pub wellbeing_index: f64,
    pub mood: f64,
    pub stress: f64,
    pub energy: f64,
    pub sleep_hours: f64,
    pub sleep_quality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub window_days: i64,
    pub total_checkins: usize,
    pub averages: Averages,
    pub status: HealthStatus,
    pub burnout_risk: bool,
    pub trends: TrendReport,
    pub attention_areas: Vec<ConcernArea>,
    pub recommendations: Vec<String>,
}

/// Builds the window report. `None` when the window is empty: a zeroed report
/// would read as a real, critical score.
pub fn build_report(
    user_id: Uuid,
    user_name: Option<String>,
    window_days: i64,
    window: &[CheckIn],
    latest: &[CheckIn],
) -> Option<AnalysisReport> {
    let averages = averages(window)?;
    let burnout_risk = sustained_burnout_risk(latest);
    let attention_areas = attention_areas(&averages);
    let recommendations = recommendations(&attention_areas, burnout_risk);

    Some(AnalysisReport {
        user_id,
        user_name,
        window_days,
        total_checkins: window.len(),
        status: HealthStatus::from_index(averages.wellbeing_index),
        averages,
        burnout_risk,
        trends: analyze_trend(window),
        attention_areas,
        recommendations,
    })
}

pub fn averages(checkins: &[CheckIn]) -> Option<Averages> {
    if checkins.is_empty() {
        return None;
    }
    let n = checkins.len() as f64;
    let mean = |value: fn(&CheckIn) -> f64| checkins.iter().map(value).sum::<f64>() / n;

    Some(Averages {
        wellbeing_index: mean(CheckIn::wellbeing_index),
        mood: mean(|c| f64::from(c.mood())),
        stress: mean(|c| f64::from(c.stress())),
        energy: mean(|c| f64::from(c.energy())),
        sleep_hours: mean(CheckIn::sleep_hours),
        sleep_quality: mean(|c| f64::from(c.sleep_quality())),
    })
}

/// True only when each of the three most recent check-ins trips the burnout rule.
pub fn sustained_burnout_risk(checkins: &[CheckIn]) -> bool {
    if checkins.len() < BURNOUT_STREAK {
        return false;
    }
    let mut newest_first: Vec<&CheckIn> = checkins.iter().collect();
    newest_first.sort_by_key(|c| std::cmp::Reverse(c.recorded_at()));
    newest_first
        .iter()
        .take(BURNOUT_STREAK)
        .all(|c| c.indicates_burnout())
}

/// Average-based thresholds; these differ from the per-record ones.
pub fn attention_areas(averages: &Averages) -> Vec<ConcernArea> {
    let mut areas = Vec::new();
    if averages.stress >= 7.0 {
        areas.push(ConcernArea::Stress);
    }
    if averages.sleep_hours < 6.0 {
        areas.push(ConcernArea::Sleep);
    }
    if averages.energy <= 4.0 {
        areas.push(ConcernArea::Energy);
    }
    if averages.mood <= 4.0 {
        areas.push(ConcernArea::Mood);
    }
    areas
}

pub fn recommendations(areas: &[ConcernArea], burnout_risk: bool) -> Vec<String> {
    let mut out = Vec::new();
    if burnout_risk {
        out.push(BURNOUT_WARNING.to_string());
    }
    out.extend(
        areas
            .iter()
            .filter_map(|area| attention_advice(*area))
            .map(str::to_string),
    );
    if out.is_empty() {
        out.push(GOOD_HABITS.to_string());
    }
    out
}

fn attention_advice(area: ConcernArea) -> Option<&'static str> {
    let advice = match area {
        ConcernArea::Stress => {
            "Practice breathing and meditation techniques. Take regular breaks during work."
        }
        ConcernArea::Sleep => "Keep a consistent sleep routine. Avoid screens for an hour before bed.",
        ConcernArea::Energy => "Keep a balanced diet and do light exercise regularly.",
        ConcernArea::Mood => {
            "Connect with people you care about. Consider a session with a mental health professional."
        }
        ConcernArea::None => return None,
    };
    Some(advice)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analytics::trend::Trend;
    use crate::domain::checkin::tests::input;
    use chrono::{Duration, Utc};

    /// (mood, stress, energy, sleep_hours) per day, oldest first.
    pub(crate) fn days(user: Uuid, values: &[(i16, i16, i16, f64)]) -> Vec<CheckIn> {
        let start = Utc::now() - Duration::hours(values.len() as i64 * 12);
        values
            .iter()
            .enumerate()
            .map(|(i, &(mood, stress, energy, sleep))| {
                CheckIn::create_at(
                    user,
                    input(mood, stress, energy, sleep, 5),
                    start + Duration::hours(i as i64 * 12),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_empty_window_has_no_report() {
        assert!(build_report(Uuid::new_v4(), None, 7, &[], &[]).is_none());
    }

    #[test]
    fn test_healthy_window() {
        let user = Uuid::new_v4();
        let window = days(user, &[(8, 2, 8, 8.0), (9, 3, 7, 7.5)]);
        let report = build_report(user, Some("Ana".into()), 7, &window, &window).unwrap();

        assert_eq!(report.total_checkins, 2);
        assert_eq!(report.averages.mood, 8.5);
        assert_eq!(report.averages.sleep_quality, 5.0);
        // (8+8+5-2+10)/4 = 7.25, (9+7+5-3+10)/4 = 7.0
        assert_eq!(report.averages.wellbeing_index, 7.125);
        assert_eq!(report.status, HealthStatus::Good);
        assert!(!report.burnout_risk);
        assert_eq!(report.trends, TrendReport::stable());
        assert!(report.attention_areas.is_empty());
        assert_eq!(report.recommendations, vec![GOOD_HABITS.to_string()]);
    }

    #[test]
    fn test_burnout_window() {
        let user = Uuid::new_v4();
        let window = days(
            user,
            &[(7, 3, 7, 7.0), (4, 8, 3, 5.0), (3, 9, 2, 4.5), (2, 10, 1, 4.0)],
        );
        let report = build_report(user, None, 7, &window, &window).unwrap();

        assert!(report.burnout_risk);
        assert_eq!(
            report.attention_areas,
            vec![ConcernArea::Stress, ConcernArea::Sleep, ConcernArea::Energy, ConcernArea::Mood]
        );
        assert_eq!(report.recommendations.len(), 5);
        assert_eq!(report.recommendations[0], BURNOUT_WARNING);
        assert_eq!(report.trends.mood, Trend::Worsening);
        assert_eq!(report.trends.stress, Trend::Worsening);
    }

    #[test]
    fn test_streak_needs_all_three_latest() {
        let user = Uuid::new_v4();
        assert!(!sustained_burnout_risk(&days(user, &[(3, 9, 2, 7.0), (3, 9, 2, 7.0)])));

        // the newest one recovered
        let broken = days(user, &[(3, 9, 2, 7.0), (3, 9, 2, 7.0), (6, 5, 6, 7.0)]);
        assert!(!sustained_burnout_risk(&broken));

        // an old good day does not matter
        let streak = days(
            user,
            &[(8, 2, 8, 7.0), (4, 8, 3, 7.0), (3, 9, 2, 7.0), (1, 10, 1, 7.0)],
        );
        assert!(sustained_burnout_risk(&streak));

        let mut shuffled = streak.clone();
        shuffled.swap(0, 3);
        assert!(sustained_burnout_risk(&shuffled));
    }

    #[test]
    fn test_attention_thresholds() {
        let base = Averages {
            wellbeing_index: 5.0,
            mood: 5.0,
            stress: 6.9,
            energy: 5.0,
            sleep_hours: 6.0,
            sleep_quality: 5.0,
        };
        assert!(attention_areas(&base).is_empty());

        let edge = Averages {
            stress: 7.0,
            sleep_hours: 5.9,
            energy: 4.0,
            mood: 4.0,
            ..base
        };
        assert_eq!(attention_areas(&edge).len(), 4);
    }

    #[test]
    fn test_recommendations_without_areas_but_at_risk() {
        let recs = recommendations(&[], true);
        assert_eq!(recs, vec![BURNOUT_WARNING.to_string()]);
    }
}
