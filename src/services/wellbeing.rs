///! Well-being use cases
///! - recording a check-in together with its automatic burnout alert
///! - per-user window analysis over any `CheckInSource`
///! - the scheduled sustained-burnout sweep
use crate::analytics::report::{build_report, sustained_burnout_risk, AnalysisReport, BURNOUT_STREAK};
use crate::db::{self, AlertFilter};
use crate::domain::alert::{Alert, SUSTAINED_BURNOUT_KIND};
use crate::domain::checkin::{CheckIn, NewCheckIn};
use crate::domain::user::User;
use crate::domain::DomainError;
use crate::state::AppState;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Read side needed by the analysis. Postgres-backed through `AppState`.
#[async_trait]
pub trait CheckInSource: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;
    /// Check-ins recorded in the last `days` days, newest first.
    async fn checkins_within(&self, user_id: Uuid, days: i64) -> Result<Vec<CheckIn>>;
    /// The `limit` most recent check-ins regardless of age, newest first.
    async fn latest_checkins(&self, user_id: Uuid, limit: usize) -> Result<Vec<CheckIn>>;
}

#[async_trait]
impl CheckInSource for AppState {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        db::find_user_by_id(&self.pool, &self.crypto, user_id).await
    }

    async fn checkins_within(&self, user_id: Uuid, days: i64) -> Result<Vec<CheckIn>> {
        let since = Utc::now() - Duration::days(days);
        db::checkins_since(&self.pool, &self.crypto, user_id, since).await
    }

    async fn latest_checkins(&self, user_id: Uuid, limit: usize) -> Result<Vec<CheckIn>> {
        db::latest_checkins(&self.pool, &self.crypto, user_id, limit as i64).await
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error("user is inactive")]
    InactiveUser,
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Report for the last `window_days` days. `None` for an unknown or inactive
/// user and for an empty window.
pub async fn analyze_user<S>(source: &S, user_id: Uuid, window_days: i64) -> Result<Option<AnalysisReport>>
where
    S: CheckInSource + ?Sized,
{
    let Some(user) = source.find_user(user_id).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }

    let window = source.checkins_within(user_id, window_days).await?;
    if window.is_empty() {
        return Ok(None);
    }
    let latest = source.latest_checkins(user_id, BURNOUT_STREAK).await?;

    let report = build_report(user.id, Some(user.name), window_days, &window, &latest);
    if let Some(report) = &report {
        tracing::debug!(
            "Analysis for user {}: {} check-ins, status {}, burnout risk {}",
            user_id,
            report.total_checkins,
            report.status.as_str(),
            report.burnout_risk
        );
    }
    Ok(report)
}

/// Validates a check-in for `user` and derives the alert it triggers, if any.
pub fn plan_checkin(user: &User, input: NewCheckIn) -> Result<(CheckIn, Option<Alert>), ServiceError> {
    if !user.is_active {
        return Err(ServiceError::InactiveUser);
    }
    let checkin = CheckIn::create(user.id, input)?;
    let alert = if checkin.indicates_burnout() {
        Some(Alert::burnout(&checkin)?)
    } else {
        None
    };
    Ok((checkin, alert))
}

pub async fn record_checkin(
    state: &AppState,
    user_id: Uuid,
    input: NewCheckIn,
) -> Result<(CheckIn, Option<Alert>), ServiceError> {
    let user = state
        .find_user(user_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;
    let (checkin, alert) = plan_checkin(&user, input)?;

    db::insert_checkin(&state.pool, &state.crypto, &checkin, alert.as_ref()).await?;

    if let Some(alert) = &alert {
        tracing::warn!(
            "Burnout alert {} raised for user {} (check-in {}, concern {})",
            alert.id,
            user_id,
            checkin.id(),
            checkin.area_of_concern().as_str()
        );
    }
    Ok((checkin, alert))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: usize,
    pub raised: usize,
    pub failed: usize,
}

/// The sweep's decision for one user: an alert when the latest check-ins form a
/// burnout streak and no open sustained-burnout alert exists yet.
pub fn sustained_alert(
    user_id: Uuid,
    latest: &[CheckIn],
    existing: &[Alert],
    now: DateTime<Utc>,
) -> Result<Option<Alert>, DomainError> {
    if !sustained_burnout_risk(latest) {
        return Ok(None);
    }
    let already_open = existing
        .iter()
        .any(|a| a.kind == SUSTAINED_BURNOUT_KIND && a.status.is_open());
    if already_open {
        return Ok(None);
    }
    Alert::sustained_burnout(user_id, BURNOUT_STREAK, now).map(Some)
}

pub async fn sweep_sustained_burnout(state: &AppState) -> Result<SweepSummary> {
    let users = db::active_user_ids(&state.pool).await?;
    let now = Utc::now();
    let mut summary = SweepSummary::default();

    for user_id in users {
        summary.checked += 1;
        match sweep_user(state, user_id, now).await {
            Ok(true) => summary.raised += 1,
            Ok(false) => {}
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Burnout sweep failed for user {}: {}", user_id, e);
            }
        }
    }

    tracing::info!(
        "Burnout sweep finished: {} users checked, {} alerts raised, {} failed",
        summary.checked,
        summary.raised,
        summary.failed
    );
    Ok(summary)
}

async fn sweep_user(state: &AppState, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let latest = state.latest_checkins(user_id, BURNOUT_STREAK).await?;
    let filter = AlertFilter {
        user_id: Some(user_id),
        status: None,
    };
    let existing = db::list_alerts(&state.pool, &filter).await?;

    let Some(alert) = sustained_alert(user_id, &latest, &existing, now)? else {
        return Ok(false);
    };
    db::insert_alert(&state.pool, &alert).await?;
    tracing::warn!("Sustained burnout alert {} raised for user {}", alert.id, user_id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::report::tests::days;
    use crate::domain::alert::{AlertStatus, BURNOUT_KIND};
    use crate::domain::checkin::tests::input;
    use crate::domain::user::Email;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySource {
        users: HashMap<Uuid, User>,
        checkins: Vec<CheckIn>,
    }

    impl MemorySource {
        fn with_user(mut self, user: User) -> Self {
            self.users.insert(user.id, user);
            self
        }

        fn with_checkins(mut self, checkins: Vec<CheckIn>) -> Self {
            self.checkins.extend(checkins);
            self
        }

        fn newest_first(&self, user_id: Uuid) -> Vec<CheckIn> {
            let mut own: Vec<CheckIn> = self
                .checkins
                .iter()
                .filter(|c| c.user_id() == user_id)
                .cloned()
                .collect();
            own.sort_by_key(|c| std::cmp::Reverse(c.recorded_at()));
            own
        }
    }

    #[async_trait]
    impl CheckInSource for MemorySource {
        async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
            Ok(self.users.get(&user_id).cloned())
        }

        async fn checkins_within(&self, user_id: Uuid, days: i64) -> Result<Vec<CheckIn>> {
            let since = Utc::now() - Duration::days(days);
            Ok(self
                .newest_first(user_id)
                .into_iter()
                .filter(|c| c.recorded_at() >= since)
                .collect())
        }

        async fn latest_checkins(&self, user_id: Uuid, limit: usize) -> Result<Vec<CheckIn>> {
            Ok(self.newest_first(user_id).into_iter().take(limit).collect())
        }
    }

    fn user(active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Bruno Lima".to_string(),
            email: Email::parse("bruno@acme.io").unwrap(),
            password_hash: String::new(),
            birth_date: NaiveDate::from_ymd_opt(1988, 2, 3).unwrap(),
            gender: None,
            phone: None,
            created_at: Utc::now(),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_user_has_no_report() {
        let source = MemorySource::default();
        assert!(analyze_user(&source, Uuid::new_v4(), 7).await.unwrap().is_none());

        let inactive = user(false);
        let id = inactive.id;
        let source = MemorySource::default()
            .with_user(inactive)
            .with_checkins(days(id, &[(5, 5, 5, 7.0)]));
        assert!(analyze_user(&source, id, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_window_has_no_report() {
        let u = user(true);
        let id = u.id;
        let old = CheckIn::create_at(id, input(5, 5, 5, 7.0, 5), Utc::now() - Duration::days(20)).unwrap();
        let source = MemorySource::default().with_user(u).with_checkins(vec![old]);
        assert!(analyze_user(&source, id, 7).await.unwrap().is_none());
        assert!(analyze_user(&source, id, 30).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_report_for_struggling_user() {
        let u = user(true);
        let id = u.id;
        let source = MemorySource::default().with_user(u).with_checkins(days(
            id,
            &[(7, 3, 7, 7.0), (4, 8, 3, 5.0), (3, 9, 2, 4.5), (2, 10, 1, 4.0)],
        ));

        let report = analyze_user(&source, id, 7).await.unwrap().unwrap();
        assert_eq!(report.user_name.as_deref(), Some("Bruno Lima"));
        assert_eq!(report.total_checkins, 4);
        assert_eq!(report.window_days, 7);
        assert!(report.burnout_risk);
    }

    #[tokio::test]
    async fn test_streak_uses_latest_even_outside_window() {
        let u = user(true);
        let id = u.id;
        let now = Utc::now();
        let burnt = |d: i64| CheckIn::create_at(id, input(3, 9, 2, 5.0, 4), now - Duration::days(d)).unwrap();
        // only one of the three streak records falls inside a 2-day window
        let source = MemorySource::default()
            .with_user(u)
            .with_checkins(vec![burnt(1), burnt(3), burnt(4)]);

        let report = analyze_user(&source, id, 2).await.unwrap().unwrap();
        assert_eq!(report.total_checkins, 1);
        assert!(report.burnout_risk);
    }

    #[test]
    fn test_plan_checkin() {
        let active = user(true);

        let (checkin, alert) = plan_checkin(&active, input(8, 2, 8, 8.0, 8)).unwrap();
        assert_eq!(checkin.user_id(), active.id);
        assert!(alert.is_none());

        let (_, alert) = plan_checkin(&active, input(3, 9, 2, 5.0, 4)).unwrap();
        let alert = alert.unwrap();
        assert_eq!(alert.kind, BURNOUT_KIND);
        assert!(alert.is_critical());

        assert!(matches!(
            plan_checkin(&active, input(11, 2, 8, 8.0, 8)),
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            plan_checkin(&user(false), input(8, 2, 8, 8.0, 8)),
            Err(ServiceError::InactiveUser)
        ));
    }

    #[test]
    fn test_sweep_decision() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let streak = days(id, &[(3, 9, 2, 5.0), (2, 9, 1, 5.0), (4, 8, 3, 5.0)]);
        let healthy = days(id, &[(3, 9, 2, 5.0), (2, 9, 1, 5.0), (7, 4, 7, 7.0)]);

        assert!(sustained_alert(id, &healthy, &[], now).unwrap().is_none());

        let raised = sustained_alert(id, &streak, &[], now).unwrap().unwrap();
        assert_eq!(raised.kind, SUSTAINED_BURNOUT_KIND);

        // an open one suppresses a duplicate
        assert!(sustained_alert(id, &streak, &[raised.clone()], now).unwrap().is_none());
        let in_review = raised.with_status(AlertStatus::InReview, None, now).unwrap();
        assert!(sustained_alert(id, &streak, &[in_review.clone()], now).unwrap().is_none());

        // a closed one does not
        let resolved = in_review
            .with_status(AlertStatus::Resolved, Some("followed up".into()), now)
            .unwrap();
        assert!(sustained_alert(id, &streak, &[resolved], now).unwrap().is_some());

        // other open alert kinds do not count
        let single = Alert::burnout(&streak[0]).unwrap();
        assert!(sustained_alert(id, &streak, &[single], now).unwrap().is_some());
    }
}
