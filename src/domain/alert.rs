use crate::domain::checkin::CheckIn;
use crate::domain::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KIND_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const BURNOUT_KIND: &str = "Burnout risk";
pub const SUSTAINED_BURNOUT_KIND: &str = "Sustained burnout risk";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn escalated(self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

impl TryFrom<&str> for Severity {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(DomainError::InvalidSeverity(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    InReview,
    Resolved,
    Cancelled,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "PENDING",
            AlertStatus::InReview => "IN_REVIEW",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Cancelled)
    }

    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

impl TryFrom<&str> for AlertStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(AlertStatus::Pending),
            "IN_REVIEW" => Ok(AlertStatus::InReview),
            "RESOLVED" => Ok(AlertStatus::Resolved),
            "CANCELLED" | "CANCELED" => Ok(AlertStatus::Cancelled),
            _ => Err(DomainError::InvalidStatus(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub status: AlertStatus,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
}

impl Alert {
    pub fn new(
        user_id: Uuid,
        kind: &str,
        severity: Severity,
        description: Option<String>,
        raised_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if user_id.is_nil() {
            return Err(DomainError::InvalidUser);
        }
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(DomainError::Required { field: "kind" });
        }
        if kind.chars().count() > KIND_MAX_LEN {
            return Err(DomainError::TooLong {
                field: "kind",
                max: KIND_MAX_LEN,
            });
        }
        let description = bounded_text("description", description)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            description,
            severity,
            status: AlertStatus::Pending,
            raised_at,
            resolved_at: None,
            action_taken: None,
        })
    }

    /// Automatic alert for a single check-in that trips the burnout rule.
    pub fn burnout(checkin: &CheckIn) -> Result<Self, DomainError> {
        let description = format!(
            "Critical indicators detected: stress={}/10, energy={}/10, mood={}/10",
            checkin.stress(),
            checkin.energy(),
            checkin.mood()
        );
        Self::new(
            checkin.user_id(),
            BURNOUT_KIND,
            Severity::Critical,
            Some(description),
            checkin.recorded_at(),
        )
    }

    /// Raised when the latest check-ins all trip the burnout rule.
    pub fn sustained_burnout(
        user_id: Uuid,
        streak: usize,
        raised_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::new(
            user_id,
            SUSTAINED_BURNOUT_KIND,
            Severity::Critical,
            Some(format!(
                "Last {streak} check-ins all show high stress, low energy and low mood"
            )),
            raised_at,
        )
    }

    /// Resolved and cancelled alerts are final; pending is only the starting point.
    pub fn with_status(
        &self,
        status: AlertStatus,
        action: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let illegal = DomainError::IllegalTransition {
            from: self.status.as_str(),
            to: status.as_str(),
        };
        if self.status.is_terminal() && self.status != status {
            return Err(illegal);
        }
        if status == AlertStatus::Pending && self.status != AlertStatus::Pending {
            return Err(illegal);
        }

        let mut next = self.clone();
        next.status = status;
        if status.is_terminal() {
            next.resolved_at = Some(at);
            next.action_taken = bounded_text("action_taken", action)?;
        }
        Ok(next)
    }

    /// One severity step up. Closed alerts stay as they were closed.
    pub fn escalated(&self) -> Result<Self, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::IllegalTransition {
                from: self.status.as_str(),
                to: "ESCALATED",
            });
        }
        let mut next = self.clone();
        next.severity = self.severity.escalated();
        Ok(next)
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        now - self.raised_at <= Duration::hours(24)
    }

    pub fn open_duration(&self, now: DateTime<Utc>) -> Duration {
        self.resolved_at.unwrap_or(now) - self.raised_at
    }
}

fn bounded_text(field: &'static str, value: Option<String>) -> Result<Option<String>, DomainError> {
    match value {
        Some(text) if text.chars().count() > DESCRIPTION_MAX_LEN => Err(DomainError::TooLong {
            field,
            max: DESCRIPTION_MAX_LEN,
        }),
        Some(text) => Ok(Some(text.trim().to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkin::tests::checkin;

    fn pending() -> Alert {
        Alert::new(Uuid::new_v4(), "Manual check", Severity::Low, None, Utc::now()).unwrap()
    }

    #[test]
    fn test_burnout_alert_from_checkin() {
        let c = checkin(3, 9, 2, 5.0, 4);
        let alert = Alert::burnout(&c).unwrap();
        assert_eq!(alert.kind, BURNOUT_KIND);
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.is_pending());
        assert_eq!(alert.user_id, c.user_id());
        assert_eq!(
            alert.description.as_deref(),
            Some("Critical indicators detected: stress=9/10, energy=2/10, mood=3/10")
        );
    }

    #[test]
    fn test_validation() {
        let user = Uuid::new_v4();
        assert!(Alert::new(user, "   ", Severity::Low, None, Utc::now()).is_err());
        assert!(Alert::new(user, &"k".repeat(51), Severity::Low, None, Utc::now()).is_err());
        assert!(Alert::new(user, "ok", Severity::Low, Some("d".repeat(501)), Utc::now()).is_err());
        assert!(Alert::new(Uuid::nil(), "ok", Severity::Low, None, Utc::now()).is_err());
        assert!(Severity::try_from("bogus").is_err());
        assert_eq!(Severity::try_from(" high ").unwrap(), Severity::High);
        assert_eq!(AlertStatus::try_from("in-review").unwrap(), AlertStatus::InReview);
    }

    #[test]
    fn test_lifecycle() {
        let now = Utc::now();
        let alert = pending();

        let review = alert.with_status(AlertStatus::InReview, None, now).unwrap();
        assert_eq!(review.status, AlertStatus::InReview);
        assert!(review.resolved_at.is_none());
        // original value is untouched
        assert!(alert.is_pending());

        let resolved = review
            .with_status(AlertStatus::Resolved, Some(" talked to HR ".into()), now)
            .unwrap();
        assert!(resolved.is_resolved());
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(resolved.action_taken.as_deref(), Some("talked to HR"));

        assert!(resolved.with_status(AlertStatus::Resolved, None, now).is_ok());
        let err = resolved
            .with_status(AlertStatus::InReview, None, now)
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(resolved.with_status(AlertStatus::Cancelled, None, now).is_err());
    }

    #[test]
    fn test_cancelled_is_final_and_pending_not_reentered() {
        let now = Utc::now();
        let cancelled = pending()
            .with_status(AlertStatus::Cancelled, Some("duplicate".into()), now)
            .unwrap();
        assert!(cancelled.with_status(AlertStatus::Resolved, None, now).is_err());

        let review = pending().with_status(AlertStatus::InReview, None, now).unwrap();
        assert!(review.with_status(AlertStatus::Pending, None, now).is_err());
    }

    #[test]
    fn test_escalation_ladder() {
        let medium = pending().escalated().unwrap();
        assert_eq!(medium.severity, Severity::Medium);
        let high = medium.escalated().unwrap();
        assert_eq!(high.severity, Severity::High);
        let top = high.escalated().unwrap();
        assert!(top.is_critical());
        assert!(top.escalated().unwrap().is_critical());

        let closed = top
            .with_status(AlertStatus::Cancelled, None, Utc::now())
            .unwrap();
        assert!(closed.escalated().unwrap_err().is_conflict());
    }

    #[test]
    fn test_recent_and_open_duration() {
        let now = Utc::now();
        let old = Alert::new(
            Uuid::new_v4(),
            "Manual check",
            Severity::Medium,
            None,
            now - Duration::hours(30),
        )
        .unwrap();
        assert!(!old.is_recent(now));
        assert_eq!(old.open_duration(now), Duration::hours(30));

        let closed = old
            .with_status(AlertStatus::Resolved, None, now - Duration::hours(10))
            .unwrap();
        assert_eq!(closed.open_duration(now), Duration::hours(20));
        assert!(pending().is_recent(Utc::now()));
    }
}
