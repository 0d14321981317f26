///! Daily well-being check-ins
///! - Validated at construction, immutable apart from notes
///! - Composite well-being index (0-10)
///! - Per-record burnout flag, area of concern and coaching tip
use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NOTES_MAX_LEN: usize = 500;

/// Raw check-in input as it arrives from a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckIn {
    pub mood: i16,
    pub stress: i16,
    pub energy: i16,
    pub sleep_hours: f64,
    pub sleep_quality: i16,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckIn {
    id: Uuid,
    user_id: Uuid,
    recorded_at: DateTime<Utc>,
    mood: i16,
    stress: i16,
    energy: i16,
    sleep_hours: f64,
    sleep_quality: i16,
    notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConcernArea {
    Stress,
    Sleep,
    Energy,
    Mood,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl CheckIn {
    /// Validates the input and stamps it with the current instant.
    pub fn create(user_id: Uuid, input: NewCheckIn) -> Result<Self, DomainError> {
        Self::create_at(user_id, input, Utc::now())
    }

    pub fn create_at(
        user_id: Uuid,
        input: NewCheckIn,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::restore(Uuid::new_v4(), user_id, recorded_at, input)
    }

    /// Rebuilds a stored record. Stored values go through the same checks as new ones.
    pub fn restore(
        id: Uuid,
        user_id: Uuid,
        recorded_at: DateTime<Utc>,
        input: NewCheckIn,
    ) -> Result<Self, DomainError> {
        if user_id.is_nil() {
            return Err(DomainError::InvalidUser);
        }
        validate_level("mood", input.mood)?;
        validate_level("stress", input.stress)?;
        validate_level("energy", input.energy)?;
        validate_level("sleep_quality", input.sleep_quality)?;
        validate_sleep_hours(input.sleep_hours)?;
        let notes = normalize_notes(input.notes)?;

        Ok(Self {
            id,
            user_id,
            recorded_at,
            mood: input.mood,
            stress: input.stress,
            energy: input.energy,
            sleep_hours: input.sleep_hours,
            sleep_quality: input.sleep_quality,
            notes,
        })
    }

    /// Notes are the only mutable part of a check-in.
    pub fn with_notes(&self, notes: Option<String>) -> Result<Self, DomainError> {
        let notes = normalize_notes(notes)?;
        Ok(Self {
            notes,
            ..self.clone()
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn mood(&self) -> i16 {
        self.mood
    }

    pub fn stress(&self) -> i16 {
        self.stress
    }

    pub fn energy(&self) -> i16 {
        self.energy
    }

    pub fn sleep_hours(&self) -> f64 {
        self.sleep_hours
    }

    pub fn sleep_quality(&self) -> i16 {
        self.sleep_quality
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Composite well-being index, 0-10.
    /// (mood + energy + sleep_quality - stress + sleep_score) / 4, clamped.
    pub fn wellbeing_index(&self) -> f64 {
        let sleep_score = sleep_score(self.sleep_hours);
        let raw = (f64::from(self.mood) + f64::from(self.energy) + f64::from(self.sleep_quality)
            - f64::from(self.stress)
            + sleep_score)
            / 4.0;
        raw.clamp(0.0, 10.0)
    }

    /// All three conditions must hold at once.
    pub fn indicates_burnout(&self) -> bool {
        self.stress >= 8 && self.energy <= 3 && self.mood <= 4
    }

    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::from_index(self.wellbeing_index())
    }

    /// First match wins: stress, sleep, energy, mood.
    /// Mood threshold here is <= 3, one lower than the burnout rule.
    pub fn area_of_concern(&self) -> ConcernArea {
        if self.stress >= 8 {
            ConcernArea::Stress
        } else if self.sleep_hours < 5.0 {
            ConcernArea::Sleep
        } else if self.energy <= 3 {
            ConcernArea::Energy
        } else if self.mood <= 3 {
            ConcernArea::Mood
        } else {
            ConcernArea::None
        }
    }

    pub fn recommendation(&self) -> &'static str {
        self.area_of_concern().recommendation()
    }
}

/// Sleep duration mapped to 0-10. 7-9h is ideal, oversleeping loses 2 points per hour.
pub fn sleep_score(hours: f64) -> f64 {
    if (7.0..=9.0).contains(&hours) {
        10.0
    } else if (6.0..7.0).contains(&hours) {
        8.0
    } else if (5.0..6.0).contains(&hours) {
        6.0
    } else if (4.0..5.0).contains(&hours) {
        4.0
    } else if hours < 4.0 {
        2.0
    } else {
        (10.0 - (hours - 9.0) * 2.0).max(0.0)
    }
}

impl ConcernArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcernArea::Stress => "STRESS",
            ConcernArea::Sleep => "SLEEP",
            ConcernArea::Energy => "ENERGY",
            ConcernArea::Mood => "MOOD",
            ConcernArea::None => "NONE",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            ConcernArea::Stress => {
                "Try relaxation and breathing techniques. Take regular breaks during the workday."
            }
            ConcernArea::Sleep => {
                "Aim for at least 7-8 hours of sleep a night. Avoid screens before bed."
            }
            ConcernArea::Energy => {
                "Add some light physical activity and keep your meals balanced."
            }
            ConcernArea::Mood => {
                "Reach out to friends and family. Consider professional support if you need it."
            }
            ConcernArea::None => GOOD_HABITS,
        }
    }
}

pub const GOOD_HABITS: &str = "Keep up your good well-being habits!";

impl HealthStatus {
    /// Five tiers, shared by single records and window averages.
    pub fn from_index(index: f64) -> Self {
        if index >= 8.0 {
            HealthStatus::Excellent
        } else if index >= 6.0 {
            HealthStatus::Good
        } else if index >= 4.0 {
            HealthStatus::Fair
        } else if index >= 2.0 {
            HealthStatus::Poor
        } else {
            HealthStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "EXCELLENT",
            HealthStatus::Good => "GOOD",
            HealthStatus::Fair => "FAIR",
            HealthStatus::Poor => "POOR",
            HealthStatus::Critical => "CRITICAL",
        }
    }
}

fn validate_level(field: &'static str, value: i16) -> Result<(), DomainError> {
    if !(1..=10).contains(&value) {
        return Err(DomainError::OutOfRange {
            field,
            min: 1.0,
            max: 10.0,
        });
    }
    Ok(())
}

fn validate_sleep_hours(hours: f64) -> Result<(), DomainError> {
    // NaN fails the range check as well
    if !(0.0..=24.0).contains(&hours) {
        return Err(DomainError::OutOfRange {
            field: "sleep_hours",
            min: 0.0,
            max: 24.0,
        });
    }
    Ok(())
}

fn normalize_notes(notes: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(notes) = notes else {
        return Ok(None);
    };
    if notes.chars().count() > NOTES_MAX_LEN {
        return Err(DomainError::TooLong {
            field: "notes",
            max: NOTES_MAX_LEN,
        });
    }
    let notes = notes.trim();
    if notes.is_empty() {
        return Ok(None);
    }
    Ok(Some(notes.to_string()))
}
