use crate::crypto::Crypto;
use crate::domain::alert::{Alert, AlertStatus, Severity};
use crate::domain::checkin::{CheckIn, NewCheckIn};
use crate::domain::user::{Email, User};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub enc_name: String,
    pub email: String,
    pub hash: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl DbUser {
    fn into_user(self, crypto: &Crypto) -> Result<User> {
        Ok(User {
            id: self.id,
            name: crypto
                .decrypt_str(&self.enc_name)
                .with_context(|| format!("decrypting name of user {}", self.id))?,
            email: Email::parse(&self.email)?,
            password_hash: self.hash,
            birth_date: self.birth_date,
            gender: self.gender,
            phone: self.phone,
            created_at: self.created_at,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct DbCheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub mood: i16,
    pub stress: i16,
    pub energy: i16,
    pub sleep_hours: f64,
    pub sleep_quality: i16,
    pub enc_notes: Option<String>,
}

impl DbCheckIn {
    fn into_checkin(self, crypto: &Crypto) -> Result<CheckIn> {
        let notes = crypto
            .decrypt_opt(self.enc_notes.as_deref())
            .with_context(|| format!("decrypting notes of check-in {}", self.id))?;
        let input = NewCheckIn {
            mood: self.mood,
            stress: self.stress,
            energy: self.energy,
            sleep_hours: self.sleep_hours,
            sleep_quality: self.sleep_quality,
            notes,
        };
        Ok(CheckIn::restore(self.id, self.user_id, self.recorded_at, input)?)
    }
}

#[derive(Debug, FromRow)]
pub struct DbAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub description: Option<String>,
    pub severity: String,
    pub status: String,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
}

impl TryFrom<DbAlert> for Alert {
    type Error = anyhow::Error;

    fn try_from(row: DbAlert) -> Result<Self> {
        Ok(Alert {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            description: row.description,
            severity: Severity::try_from(row.severity.as_str())?,
            status: AlertStatus::try_from(row.status.as_str())?,
            raised_at: row.raised_at,
            resolved_at: row.resolved_at,
            action_taken: row.action_taken,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct AlertFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<AlertStatus>,
}

pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

// ---- users ----

pub async fn insert_user(pool: &PgPool, crypto: &Crypto, user: &User) -> Result<()> {
    let enc_name = crypto.encrypt_str(&user.name)?;
    sqlx::query(
        r#"
        INSERT INTO users (id, enc_name, email, hash, birth_date, gender, phone, created_at, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(user.id)
    .bind(enc_name)
    .bind(user.email.as_str())
    .bind(&user.password_hash)
    .bind(user.birth_date)
    .bind(&user.gender)
    .bind(&user.phone)
    .bind(user.created_at)
    .bind(user.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres rejected a duplicate key (e.g. a concurrent insert won the race).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|d| d.code())
        .as_deref()
        == Some(UNIQUE_VIOLATION)
}

pub async fn email_taken(pool: &PgPool, email: &Email) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email.as_str())
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

pub async fn find_user_by_id(pool: &PgPool, crypto: &Crypto, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, enc_name, email, hash, birth_date, gender, phone, created_at, is_active
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(|r| r.into_user(crypto)).transpose()
}

pub async fn list_users(
    pool: &PgPool,
    crypto: &Crypto,
    include_inactive: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, enc_name, email, hash, birth_date, gender, phone, created_at, is_active
        FROM users
        WHERE is_active = true OR $1
        ORDER BY created_at, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(include_inactive)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| r.into_user(crypto)).collect()
}

pub async fn count_users(pool: &PgPool, include_inactive: bool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = true OR $1")
        .bind(include_inactive)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn active_user_ids(pool: &PgPool) -> Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE is_active = true ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Persists the mutable profile fields and the active flag.
pub async fn update_user(pool: &PgPool, crypto: &Crypto, user: &User) -> Result<()> {
    let enc_name = crypto.encrypt_str(&user.name)?;
    sqlx::query(
        r#"
        UPDATE users
        SET enc_name = $2,
            gender = $3,
            phone = $4,
            is_active = $5
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(enc_name)
    .bind(&user.gender)
    .bind(&user.phone)
    .bind(user.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

// ---- check-ins ----

/// Stores the check-in and, when present, its automatic alert atomically.
pub async fn insert_checkin(
    pool: &PgPool,
    crypto: &Crypto,
    checkin: &CheckIn,
    alert: Option<&Alert>,
) -> Result<()> {
    let enc_notes = crypto.encrypt_opt(checkin.notes())?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO checkins (id, user_id, recorded_at, mood, stress, energy, sleep_hours, sleep_quality, enc_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(checkin.id())
    .bind(checkin.user_id())
    .bind(checkin.recorded_at())
    .bind(checkin.mood())
    .bind(checkin.stress())
    .bind(checkin.energy())
    .bind(checkin.sleep_hours())
    .bind(checkin.sleep_quality())
    .bind(enc_notes)
    .execute(&mut *tx)
    .await?;

    if let Some(alert) = alert {
        insert_alert(&mut *tx, alert).await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn find_checkin(pool: &PgPool, crypto: &Crypto, id: Uuid) -> Result<Option<CheckIn>> {
    let row = sqlx::query_as::<_, DbCheckIn>(
        r#"
        SELECT id, user_id, recorded_at, mood, stress, energy, sleep_hours, sleep_quality, enc_notes
        FROM checkins
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(|r| r.into_checkin(crypto)).transpose()
}

/// Newest first.
pub async fn checkins_since(
    pool: &PgPool,
    crypto: &Crypto,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<CheckIn>> {
    let rows = sqlx::query_as::<_, DbCheckIn>(
        r#"
        SELECT id, user_id, recorded_at, mood, stress, energy, sleep_hours, sleep_quality, enc_notes
        FROM checkins
        WHERE user_id = $1
          AND recorded_at >= $2
        ORDER BY recorded_at DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| r.into_checkin(crypto)).collect()
}

pub async fn latest_checkins(
    pool: &PgPool,
    crypto: &Crypto,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<CheckIn>> {
    let rows = sqlx::query_as::<_, DbCheckIn>(
        r#"
        SELECT id, user_id, recorded_at, mood, stress, energy, sleep_hours, sleep_quality, enc_notes
        FROM checkins
        WHERE user_id = $1
        ORDER BY recorded_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| r.into_checkin(crypto)).collect()
}

pub async fn update_checkin_notes(pool: &PgPool, crypto: &Crypto, checkin: &CheckIn) -> Result<()> {
    let enc_notes = crypto.encrypt_opt(checkin.notes())?;
    sqlx::query("UPDATE checkins SET enc_notes = $2 WHERE id = $1")
        .bind(checkin.id())
        .bind(enc_notes)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- alerts ----

pub async fn insert_alert<'e, E>(executor: E, alert: &Alert) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO alerts (id, user_id, kind, description, severity, status, raised_at, resolved_at, action_taken)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(alert.id)
    .bind(alert.user_id)
    .bind(&alert.kind)
    .bind(&alert.description)
    .bind(alert.severity.as_str())
    .bind(alert.status.as_str())
    .bind(alert.raised_at)
    .bind(alert.resolved_at)
    .bind(&alert.action_taken)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_alert(pool: &PgPool, id: Uuid) -> Result<Option<Alert>> {
    let row = sqlx::query_as::<_, DbAlert>(
        r#"
        SELECT id, user_id, kind, description, severity, status, raised_at, resolved_at, action_taken
        FROM alerts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Alert::try_from).transpose()
}

/// Newest first; unset filter fields match everything.
pub async fn list_alerts(pool: &PgPool, filter: &AlertFilter) -> Result<Vec<Alert>> {
    let rows = sqlx::query_as::<_, DbAlert>(
        r#"
        SELECT id, user_id, kind, description, severity, status, raised_at, resolved_at, action_taken
        FROM alerts
        WHERE ($1::uuid IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY raised_at DESC
        "#,
    )
    .bind(filter.user_id)
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Alert::try_from).collect()
}

/// Writes back status, severity and resolution fields.
pub async fn update_alert(pool: &PgPool, alert: &Alert) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE alerts
        SET severity = $2,
            status = $3,
            resolved_at = $4,
            action_taken = $5
        WHERE id = $1
        "#,
    )
    .bind(alert.id)
    .bind(alert.severity.as_str())
    .bind(alert.status.as_str())
    .bind(alert.resolved_at)
    .bind(&alert.action_taken)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;

    #[derive(Debug)]
    pub(crate) struct PgCodeError(pub(crate) &'static str);

    impl std::fmt::Display for PgCodeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl StdError for PgCodeError {}

    impl DatabaseError for PgCodeError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> anyhow::Error {
        sqlx::Error::Database(Box::new(PgCodeError(code))).into()
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(is_unique_violation(&db_error("23505")));
        assert!(is_unique_violation(
            &db_error("23505").context("inserting user")
        ));

        // check constraint, not a duplicate
        assert!(!is_unique_violation(&db_error("23514")));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound.into()));
        assert!(!is_unique_violation(&anyhow::anyhow!("pool timed out")));
    }
}
