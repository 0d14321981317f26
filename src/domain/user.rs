use crate::domain::DomainError;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "hotmail.com",
    "outlook.com",
    "yahoo.com",
    "live.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
];

const FORBIDDEN_EMAIL_CHARS: &[char] = &[' ', ',', ';', ':', '<', '>', '[', ']', '(', ')'];

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 120;

/// Lower-cased, validated email address. Valid for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let address = raw.trim().to_lowercase();
        if address.is_empty() {
            return Err(DomainError::Required { field: "email" });
        }
        if !Self::is_valid(&address) {
            return Err(DomainError::InvalidEmail(address));
        }
        Ok(Self(address))
    }

    fn is_valid(address: &str) -> bool {
        let len = address.chars().count();
        if !(5..=100).contains(&len) {
            return false;
        }
        if address.contains(FORBIDDEN_EMAIL_CHARS) {
            return false;
        }
        let mut parts = address.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        !local.is_empty() && domain.contains('.') && domain.len() >= 4
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or_default()
    }

    /// Anything outside the well-known free mail providers.
    pub fn is_corporate(&self) -> bool {
        !FREE_MAIL_DOMAINS.contains(&self.domain())
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl User {
    pub fn register(input: NewUser, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = validate_name(&input.name)?;
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;
        validate_age(input.birth_date, now.date_naive())?;
        let password_hash = hash_password(&input.password)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            birth_date: input.birth_date,
            gender: trimmed(input.gender),
            phone: trimmed(input.phone),
            created_at: now,
            is_active: true,
        })
    }

    pub fn with_name(&self, name: &str) -> Result<Self, DomainError> {
        Ok(Self {
            name: validate_name(name)?,
            ..self.clone()
        })
    }

    pub fn with_phone(&self, phone: Option<String>) -> Self {
        Self {
            phone: trimmed(phone),
            ..self.clone()
        }
    }

    pub fn with_gender(&self, gender: Option<String>) -> Self {
        Self {
            gender: trimmed(gender),
            ..self.clone()
        }
    }

    pub fn deactivated(&self) -> Result<Self, DomainError> {
        if !self.is_active {
            return Err(DomainError::AlreadyInactive);
        }
        Ok(Self {
            is_active: false,
            ..self.clone()
        })
    }

    pub fn reactivated(&self) -> Result<Self, DomainError> {
        if self.is_active {
            return Err(DomainError::AlreadyActive);
        }
        Ok(Self {
            is_active: true,
            ..self.clone()
        })
    }

    pub fn age_on(&self, date: NaiveDate) -> i32 {
        age_on(self.birth_date, date)
    }
}

pub fn age_on(birth_date: NaiveDate, date: NaiveDate) -> i32 {
    let mut age = date.year() - birth_date.year();
    if (date.month(), date.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::Required { field: "name" });
    }
    let len = name.chars().count();
    if len < 3 {
        return Err(DomainError::TooShort {
            field: "name",
            min: 3,
        });
    }
    if len > 100 {
        return Err(DomainError::TooLong {
            field: "name",
            max: 100,
        });
    }
    Ok(name.to_string())
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.trim().is_empty() {
        return Err(DomainError::Required { field: "password" });
    }
    let len = password.chars().count();
    if len < 6 {
        return Err(DomainError::TooShort {
            field: "password",
            min: 6,
        });
    }
    if len > 50 {
        return Err(DomainError::TooLong {
            field: "password",
            max: 50,
        });
    }
    Ok(())
}

fn validate_age(birth_date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    let age = age_on(birth_date, today);
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(DomainError::InvalidAge {
            min: MIN_AGE,
            max: MAX_AGE,
        });
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| DomainError::PasswordHash)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
