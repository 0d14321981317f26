use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SWEEP_CRON: &str = "0 0 9 * * *";
const DEFAULT_MODEL_PATH: &str = "models/burnout_model.json";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} missing")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Rules,
    Model,
}

impl TryFrom<&str> for PredictorKind {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "rules" | "rule" => Ok(PredictorKind::Rules),
            "model" | "ml" => Ok(PredictorKind::Model),
            other => Err(ConfigError::Invalid {
                name: "BURNOUT_PREDICTOR",
                reason: format!("unknown predictor '{other}' (use rules or model)"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub enc_key: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub analysis_window_days: i64,
    pub predictor: PredictorKind,
    pub model_path: PathBuf,
    pub sweep_cron: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let enc_key = get("APP_ENC_KEY").ok_or(ConfigError::Missing("APP_ENC_KEY"))?;

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| {
            let port = get("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{port}")
        });

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => parse_number("DB_MAX_CONNECTIONS", &raw, 1, 1000)?,
            None => 10,
        };

        let analysis_window_days = match get("ANALYSIS_WINDOW_DAYS") {
            Some(raw) => parse_number("ANALYSIS_WINDOW_DAYS", &raw, 1, 365)?,
            None => 7,
        };

        let predictor = match get("BURNOUT_PREDICTOR") {
            Some(raw) => PredictorKind::try_from(raw.as_str())?,
            None => PredictorKind::Rules,
        };

        Ok(Self {
            database_url,
            enc_key,
            bind_addr,
            max_connections: max_connections as u32,
            analysis_window_days,
            predictor,
            model_path: get("BURNOUT_MODEL_PATH")
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
                .into(),
            sweep_cron: get("BURNOUT_SWEEP_CRON").unwrap_or_else(|| DEFAULT_SWEEP_CRON.to_string()),
        })
    }
}

fn parse_number(name: &'static str, raw: &str, min: i64, max: i64) -> Result<i64, ConfigError> {
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("'{raw}' is not a number"),
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{value} is outside {min}..={max}"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/wellmind"),
        ("APP_ENC_KEY", "a2V5"),
    ];

    #[test]
    fn test_defaults() {
        let cfg = config(&REQUIRED).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.analysis_window_days, 7);
        assert_eq!(cfg.predictor, PredictorKind::Rules);
        assert_eq!(cfg.model_path, PathBuf::from("models/burnout_model.json"));
        assert_eq!(cfg.sweep_cron, DEFAULT_SWEEP_CRON);
    }

    #[test]
    fn test_required_vars() {
        assert_eq!(
            config(&[("APP_ENC_KEY", "a2V5")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            config(&[("DATABASE_URL", "postgres://x"), ("APP_ENC_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("APP_ENC_KEY")
        );
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("ANALYSIS_WINDOW_DAYS", "30"),
            ("BURNOUT_PREDICTOR", "Model"),
            ("BURNOUT_MODEL_PATH", "/etc/wellmind/model.json"),
        ]);
        let cfg = config(&pairs).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.analysis_window_days, 30);
        assert_eq!(cfg.predictor, PredictorKind::Model);
        assert_eq!(cfg.model_path, PathBuf::from("/etc/wellmind/model.json"));

        pairs.push(("BIND_ADDR", "127.0.0.1:9000"));
        assert_eq!(config(&pairs).unwrap().bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_values() {
        let mut window = REQUIRED.to_vec();
        window.push(("ANALYSIS_WINDOW_DAYS", "0"));
        assert!(matches!(
            config(&window),
            Err(ConfigError::Invalid { name: "ANALYSIS_WINDOW_DAYS", .. })
        ));

        let mut predictor = REQUIRED.to_vec();
        predictor.push(("BURNOUT_PREDICTOR", "oracle"));
        assert!(config(&predictor).is_err());

        let mut pool = REQUIRED.to_vec();
        pool.push(("DB_MAX_CONNECTIONS", "many"));
        assert!(config(&pool).is_err());
    }
}
