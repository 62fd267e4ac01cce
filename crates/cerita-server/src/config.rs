use std::path::PathBuf;

use chrono::{FixedOffset, Local, Offset};

/// Secrets shipped in `.env.example` that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is unset or still a placeholder")]
    MissingSecret(&'static str),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { dir: PathBuf, public_url: String },
    Supabase { url: String, service_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub teacher_code: String,
    pub cookie_secure: bool,
    pub utc_offset: FixedOffset,
    pub storage: StorageConfig,
    pub static_dir: Option<PathBuf>,
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = get("CERITA_JWT_SECRET")
            .filter(|s| !PLACEHOLDER_SECRETS.contains(&s.as_str()))
            .ok_or(ConfigError::MissingSecret("CERITA_JWT_SECRET"))?;
        let teacher_code = get("CERITA_TEACHER_CODE").ok_or(ConfigError::Missing("CERITA_TEACHER_CODE"))?;

        let port = match get("CERITA_PORT") {
            Some(v) => parse("CERITA_PORT", v)?,
            None => 3000,
        };
        let cookie_secure = match get("CERITA_COOKIE_SECURE") {
            Some(v) => parse_bool("CERITA_COOKIE_SECURE", v)?,
            None => false,
        };
        let utc_offset = match get("CERITA_UTC_OFFSET_MINUTES") {
            Some(v) => {
                let minutes: i32 = parse("CERITA_UTC_OFFSET_MINUTES", v.clone())?;
                minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or(ConfigError::Invalid {
                        key: "CERITA_UTC_OFFSET_MINUTES",
                        value: v,
                    })?
            }
            None => Local::now().offset().fix(),
        };

        let storage = match get("CERITA_STORAGE").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                dir: get("CERITA_STORAGE_DIR").unwrap_or_else(|| "./uploads".into()).into(),
                public_url: get("CERITA_PUBLIC_URL").unwrap_or_default(),
            },
            "supabase" => StorageConfig::Supabase {
                url: get("CERITA_SUPABASE_URL").ok_or(ConfigError::Missing("CERITA_SUPABASE_URL"))?,
                service_key: get("CERITA_SUPABASE_SERVICE_KEY")
                    .ok_or(ConfigError::Missing("CERITA_SUPABASE_SERVICE_KEY"))?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "CERITA_STORAGE",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            host: get("CERITA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("CERITA_DB_PATH").unwrap_or_else(|| "cerita.db".into()).into(),
            jwt_secret,
            teacher_code,
            cookie_secure,
            utc_offset,
            storage,
            static_dir: get("CERITA_STATIC_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[("CERITA_JWT_SECRET", "s3cret"), ("CERITA_TEACHER_CODE", "GURU")];

    #[test]
    fn defaults() {
        let cfg = config(REQUIRED).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("cerita.db"));
        assert!(!cfg.cookie_secure);
        assert!(cfg.static_dir.is_none());
        assert!(matches!(cfg.storage, StorageConfig::Local { .. }));
    }

    #[test]
    fn rejects_placeholder_secret() {
        let err = config(&[
            ("CERITA_JWT_SECRET", "dev-secret-change-me"),
            ("CERITA_TEACHER_CODE", "GURU"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(_)));
        assert!(matches!(
            config(&[("CERITA_JWT_SECRET", "s3cret")]).unwrap_err(),
            ConfigError::Missing("CERITA_TEACHER_CODE")
        ));
    }

    #[test]
    fn explicit_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("CERITA_UTC_OFFSET_MINUTES", "420"),
            ("CERITA_COOKIE_SECURE", "true"),
            ("CERITA_STORAGE", "supabase"),
            ("CERITA_SUPABASE_URL", "https://x.supabase.co"),
            ("CERITA_SUPABASE_SERVICE_KEY", "key"),
        ]);
        let cfg = config(&pairs).unwrap();
        assert_eq!(cfg.utc_offset.local_minus_utc(), 7 * 3600);
        assert!(cfg.cookie_secure);
        assert_eq!(
            cfg.storage,
            StorageConfig::Supabase {
                url: "https://x.supabase.co".into(),
                service_key: "key".into(),
            }
        );
    }

    #[test]
    fn supabase_needs_credentials() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CERITA_STORAGE", "supabase"));
        assert!(matches!(config(&pairs).unwrap_err(), ConfigError::Missing("CERITA_SUPABASE_URL")));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CERITA_PORT", "lots"));
        assert!(matches!(config(&pairs).unwrap_err(), ConfigError::Invalid { key: "CERITA_PORT", .. }));
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        for minutes in ["2147483647", "-2147483648", "1440"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("CERITA_UTC_OFFSET_MINUTES", minutes));
            assert!(
                matches!(
                    config(&pairs).unwrap_err(),
                    ConfigError::Invalid {
                        key: "CERITA_UTC_OFFSET_MINUTES",
                        ..
                    }
                ),
                "{minutes}"
            );
        }
    }
}
