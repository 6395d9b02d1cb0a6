use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::errors::AppError;
use crate::models::StayWindow;

const DEFAULT_LEDGER_FILE: &str = "history.csv";
const DEFAULT_BASE_URL: &str = "https://example.com/path";
const DEFAULT_STAY_START: &str = "2026-12-13";
const DEFAULT_STAY_END: &str = "2026-12-19";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_KIDS: u32 = 2;
const DEFAULT_BIRTHDATES: [&str; 2] = ["2015-05-08", "2018-07-08"];
// The observation date follows the booking site's calendar day.
const DEFAULT_TIMEZONE: Tz = Tz::America__New_York;

/// Where the ledger lives. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local { path: PathBuf },
    ObjectStore { bucket: String, key: String, region: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub base_url: String,
    pub stay: StayWindow,
    /// One per kid, sent with the query.
    pub birthdates: Vec<String>,
    pub timezone: Tz,
    /// Empty disables notifications.
    pub recipients: Vec<String>,
    /// `None` when SMTP settings are incomplete.
    pub smtp: Option<SmtpConfig>,
    pub dashboard_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let storage = resolve_storage(&get)?;

        let start = parse_date("STAY_START_DATE", get("STAY_START_DATE").as_deref().unwrap_or(DEFAULT_STAY_START))?;
        let end = parse_date("STAY_END_DATE", get("STAY_END_DATE").as_deref().unwrap_or(DEFAULT_STAY_END))?;
        if end < start {
            return Err(AppError::Config(format!(
                "STAY_END_DATE {} is before STAY_START_DATE {}",
                end, start
            )));
        }

        let stay = StayWindow {
            start,
            end,
            adults: parse_number("PARTY_ADULTS", get("PARTY_ADULTS"), 2)?,
            kids: parse_number("PARTY_KIDS", get("PARTY_KIDS"), DEFAULT_KIDS)?,
        };

        let birthdates = match get("PARTY_BIRTHDATES") {
            Some(raw) => split_csv_list(&raw),
            None => DEFAULT_BIRTHDATES.iter().map(|d| d.to_string()).collect(),
        };
        for birthdate in &birthdates {
            parse_date("PARTY_BIRTHDATES", birthdate)?;
        }
        if birthdates.len() != stay.kids as usize {
            return Err(AppError::Config(format!(
                "PARTY_BIRTHDATES lists {} date(s) but PARTY_KIDS is {}",
                birthdates.len(),
                stay.kids
            )));
        }

        let timezone = match get("PRICE_CHECK_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                AppError::Config(format!("Invalid PRICE_CHECK_TIMEZONE: {}", name))
            })?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            storage,
            base_url: get("PRICE_MONITOR_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            stay,
            birthdates,
            timezone,
            recipients: get("PRICE_ALERT_EMAILS")
                .map(|raw| split_csv_list(&raw))
                .unwrap_or_default(),
            smtp: resolve_smtp(&get)?,
            dashboard_url: get("DASHBOARD_URL"),
        })
    }

    /// Calendar date of a check run at `now`, in the configured time zone.
    pub fn observation_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

/// Split a comma-separated setting, dropping blank entries.
pub fn split_csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_storage<G>(get: &G) -> Result<StorageBackend, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    let bucket = get("S3_BUCKET");
    let selector = get("LEDGER_STORAGE").map(|s| s.to_lowercase());

    let use_object_store = match selector.as_deref() {
        Some("local") => false,
        Some("s3") => true,
        None => bucket.is_some(),
        Some(other) => {
            return Err(AppError::Config(format!(
                "Invalid LEDGER_STORAGE: {}. Must be 'local' or 's3'",
                other
            )))
        }
    };

    if use_object_store {
        let bucket = bucket.ok_or_else(|| {
            AppError::Config("LEDGER_STORAGE is s3 but S3_BUCKET is not set".to_string())
        })?;
        Ok(StorageBackend::ObjectStore {
            bucket,
            key: get("LEDGER_KEY").unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string()),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    } else {
        Ok(StorageBackend::Local {
            path: PathBuf::from(get("LEDGER_PATH").unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string())),
        })
    }
}

fn resolve_smtp<G>(get: &G) -> Result<Option<SmtpConfig>, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    let (host, username, password) = match (get("SMTP_HOST"), get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
        (Some(host), Some(username), Some(password)) => (host, username, password),
        _ => return Ok(None),
    };

    Ok(Some(SmtpConfig {
        port: parse_number("SMTP_PORT", get("SMTP_PORT"), 587)?,
        from_email: get("SMTP_FROM_EMAIL").unwrap_or_else(|| username.clone()),
        from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| "Price Monitor".to_string()),
        host,
        username,
        password,
    }))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Config(format!("Invalid date for {}: {} (format: YYYY-MM-DD)", key, value))
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, AppError> {
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.storage, StorageBackend::Local { path: PathBuf::from("history.csv") });
        assert_eq!(config.stay.start, NaiveDate::from_ymd_opt(2026, 12, 13).unwrap());
        assert_eq!(config.stay.end, NaiveDate::from_ymd_opt(2026, 12, 19).unwrap());
        assert_eq!(config.stay.adults, 2);
        assert_eq!(config.stay.kids, 2);
        assert!(config.recipients.is_empty());
        assert!(config.smtp.is_none());
        assert_eq!(config.birthdates, vec!["2015-05-08", "2018-07-08"]);
        assert_eq!(config.timezone, Tz::America__New_York);
    }

    #[test]
    fn test_birthdates_must_match_kids() {
        let config = config_from(&[("PARTY_KIDS", "1"), ("PARTY_BIRTHDATES", "2016-01-02")]).unwrap();
        assert_eq!(config.birthdates, vec!["2016-01-02"]);

        let config = config_from(&[("PARTY_KIDS", "0"), ("PARTY_BIRTHDATES", " , ")]).unwrap();
        assert!(config.birthdates.is_empty());

        assert!(matches!(config_from(&[("PARTY_KIDS", "0")]), Err(AppError::Config(_))));
        assert!(matches!(
            config_from(&[("PARTY_BIRTHDATES", "2016-01-02")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("PARTY_BIRTHDATES", "2016-01-02,08/07/2018")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_split_csv_list() {
        assert_eq!(
            split_csv_list(" a@example.com, ,b@example.com,"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(split_csv_list("").is_empty());
        assert!(split_csv_list(" , ").is_empty());
    }

    #[test]
    fn test_bucket_selects_object_store() {
        let config = config_from(&[("S3_BUCKET", "prices")]).unwrap();
        assert_eq!(
            config.storage,
            StorageBackend::ObjectStore {
                bucket: "prices".to_string(),
                key: "history.csv".to_string(),
                region: "us-east-1".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_local_overrides_bucket() {
        let config = config_from(&[
            ("S3_BUCKET", "prices"),
            ("LEDGER_STORAGE", "local"),
            ("LEDGER_PATH", "/tmp/ledger.csv"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Local { path: PathBuf::from("/tmp/ledger.csv") });
    }

    #[test]
    fn test_s3_without_bucket_is_error() {
        assert!(matches!(config_from(&[("LEDGER_STORAGE", "s3")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("LEDGER_STORAGE", "ftp")]), Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_stay_dates() {
        assert!(config_from(&[("STAY_START_DATE", "12/13/2026")]).is_err());
        assert!(config_from(&[
            ("STAY_START_DATE", "2026-12-19"),
            ("STAY_END_DATE", "2026-12-13"),
        ])
        .is_err());
    }

    #[test]
    fn test_recipients_and_smtp() {
        let config = config_from(&[
            ("PRICE_ALERT_EMAILS", "a@example.com, b@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "monitor@example.com"),
            ("SMTP_PASSWORD", "secret"),
        ])
        .unwrap();

        assert_eq!(config.recipients.len(), 2);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from_email, "monitor@example.com");
    }

    #[test]
    fn test_observation_date_in_winter() {
        let config = config_from(&[]).unwrap();
        // 03:00 UTC is still the previous day in EST.
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 0).unwrap();
        assert_eq!(config.observation_date(now), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_observation_date_follows_daylight_saving() {
        let config = config_from(&[]).unwrap();
        // 04:30 UTC is 00:30 EDT on Jul 1.
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 4, 30, 0).unwrap();
        assert_eq!(config.observation_date(now), NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());

        // 03:30 UTC is still Jun 30 in New York.
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 3, 30, 0).unwrap();
        assert_eq!(config.observation_date(now), NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[test]
    fn test_timezone_setting() {
        let config = config_from(&[("PRICE_CHECK_TIMEZONE", "Europe/Berlin")]).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 22, 30, 0).unwrap();
        assert_eq!(config.observation_date(now), NaiveDate::from_ymd_opt(2026, 7, 2).unwrap());

        assert!(matches!(
            config_from(&[("PRICE_CHECK_TIMEZONE", "Mars/Olympus")]),
            Err(AppError::Config(_))
        ));
    }
}
