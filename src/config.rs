//! External configuration file.
//!
//! A JSON document listing provider accounts plus the retention counts.
//! The retention block is optional and defaults to 7 dailies, 4 weeklies,
//! and one snapshot per month unlimited.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::RetentionPolicy;
use crate::Result;

/// Credentials for one provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MonthlyRetention;
    use std::io::Write;

    #[test]
    fn missing_retention_block_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "accounts": [
                    {
                        "name": "prod",
                        "access_key_id": "AKIA123",
                        "secret_access_key": "secret"
                    }
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.retention, RetentionPolicy::default());
    }

    #[test]
    fn retention_block_overrides_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "accounts": [],
                "retention": {
                    "hourly": 24,
                    "daily": 14,
                    "weekly": 8,
                    "monthly": 6
                }
            }"#,
        )
        .expect("parse");

        assert_eq!(config.retention.hourly, 24);
        assert_eq!(config.retention.daily, 14);
        assert_eq!(config.retention.weekly, 8);
        assert_eq!(config.retention.monthly, MonthlyRetention::Count(6));
    }

    #[test]
    fn monthly_true_means_unlimited() {
        let config: Config = serde_json::from_str(
            r#"{
                "accounts": [],
                "retention": {
                    "hourly": 0,
                    "daily": 7,
                    "weekly": 4,
                    "monthly": true
                }
            }"#,
        )
        .expect("parse");

        assert_eq!(config.retention.monthly, MonthlyRetention::Unlimited);
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"accounts": [{{"name": "a", "access_key_id": "k", "secret_access_key": "s"}}]}}"#
        )
        .expect("write");

        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.accounts[0].name, "a");
    }

    #[test]
    fn load_surfaces_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "not json").expect("write");
        assert!(Config::load(file.path()).is_err());
    }
}
