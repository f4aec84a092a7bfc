use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::DashboardError;

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_STATIC_DIR: &str = "static";

/// Where worksheets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Google Sheets, authenticated with a bearer token issued out-of-band.
    Google {
        spreadsheet_id: String,
        access_token: String,
    },
    /// A directory with one CSV file per worksheet.
    CsvDir(PathBuf),
    /// Empty in-process workbook.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    pub backend: Backend,
    pub static_dir: PathBuf,
}

impl Config {
    /// Read configuration from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, DashboardError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    ///
    /// | key | meaning |
    /// |---|---|
    /// | `DASHBOARD_BIND` | listen address, default `127.0.0.1:3000` |
    /// | `DASHBOARD_BACKEND` | `google`, `csv` or `memory` (default `google`) |
    /// | `SHEETS_SPREADSHEET_ID` | spreadsheet key for `google` |
    /// | `SHEETS_ACCESS_TOKEN` | OAuth bearer token for `google` |
    /// | `DASHBOARD_CSV_DIR` | directory for `csv` |
    /// | `DASHBOARD_STATIC_DIR` | static assets, default `static` |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| DashboardError::Config(format!("{} is not set", key)))
        };

        let bind_text = get("DASHBOARD_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text.parse().map_err(|e| {
            DashboardError::Config(format!("invalid DASHBOARD_BIND '{}': {}", bind_text, e))
        })?;

        let backend = match get("DASHBOARD_BACKEND").as_deref().unwrap_or("google") {
            "google" => Backend::Google {
                spreadsheet_id: require("SHEETS_SPREADSHEET_ID")?,
                access_token: require("SHEETS_ACCESS_TOKEN")?,
            },
            "csv" => Backend::CsvDir(PathBuf::from(require("DASHBOARD_CSV_DIR")?)),
            "memory" => Backend::Memory,
            other => {
                return Err(DashboardError::Config(format!(
                    "unknown DASHBOARD_BACKEND '{}'",
                    other
                )));
            }
        };

        let static_dir = PathBuf::from(
            get("DASHBOARD_STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        );

        Ok(Config {
            bind,
            backend,
            static_dir,
        })
    }
}
