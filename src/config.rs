use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "jobfinder.toml";

/// Runtime settings, read from `jobfinder.toml`. Every field has a default so
/// an empty or missing file still gives a working setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Substrings looked up in offer titles and departments.
    pub keywords: Vec<String>,
    /// Location names kept in the report. Empty means all.
    pub locations: Vec<String>,
    /// Companies to crawl. Empty means every stored company.
    pub companies: Vec<String>,
    pub case_sensitive: bool,
    pub database: PathBuf,
    pub companies_file: PathBuf,
    pub report_path: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub open_browser: bool,
    pub clear_old: bool,
    pub stale_after_days: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Extra city translations, merged over the built-in table.
    pub location_aliases: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: [
                "Data", "Data Science", "Analyst", "Intern", "Junior", "Trainee", "Sommar",
                "Summer", "Student",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            locations: Vec::new(),
            companies: Vec::new(),
            case_sensitive: false,
            database: PathBuf::from("db/jobfinder.sqlite"),
            companies_file: PathBuf::from("teamtailor.json"),
            report_path: PathBuf::from("jobs.html"),
            csv_path: None,
            open_browser: true,
            clear_old: true,
            stale_after_days: 7,
            request_timeout_secs: 30,
            user_agent: format!("jobfinder/{}", env!("CARGO_PKG_VERSION")),
            location_aliases: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Loads the file at `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }
}
