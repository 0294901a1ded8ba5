use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use tracing::{debug, info};

pub const DATA_DIR_KEY: &str = "GOURMELIST_DATA_DIR";
pub const API_KEY_KEY: &str = "GOURMELIST_PLACES_API_KEY";

const DATABASE_FILE: &str = "gourmelist.sqlite3";
const DOCUMENTS_DIR: &str = "documents";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub places_api_key: Option<String>,
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Where photo files are written.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_DIR)
    }
}

/// Explicit values from the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub places_api_key: Option<String>,
}

/// Resolves the configuration: overrides, then process environment, then the
/// `.env` file in the working directory, then the platform data directory.
pub fn load(overrides: Overrides) -> Result<AppConfig> {
    load_from(overrides, Path::new(".env"))
}

pub fn load_from(overrides: Overrides, env_path: &Path) -> Result<AppConfig> {
    let env_file = load_env_file(env_path).unwrap_or_default();
    let lookup = |key: &str| {
        std::env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env_file.get(key).cloned())
    };

    let data_dir = match overrides.data_dir.or_else(|| lookup(DATA_DIR_KEY).map(PathBuf::from)) {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let places_api_key = overrides.places_api_key.or_else(|| lookup(API_KEY_KEY));

    debug!("Data directory: {:?}", data_dir);
    if places_api_key.is_none() {
        info!("No places API key configured; place lookups are disabled");
    }
    Ok(AppConfig {
        data_dir,
        places_api_key,
    })
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("app", "GourmeList", "gourmelist")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine a data directory; pass --data-dir"))
}

fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut values = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                DATA_DIR_KEY | API_KEY_KEY => {
                    values.insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => {}
            }
        }
    }
    Ok(values)
}

pub fn save_to_env(path: &Path, config: &AppConfig) -> Result<()> {
    let mut file = File::create(path).context("Failed to create .env file")?;
    writeln!(file, "{}={}", DATA_DIR_KEY, config.data_dir.display())?;
    if let Some(key) = &config.places_api_key {
        writeln!(file, "{}={}", API_KEY_KEY, key)?;
    }
    Ok(())
}
