use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extension of compiled artifacts, without the dot.
    pub output_extension: String,
    pub source_extension: String,
    /// Artifacts go next to their source when unset.
    pub output_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_extension: String::from("vnb"),
            source_extension: String::from("vns"),
            output_dir: None,
            log_level: String::from("warn"),
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self, CliError> {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<(), CliError> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|e| CliError::io(path, e))
    }

    pub fn get_config_path() -> PathBuf {
        if let Ok(custom) = env::var("VNSC_CONFIG") {
            return PathBuf::from(custom);
        }

        let home = if cfg!(windows) {
            env::var("USERPROFILE")
        } else {
            env::var("HOME")
        };
        PathBuf::from(home.unwrap_or_else(|_| String::from(".")))
            .join(".vnsc")
            .join("config.json")
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(self.source_extension.as_str())
    }

    /// Expands directory inputs to the source files directly inside them, sorted by name.
    /// File inputs are kept as given, whatever their extension.
    pub fn source_files(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
        let mut found = Vec::new();
        for input in inputs {
            if !input.is_dir() {
                found.push(input.clone());
                continue;
            }

            let entries = fs::read_dir(input).map_err(|e| CliError::io(input, e))?;
            let mut sources = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| CliError::io(input, e))?.path();
                if path.is_file() && self.is_source(&path) {
                    sources.push(path);
                }
            }
            if sources.is_empty() {
                log::warn!(
                    "no .{} files found in {}",
                    self.source_extension,
                    input.display()
                );
            }
            sources.sort();
            found.extend(sources);
        }
        Ok(found)
    }

    /// Where the artifact for `source` is written.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let file_name = source
            .with_extension(&self.output_extension)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("out.{}", self.output_extension)));

        match &self.output_dir {
            Some(dir) => dir.join(file_name),
            None => source.with_extension(&self.output_extension),
        }
    }
}
