//! Flat key→value settings persisted as a JSON file.
//!
//! Missing keys fall back to defaults; `set` writes the file back so the
//! front-end and the engine always agree on what was last chosen.

use anyhow::{Context, Result};
use gramflow_runner::RunOptions;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Settings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Settings {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gramflow")
            .join("settings.json")
    }

    /// Load from `path`; a missing file means defaults for everything.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading settings file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing settings file {}", path.display()))?
        } else {
            Map::new()
        };
        Ok(Self { path, values })
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.values
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.values
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Update one key and write the file back.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.values.insert(key.into(), value);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating settings dir {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing settings file {}", self.path.display()))?;
        Ok(())
    }

    /// Run options assembled from the settings keys the GUI edits.
    pub fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            parallelism: self.get_u64("parallelism", defaults.parallelism as u64) as usize,
            max_sessions_per_day: self
                .get_u64("max_sessions_per_day", defaults.max_sessions_per_day as u64)
                as u32,
            cooldown_minutes: self.get_u64("cooldown_minutes", defaults.cooldown_minutes as u64)
                as i64,
            message_cooldown_hours: self.get_u64(
                "message_cooldown_hours",
                defaults.message_cooldown_hours as u64,
            ) as i64,
            restart_budget: self.get_u64("restart_budget", defaults.restart_budget as u64) as u32,
            max_steps: self.get_u64("max_steps", defaults.max_steps as u64) as u32,
            step_pause_min_seconds: self
                .get_f64("step_pause_min_seconds", defaults.step_pause_min_seconds),
            step_pause_max_seconds: self
                .get_f64("step_pause_max_seconds", defaults.step_pause_max_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("settings.json")).unwrap();
        let options = settings.run_options();
        assert_eq!(options.parallelism, 2);
        assert_eq!(options.max_sessions_per_day, 5);
    }

    #[test]
    fn set_writes_back_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::load(&path).unwrap();
        settings.set("parallelism", json!(6)).unwrap();
        settings.set("step_pause_min_seconds", json!(0.5)).unwrap();

        let reloaded = Settings::load(&path).unwrap();
        let options = reloaded.run_options();
        assert_eq!(options.parallelism, 6);
        assert!((options.step_pause_min_seconds - 0.5).abs() < f64::EPSILON);
        // Untouched keys still default.
        assert_eq!(options.cooldown_minutes, 30);
    }

    #[test]
    fn unknown_keys_are_preserved_for_the_front_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::load(&path).unwrap();
        settings.set("like_chance_percent", json!(70)).unwrap();

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded.get_u64("like_chance_percent", 0), 70);
    }
}
