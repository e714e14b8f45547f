use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Level applied to categories without their own entry
    pub global: String,
    /// Category name -> level, e.g. "display": "debug"
    pub categories: BTreeMap<String, String>,
    /// Messages per second per category
    pub rate_limit: usize,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            global: "warn".to_string(),
            categories: BTreeMap::new(),
            rate_limit: 120,
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Screen mode the VDP starts in; the subsystem default when unset
    pub startup_mode: Option<u32>,
    pub frame_rate_hz: f64,
    /// Sleep between VDP service ticks
    pub vdp_tick_interval_us: u64,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            startup_mode: None,
            frame_rate_hz: 60.0,
            vdp_tick_interval_us: 1000,
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json, falling back to defaults on error
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            // Missing file is the normal first-run case
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.startup_mode, None);
        assert_eq!(settings.frame_rate_hz, 60.0);
        assert_eq!(settings.log.global, "warn");
        assert_eq!(settings.log.rate_limit, 120);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "startup_mode": 8, "log": { "categories": { "display": "debug" } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.startup_mode, Some(8));
        assert_eq!(settings.vdp_tick_interval_us, 1000);
        assert_eq!(settings.log.global, "warn");
        assert_eq!(
            settings.log.categories.get("display").map(String::as_str),
            Some("debug")
        );
    }

    #[test]
    fn test_settings_save_load() {
        let test_dir = std::env::temp_dir().join("vdp_cli_test_settings");
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("config.json");

        let settings = Settings {
            startup_mode: Some(18),
            frame_rate_hz: 50.0,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_bad_config_uses_defaults() {
        let test_dir = std::env::temp_dir().join("vdp_cli_test_bad_settings");
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(
            Settings::load_from(&test_dir.join("missing.json")),
            Settings::default()
        );

        fs::remove_dir_all(&test_dir).unwrap();
    }
}
