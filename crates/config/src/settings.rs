use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use gradcheck_recon::transcript::is_valid_student_id;
use tracing::warn;

/// Overrides the directory holding `settings.json`.
pub const CONFIG_DIR_ENV: &str = "GRADCHECK_CONFIG_DIR";

/// User settings persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Last inputs
    #[serde(rename = "document.lastPath")]
    pub last_document_path: Option<PathBuf>,
    #[serde(rename = "student.lastId")]
    pub last_student_id: Option<String>,

    // Storage
    #[serde(rename = "data.dir")]
    pub data_dir: Option<PathBuf>,

    // Engine
    #[serde(rename = "policy.path")]
    pub policy_path: Option<PathBuf>,
}

impl Settings {
    /// Directory holding the settings file
    pub fn config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gradcheck")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Default location for transcripts and snapshots
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gradcheck")
    }

    pub fn effective_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::default_data_dir)
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), "cannot read settings: {e}");
                return Self::default();
            }
        };

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut settings: Settings = match serde_json::from_str(&cleaned) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "invalid settings, using defaults: {e}");
                return Self::default();
            }
        };

        if let Some(id) = settings.last_student_id.as_deref() {
            if !is_valid_student_id(id) {
                warn!(student_id = id, "stored student id is not 14 digits; ignored");
                settings.last_student_id = None;
            }
        }

        settings
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Remember a student id; ids of the wrong shape are not stored.
    pub fn remember_student(&mut self, student_id: &str) -> bool {
        if is_valid_student_id(student_id) {
            self.last_student_id = Some(student_id.to_string());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_default() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::load_from(&dir.path().join("settings.json")), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");

        let mut settings = Settings {
            last_document_path: Some(PathBuf::from("/tmp/plan.docx")),
            data_dir: Some(PathBuf::from("/tmp/data")),
            ..Settings::default()
        };
        assert!(settings.remember_student("20230001000001"));
        settings.save_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"student.lastId\": \"20230001000001\""));
        assert_eq!(Settings::load_from(&path), settings);
        assert_eq!(settings.effective_data_dir(), PathBuf::from("/tmp/data"));
    }

    #[test]
    fn comments_are_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // where transcripts live\n  \"data.dir\": \"/srv/grades\"\n}\n",
        )
        .unwrap();
        assert_eq!(Settings::load_from(&path).data_dir, Some(PathBuf::from("/srv/grades")));
    }

    #[test]
    fn malformed_student_id_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"student.lastId": "12345", "policy.path": "p.toml"}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.last_student_id, None);
        assert_eq!(settings.policy_path, Some(PathBuf::from("p.toml")));

        let mut settings = settings;
        assert!(!settings.remember_student("abc"));
        assert_eq!(settings.last_student_id, None);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
