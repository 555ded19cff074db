use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::calendar::CalendarOptions;
use crate::timetable::TableGeometry;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ORGANIZER: &str = "TIMETABLE_ORGANIZER";
pub const ENV_UID_DOMAIN: &str = "TIMETABLE_UID_DOMAIN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub bot_token: Option<String>,
    /// Port of the health check listener
    pub port: u16,
    pub organizer: Option<String>,
    pub uid_domain: String,
    pub geometry: TableGeometry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            port: 8080,
            organizer: None,
            uid_domain: "timetable-ics.local".into(),
            geometry: TableGeometry::default(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by the JSON file at `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings
            .geometry
            .validate()
            .with_context(|| format!("Invalid geometry in {}", path.display()))?;
        Ok(settings)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = lookup(ENV_BOT_TOKEN) {
            self.bot_token = Some(token);
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} must be a port number, got '{port}'"))?;
        }
        if let Some(organizer) = lookup(ENV_ORGANIZER) {
            self.organizer = Some(organizer);
        }
        if let Some(domain) = lookup(ENV_UID_DOMAIN) {
            self.uid_domain = domain;
        }
        Ok(())
    }

    pub fn bot_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow!("{ENV_BOT_TOKEN} environment variable is required"))
    }

    pub fn calendar_options(&self) -> CalendarOptions {
        CalendarOptions {
            organizer: self.organizer.clone(),
            uid_domain: self.uid_domain.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_overrides_defaults() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                (ENV_BOT_TOKEN, "123:abc"),
                (ENV_PORT, "9000"),
                (ENV_ORGANIZER, ""),
            ]))
            .unwrap();

        assert_eq!(settings.bot_token().unwrap(), "123:abc");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.organizer, None);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(env(&[(ENV_PORT, "http")])).is_err());
    }

    #[test]
    fn missing_token_is_reported() {
        let err = Settings::default().bot_token().unwrap_err();
        assert!(err.to_string().contains(ENV_BOT_TOKEN));
    }

    #[test]
    fn file_settings_merge_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"organizer": "me@example.com", "geometry": {{"block_height": 23}}}}"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();

        assert_eq!(settings.organizer.as_deref(), Some("me@example.com"));
        assert_eq!(settings.geometry.block_height, 23);
        assert_eq!(settings.geometry.first_slot_offset, 2);
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn file_with_unusable_geometry_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"geometry": {{"slot_minutes": 9223372036854775807}}}}"#).unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();

        assert!(format!("{err:#}").contains("slot_minutes"));
    }
}
