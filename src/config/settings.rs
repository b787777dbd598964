use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::autosave::DEFAULT_AUTOSAVE_INTERVAL;
use crate::ext::PathExt;

const SETTINGS_FILE_NAME: &str = "notekeeper.yaml";
const DEFAULT_DATA_FILE: &str = "notebooks_data.json";
const DEFAULT_THEME_FILE: &str = "theme.json";

const DATA_FILE_KEY: &str = "data_file";
const THEME_FILE_KEY: &str = "theme_file";
const AUTOSAVE_INTERVAL_KEY: &str = "autosave_interval_ms";

pub fn get_settings_file_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

/// Values from `notekeeper.yaml`. Paths are kept as written; relative ones are
/// resolved against the root directory by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_file: PathBuf,
    pub theme_file: PathBuf,
    pub autosave_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            theme_file: PathBuf::from(DEFAULT_THEME_FILE),
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
        }
    }
}

impl Settings {
    pub async fn read(root: &Path) -> Result<Self, SettingsError> {
        Self::from_path(get_settings_file_path(root)).await
    }

    /// Reads settings from `path`, falling back to defaults when the file does not exist.
    pub async fn from_path(path: PathBuf) -> Result<Self, SettingsError> {
        debug!("Reading settings file: {}", path.best_effort_path_display());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::ReadError {
                    file_path: path.best_effort_path_display(),
                    source,
                });
            }
        };

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn apply_entries(
        mut self,
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Self, SettingsError> {
        if let Some(value) = top_level.get(&key(DATA_FILE_KEY)) {
            self.data_file = path_value(DATA_FILE_KEY, value)?;
        }
        if let Some(value) = top_level.get(&key(THEME_FILE_KEY)) {
            self.theme_file = path_value(THEME_FILE_KEY, value)?;
        }
        if let Some(value) = top_level.get(&key(AUTOSAVE_INTERVAL_KEY)) {
            self.autosave_interval = interval_value(value)?;
        }

        for unknown in top_level.keys().filter(|candidate| {
            ![DATA_FILE_KEY, THEME_FILE_KEY, AUTOSAVE_INTERVAL_KEY]
                .iter()
                .any(|known| **candidate == key(known))
        }) {
            debug!("Skipping unknown settings entry: {:?}", unknown);
        }

        Ok(self)
    }
}

impl TryFrom<&str> for Settings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
        Self::default().apply_entries(top_level)
    }
}

fn key(name: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

fn path_value(name: &'static str, value: &Yaml) -> Result<PathBuf, SettingsError> {
    match value.as_str() {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => InvalidValueSnafu {
            key: name,
            expected: "a non-empty path",
        }
        .fail(),
    }
}

fn interval_value(value: &Yaml) -> Result<Duration, SettingsError> {
    match value {
        Yaml::Value(Scalar::Integer(millis)) if *millis > 0 => {
            Ok(Duration::from_millis(*millis as u64))
        }
        _ => InvalidValueSnafu {
            key: AUTOSAVE_INTERVAL_KEY,
            expected: "a positive number of milliseconds",
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The settings file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Setting '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn missing_file_gives_defaults() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let settings = Settings::read(dir.path()).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[compio::test]
    async fn reads_file_from_root() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            get_settings_file_path(dir.path()),
            "data_file: notes/all.json\nautosave_interval_ms: 250\n",
        )
        .unwrap();

        let settings = Settings::read(dir.path()).await.unwrap();

        assert_eq!(settings.data_file, PathBuf::from("notes/all.json"));
        assert_eq!(settings.theme_file, PathBuf::from(DEFAULT_THEME_FILE));
        assert_eq!(settings.autosave_interval, Duration::from_millis(250));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings: Settings = "".try_into().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn all_keys_are_read() {
        let yaml = r#"
data_file: /var/notes/data.json
theme_file: prefs/theme.json
autosave_interval_ms: 5000
"#;
        let settings: Settings = yaml.try_into().unwrap();
        assert_eq!(settings.data_file, PathBuf::from("/var/notes/data.json"));
        assert_eq!(settings.theme_file, PathBuf::from("prefs/theme.json"));
        assert_eq!(settings.autosave_interval, Duration::from_secs(5));
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let settings: Settings = "colour: blue\nautosave_interval_ms: 10".try_into().unwrap();
        assert_eq!(settings.autosave_interval, Duration::from_millis(10));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let result: Result<Settings, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn non_map_top_level_is_rejected(#[case] yaml: &str) {
        let result: Result<Settings, _> = yaml.try_into();
        assert!(matches!(result, Err(SettingsError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("autosave_interval_ms: 0")]
    #[case("autosave_interval_ms: -5")]
    #[case("autosave_interval_ms: fast")]
    #[case("autosave_interval_ms: 1.5")]
    #[case("data_file: [a, b]")]
    #[case("theme_file: ''")]
    fn invalid_values_are_rejected(#[case] yaml: &str) {
        let result: Result<Settings, _> = yaml.try_into();
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }
}
