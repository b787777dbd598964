use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::config::Settings;

/// Settings with command-line overrides applied and every path made absolute
/// against the root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub data_file: PathBuf,
    pub theme_file: PathBuf,
    pub autosave_interval: Duration,
}

impl RuntimeConfig {
    pub fn resolve(cli: &Cli, settings: Settings) -> Self {
        let data_file = cli.data_file.clone().unwrap_or(settings.data_file);
        let autosave_interval = cli
            .autosave_ms
            .map(Duration::from_millis)
            .unwrap_or(settings.autosave_interval);

        Self {
            data_file: under_root(&cli.root, data_file),
            theme_file: under_root(&cli.root, settings.theme_file),
            autosave_interval,
        }
    }
}

fn under_root(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn relative_paths_resolve_against_root() {
        let cli = Cli::try_parse_from(["notekeeper", "--root", "/srv/notes", "list"]).unwrap();
        let config = RuntimeConfig::resolve(&cli, Settings::default());

        assert_eq!(config.data_file, PathBuf::from("/srv/notes/notebooks_data.json"));
        assert_eq!(config.theme_file, PathBuf::from("/srv/notes/theme.json"));
        assert_eq!(config.autosave_interval, Duration::from_secs(1));
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "notekeeper",
            "--root",
            "/srv/notes",
            "--data-file",
            "/tmp/other.json",
            "--autosave-ms",
            "250",
            "session",
        ])
        .unwrap();
        let settings = Settings {
            data_file: "configured.json".into(),
            theme_file: "look.json".into(),
            autosave_interval: Duration::from_secs(5),
        };
        let config = RuntimeConfig::resolve(&cli, settings);

        assert_eq!(config.data_file, PathBuf::from("/tmp/other.json"));
        assert_eq!(config.theme_file, PathBuf::from("/srv/notes/look.json"));
        assert_eq!(config.autosave_interval, Duration::from_millis(250));
    }
}
