use std::sync::Arc;

use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::cli::output::{format_entries, format_notice};
use crate::cli::{Cli, Command};
use crate::config::{Settings, SettingsError};
use crate::notes::{NodeKind, NoteStore, NoteStoreError};
use crate::preferences::{Theme, ThemeError};
use crate::session::{Session, SessionError, stdin_lines};

pub struct Application;

/// Result of a one-shot command: what to print and whether the tree changed.
#[derive(Debug, PartialEq, Eq)]
struct Outcome {
    output: Vec<String>,
    mutated: bool,
}

impl Outcome {
    fn read(output: Vec<String>) -> Self {
        Self {
            output,
            mutated: false,
        }
    }

    fn changed(message: String) -> Self {
        Self {
            output: vec![message],
            mutated: true,
        }
    }
}

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let settings = Settings::read(&cli.root).await.context(SettingsSnafu)?;
        debug!("Loaded settings: {:?}", settings);
        let config = RuntimeConfig::resolve(&cli, settings);
        debug!("Runtime config: {:?}", config);

        match cli.command {
            Command::Theme { theme } => Self::theme(&config, theme).await,
            Command::Session => Self::session(config).await,
            command => Self::one_shot(&config, &command).await,
        }
    }

    async fn one_shot(config: &RuntimeConfig, command: &Command) -> Result<(), ApplicationError> {
        let mut store = NoteStore::open(&config.data_file)
            .await
            .context(LoadSnafu)?;

        let outcome = apply(&mut store, command)?;
        if outcome.mutated {
            store.save_to(&config.data_file).await.context(SaveSnafu)?;
            info!("Saved notes to {}", config.data_file.display());
        }

        for line in outcome.output {
            println!("{line}");
        }
        Ok(())
    }

    async fn theme(config: &RuntimeConfig, theme: Option<Theme>) -> Result<(), ApplicationError> {
        match theme {
            None => {
                let theme = Theme::load(&config.theme_file).await.context(ThemeSnafu)?;
                println!("{theme}");
            }
            Some(theme) => {
                theme.save(&config.theme_file).await.context(ThemeSnafu)?;
                println!("{}", format_notice(&format!("theme set to {theme}")));
            }
        }
        Ok(())
    }

    async fn session(config: RuntimeConfig) -> Result<(), ApplicationError> {
        let store = NoteStore::open(&config.data_file)
            .await
            .context(LoadSnafu)?;
        let theme = Theme::load(&config.theme_file).await.context(ThemeSnafu)?;

        Session::new(store, Arc::new(config), theme)
            .run(stdin_lines())
            .await
            .context(SessionSnafu)
    }
}

fn apply(store: &mut NoteStore, command: &Command) -> Result<Outcome, ApplicationError> {
    let outcome = match command {
        Command::List { at } => Outcome::read(format_entries(&store.entries(at).context(OperationSnafu)?)),
        Command::Create { name, text, at } => {
            store.create(at, name, text.clone()).context(OperationSnafu)?;
            Outcome::changed(format!("Created '{name}' in {at}"))
        }
        Command::AddChild {
            name,
            child,
            text,
            at,
        } => {
            store
                .create_child(at, name, child, text.clone())
                .context(OperationSnafu)?;
            Outcome::changed(format!("Created '{child}' in {}", at.join(name)))
        }
        Command::Promote { name, at } => {
            store.promote_to_container(at, name).context(OperationSnafu)?;
            Outcome::changed(format!("'{name}' is now a notebook"))
        }
        Command::Rename {
            old_name,
            new_name,
            at,
        } => {
            store.rename(at, old_name, new_name).context(OperationSnafu)?;
            Outcome::changed(format!("Renamed '{old_name}' to '{new_name}'"))
        }
        Command::Delete { name, yes, at } => {
            let kind = store.kind(at, name).context(OperationSnafu)?;
            ensure!(*yes, DeleteNotConfirmedSnafu { name, kind });
            store.delete(at, name).context(OperationSnafu)?;
            Outcome::changed(format!("Deleted {kind} '{name}'"))
        }
        Command::Show { name, at } => {
            let text = store.get_content(at, name).context(OperationSnafu)?;
            Outcome::read(text.lines().map(str::to_string).collect())
        }
        Command::Write {
            name,
            text,
            slot,
            at,
        } => {
            let written = if *slot {
                store.set_slot_content(at, name, text.clone())
            } else {
                store.set_content(at, name, text.clone())
            };
            written.context(OperationSnafu)?;
            Outcome::changed(format!("Updated '{name}'"))
        }
        Command::Theme { .. } | Command::Session => Outcome::read(Vec::new()),
    };
    Ok(outcome)
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while reading settings"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Failed to load the notes"))]
    LoadError { source: NoteStoreError },
    #[snafu(display("Operation failed"))]
    OperationError { source: NoteStoreError },
    #[snafu(display("Failed to save the notes"))]
    SaveError { source: NoteStoreError },
    #[snafu(display("Refusing to delete {} '{}' without --yes", kind, name))]
    DeleteNotConfirmed { name: String, kind: NodeKind },
    #[snafu(display("Failed to access the theme preference"))]
    ThemeError { source: ThemeError },
    #[snafu(display("The interactive session failed"))]
    SessionError { source: SessionError },
}
