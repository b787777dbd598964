use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use colored::Colorize;
use futures::stream::FusedStream;
use futures::{Stream, StreamExt, select};
use futures_channel::mpsc::UnboundedReceiver;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::autosave::{AutosaveError, AutosaveEvent, AutosaveScheduler, SchedulerState};
use crate::cli::output::{format_entries, format_error, format_notice};
use crate::notes::{NodeKind, NotePath, NoteStore, NoteStoreError};
use crate::preferences::{Theme, ThemeError};
use crate::session::command::{CommandParseError, HELP, SessionCommand};
use crate::storage::{self, PersistenceError};

/// What the front end prints after one line of input.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            quit: false,
        }
    }

    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn error(error: &(dyn Error + 'static)) -> Self {
        Self::line(format_error(error))
    }

    fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }
}

enum Input {
    Line(Option<String>),
    Autosave(Option<AutosaveEvent>),
}

/// Interactive front end: holds only the current path and a pending
/// confirmation, and reaches the notes exclusively through the store.
pub struct Session {
    store: Arc<Mutex<NoteStore>>,
    config: Arc<RuntimeConfig>,
    autosave: AutosaveScheduler,
    events: UnboundedReceiver<AutosaveEvent>,
    path: NotePath,
    theme: Theme,
    pending_delete: Option<String>,
    last_autosave: Option<AutosaveEvent>,
}

impl Session {
    pub fn new(store: NoteStore, config: Arc<RuntimeConfig>, theme: Theme) -> Self {
        let store = Arc::new(Mutex::new(store));
        let (autosave, events) = AutosaveScheduler::new(
            store.clone(),
            config.data_file.clone(),
            config.autosave_interval,
        );
        Self {
            store,
            config,
            autosave,
            events,
            path: NotePath::root(),
            theme,
            pending_delete: None,
            last_autosave: None,
        }
    }

    /// Processes input lines until `quit` or the end of input, autosaving in
    /// the background, then stops autosave and saves one final time.
    pub async fn run<S>(mut self, mut lines: S) -> Result<(), SessionError>
    where
        S: Stream<Item = String> + FusedStream + Unpin,
    {
        self.autosave.start().context(AutosaveSnafu)?;
        println!("{}", format_notice("type 'help' for commands"));
        self.prompt();

        loop {
            let input = select! {
                line = lines.next() => Input::Line(line),
                event = self.events.next() => Input::Autosave(event),
            };

            match input {
                Input::Line(Some(line)) => {
                    let reply = self.handle_line(&line).await;
                    reply.print();
                    if reply.quit {
                        break;
                    }
                    self.prompt();
                }
                Input::Line(None) => {
                    debug!("Input closed");
                    println!();
                    break;
                }
                Input::Autosave(Some(event)) => {
                    if let Some(line) = self.observe(event) {
                        println!();
                        println!("{line}");
                        self.prompt();
                    }
                }
                Input::Autosave(None) => {}
            }
        }

        self.finish().await
    }

    /// Handles one input line. Every failure becomes a message in the reply.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        if let Some(name) = self.pending_delete.take() {
            return self.confirm_delete(&name, line);
        }

        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(CommandParseError::Empty) => return Reply::default(),
            Err(error) => return Reply::error(&error),
        };
        debug!("Session command: {:?}", command);

        match self.execute(command).await {
            Ok(reply) => reply,
            Err(error) => Reply::error(&error),
        }
    }

    async fn execute(&mut self, command: SessionCommand) -> Result<Reply, CommandError> {
        let reply = match command {
            SessionCommand::List => {
                let entries = self.store().entries(&self.path)?;
                Reply::lines(format_entries(&entries))
            }
            SessionCommand::Enter(name) => {
                let path = self.store().navigate_into(&self.path, &name)?;
                self.path = path;
                Reply::line(self.path.to_string())
            }
            SessionCommand::Up => {
                let path = self.store().navigate_up(&self.path);
                self.path = path;
                Reply::line(self.path.to_string())
            }
            SessionCommand::Top => {
                self.path = NotePath::root();
                Reply::line(self.path.to_string())
            }
            SessionCommand::Pwd => Reply::line(self.path.to_string()),
            SessionCommand::New { name, text } => {
                self.store().create(&self.path, &name, text)?;
                Reply::line(format!("Created '{name}'"))
            }
            SessionCommand::Sub { name, child, text } => {
                self.store().create_child(&self.path, &name, &child, text)?;
                Reply::line(format!("Created '{name}/{child}'"))
            }
            SessionCommand::Promote(name) => {
                self.store().promote_to_container(&self.path, &name)?;
                Reply::line(format!("'{name}' is a notebook"))
            }
            SessionCommand::Rename { old_name, new_name } => {
                self.store().rename(&self.path, &old_name, &new_name)?;
                Reply::line(format!("Renamed '{old_name}' to '{new_name}'"))
            }
            SessionCommand::Remove(name) => {
                let kind = self.store().kind(&self.path, &name)?;
                let question = match kind {
                    NodeKind::Container => {
                        let inside = self.store().list_children(&self.path.join(&name))?;
                        let contents = match inside.len() {
                            0 => "nothing".to_string(),
                            1 => "1 entry".to_string(),
                            count => format!("{count} entries"),
                        };
                        format!("Delete notebook '{name}' with {contents} inside? [y/N]")
                    }
                    NodeKind::Leaf => format!("Delete note '{name}'? [y/N]"),
                };
                self.pending_delete = Some(name);
                Reply::line(question)
            }
            SessionCommand::Show(name) => {
                let store = self.store();
                let text = store.get_content(&self.path, &name)?;
                if text.is_empty() {
                    Reply::line("(no text)".dimmed().to_string())
                } else {
                    Reply::lines(text.lines().map(str::to_string).collect())
                }
            }
            SessionCommand::Set { name, text } => {
                self.store().set_content(&self.path, &name, text)?;
                Reply::line(format!("Updated '{name}'"))
            }
            SessionCommand::Slot { name, text } => {
                self.store().set_slot_content(&self.path, &name, text)?;
                Reply::line(format!("Updated notebook '{name}'"))
            }
            SessionCommand::Theme(None) => Reply::line(format!("Theme: {}", self.theme)),
            SessionCommand::Theme(Some(theme)) => self.set_theme(theme).await?,
            SessionCommand::ToggleTheme => self.set_theme(self.theme.toggled()).await?,
            SessionCommand::Status => Reply::line(self.status()),
            SessionCommand::Save => {
                self.save_now().await?;
                Reply::line("Saved")
            }
            SessionCommand::Help => Reply::lines(HELP.iter().map(|line| line.to_string()).collect()),
            SessionCommand::Quit => Reply {
                lines: Vec::new(),
                quit: true,
            },
        };
        Ok(reply)
    }

    async fn set_theme(&mut self, theme: Theme) -> Result<Reply, ThemeError> {
        theme.save(&self.config.theme_file).await?;
        self.theme = theme;
        Ok(Reply::line(format!("Theme set to {theme}")))
    }

    fn confirm_delete(&mut self, name: &str, answer: &str) -> Reply {
        let answer = answer.trim();
        if !(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")) {
            return Reply::line(format!("Kept '{name}'"));
        }

        match self.store().delete(&self.path, name) {
            Ok(_) => Reply::line(format!("Deleted '{name}'")),
            Err(error) => Reply::error(&error),
        }
    }

    /// Records an autosave outcome and returns a line worth showing right away.
    fn observe(&mut self, event: AutosaveEvent) -> Option<String> {
        let recovered = matches!(self.last_autosave, Some(AutosaveEvent::Failed { .. }));
        let line = match &event {
            AutosaveEvent::Failed { message, .. } => {
                Some(format!("{} {}", "autosave failed:".red().bold(), message))
            }
            AutosaveEvent::Saved { .. } if recovered => Some(format_notice("autosave recovered")),
            AutosaveEvent::Saved { .. } => None,
        };
        self.last_autosave = Some(event);
        line
    }

    fn status(&self) -> String {
        let last = match &self.last_autosave {
            None => "no autosave yet".to_string(),
            Some(AutosaveEvent::Saved { tick }) => format!("last autosave #{tick} succeeded"),
            Some(AutosaveEvent::Failed { tick, message }) => {
                format!("last autosave #{tick} failed: {message}")
            }
        };
        let state = match self.autosave.state() {
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        };
        format!(
            "Autosave {} every {:?} to {}; {}",
            state,
            self.autosave.period(),
            self.config.data_file.display(),
            last
        )
    }

    async fn save_now(&self) -> Result<(), PersistenceError> {
        let snapshot = self.store().snapshot();
        storage::save(&snapshot, &self.config.data_file).await
    }

    async fn finish(mut self) -> Result<(), SessionError> {
        if let Err(error) = self.autosave.stop().await {
            warn!("Stopping autosave: {}", error);
        }
        self.save_now().await.context(FinalSaveSnafu)?;
        info!("Session ended, notes saved");
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, NoteStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prompt(&self) {
        print!("{} {} ", self.path.to_string().bold(), ">".dimmed());
        let _ = std::io::stdout().flush();
    }
}

#[derive(Debug, Snafu)]
enum CommandError {
    #[snafu(transparent)]
    Store { source: NoteStoreError },
    #[snafu(transparent)]
    Theme { source: ThemeError },
    #[snafu(transparent)]
    Persistence { source: PersistenceError },
}

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("Failed to start autosave"))]
    AutosaveError { source: AutosaveError },
    #[snafu(display("Failed to save the notes when leaving the session"))]
    FinalSaveError { source: PersistenceError },
}
