use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;
use crate::notes::NotePath;
use crate::preferences::Theme;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Hierarchical notebooks with autosave")]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// The directory holding the settings file; relative data paths resolve against it
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Notes document to use instead of the configured one
    #[clap(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Autosave interval for sessions, in milliseconds
    #[clap(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub autosave_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the notes in a notebook
    List {
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Create a note
    Create {
        name: String,
        #[clap(default_value = "")]
        text: String,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Create a sub-note, turning NAME into a notebook if needed
    AddChild {
        name: String,
        child: String,
        #[clap(default_value = "")]
        text: String,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Turn a note into a notebook, keeping its text
    Promote {
        name: String,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    Rename {
        old_name: String,
        new_name: String,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Delete a note or notebook with everything in it
    Delete {
        name: String,
        /// Confirm the deletion
        #[clap(long, short)]
        yes: bool,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Print a note's text
    Show {
        name: String,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Replace a note's text
    Write {
        name: String,
        text: String,
        /// Write a notebook's own text instead of a note's
        #[clap(long)]
        slot: bool,
        #[clap(long, default_value = "/")]
        at: NotePath,
    },
    /// Show or change the theme preference
    Theme {
        #[clap(value_enum)]
        theme: Option<Theme>,
    },
    /// Interactive session with autosave
    Session,
}
