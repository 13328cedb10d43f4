use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "studysync")]
#[command(version, about = "Study reminders with Wi-Fi and Bluetooth sync to a companion device")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new studysync project in the current directory
    Init,

    /// Add a new note
    Add {
        /// Note text
        text: String,

        /// Subject label
        #[arg(long, short = 's', default_value = "General")]
        subject: String,

        /// Priority label (low, normal, high, ...)
        #[arg(long, short = 'p', default_value = "normal")]
        priority: String,

        /// Due date
        #[arg(long)]
        due_date: Option<String>,

        /// Due time
        #[arg(long)]
        due_time: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes, newest first
    List {
        /// Keep insertion order instead of newest first
        #[arg(long)]
        canonical: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note by ID (or ID prefix), or by its position in `list`
    Delete {
        /// Note ID or unique ID prefix
        #[arg(required_unless_present = "index", conflicts_with = "index")]
        id: Option<String>,

        /// Zero-based position in the newest-first listing
        #[arg(long)]
        index: Option<usize>,
    },

    /// Delete all notes
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Write all notes to a JSON document
    Export {
        /// Output path ("-" for stdout)
        #[arg(long, short = 'o', default_value = "study-notes.json")]
        output: PathBuf,
    },

    /// Send notes to the device
    Sync(SyncCommand),

    /// Query the device's status endpoint
    DeviceStatus,

    /// Show note count, storage health and device settings
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub action: SyncAction,
}

#[derive(Subcommand, Debug)]
pub enum SyncAction {
    /// POST all notes to the device over Wi-Fi
    Wifi,

    /// Connect to the device over Bluetooth
    Bluetooth {
        /// Write the note count once connected
        #[arg(long)]
        send_count: bool,
    },

    /// Run Wi-Fi and Bluetooth sync side by side
    All {
        /// Write the note count once connected over Bluetooth
        #[arg(long)]
        send_count: bool,
    },
}
