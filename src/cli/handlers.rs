use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::app::{App, DATA_DIR};
use crate::entity::{Note, NoteFields};
use crate::error::{Result, StudySyncError};
use crate::export::export_document;
use crate::sync::{SyncStatus, WirelessStatus};

/// Find the project root by looking for .studysync/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(DATA_DIR).is_dir() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_app() -> Result<App> {
    App::open(&find_project_root())
}

/// Sync commands run on a single-threaded runtime.
fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn print_note(position: usize, note: &Note) {
    println!("  [{}] ({}) {}", position, note.short_id(), note.text);
    println!("      {} | Priority: {}", note.subject, note.priority);
    println!("      {} | {}", note.created_label(), note.due_label());
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;
    let dir = App::init(&root)?;
    println!("Initialized studysync project in {}", root.display());
    println!("  Edit {} to point at your device.", dir.join("config.json").display());
    Ok(())
}

pub fn handle_add(
    text: String,
    subject: String,
    priority: String,
    due_date: Option<String>,
    due_time: Option<String>,
    json: bool,
) -> Result<()> {
    let mut app = open_app()?;

    let fields = NoteFields::new(text)
        .subject(subject)
        .priority(priority)
        .due(due_date, due_time);
    let note = app.add_note(fields)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Note saved locally ({}) - {}", note.short_id(), note.text);
    }

    let health = app.storage_health();
    if !health.is_ok() {
        eprintln!("Warning: {}", health);
    }

    Ok(())
}

pub fn handle_list(canonical: bool, json: bool) -> Result<()> {
    let app = open_app()?;

    let notes = if canonical {
        app.store.list().to_vec()
    } else {
        app.notes_for_display()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes yet. Add one with 'studysync add'.");
    } else {
        println!("Notes:\n");
        for (position, note) in notes.iter().enumerate() {
            print_note(position, note);
        }
    }

    Ok(())
}

pub fn handle_delete(id: Option<String>, index: Option<usize>) -> Result<()> {
    let mut app = open_app()?;

    let removed = match (id, index) {
        (Some(id), _) => {
            let full_id = app.store.find(&id)?.id.clone();
            app.store.delete_by_id(&full_id)?
        }
        (None, Some(index)) => app.store.delete_at(index)?,
        (None, None) => {
            return Err(StudySyncError::Validation(
                "Give a note ID or --index".to_string(),
            ))
        }
    };

    println!("Deleted note ({}) - {}", removed.short_id(), removed.text);
    Ok(())
}

pub fn handle_clear(force: bool) -> Result<()> {
    let mut app = open_app()?;

    if app.store.is_empty() {
        println!("No notes to delete.");
        return Ok(());
    }

    if !force {
        eprintln!(
            "Delete all {} notes? This cannot be undone. [y/N] ",
            app.store.len()
        );

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(StudySyncError::Validation(
                "Use --force to clear notes in non-interactive mode".to_string(),
            ));
        }
    }

    let count = app.store.len();
    app.store.clear_all();
    println!("Deleted {} notes.", count);
    Ok(())
}

pub fn handle_export(output: PathBuf) -> Result<()> {
    let app = open_app()?;

    if output == Path::new("-") {
        let bytes = export_document(app.store.list())?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&bytes)?;
        writeln!(stdout)?;
        return Ok(());
    }

    app.export_to(&output)?;
    println!(
        "Exported {} notes to {}",
        app.store.len(),
        output.display()
    );
    Ok(())
}

pub fn handle_sync_wifi() -> Result<()> {
    let app = open_app()?;

    println!("{}", SyncStatus::InProgress);
    let outcome = runtime()?.block_on(app.sync_wifi());
    println!("{}", app.network.status());

    outcome.map(|_| ())
}

pub fn handle_sync_bluetooth(send_count: bool) -> Result<()> {
    let rt = runtime()?;
    let app = rt.block_on(App::open_with_host_wireless(&find_project_root()))?;

    println!("{}", WirelessStatus::Connecting);
    let outcome = rt.block_on(app.connect_bluetooth(send_count));
    println!("{}", app.wireless.status());

    outcome.map(|_| ())
}

pub fn handle_sync_all(send_count: bool) -> Result<()> {
    let rt = runtime()?;
    let app = rt.block_on(App::open_with_host_wireless(&find_project_root()))?;

    let (wifi, bluetooth) = rt.block_on(app.sync_all(send_count));
    println!("{}", app.network.status());
    println!("{}", app.wireless.status());

    wifi?;
    bluetooth.map(|_| ())
}

pub fn handle_device_status() -> Result<()> {
    let app = open_app()?;

    let status = runtime()?.block_on(app.network.device_status())?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub fn handle_status(json: bool) -> Result<()> {
    let app = open_app()?;
    let health = app.storage_health();

    if json {
        let value = serde_json::json!({
            "notes": app.store.len(),
            "storage_ok": health.is_ok(),
            "storage": health.to_string(),
            "sync_endpoint": app.network.endpoint(),
            "bluetooth_prefix": app.config.wireless.name_prefix,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Notes:      {}", app.store.len());
        println!("Storage:    {}", health);
        println!("Sync URL:   {}", app.network.endpoint());
        println!("Bluetooth:  name prefix \"{}\"", app.config.wireless.name_prefix);
    }

    Ok(())
}
