use clap::Parser;
use studysync::cli::{
    handle_add, handle_clear, handle_delete, handle_device_status, handle_export, handle_init,
    handle_list, handle_status, handle_sync_all, handle_sync_bluetooth, handle_sync_wifi, Cli,
    Commands, SyncAction,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Add {
            text,
            subject,
            priority,
            due_date,
            due_time,
            json,
        } => handle_add(text, subject, priority, due_date, due_time, json),
        Commands::List { canonical, json } => handle_list(canonical, json),
        Commands::Delete { id, index } => handle_delete(id, index),
        Commands::Clear { force } => handle_clear(force),
        Commands::Export { output } => handle_export(output),
        Commands::Sync(sync_cmd) => match sync_cmd.action {
            SyncAction::Wifi => handle_sync_wifi(),
            SyncAction::Bluetooth { send_count } => handle_sync_bluetooth(send_count),
            SyncAction::All { send_count } => handle_sync_all(send_count),
        },
        Commands::DeviceStatus => handle_device_status(),
        Commands::Status { json } => handle_status(json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
