mod commands;
mod handlers;

pub use commands::{Cli, Commands, SyncAction, SyncCommand};
pub use handlers::{
    handle_add, handle_clear, handle_delete, handle_device_status, handle_export, handle_init,
    handle_list, handle_status, handle_sync_all, handle_sync_bluetooth, handle_sync_wifi,
};
