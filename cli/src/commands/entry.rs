use anyhow::Result;
use std::process;
use uuid::Uuid;

use simply_core::service::LogService;

use crate::backend::Backend;

use super::helpers::json_error;

pub(crate) async fn cmd_delete(backend: &Backend, entry_id: Uuid, json: bool) -> Result<()> {
    if backend.delete_entry(entry_id).await? {
        tracing::info!(%entry_id, "entry deleted");
        if json {
            println!("{}", serde_json::json!({ "deleted": entry_id }));
        } else {
            println!("Deleted entry {entry_id}");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Entry {entry_id} not found")));
        } else {
            eprintln!("Entry {entry_id} not found");
        }
        process::exit(2);
    }
}
