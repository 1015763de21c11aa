use std::io::{BufRead, Write};

use floorplan_sync_lib::command::{execute_json, CommandResponse};
use floorplan_sync_lib::harness::TestHarness;
use floorplan_sync_lib::state::settings::Preferences;

/// Reads one JSON command per line from stdin and answers with one JSON
/// response per line on stdout. Logs go to stderr.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floorplan_sync=info,floorplan_sync_lib=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let prefs = Preferences::load();
    match &prefs.path {
        Some(path) => tracing::info!("Preferences at {}", path.display()),
        None => tracing::info!("No config directory; preferences stay in memory"),
    }
    let mut harness = TestHarness::with_preferences(prefs);
    tracing::info!(
        "Loaded sample plan ({} entities, {} meshes)",
        harness.doc.registry().entity_count(),
        harness.doc.registry().mesh_count()
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = execute_json(&mut harness, &line).unwrap_or_else(|e| {
            tracing::warn!("Rejected command: {e}");
            CommandResponse::err(e.to_string())
        });
        let json = serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"{e}"}}"#));
        if let Err(e) = writeln!(stdout, "{json}").and_then(|_| stdout.flush()) {
            tracing::error!("Failed to write response: {e}");
            break;
        }
    }
}
