mod calc;
mod config;
mod ipc;
mod telemetry;
mod words;

use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        decision_points = config.default_settings.decision_points,
        supplementary_subjects = config.default_settings.supplementary_subjects_count,
        "gradesd ready"
    );

    let mut state = ipc::AppState { config };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                warn!(error = %e, "bad request line");
                writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None))?;
                stdout.flush()?;
                continue;
            }
        };

        debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }

    Ok(())
}
