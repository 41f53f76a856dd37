mod cli;

use std::fs;

use clap::Parser;
use serde::Serialize;
use serde_json::json;

use tuxmate_models::{
    core::ScheduledTask,
    errors::{Result, SchedulerError},
};
use tuxmate_scheduler::{detect, Scheduler};
use tuxmate_utilities::startup;

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = startup::startup("tuxmate") {
        eprintln!("{}", json!({ "success": false, "error": err.to_string() }));
        std::process::exit(1);
    }

    if let Err(err) = run(cli) {
        eprintln!(
            "{}",
            json!({ "success": false, "kind": err.kind(), "error": err.to_string() })
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List => {
            let tasks = Scheduler::from_detection()?.list()?;
            emit(&json!({ "taches": tasks, "success": true }));
        }
        Commands::Add { payload } => {
            let task = read_payload(&payload)?;
            Scheduler::from_detection()?.add(&task)?;
            emit(&json!({ "success": true, "message": "task scheduled" }));
        }
        Commands::Remove { id } => {
            Scheduler::from_detection()?.remove(&id)?;
            emit(&json!({ "success": true, "message": "task removed" }));
        }
        Commands::Toggle { id } => {
            Scheduler::from_detection()?.toggle(&id)?;
            emit(&json!({ "success": true, "message": "task toggled" }));
        }
        Commands::Detect => {
            let report = detect::DetectionReport::from(&detect::detect());
            emit(&report);
            if !report.success {
                return Err(SchedulerError::BackendUnavailable);
            }
        }
    }
    Ok(())
}

fn read_payload(path: &std::path::Path) -> Result<ScheduledTask> {
    let body = fs::read_to_string(path).map_err(|err| {
        SchedulerError::validation("payload", format!("cannot read {}: {}", path.display(), err))
    })?;
    serde_json::from_str(&body).map_err(|err| {
        SchedulerError::validation("payload", format!("invalid task JSON: {}", err))
    })
}

fn emit(value: &impl Serialize) {
    // Values built here serialize infallibly.
    let body = serde_json::to_string_pretty(value).expect("serializable payload");
    println!("{}", body);
}
