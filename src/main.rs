// ABOUTME: Entry point for the punchlist binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and drives the record store contract.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use punchlist_store::{ConnectionState, InitOptions, initialize, shutdown};

const USAGE: &str = "usage: punchlist [--volatile] <command>
commands:
  add <text...>      add a record
  list [--json]      list records, newest first
  toggle <id>        flip a record's completion flag
  clear-all          delete every record
  clear-completed    delete completed records";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punchlist=info".parse().unwrap()),
        )
        .init();

    tracing::debug!("punchlist starting up");

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let volatile = args.iter().position(|a| a == "--volatile");
    if let Some(i) = volatile {
        args.remove(i);
    }

    match run(&args, volatile.is_none()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String], prefer_durable: bool) -> Result<(), Box<dyn Error>> {
    let mut options = InitOptions {
        prefer_durable,
        ..InitOptions::default()
    };
    if let Ok(path) = std::env::var("PUNCHLIST_DB") {
        options.path = PathBuf::from(path);
    }

    let state = initialize(&options)?;
    let result = dispatch(&state, args).await;
    shutdown(&state).await;
    result
}

async fn dispatch(state: &ConnectionState, args: &[String]) -> Result<(), Box<dyn Error>> {
    match args {
        [cmd, rest @ ..] if cmd == "add" && !rest.is_empty() => {
            state.add(&rest.join(" ")).await?;
            Ok(())
        }
        [cmd] if cmd == "list" => {
            for record in state.list().await? {
                let mark = if record.completed { "x" } else { " " };
                println!("{:>4} [{}] {}", record.id, mark, record.content);
            }
            Ok(())
        }
        [cmd, flag] if cmd == "list" && flag == "--json" => {
            let records = state.list().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        [cmd, id] if cmd == "toggle" => {
            state.toggle(id.parse()?).await?;
            Ok(())
        }
        [cmd] if cmd == "clear-all" => {
            state.clear_all().await?;
            Ok(())
        }
        [cmd] if cmd == "clear-completed" => {
            let removed = state.clear_completed().await?;
            println!("removed {removed} completed record(s)");
            Ok(())
        }
        _ => {
            eprintln!("{USAGE}");
            Err("unrecognized command".into())
        }
    }
}
