//! CLI entry point for notekeeper.
//!
//! # Responsibility
//! - Provide a small executable over `notekeeper_core` for local checks.
//! - Resolve config from the environment, with `--db` taking precedence.

use clap::{Parser, Subcommand};
use log::error;
use notekeeper_core::db::open_db;
use notekeeper_core::{
    init_logging, CoreConfig, CustomerId, Note, NoteService, SqliteNoteRepository, SystemClock,
    UniqueTimestamps,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notekeeper", version, about = "Timestamped customer notes")]
struct Cli {
    /// SQLite database file (overrides NOTEKEEPER_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core health and version.
    Ping,
    /// Parse a note line and print its externalized form.
    Parse { raw: String },
    /// Store a note for a customer.
    Add {
        #[arg(long)]
        customer: CustomerId,
        raw: String,
    },
    /// List a customer's notes with their ids.
    List {
        #[arg(long)]
        customer: CustomerId,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Print all of a customer's notes as externalized lines.
    Export {
        #[arg(long)]
        customer: CustomerId,
    },
    /// Read externalized lines from stdin and store them for a customer.
    Import {
        #[arg(long)]
        customer: CustomerId,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(config.log_level, log_dir)?;
    }

    match cli.command {
        Command::Ping => {
            println!("notekeeper_core ping={}", notekeeper_core::ping());
            println!("notekeeper_core version={}", notekeeper_core::core_version());
        }
        Command::Parse { raw } => {
            let note = Note::parse(&raw, &UniqueTimestamps::new(SystemClock));
            println!("{note}");
        }
        Command::Add { customer, raw } => {
            let conn = open_db(&config.db_path)?;
            let repo = SqliteNoteRepository::try_new(&conn)?;
            let mut service = NoteService::resume(repo, SystemClock)?;
            let note = service.add_note(customer, &raw)?;
            println!("{}\t{note}", note.id().unwrap_or_default());
        }
        Command::List {
            customer,
            limit,
            offset,
        } => {
            let conn = open_db(&config.db_path)?;
            let repo = SqliteNoteRepository::try_new(&conn)?;
            let service = NoteService::new(repo, SystemClock);
            for note in service.list_customer_notes(customer, limit, offset)? {
                println!("{}\t{note}", note.id().unwrap_or_default());
            }
        }
        Command::Export { customer } => {
            let conn = open_db(&config.db_path)?;
            let repo = SqliteNoteRepository::try_new(&conn)?;
            let service = NoteService::new(repo, SystemClock);
            for line in service.export_customer_notes(customer)? {
                println!("{line}");
            }
        }
        Command::Import { customer } => {
            let lines = std::io::stdin()
                .lines()
                .collect::<Result<Vec<String>, _>>()?;
            let conn = open_db(&config.db_path)?;
            let repo = SqliteNoteRepository::try_new(&conn)?;
            let mut service = NoteService::resume(repo, SystemClock)?;
            let imported = service.import_notes(
                customer,
                lines
                    .iter()
                    .map(String::as_str)
                    .filter(|line| !line.trim().is_empty()),
            )?;
            println!("imported={}", imported.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_db_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["notekeeper", "list", "--customer", "4", "--db", "x.db"])
            .unwrap();
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("x.db")));
        assert!(matches!(
            cli.command,
            Command::List {
                customer: 4,
                limit: None,
                offset: 0
            }
        ));
    }
}
