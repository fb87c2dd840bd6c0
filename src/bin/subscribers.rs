use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use pushkind_campaign::domain::{UnsubscribePreference, UnsubscribeRequest};
use pushkind_campaign::errors::Error;
use pushkind_campaign::repository::{DieselRepository, establish_connection_pool};
use pushkind_campaign::subscribers;

/// Manage the email subscriber registry.
#[derive(Debug, Parser)]
#[command(about)]
struct Opt {
    #[arg(long, env = "DATABASE_URL", default_value = "email_subscribers.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the registry tables.
    Init,
    /// Import subscribers from a CSV file; known addresses keep their status.
    Import { csv: PathBuf },
    /// Copy a CSV file without the rows of unsubscribed addresses.
    Filter { input: PathBuf, output: PathBuf },
    /// Record an opt-out.
    Unsubscribe {
        /// Address to unsubscribe; omit when using `--json`.
        email: Option<String>,
        #[arg(long = "reason")]
        reasons: Vec<String>,
        #[arg(long, default_value = "")]
        comments: String,
        #[arg(long, value_enum, default_value_t = Preference::UnsubscribeAll)]
        preference: Preference,
        /// Request body as submitted by the unsubscribe page.
        #[arg(long, conflicts_with = "email")]
        json: Option<String>,
        #[arg(long, env = "AUDIT_LOG", default_value = "unsubscribes.csv")]
        audit_log: PathBuf,
    },
    /// Show the registry entry of an address.
    Status { email: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Preference {
    UnsubscribeAll,
    LessFrequent,
}

impl From<Preference> for UnsubscribePreference {
    fn from(value: Preference) -> Self {
        match value {
            Preference::UnsubscribeAll => UnsubscribePreference::UnsubscribeAll,
            Preference::LessFrequent => UnsubscribePreference::LessFrequent,
        }
    }
}

fn execute(repo: &DieselRepository, command: Command) -> Result<(), Error> {
    repo.ensure_schema()?;

    match command {
        Command::Init => println!("Database and tables are ready"),
        Command::Import { csv } => {
            let count = subscribers::import_csv(repo, &csv)?;
            println!("Imported {count} new subscribers to database");
        }
        Command::Filter { input, output } => {
            let removed = subscribers::filter_csv(repo, &input, &output)?;
            println!(
                "Created filtered CSV at {}, removed {removed} unsubscribed emails",
                output.display()
            );
        }
        Command::Unsubscribe {
            email,
            reasons,
            comments,
            preference,
            json,
            audit_log,
        } => {
            let request = match (json, email) {
                (Some(json), _) => serde_json::from_str::<UnsubscribeRequest>(&json)
                    .map_err(|e| Error::Validation(format!("invalid request: {e}")))?,
                (None, Some(email)) => UnsubscribeRequest {
                    email,
                    reasons,
                    comments,
                    preference: preference.into(),
                },
                (None, None) => return Err(Error::Validation("Email is required".to_owned())),
            };
            subscribers::unsubscribe(repo, &request, Some(&audit_log))?;
            println!("Successfully unsubscribed {}", request.email.trim());
        }
        Command::Status { email } => match subscribers::status(repo, &email)? {
            Some(subscriber) => println!(
                "{}: {} (updated {})",
                subscriber.email,
                if subscriber.subscribed {
                    "subscribed"
                } else {
                    "unsubscribed"
                },
                subscriber.updated_at
            ),
            None => println!("{email}: not found in database"),
        },
    }
    Ok(())
}

/// Entry point for the subscriber maintenance tool.
fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenv().ok();
    let opts = Opt::parse();

    let result = establish_connection_pool(&opts.database)
        .map(DieselRepository::new)
        .map_err(Error::from)
        .and_then(|repo| execute(&repo, opts.command));

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
