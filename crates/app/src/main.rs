use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use flashdeck_core::model::{FlashcardDraft, SessionUser};
use services::{AuthService, CardService, ControllerError, ReviewController, StaticAuth};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod review_loop;

use cli::{Cli, Command};
use config::Settings;

const LOGIN_HINT: &str = "\
You are not signed in.
Set a user id with --user-id, the FLASHDECK_USER_ID environment variable,
or `id = \"<uuid>\"` under [user] in .flashdeck.toml.";

/// Exit code for an unauthenticated run.
const EXIT_SIGNED_OUT: u8 = 1;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let file = config::load(cli.global.config.as_deref())?;
    let settings = Settings::resolve(&cli.global, file)?;
    tracing::debug!(db = %settings.db_url, "resolved settings");

    config::prepare_sqlite_file(&settings.db_url)?;
    let storage = Storage::sqlite(&settings.db_url)
        .await
        .with_context(|| format!("opening database {}", settings.db_url))?;

    let auth = settings
        .user
        .clone()
        .map_or_else(StaticAuth::signed_out, StaticAuth::signed_in);
    let Ok(user) = auth.current_user().await else {
        eprintln!("{LOGIN_HINT}");
        return Ok(ExitCode::from(EXIT_SIGNED_OUT));
    };

    match cli.command {
        Command::Add { question, answer } => add(&storage, &user, question, answer).await?,
        Command::List { json } => list(&storage, &user, json).await?,
        Command::Review => {
            let ctrl = match ReviewController::open(&auth, Arc::clone(&storage.flashcards)).await
            {
                Ok(ctrl) => ctrl,
                Err(ControllerError::Unauthenticated) => {
                    eprintln!("{LOGIN_HINT}");
                    return Ok(ExitCode::from(EXIT_SIGNED_OUT));
                }
                Err(err) => return Err(err.into()),
            };
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            review_loop::run(&ctrl, stdin, &mut stdout).await?;
            ctrl.close();
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn add(
    storage: &Storage,
    user: &SessionUser,
    question: String,
    answer: String,
) -> anyhow::Result<()> {
    let cards = CardService::new(Arc::clone(&storage.flashcards));
    let card = cards
        .create_card(user.id, FlashcardDraft::new(question, answer))
        .await?;
    println!("Created card #{}: {}", card.id(), card.question());
    Ok(())
}

async fn list(storage: &Storage, user: &SessionUser, json: bool) -> anyhow::Result<()> {
    let cards = CardService::new(Arc::clone(&storage.flashcards))
        .list_cards(user.id)
        .await?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &cards)?;
        writeln!(out)?;
        return Ok(());
    }

    if cards.is_empty() {
        writeln!(out, "No flashcards yet.")?;
    }
    for card in &cards {
        writeln!(
            out,
            "#{:<5} {}  {}\n       {}",
            card.id().to_string(),
            card.created_at().format("%Y-%m-%d"),
            card.question(),
            card.answer()
        )?;
    }
    Ok(())
}
