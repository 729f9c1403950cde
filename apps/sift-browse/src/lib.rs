use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sift_config::Config;
use sift_service::{FillOutcome, HttpBackend, QueryBackend, Session, SessionSlot};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'q', value_name = "TEXT")]
	pub query: String,
	/// Page to show; defaults to `pagination.initial_page`.
	#[arg(long, short = 'p', value_name = "N", conflicts_with = "all")]
	pub page: Option<u32>,
	/// Walk every page until the result stream is exhausted.
	#[arg(long, conflicts_with = "interactive")]
	pub all: bool,
	/// Read navigation commands and new queries from stdin.
	#[arg(long, short = 'i')]
	pub interactive: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
	Next,
	Prev,
	Page(u32),
	Quit,
	Query(String),
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let backend: Arc<dyn QueryBackend> = Arc::new(HttpBackend::new(config.backend.clone()));

	if args.interactive {
		return interactive(&config, backend, &args.query).await;
	}

	let query = args.query.trim();

	if query.is_empty() {
		return Err(eyre::eyre!("--query must not be blank."));
	}

	let session = Session::from_config(query, &config, backend)?;

	if args.all {
		let mut page = 1;

		loop {
			session.set_page(page);
			fill_current(&session).await?;
			print_snapshot(&session)?;

			match session.max_pages() {
				Some(max) if page >= max => break,
				_ => page += 1,
			}
		}

		return Ok(());
	}

	session.set_page(args.page.unwrap_or(config.pagination.initial_page));
	fill_current(&session).await?;
	print_snapshot(&session)
}

async fn interactive(
	config: &Config,
	backend: Arc<dyn QueryBackend>,
	query: &str,
) -> color_eyre::Result<()> {
	let slot = SessionSlot::from_config(config, backend)?;
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	if let Some(session) = slot.set_query(query)? {
		spawn_render(session);
	}

	while let Some(line) = lines.next_line().await? {
		let command = match parse_command(&line) {
			Ok(Some(command)) => command,
			Ok(None) => continue,
			Err(err) => {
				tracing::warn!(error = %err, "Ignoring command.");

				continue;
			},
		};
		let session = match command {
			Command::Quit => break,
			Command::Query(text) => slot.set_query(&text)?,
			Command::Next => navigate(&slot, Session::next_page),
			Command::Prev => navigate(&slot, Session::previous_page),
			Command::Page(page) => navigate(&slot, |session| session.set_page(page)),
		};
		let Some(session) = session else {
			continue;
		};

		spawn_render(session);
	}

	slot.detach();

	Ok(())
}

fn navigate(slot: &SessionSlot, turn: impl FnOnce(&Session) -> u32) -> Option<Arc<Session>> {
	let Some(session) = slot.live() else {
		tracing::warn!("No active query.");

		return None;
	};
	let page = turn(session.as_ref());

	tracing::debug!(session_id = %session.id(), page, "Page changed.");

	Some(session)
}

fn spawn_render(session: Arc<Session>) {
	tokio::spawn(async move {
		let outcome = match fill_current(&session).await {
			Ok(outcome) => outcome,
			Err(err) => {
				tracing::error!(session_id = %session.id(), error = %err, "Failed to fill page.");

				return;
			},
		};

		if outcome == FillOutcome::Superseded {
			return;
		}
		if let Err(err) = print_snapshot(&session) {
			tracing::error!(session_id = %session.id(), error = %err, "Failed to print snapshot.");
		}
	});
}

/// Fills the current page, resuming past per-call batch limits.
///
/// A fill already in flight may have started for an earlier page, so this waits for it to
/// settle and ensures the current page again.
async fn fill_current(session: &Session) -> color_eyre::Result<FillOutcome> {
	loop {
		match session.ensure_current_page().await? {
			FillOutcome::BatchLimit => {
				tracing::debug!(session_id = %session.id(), "Resuming fill after the batch limit.");
			},
			FillOutcome::AlreadyFilling => {
				tracing::debug!(session_id = %session.id(), "Waiting for the running fill.");

				session.fill_settled().await;
			},
			outcome => return Ok(outcome),
		}
	}
}

fn print_snapshot(session: &Session) -> color_eyre::Result<()> {
	let json = serde_json::to_string_pretty(&session.snapshot())?;

	println!("{json}");

	Ok(())
}

fn parse_command(line: &str) -> color_eyre::Result<Option<Command>> {
	let line = line.trim();

	if line.is_empty() {
		return Ok(None);
	}

	let Some(command) = line.strip_prefix(':') else {
		return Ok(Some(Command::Query(line.to_string())));
	};
	let mut parts = command.split_whitespace();
	let command = match (parts.next(), parts.next()) {
		(Some("next" | "n"), None) => Command::Next,
		(Some("prev" | "p"), None) => Command::Prev,
		(Some("quit" | "q"), None) => Command::Quit,
		(Some("page"), Some(page)) => Command::Page(
			page.parse().map_err(|_| eyre::eyre!("Page must be a positive integer: {page}."))?,
		),
		_ => return Err(eyre::eyre!("Unknown command: {line}.")),
	};

	if parts.next().is_some() {
		return Err(eyre::eyre!("Unexpected arguments: {line}."));
	}

	Ok(Some(command))
}
