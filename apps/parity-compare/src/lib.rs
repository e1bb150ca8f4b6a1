use std::{fs, path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use serde::Serialize;
use uuid::Uuid;

use parity_config::Config;
use parity_domain::{ComparisonRecord, RunSummary};
use parity_service::{
	CancelToken, Comparator, CompareSettings, ComparisonObserver, ExecutorRegistry,
	ProgressEvent, RequestSource, RunOutcome, SearchLogSource, StaticSource,
};
use parity_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = parity_cli::VERSION,
	about = parity_cli::ABOUT,
	rename_all = "kebab",
	styles = parity_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of search requests to replay instead of reading the search log.
	#[arg(long, short = 'r', value_name = "FILE")]
	pub requests: Option<PathBuf>,
	/// Skip the engine status probe and replay this shard.
	#[arg(long, value_name = "N")]
	pub shard: Option<i32>,
	/// File whose content is sent with every call as the stack override.
	#[arg(long, value_name = "FILE")]
	pub extra_config: Option<PathBuf>,
	/// Print only mismatched records.
	#[arg(long)]
	pub mismatches_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Completed,
	Canceled,
}

#[derive(Debug, Serialize)]
pub struct CompareReport {
	pub status: RunStatus,
	pub session_id: Uuid,
	pub shard_id: i32,
	pub control: String,
	pub test: String,
	pub enabled_kinds: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub outcome: Option<RunOutcome>,
	pub summary: RunSummary,
	pub records: Vec<ComparisonRecord>,
}

/// Logs engine events through `tracing`.
struct LogObserver;
impl ComparisonObserver for LogObserver {
	fn on_progress(&self, event: &ProgressEvent) {
		tracing::debug!(current = event.current, total = event.total, "{}", event.message);
	}

	fn on_difference(&self, record: &ComparisonRecord) {
		tracing::info!(
			site_code = record.key.site_code,
			searcher_user_id = record.key.searcher_user_id,
			kind = %record.key.kind,
			only_in_control = ?record.only_in_control,
			only_in_test = ?record.only_in_test,
			ignored = record.ignored_total(),
			"Difference found."
		);
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = parity_config::load(&args.config)?;

	parity_cli::init_tracing(&config.service.log_level);

	let control = config.deployments.control();
	let test = config.deployments.test();
	let session_id = Uuid::new_v4();
	let shard_id = match args.shard {
		Some(shard_id) => shard_id,
		None => {
			let client = parity_providers::client(&config.executor)?;

			parity_providers::status::resolve_shard(&client, &config.executor, &control, &test)
				.await?
		},
	};

	tracing::info!(
		shard_id,
		%session_id,
		control = control.name.as_str(),
		test = test.name.as_str(),
		"Starting comparison."
	);

	let source = request_source(&config, &args).await?;
	let requests = source.requests(shard_id).await?;
	let mut settings = CompareSettings::from_config(&config);

	settings.extra_config = args.extra_config.as_ref().map(fs::read_to_string).transpose()?;

	let registry = ExecutorRegistry::http(&config, session_id)?;
	let control_name = control.name.clone();
	let test_name = test.name.clone();
	let comparator = Comparator::new(settings, control, test, registry, Arc::new(LogObserver))?;
	let cancel = CancelToken::new();

	tokio::spawn({
		let cancel = cancel.clone();

		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				tracing::warn!("Interrupt received. Canceling comparison.");

				cancel.cancel();
			}
		}
	});

	let (status, outcome) = match comparator.run(requests, &cancel).await {
		Ok(outcome) => (RunStatus::Completed, Some(outcome)),
		Err(err) if err.is_canceled() => {
			tracing::warn!(error = %err, "Reporting partial results.");

			(RunStatus::Canceled, None)
		},
		Err(err) => return Err(err.into()),
	};
	let records = comparator.records();
	let summary = parity_domain::summarize(&records);

	log_summary(&summary);

	let report = CompareReport {
		status,
		session_id,
		shard_id,
		control: control_name,
		test: test_name,
		enabled_kinds: comparator.enabled_kinds(),
		outcome,
		summary,
		records: if args.mismatches_only {
			records.into_iter().filter(|record| !record.matched).collect()
		} else {
			records
		},
	};
	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	Ok(())
}

async fn request_source(cfg: &Config, args: &Args) -> color_eyre::Result<Box<dyn RequestSource>> {
	if let Some(path) = &args.requests {
		return Ok(Box::new(StaticSource::from_json_file(path)?));
	}

	let postgres = cfg
		.storage
		.as_ref()
		.and_then(|storage| storage.postgres.as_ref())
		.ok_or_else(|| eyre::eyre!("Either --requests or [storage.postgres] is required."))?;
	let db = Db::connect(postgres).await?;

	Ok(Box::new(SearchLogSource::new(db, cfg.source.clone())))
}

fn log_summary(summary: &RunSummary) {
	for site in &summary.sites {
		tracing::info!(
			site_code = site.site_code,
			total = site.total,
			matched = site.matched,
			mismatched = site.mismatched,
			mismatched_user_ids = ?site.mismatched_user_ids,
			"Site summary."
		);
	}

	tracing::info!(
		total = summary.total,
		matched = summary.matched,
		mismatched = summary.mismatched,
		success_rate = summary.success_rate,
		retried = summary.retried,
		confirmed = summary.confirmed_mismatches,
		transient = summary.transient_mismatches,
		ignored_as_recent = summary.ignored_as_recent,
		"Run summary."
	);
}
