//! matchfetch CLI - Resumable fetch-and-enrich exporter for DNA match lists.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use matchfetch::checkpoint::{CheckpointStore, FileCheckpointStore};
use matchfetch::client::{Credentials, FixedDelay, MatchClient};
use matchfetch::export::CsvExporter;
use matchfetch::models::{Config, MatchFilter, MatchType, ParentalSide, RequestSignature};
use matchfetch::pipeline::{
    CancellationFlag, Pipeline, PipelineOptions, Progress, ProgressSink, RunOutcome, RunState,
};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "matchfetch")]
#[command(version)]
#[command(about = "Resumable fetch-and-enrich exporter for DNA match lists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "matchfetch.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Close,
    Distant,
    Custom,
}

#[derive(Subcommand)]
enum Commands {
    /// List DNA tests available to the account
    Tests,

    /// Show match counts and journey filters for a test
    Options {
        /// Test identifier
        #[arg(short, long)]
        test: String,
    },

    /// Fetch, enrich and export matches (resumes a matching checkpoint)
    Fetch {
        /// Test identifier
        #[arg(short, long)]
        test: String,

        /// Which matches to fetch
        #[arg(short, long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Number of matches for all/close/distant
        #[arg(short = 'n', long, default_value = "100")]
        count: u64,

        /// Lower centimorgan bound for custom ranges
        #[arg(long)]
        min_cm: Option<u32>,

        /// Upper centimorgan bound for custom ranges
        #[arg(long)]
        max_cm: Option<u32>,

        /// Journey id to filter on (repeatable)
        #[arg(short, long = "journey")]
        journeys: Vec<String>,

        /// Parental side: maternal, paternal, both, unassigned
        #[arg(short, long)]
        side: Option<String>,

        /// Hash identifiers and drop identifying columns
        #[arg(long)]
        privacy: bool,

        /// Name used for the output file
        #[arg(long)]
        name: Option<String>,
    },

    /// Describe the saved checkpoint
    Status,

    /// Resume the run stored in the checkpoint
    Resume {
        /// Hash identifiers and drop identifying columns
        #[arg(long)]
        privacy: bool,

        /// Name used for the output file
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete the saved checkpoint
    Discard,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# matchfetch configuration file

[service]
base_url = "https://www.ancestry.com"
timeout_secs = 60
user_agent = "Mozilla/5.0"
# Cookie string copied from a signed-in browser session.
# cookies = "${ANCESTRY_COOKIES}"
cookies_env = "MATCHFETCH_COOKIES"
cookie_file = "cookie.txt"

[fetch]
page_size = 100
batch_size = 24
delay_ms = 2000

[checkpoint]
path = "progress.json"

[export]
output_dir = "."
privacy_mode = false
"#;
    println!("{example}");
}

/// Progress bar fed by pipeline events.
struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn stage(&self, state: RunState) {
        match state {
            RunState::Paginating | RunState::Enriching => {
                self.bar.reset();
                self.bar.set_length(0);
            }
            RunState::Done => self.bar.finish_with_message("done"),
            RunState::Failed(stage) => self.bar.abandon_with_message(format!("{stage} failed")),
            _ => {}
        }
    }

    fn progress(&self, progress: &Progress) {
        let total = progress.total.unwrap_or(progress.unit);
        self.bar.set_length(total as u64);
        self.bar.set_position(progress.unit as u64);
        self.bar
            .set_message(format!("{} ({} records)", progress.stage, progress.processed));
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path).with_context(|| format!("Failed to load config from {path:?}"))
}

fn build_client(config: &Config) -> Result<MatchClient> {
    let cookies = config
        .resolve_cookies()
        .context("Failed to resolve session cookies")?;
    let credentials = Credentials::parse(&cookies);
    if credentials.csrf_token().is_none() {
        warn!("No CSRF cookie found, list requests may be rejected");
    }
    info!(cookies = credentials.len(), "Session cookies loaded");

    let client = MatchClient::new(
        config.service.base_url.clone(),
        &credentials,
        Some(config.service.timeout_secs),
        Some(&config.service.user_agent),
    )?;
    Ok(client)
}

fn build_signature(
    test: String,
    filter: FilterArg,
    count: u64,
    min_cm: Option<u32>,
    max_cm: Option<u32>,
    journeys: Vec<String>,
    side: Option<String>,
) -> Result<RequestSignature> {
    let filter = match filter {
        FilterArg::All => MatchFilter::All,
        FilterArg::Close => MatchFilter::Close,
        FilterArg::Distant => MatchFilter::Distant,
        FilterArg::Custom => MatchFilter::Custom { min_cm, max_cm },
    };
    let side = side
        .map(|s| s.parse::<ParentalSide>())
        .transpose()
        .context("Invalid parental side")?;
    let signature = RequestSignature::new(test, filter, count, journeys, side)
        .context("Invalid fetch parameters")?;
    Ok(signature)
}

fn describe(signature: &RequestSignature) -> String {
    let filter = match (&signature.match_type, &signature.shared_dna) {
        (Some(MatchType::All), _) => format!("all matches, {}", signature.n_matches),
        (Some(MatchType::Close), _) => format!("close matches, {}", signature.n_matches),
        (Some(MatchType::Distant), _) => format!("distant matches, {}", signature.n_matches),
        (None, Some(range)) => format!("{range} cM"),
        (None, None) => "custom range".to_string(),
    };
    let mut parts = vec![filter];
    if let Some(side) = signature.parental_sides {
        parts.push(format!("{side} side"));
    }
    if !signature.journey_ids.is_empty() {
        parts.push(format!("journeys {}", signature.journey_ids.join(",")));
    }
    parts.join("; ")
}

/// Subject name of a test, used for the output file name.
async fn lookup_subject_name(client: &MatchClient, test_guid: &str) -> Option<String> {
    match client.list_tests().await {
        Ok(tests) => tests
            .into_iter()
            .find(|t| t.test_guid == test_guid)
            .map(|t| t.subject_name),
        Err(e) => {
            warn!(error = %e, "Could not look up test name");
            None
        }
    }
}

async fn run_pipeline(
    config: &Config,
    client: MatchClient,
    signature: RequestSignature,
    name: Option<String>,
    privacy: bool,
) -> Result<()> {
    let privacy = privacy || config.export.privacy_mode;
    let subject_name = match name {
        Some(name) => Some(name),
        None if !privacy => lookup_subject_name(&client, &signature.test_guid).await,
        None => None,
    };
    let paternal_code = client.paternal_cluster_code(&signature.test_guid).await;

    let exporter = CsvExporter::new(&config.export.output_dir)
        .privacy_mode(privacy)
        .subject_name(subject_name)
        .paternal_code(paternal_code);
    let store = FileCheckpointStore::new(&config.checkpoint.path);
    let throttle = FixedDelay::new(config.fetch.delay());

    let cancel = CancellationFlag::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            handle.cancel();
        }
    });

    info!(test = %signature.test_guid, filter = %describe(&signature), "Starting run");
    let pipeline = Pipeline::new(client, store, throttle, PipelineOptions::from(&config.fetch))
        .with_cancellation(cancel);
    let sink = BarSink::new();
    let outcome = pipeline.run(signature, &exporter, &sink).await;

    match outcome {
        RunOutcome::Completed(report) => {
            println!("\n=== Fetch Complete ===");
            println!("Records:     {}", report.export.rows);
            println!("Pages:       {}", report.pagination.pages_fetched);
            println!("Batches:     {}", report.enrichment.batches_processed);
            println!("Requests:    {}", pipeline.source().requests_sent());
            println!("Throttled:   {:.1}s", pipeline.throttle().stats().total_wait_secs);
            println!("Runtime:     {:.1}s", report.elapsed.as_secs_f64());
            println!("Output:      {:?}", report.export.path);
            Ok(())
        }
        RunOutcome::Failed(failure) => {
            println!("\n=== Fetch Stopped ===");
            println!("Stage:       {}", failure.stage);
            println!("Error:       {}", failure.error);
            println!("Fetched:     {}", failure.fetched);
            println!("Enriched:    {}", failure.enriched);
            println!(
                "Saved:       {} fetched, {} enriched",
                failure.saved_fetched, failure.saved_enriched
            );
            if failure.unsaved() > 0 {
                println!(
                    "Unsaved:     {} records could not be written to the checkpoint",
                    failure.unsaved()
                );
            }
            if failure.resumable {
                println!("Resume available: rerun the same command or `matchfetch resume`");
            } else {
                println!("No checkpoint saved: rerunning starts from the first page");
            }
            Err(failure.error).context(format!("Run failed while {}", failure.stage))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Tests => {
            let config = load_config(&cli.config)?;
            let client = build_client(&config)?;
            let tests = client.list_tests().await.context("Failed to list tests")?;
            if tests.is_empty() {
                println!("No tests found.");
            }
            for test in tests {
                println!("{}  {}", test.test_guid, test.subject_name);
            }
        }

        Commands::Options { test } => {
            let config = load_config(&cli.config)?;
            let client = build_client(&config)?;
            let counts = client
                .match_counts(&test)
                .await
                .context("Failed to count matches")?;
            println!("All matches:     {}", counts.all);
            println!("Close matches:   {}", counts.close);
            println!("Distant matches: {}", counts.distant);

            let journeys = client
                .journey_options(&test)
                .await
                .context("Failed to load journeys")?;
            if !journeys.is_empty() {
                println!("\nJourneys:");
                for journey in journeys {
                    println!("  {}  {}", journey.id, journey.name);
                }
            }
        }

        Commands::Fetch {
            test,
            filter,
            count,
            min_cm,
            max_cm,
            journeys,
            side,
            privacy,
            name,
        } => {
            let config = load_config(&cli.config)?;
            let signature = build_signature(test, filter, count, min_cm, max_cm, journeys, side)?;
            let client = build_client(&config)?;
            run_pipeline(&config, client, signature, name, privacy).await?;
        }

        Commands::Status => {
            let config = load_config(&cli.config)?;
            let store = FileCheckpointStore::new(&config.checkpoint.path);
            match store.load() {
                Some(checkpoint) => {
                    println!("Checkpoint:  {:?}", store.path());
                    println!("Test:        {}", checkpoint.signature.test_guid);
                    println!("Filter:      {}", describe(&checkpoint.signature));
                    println!("Fetched:     {}", checkpoint.fetched_count());
                    println!("Enriched:    {}", checkpoint.enriched_count());
                    if let Some(saved_at) = checkpoint.saved_at {
                        println!("Saved at:    {}", saved_at.to_rfc3339());
                    }
                }
                None => println!("No resumable checkpoint at {:?}", store.path()),
            }
        }

        Commands::Resume { privacy, name } => {
            let config = load_config(&cli.config)?;
            let store = FileCheckpointStore::new(&config.checkpoint.path);
            let Some(checkpoint) = store.load() else {
                bail!("No resumable checkpoint at {:?}", store.path());
            };
            let client = build_client(&config)?;
            run_pipeline(&config, client, checkpoint.signature, name, privacy).await?;
        }

        Commands::Discard => {
            let config = load_config(&cli.config)?;
            let store = FileCheckpointStore::new(&config.checkpoint.path);
            store.clear().context("Failed to delete checkpoint")?;
            println!("Checkpoint discarded.");
        }
    }

    Ok(())
}
