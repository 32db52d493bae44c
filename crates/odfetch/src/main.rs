//! odfetch - open-data retrieval tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odfetch::changelog::DEFAULT_MIN_DELTA_SECS;
use odfetch::diagnostics::{CollectingSink, DiagnosticSink, TracingSink};
use odfetch::{
    ChangeLogConfig, Fetch, FetchConfig, FetchRun, IncrementalPipeline, ResourceWriter,
    SelectionCutoff, SnapshotPipeline,
};
use odfetch_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "odfetch")]
#[command(author, version, about = "Fetch new or matching files from an open-data repository")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Keep the raw downloaded bytes in this directory
    #[arg(long, global = true, env = "ODFETCH_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// Where decoded files are written (default: storage path, else current directory)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write the log to odfetch.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch files listed in the change log as changed since a cutoff
    Updated {
        /// Change-log file name, relative to the base URL
        #[arg(default_value = odfetch::config::DEFAULT_CONTENT_LOG)]
        content_log: String,

        /// Repository base URL
        #[arg(long, env = "ODFETCH_BASE_URL")]
        url_base: String,

        /// Regular expression selecting paths relative to the base URL
        #[arg(long, env = "ODFETCH_PATTERN")]
        pattern: String,

        /// Cutoff (ISO-8601); naive values are local time (default: today 00:00)
        #[arg(long)]
        since: Option<String>,

        /// Seconds an entry must be newer than the cutoff
        #[arg(long, env = "ODFETCH_MIN_DELTA", default_value_t = DEFAULT_MIN_DELTA_SECS)]
        min_delta: i64,
    },

    /// Fetch every file in the pattern's directory that matches
    Snapshot {
        /// Repository base URL
        #[arg(long, env = "ODFETCH_BASE_URL")]
        url_base: String,

        /// Regular expression selecting paths relative to the base URL
        #[arg(long, env = "ODFETCH_PATTERN")]
        pattern: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let mut log_builder = LogConfig::builder().level(log_level);
    if let Some(ref dir) = cli.log_dir {
        log_builder = log_builder.log_dir(dir);
    }

    // Environment variables take precedence
    let log_config = log_builder.build().merge_env()?;
    let _guard = init_logging(&log_config)?;

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| cli.storage_path.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let writer = ResourceWriter::new(output_dir);
    let sink = Arc::new(CollectingSink::forwarding_to(Arc::new(TracingSink)));

    let written = match cli.command {
        Command::Updated {
            content_log,
            url_base,
            pattern,
            since,
            min_delta,
        } => {
            let config = fetch_config(url_base, pattern, cli.storage_path);
            let log_config = ChangeLogConfig::new(content_log).with_min_delta(min_delta);
            let since = since
                .as_deref()
                .map(SelectionCutoff::parse_since)
                .transpose()?;
            let cutoff = log_config.cutoff(since);

            info!(base_url = %config.base_url, since = %cutoff.since, "Fetching updated files");
            let pipeline =
                IncrementalPipeline::new(&config, &log_config)?.with_sink(sink.clone());
            let run = pipeline.start(&cutoff).context("Incremental run failed")?;
            write_all(run, &writer, sink.as_ref())
        },
        Command::Snapshot { url_base, pattern } => {
            let config = fetch_config(url_base, pattern, cli.storage_path);

            info!(base_url = %config.base_url, "Fetching matching files");
            let pipeline = SnapshotPipeline::new(&config)?.with_sink(sink.clone());
            let run = pipeline.start().context("Snapshot run failed")?;
            write_all(run, &writer, sink.as_ref())
        },
    };

    if !sink.is_empty() {
        println!("skipped {} item(s)", sink.len());
        for diagnostic in sink.entries() {
            println!("  {} [{}]: {}", diagnostic.subject, diagnostic.kind, diagnostic.message);
        }
    }

    info!("Run complete: {} written, {} skipped", written, sink.len());
    Ok(())
}

fn fetch_config(url_base: String, pattern: String, storage_path: Option<PathBuf>) -> FetchConfig {
    let mut builder = FetchConfig::builder().base_url(url_base).pattern(pattern);
    if let Some(path) = storage_path {
        builder = builder.local_storage_path(path);
    }
    builder.build()
}

/// Write every resource of `run`, returning how many were written
fn write_all<F: Fetch>(
    run: FetchRun<'_, F>,
    writer: &ResourceWriter,
    sink: &dyn DiagnosticSink,
) -> usize {
    let mut written = 0;
    for resource in run {
        match writer.write(&resource) {
            Ok(path) => {
                println!("downloaded {}. file {}", resource.index, path.display());
                written += 1;
            },
            Err(err) => sink.report(&resource.url, &err),
        }
    }
    written
}
