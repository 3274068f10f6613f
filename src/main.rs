use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Interval;
use tokio_util::sync::CancellationToken;

use logsieve_filter::{FilterPipeline, Properties, Record};
use logsieve_types::{
    CONF_PATH, DYNAMIC_PROP, KEYWORDS, LOG_WAIT, LOG_WAIT_CACHE, LOG_WAIT_TIME,
    PROP_MONITOR_INTERVAL, PROP_MONITOR_MODE,
};

/// Records handed to the pipeline per batch
const BATCH_SIZE: usize = 256;

/// logsieve - pass only log lines containing a keyword, optionally through a delay queue
#[derive(Parser, Debug)]
#[command(name = "logsieve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file polled for changes (.properties or .toml)
    #[arg(long, value_name = "PATH")]
    conf_path: Option<PathBuf>,

    /// Comma-separated keywords; a line passes if it contains any of them
    #[arg(long, value_name = "LIST")]
    keywords: Option<String>,

    /// Check the config file for changes while running
    #[arg(long)]
    dynamic_prop: bool,

    /// Records between config file checks
    #[arg(long, value_name = "RECORDS")]
    prop_monitor_interval: Option<u64>,

    /// When to check the config file: threshold or periodic
    #[arg(long, value_name = "MODE")]
    prop_monitor_mode: Option<String>,

    /// Buffer matching lines in the wait queue
    #[arg(long)]
    log_wait: bool,

    /// Age in seconds after which the oldest buffered line is released
    #[arg(long, value_name = "SECS")]
    log_wait_time: Option<u64>,

    /// Queue length above which the oldest buffered line is released
    #[arg(long, value_name = "COUNT")]
    log_wait_cache: Option<usize>,

    /// Read lines from this file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Release aged lines on this timer even without new matching input
    #[arg(long, value_name = "SECS")]
    flush_interval: Option<u64>,

    /// Discard buffered lines at end of input instead of writing them
    #[arg(long)]
    no_drain: bool,

    /// Print the resolved filter config as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Host options for the pipeline; flags not given are left to the config file
    fn options(&self) -> Properties {
        let mut options = Properties::new();
        if let Some(path) = &self.conf_path {
            options.insert(CONF_PATH.name, path.display().to_string());
        }
        if let Some(keywords) = &self.keywords {
            options.insert(KEYWORDS.name, keywords.clone());
        }
        if self.dynamic_prop {
            options.insert(DYNAMIC_PROP.name, "true");
        }
        if let Some(interval) = self.prop_monitor_interval {
            options.insert(PROP_MONITOR_INTERVAL.name, interval.to_string());
        }
        if let Some(mode) = &self.prop_monitor_mode {
            options.insert(PROP_MONITOR_MODE.name, mode.clone());
        }
        if self.log_wait {
            options.insert(LOG_WAIT.name, "true");
        }
        if let Some(secs) = self.log_wait_time {
            options.insert(LOG_WAIT_TIME.name, secs.to_string());
        }
        if let Some(count) = self.log_wait_cache {
            options.insert(LOG_WAIT_CACHE.name, count.to_string());
        }
        options
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // A blocking stdin read cannot be cancelled and would hold runtime
    // shutdown until the next line arrives
    std::process::exit(code);
}

async fn run(args: Args) -> Result<()> {
    let mut pipeline = FilterPipeline::from_options(args.options());

    if args.print_config {
        let rendered =
            toml::to_string_pretty(pipeline.config()).context("failed to render filter config")?;
        print!("{rendered}");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let (record_tx, mut record_rx) = mpsc::channel::<Record>(BATCH_SIZE * 4);
    let reader = spawn_reader(args.input.clone(), record_tx, cancel.clone());

    let mut out = BufWriter::new(io::stdout());
    let mut flush_timer = args
        .flush_interval
        .map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            received = record_rx.recv_many(&mut batch, BATCH_SIZE) => {
                // Reader finished and the channel is drained
                if received == 0 {
                    break;
                }
                let emitted = pipeline.process_batch(std::mem::take(&mut batch));
                write_records(&mut out, &emitted)?;
            }

            _ = tick(&mut flush_timer) => {
                let released = pipeline.flush_expired();
                write_records(&mut out, &released)?;
            }

            _ = &mut ctrl_c => {
                tracing::info!("interrupted, stopping input");
                break;
            }
        }
    }

    cancel.cancel();
    drop(record_rx);
    reader.await.context("input reader panicked")??;

    let buffered = pipeline.close();
    if args.no_drain {
        if !buffered.is_empty() {
            tracing::warn!(discarded = buffered.len(), "discarding buffered records");
        }
    } else {
        write_records(&mut out, &buffered)?;
    }

    let stats = pipeline.stats();
    tracing::info!(
        processed = stats.processed,
        matched = stats.matched,
        dropped = stats.dropped,
        emitted = stats.emitted,
        reloads = stats.reloads,
        reload_failures = stats.reload_failures,
        "finished"
    );

    Ok(())
}

/// Wait for the next flush tick, or forever when no flush timer is set
async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn spawn_reader(
    input: Option<PathBuf>,
    record_tx: mpsc::Sender<Record>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(BufReader::new(tokio::io::stdin())),
        };
        read_records(reader, record_tx, cancel).await
    })
}

/// Send one record per input line until end of input or cancellation
async fn read_records<R>(
    mut reader: R,
    record_tx: mpsc::Sender<Record>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut line) => read.context("failed to read input")?,
        };

        if read == 0 {
            break;
        }

        let record = Record::new(trim_newline(&line));
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = record_tx.send(record) => {
                if sent.is_err() {
                    // Receiver gone, nothing left to feed
                    break;
                }
            }
        }
    }

    Ok(())
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Write each record's payload as one line and flush
fn write_records(out: &mut impl Write, records: &[Record]) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    for record in records {
        out.write_all(record.body())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
