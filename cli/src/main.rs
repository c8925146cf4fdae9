use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use mapview::offline::{CacheConfig, CacheError, CachedResponse, CachingClient, OfflineCache, ResponseSource};
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing cache directory; pass --dir or set MAPVIEW_CACHE_DIR")]
    MissingDirectory,
    #[error("no urls given; pass them as arguments or with --file")]
    NoUrls,
    #[error("cannot read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "mapview-cache", about = "Operate a mapview offline tile cache directory")]
struct Cli {
    #[arg(long, env = "MAPVIEW_CACHE_DIR")]
    dir: Option<PathBuf>,

    #[arg(long = "no-cache", value_name = "REGEX", help = "URL pattern never written to the cache")]
    no_cache: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch URLs into the cache.
    Preload(PreloadArgs),
    /// Fetch one URL through the cache and report where it came from.
    Fetch(FetchArgs),
    /// Print the cache file a URL maps to.
    Path { url: String },
    /// Delete everything in the cache directory.
    Clear,
}

#[derive(Args, Debug)]
struct PreloadArgs {
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    #[arg(long, help = "File with one URL per line, or - for stdin")]
    file: Option<String>,

    urls: Vec<String>,
}

#[derive(Args, Debug)]
struct FetchArgs {
    url: String,

    #[arg(long, help = "Write the body to this path")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cache = Arc::new(open_cache(&cli)?);

    match cli.command {
        Command::Preload(args) => run_preload(cache, args).await,
        Command::Fetch(args) => run_fetch(cache, args).await,
        Command::Path { url } => {
            println!("{}", cache.filename_for_url(&url)?.display());
            Ok(())
        }
        Command::Clear => {
            let removed = cache.clear().await?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

fn open_cache(cli: &Cli) -> Result<OfflineCache, CliError> {
    let dir = cli.dir.as_ref().ok_or(CliError::MissingDirectory)?;
    let cache = OfflineCache::new();
    cache.set_cache_directory(dir)?;
    cache.set_no_cache_filters(&cli.no_cache)?;
    cache.set_active(true)?;
    Ok(cache)
}

async fn run_preload(cache: Arc<OfflineCache>, args: PreloadArgs) -> Result<(), CliError> {
    let mut urls = args.urls;
    if let Some(path) = &args.file {
        urls.extend(read_urls(path)?);
    }
    if urls.is_empty() {
        return Err(CliError::NoUrls);
    }

    info!(count = urls.len(), concurrency = args.concurrency, "preloading");
    let client = CachingClient::new(cache, &CacheConfig::from_env())?;
    let summary = client.preload(urls, args.concurrency).await?;
    print_json(&json!({
        "fetched": summary.fetched,
        "cached": summary.cached,
        "skipped": summary.skipped,
        "failed": summary.failed,
    }))
}

async fn run_fetch(cache: Arc<OfflineCache>, args: FetchArgs) -> Result<(), CliError> {
    let client = CachingClient::new(cache, &CacheConfig::from_env())?;
    let response = client.fetch(&args.url).await?;
    if let Some(path) = &args.output {
        tokio::fs::write(path, &response.body).await.map_err(|source| CliError::Output {
            path: path.display().to_string(),
            source,
        })?;
    }
    print_json(&describe(&args.url, &response))
}

fn describe(url: &str, response: &CachedResponse) -> Value {
    let source = match response.source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Live => "live",
    };
    json!({
        "url": url,
        "status": response.status,
        "source": source,
        "bytes": response.body.len(),
        "contentType": response.info.content_type,
        "contentEncoding": response.info.content_encoding,
    })
}

fn read_urls(path: &str) -> Result<Vec<String>, CliError> {
    let input_error = |source| CliError::Input { path: path.to_owned(), source };
    let reader: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(path).map_err(input_error)?))
    };

    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(input_error)?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        urls.push(trimmed.to_owned());
    }
    Ok(urls)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
