use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use preloader::cache::CacheStore;
use preloader::config::PreloadConfig;
use preloader::downloader::HttpDownloader;
use preloader::preload::{JobId, Preloader};
use preloader::server::startup;
use preloader::status::{LogSink, Throttled};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "preloader")]
#[command(about = "Preload remote resources into a local cache directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct CommonArgs {
    #[arg(short, long, help = "JSON config file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Cache directory, overrides the config file")]
    cache_dir: Option<PathBuf>,
}

impl CommonArgs {
    fn load(&self) -> Result<PreloadConfig, BoxError> {
        let mut config = PreloadConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single job and exit. Ctrl-C cancels after the current item.
    Run {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(short, long, help = "File with one URI per line")]
        input: Option<PathBuf>,
        uris: Vec<String>,
    },
    /// Serve the HTTP control interface.
    Serve {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, default_value = "127.0.0.1", help = "Address to bind to")]
        address: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

/// URIs from a list file: one per line, blank lines and `#` comments skipped.
fn parse_uri_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

async fn read_uri_list(path: &Path) -> Result<Vec<String>, BoxError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_uri_list(&text))
}

async fn run_job(
    config: PreloadConfig,
    input: Option<PathBuf>,
    mut uris: Vec<String>,
) -> Result<(), BoxError> {
    if let Some(input) = input {
        uris.extend(read_uri_list(&input).await?);
    }
    if uris.is_empty() {
        info!("nothing to preload");
        return Ok(());
    }

    let cache = CacheStore::open(&config.cache_dir).await?;
    let downloader = HttpDownloader::from_config(&config)?;
    let preloader = Preloader::new(cache, downloader);

    let job_id = JobId::next();
    let control = preloader.control();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing current item");
            control.cancel(job_id);
        }
    });

    let mut sink = Throttled::new(LogSink, config.progress_interval());
    let summary = preloader.run(job_id, &uris, &mut sink).await;
    interrupt.abort();

    if let Some(summary) = summary {
        println!("{}: {}", summary.title(), summary.describe());
        if summary.job_failed {
            return Err("preloading failed".into());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            common,
            input,
            uris,
        }) => {
            run_job(common.load()?, input, uris).await?;
        }

        Some(Commands::Serve {
            common,
            address,
            port,
        }) => {
            startup(common.load()?, address, port).await?;
        }

        None => {
            println!("Use --help for available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_list() {
        let text = "# images\nhttp://a/1.jpg\n\n  http://a/2.jpg  \n#http://skipped\n";
        assert_eq!(parse_uri_list(text), vec!["http://a/1.jpg", "http://a/2.jpg"]);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "preloader",
            "run",
            "--cache-dir",
            "/tmp/c",
            "http://a/1.jpg",
            "http://a/2.jpg",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run { common, uris, input }) => {
                assert_eq!(common.cache_dir, Some(PathBuf::from("/tmp/c")));
                assert_eq!(uris.len(), 2);
                assert!(input.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }
}
