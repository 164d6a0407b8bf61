//! sendall: share files through anonymous hosting services
//!
//! Commands:
//!   privatebin post <files>...   - encrypt and paste each file, record its deletion link
//!   privatebin delete <urls>...  - delete pastes by their shareable link
//!   transfer post <files>...     - upload each file to transfer.sh
//!   transfer delete <urls>...    - delete uploads by their public link
//!   links [--backend]            - list recorded links
//!   config show                  - display the effective configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sendall_core::config::{expand_tilde, PrivateBinConfig};
use sendall_core::{Expiry, PasteFormat, SendallConfig};
use sendall_sync::{
    build_http_client, delete_links, submit_files, Backend, DeletionReport, LinkStore,
    PrivateBinClient, ProgressFn, SubmissionReport, TransferShClient, PRIVATEBIN_BUCKET,
    TRANSFERSH_BUCKET,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sendall",
    version,
    about = "Share files via PrivateBin or transfer.sh",
    long_about = "sendall: post files to PrivateBin (encrypted client-side) or transfer.sh, \
                  and delete them later through the recorded deletion links"
)]
struct Cli {
    /// Path to sendall.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SENDALL_CONFIG",
        default_value = "~/.config/sendall/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SENDALL_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "SENDALL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Link store database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Concurrent submissions (0 = one per CPU)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum BackendKind {
    Privatebin,
    Transfer,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// PrivateBin: zero-knowledge encrypted pastes
    Privatebin {
        #[command(subcommand)]
        action: PrivateBinAction,
    },

    /// transfer.sh: plain file uploads
    Transfer {
        #[command(subcommand)]
        action: TransferAction,
    },

    /// List recorded links
    Links {
        /// Only this backend's links
        #[arg(long)]
        backend: Option<BackendKind>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrivateBinAction {
    /// Encrypt and paste each file
    Post {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        paste: PasteArgs,
    },

    /// Delete pastes by the links printed at post time
    Delete {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

/// Per-run overrides of the `[privatebin]` config section
#[derive(Args, Debug)]
struct PasteArgs {
    /// PrivateBin instance URL
    #[arg(long, short = 'u')]
    host: Option<String>,
    /// Expiry: 5min, 10min, 1hour, 1day, 1week, 1month, 1year, never
    #[arg(long, short = 'e')]
    expire: Option<Expiry>,
    /// Allow comments on the paste (`--open-discussion=false` to disable)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    open_discussion: Option<bool>,
    /// Delete the paste after it is first read (`--burn-after-reading=false` to disable)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    burn_after_reading: Option<bool>,
    /// Paste format: plaintext, syntaxhighlighting, markdown
    #[arg(long, short = 'f')]
    format: Option<PasteFormat>,
}

impl PasteArgs {
    fn apply(self, config: &mut PrivateBinConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(expire) = self.expire {
            config.expire = expire;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(open_discussion) = self.open_discussion {
            config.open_discussion = open_discussion;
        }
        if let Some(burn_after_reading) = self.burn_after_reading {
            config.burn_after_reading = burn_after_reading;
        }
    }
}

#[derive(Subcommand, Debug)]
enum TransferAction {
    /// Upload each file
    Post {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// transfer.sh instance URL
        #[arg(long, short = 'u')]
        host: Option<String>,
        /// Downloads after which the link expires (-1 = unlimited)
        #[arg(long, short = 'n', allow_negative_numbers = true)]
        downloads: Option<i64>,
        /// Days after which the file is removed
        #[arg(long, short = 'd')]
        days: Option<u32>,
    },

    /// Delete uploads by their public link
    Delete {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults + config file + flags)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let mut config = SendallConfig::load(&config_path)?;
    apply_global_overrides(&mut config, &cli);

    let log_format = match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    };
    init_logging(&config.log.level, log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "sendall starting"
    );

    match cli.command {
        Commands::Privatebin { action: PrivateBinAction::Post { files, paste } } => {
            paste.apply(&mut config.privatebin);
            cmd_post(&config, BackendKind::Privatebin, &files).await
        }
        Commands::Privatebin { action: PrivateBinAction::Delete { urls } } => {
            cmd_delete(&config, BackendKind::Privatebin, &urls).await
        }
        Commands::Transfer { action: TransferAction::Post { files, host, downloads, days } } => {
            if let Some(host) = host {
                config.transfer.host = host;
            }
            if let Some(downloads) = downloads {
                config.transfer.max_downloads = downloads;
            }
            if let Some(days) = days {
                config.transfer.max_days = days;
            }
            cmd_post(&config, BackendKind::Transfer, &files).await
        }
        Commands::Transfer { action: TransferAction::Delete { urls } } => {
            cmd_delete(&config, BackendKind::Transfer, &urls).await
        }
        Commands::Links { backend } => cmd_links(&config, backend),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn apply_global_overrides(config: &mut SendallConfig, cli: &Cli) {
    if let Some(level) = &cli.log {
        config.log.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log.format = match format {
            LogFormat::Json => "json".into(),
            LogFormat::Text => "text".into(),
        };
    }
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    if let Some(workers) = cli.workers {
        config.pipeline.workers = workers;
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Shared setup ──────────────────────────────────────────────────────────────

fn open_store(config: &SendallConfig) -> Result<Arc<LinkStore>> {
    let path = expand_tilde(&config.store.path);
    let store = LinkStore::open(&path)
        .with_context(|| format!("opening link store: {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_backend(config: &SendallConfig, kind: BackendKind) -> Result<Backend> {
    let http = build_http_client(&config.pipeline)?;
    Ok(match kind {
        BackendKind::Privatebin => {
            Backend::PrivateBin(PrivateBinClient::new(http, config.privatebin.clone()))
        }
        BackendKind::Transfer => {
            Backend::TransferSh(TransferShClient::new(http, config.transfer.clone())?)
        }
    })
}

/// Cancel the batch on Ctrl-C; confirmed submissions are still recorded.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling remaining items");
            token.cancel();
        }
    });
    cancel
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("progress bar template")?
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn progress_callback(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, msg| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(msg.to_string());
    })
}

// ── `sendall <backend> post` ──────────────────────────────────────────────────

async fn cmd_post(config: &SendallConfig, kind: BackendKind, files: &[PathBuf]) -> Result<()> {
    let store = open_store(config)?;
    let backend = build_backend(config, kind)?;
    let cancel = cancel_on_interrupt();

    let pb = make_progress_bar(files.len() as u64, "post")?;
    let progress = progress_callback(&pb);
    let report = submit_files(
        &backend,
        &store,
        files,
        &config.pipeline,
        &cancel,
        Some(&progress),
    )
    .await;
    pb.finish_and_clear();

    print_submissions(&report);
    report
        .ensure_success()
        .with_context(|| format!("posting to {}", backend.name()))
}

fn print_submissions(report: &SubmissionReport) {
    for record in &report.records {
        match &record.outcome {
            Ok(submitted) => {
                println!("{}", record.file.display());
                println!("  link:    {}", submitted.link.public_url);
                println!("  delete:  {}", submitted.link.delete_url);
            }
            Err(e) => eprintln!("{}: {e}", record.file.display()),
        }
    }
}

// ── `sendall <backend> delete` ────────────────────────────────────────────────

async fn cmd_delete(config: &SendallConfig, kind: BackendKind, urls: &[String]) -> Result<()> {
    let store = open_store(config)?;
    let backend = build_backend(config, kind)?;
    let cancel = cancel_on_interrupt();

    let pb = make_progress_bar(urls.len() as u64, "delete")?;
    let progress = progress_callback(&pb);
    let report = delete_links(
        &backend,
        &store,
        urls,
        &config.pipeline,
        &cancel,
        Some(&progress),
    )
    .await;
    pb.finish_and_clear();

    print_deletions(&report);
    report
        .ensure_success()
        .with_context(|| format!("deleting from {}", backend.name()))
}

fn print_deletions(report: &DeletionReport) {
    for record in &report.records {
        match &record.outcome {
            Ok(()) => println!("deleted  {}", record.public_url),
            Err(e) => eprintln!("{}: {e}", record.public_url),
        }
    }
}

// ── `sendall links` ───────────────────────────────────────────────────────────

fn cmd_links(config: &SendallConfig, backend: Option<BackendKind>) -> Result<()> {
    let store = open_store(config)?;
    let buckets: &[(&str, &str)] = match backend {
        Some(BackendKind::Privatebin) => &[("privatebin", PRIVATEBIN_BUCKET)],
        Some(BackendKind::Transfer) => &[("transfer.sh", TRANSFERSH_BUCKET)],
        None => &[
            ("privatebin", PRIVATEBIN_BUCKET),
            ("transfer.sh", TRANSFERSH_BUCKET),
        ],
    };

    for (label, bucket) in buckets {
        let records = store
            .list(bucket)
            .with_context(|| format!("listing {label} links"))?;
        println!("{label} ({} links)", records.len());
        for record in records {
            println!("  {}", record.public_url);
            println!("    delete: {}", record.delete_url);
        }
    }
    Ok(())
}

// ── `sendall config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &SendallConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_privatebin_post() {
        let cli = Cli::try_parse_from([
            "sendall",
            "privatebin",
            "post",
            "a.txt",
            "b.txt",
            "--expire",
            "1day",
            "--format",
            "markdown",
            "--burn-after-reading",
        ])
        .unwrap();

        match cli.command {
            Commands::Privatebin {
                action: PrivateBinAction::Post { files, paste },
            } => {
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert_eq!(paste.expire, Some(Expiry::OneDay));
                assert_eq!(paste.format, Some(PasteFormat::Markdown));
                assert_eq!(paste.burn_after_reading, Some(true));
                assert_eq!(paste.open_discussion, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn paste_args(args: &[&str]) -> PasteArgs {
        let argv = ["sendall", "privatebin", "post"]
            .iter()
            .chain(args)
            .copied()
            .collect::<Vec<_>>();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Privatebin {
                action: PrivateBinAction::Post { paste, .. },
            } => paste,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_can_disable_config_settings() {
        let mut config = PrivateBinConfig {
            open_discussion: true,
            burn_after_reading: true,
            ..PrivateBinConfig::default()
        };
        paste_args(&["--burn-after-reading=false", "--open-discussion=false", "a.txt"])
            .apply(&mut config);
        assert!(!config.open_discussion);
        assert!(!config.burn_after_reading);
    }

    #[test]
    fn test_absent_flags_keep_config_settings() {
        let mut config = PrivateBinConfig {
            burn_after_reading: true,
            ..PrivateBinConfig::default()
        };
        paste_args(&["--open-discussion", "a.txt"]).apply(&mut config);
        assert!(config.open_discussion);
        assert!(config.burn_after_reading);
        assert_eq!(config.expire, Expiry::OneWeek);
    }

    #[test]
    fn test_parse_transfer_unlimited_downloads() {
        let cli =
            Cli::try_parse_from(["sendall", "transfer", "post", "x.bin", "--downloads", "-1"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Transfer {
                action: TransferAction::Post {
                    downloads: Some(-1),
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_expiry() {
        let result = Cli::try_parse_from(["sendall", "privatebin", "post", "a", "--expire", "2weeks"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_post_requires_files() {
        assert!(Cli::try_parse_from(["sendall", "transfer", "post"]).is_err());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "sendall",
            "--log",
            "debug",
            "links",
            "--db",
            "/tmp/links.db",
            "--workers",
            "3",
        ])
        .unwrap();

        let mut config = SendallConfig::default();
        apply_global_overrides(&mut config, &cli);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.store.path, PathBuf::from("/tmp/links.db"));
        assert_eq!(config.pipeline.workers, 3);
        assert_eq!(config.log.format, "text");
    }
}
