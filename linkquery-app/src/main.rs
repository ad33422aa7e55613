use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use linkquery_common::observability::{LogConfig, LogGuard, init_logging, init_stderr_logging};
use linkquery_common::{EXIT_OK, LinkQueryError, Result};
use linkquery_config::{HttpSettings, LinkQueryConfig, LinkQueryConfigLoader};
use linkquery_http::HttpClient;
use linkquery_web::daily::{DailySource, DailyText};
use linkquery_web::search::parse_target_url;
use linkquery_web::{
    BrowserLauncher, BrowserStatus, CleanupOptions, SearchOptions, SearchOutcome, SystemBrowser,
    run_search,
};
mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match load_config(&cli) {
        Ok(cfg) => {
            let log_guard = start_logging(&cfg);
            let code = match run(&cli, &cfg).await {
                Ok(()) => EXIT_OK,
                Err(err) => report(&err),
            };
            drop(log_guard);
            code
        }
        Err(err) => report(&err),
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn report(err: &LinkQueryError) -> i32 {
    tracing::error!(error = %format!("{err:#}"), "linkquery.failed");
    eprintln!("{err:#}");
    if matches!(err, LinkQueryError::Usage(_)) {
        eprintln!("{}", Cli::command().render_usage());
    }
    err.exit_code()
}

/// File logging is best effort: without it the run goes on, logging to
/// stderr only when that was asked for.
fn start_logging(cfg: &LinkQueryConfig) -> Option<LogGuard> {
    let log_config = LogConfig {
        log_dir: cfg.log.dir.clone(),
        emit_stderr: cfg.log.stderr,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
        ..LogConfig::default()
    };

    match init_logging(log_config.clone()) {
        Ok(guard) => {
            tracing::debug!(log = %guard.path().display(), ?cfg, "linkquery.start");
            Some(guard)
        }
        Err(e) => {
            eprintln!("Warning: file logging disabled: {e:#}");
            if log_config.emit_stderr {
                if let Err(e) = init_stderr_logging(&log_config) {
                    eprintln!("Warning: {e:#}");
                }
            }
            None
        }
    }
}

async fn run(cli: &Cli, cfg: &LinkQueryConfig) -> Result<()> {
    match &cli.command {
        Some(Commands::Daily { date, open }) => run_daily(cfg, *date, *open).await,
        None => run_extract(cfg, cli.url.as_deref()).await,
    }
}

fn load_config(cli: &Cli) -> Result<LinkQueryConfig> {
    let loader = match &cli.config {
        Some(path) => LinkQueryConfigLoader::new().with_file(path),
        None => LinkQueryConfigLoader::new().with_default_file(),
    };
    let mut cfg = loader
        .load()
        .map_err(|e| LinkQueryError::Config(e.to_string()))?;
    cli.apply_overrides(&mut cfg);
    Ok(cfg)
}

fn build_client(http: &HttpSettings) -> Result<HttpClient> {
    let client = HttpClient::new(
        &http.user_agent,
        Duration::from_secs(http.connect_timeout_secs),
    )
    .map_err(|e| LinkQueryError::Request(e.to_string()))?;
    Ok(client.with_timeout(Duration::from_secs(http.timeout_secs)))
}

async fn run_extract(cfg: &LinkQueryConfig, arg: Option<&str>) -> Result<()> {
    let raw = cli::acquire_url(
        arg,
        cfg.missing_argument,
        &mut io::stdin().lock(),
        &mut io::stderr(),
    )?;
    let url = parse_target_url(&raw).map_err(|e| LinkQueryError::Request(e.to_string()))?;

    let client = build_client(&cfg.http)?;
    let options = SearchOptions {
        cleanup: CleanupOptions {
            extra_cleanup: cfg.extra_cleanup,
        },
        open_browser: cfg.open_browser,
    };

    let outcome = run_search(&client, &SystemBrowser::new(), &url, options, &mut io::stdout())
        .await
        .map_err(|e| LinkQueryError::Request(e.to_string()))?;

    if let SearchOutcome::Completed(report) = outcome {
        tracing::info!(search_url = %report.search_url, "linkquery.done");
        if let BrowserStatus::Failed(e) = report.browser {
            eprintln!("Warning: {e}");
        }
    }
    Ok(())
}

async fn run_daily(cfg: &LinkQueryConfig, date: Option<NaiveDate>, open: bool) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let daily_err = |e: linkquery_web::daily::DailyError| LinkQueryError::Daily(e.to_string());

    let source = DailySource::new(&cfg.daily.locale, cfg.daily.r_version).map_err(daily_err)?;
    let client = build_client(&cfg.http)?;
    let daily = source.fetch(&client, date).await.map_err(daily_err)?;

    print_daily(&mut io::stdout(), &daily).context("failed to write daily text")?;

    if open {
        let share = source.share_url(date).map_err(daily_err)?;
        if let Err(e) = SystemBrowser::new().open(&share) {
            tracing::warn!(error = %e, "daily.browser_failed");
            eprintln!("Warning: {e}");
        }
    }
    Ok(())
}

fn print_daily<W: Write>(out: &mut W, daily: &DailyText) -> io::Result<()> {
    writeln!(out, "{}", daily.scripture)?;
    writeln!(out, "{}", daily.text)?;
    out.flush()
}
