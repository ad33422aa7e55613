use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use linkquery_common::LinkQueryError;
use linkquery_config::{LinkQueryConfig, MissingArgumentPolicy};

pub const URL_PROMPT: &str = "Enter the URL: ";

#[derive(Debug, Parser)]
#[command(
    name = "linkquery",
    version,
    about = "Collect the scripture links of a WOL article into one search query"
)]
pub struct Cli {
    /// Page to read the links from. Backslashes are ignored.
    pub url: Option<String>,

    /// Config file to load instead of the per-user default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// What to do when no URL is given.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub missing_argument: Option<CliMissingArgument>,

    /// Collapse `;;` and drop spaces after `;` in the result.
    #[arg(long, value_name = "BOOL")]
    pub extra_cleanup: Option<bool>,

    /// Print the result without opening a browser.
    #[arg(long)]
    pub no_open: bool,

    /// Request timeout in seconds.
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Mirror log events to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the daily text.
    Daily {
        /// Day to show (YYYY-MM-DD), today when omitted.
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Also open the day's page on jw.org.
        #[arg(long)]
        open: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMissingArgument {
    Prompt,
    UsageError,
}

impl From<CliMissingArgument> for MissingArgumentPolicy {
    fn from(value: CliMissingArgument) -> Self {
        match value {
            CliMissingArgument::Prompt => MissingArgumentPolicy::Prompt,
            CliMissingArgument::UsageError => MissingArgumentPolicy::UsageError,
        }
    }
}

impl Cli {
    /// Flags given on the command line win over every config source.
    pub fn apply_overrides(&self, cfg: &mut LinkQueryConfig) {
        if let Some(policy) = self.missing_argument {
            cfg.missing_argument = policy.into();
        }
        if let Some(extra) = self.extra_cleanup {
            cfg.extra_cleanup = extra;
        }
        if self.no_open {
            cfg.open_browser = false;
        }
        if let Some(secs) = self.timeout {
            cfg.http.timeout_secs = secs;
        }
        if self.verbose {
            cfg.log.stderr = true;
        }
    }
}

/// Resolve the target URL text: the argument if present, otherwise per `policy`.
///
/// The prompt goes to `prompt_out` so that stdout keeps only the result line.
pub fn acquire_url<R, W>(
    arg: Option<&str>,
    policy: MissingArgumentPolicy,
    input: &mut R,
    prompt_out: &mut W,
) -> Result<String, LinkQueryError>
where
    R: BufRead,
    W: Write,
{
    if let Some(arg) = arg {
        return Ok(arg.to_string());
    }

    match policy {
        MissingArgumentPolicy::UsageError => {
            Err(LinkQueryError::Usage("no URL given".to_string()))
        }
        MissingArgumentPolicy::Prompt => {
            write!(prompt_out, "{URL_PROMPT}").map_err(anyhow::Error::from)?;
            prompt_out.flush().map_err(anyhow::Error::from)?;

            let mut line = String::new();
            let read = input.read_line(&mut line).map_err(anyhow::Error::from)?;
            let line = line.trim();
            if read == 0 || line.is_empty() {
                return Err(LinkQueryError::Usage("no URL entered".to_string()));
            }
            Ok(line.to_string())
        }
    }
}
