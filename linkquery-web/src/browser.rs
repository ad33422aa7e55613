use std::process::{Command, Stdio};

use thiserror::Error;
use url::Url;

/// Browsers tried after the platform opener, in order.
const FALLBACK_BROWSERS: [&str; 4] = ["firefox", "google-chrome", "chromium", "brave-browser"];

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not open a browser for {url} (tried: {tried})")]
    NoLauncher { url: String, tried: String },
}

/// Hands a URL to something that can display it. Fire-and-forget.
pub trait BrowserLauncher {
    fn open(&self, url: &Url) -> Result<(), BrowserError>;
}

/// A program and its leading arguments. A `%s` argument is replaced by the
/// URL; without one the URL is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Parse one `$BROWSER` entry such as `firefox --new-tab %s`.
    fn parse(entry: &str) -> Option<Self> {
        let mut words = entry.split_whitespace();
        let program = words.next()?;
        Some(Self {
            program: program.to_string(),
            args: words.map(str::to_string).collect(),
        })
    }

    fn argv(&self, url: &str) -> Vec<String> {
        let mut argv: Vec<String> = self.args.iter().map(|a| a.replace("%s", url)).collect();
        if !self.args.iter().any(|a| a.contains("%s")) {
            argv.push(url.to_string());
        }
        argv
    }
}

/// The user's default browser: `$BROWSER` first, then the platform opener,
/// then a few well-known browsers.
#[derive(Debug, Clone)]
pub struct SystemBrowser {
    candidates: Vec<LaunchCommand>,
}

impl Default for SystemBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBrowser {
    pub fn new() -> Self {
        let env = std::env::var("BROWSER").ok();
        Self {
            candidates: default_candidates(env.as_deref()),
        }
    }

    /// Launcher with an explicit candidate list.
    pub fn with_commands(candidates: Vec<LaunchCommand>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[LaunchCommand] {
        &self.candidates
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), BrowserError> {
        let target = url.as_str();
        for candidate in &self.candidates {
            let spawned = Command::new(&candidate.program)
                .args(candidate.argv(target))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(child) => {
                    tracing::info!(program = %candidate.program, pid = child.id(), "browser.launched");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(program = %candidate.program, error = %e, "browser.launch_failed");
                }
            }
        }

        Err(BrowserError::NoLauncher {
            url: target.to_string(),
            tried: self
                .candidates
                .iter()
                .map(|c| c.program.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

fn default_candidates(browser_env: Option<&str>) -> Vec<LaunchCommand> {
    let mut out: Vec<LaunchCommand> = browser_env
        .map(|raw| raw.split(':').filter_map(LaunchCommand::parse).collect())
        .unwrap_or_default();

    if cfg!(target_os = "macos") {
        out.push(LaunchCommand::new("open", &[]));
    } else if cfg!(target_os = "windows") {
        out.push(LaunchCommand::new("rundll32", &["url.dll,FileProtocolHandler"]));
    } else {
        out.push(LaunchCommand::new("xdg-open", &[]));
    }

    out.extend(FALLBACK_BROWSERS.iter().map(|b| LaunchCommand::new(b, &[])));
    out
}
