//! Pull request triage CLI
//!
//! Labels and nudges open pull requests that sit inactive with merge
//! conflicts, failing CI, or no activity at all.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use triage::github::DEFAULT_API_URL;
use triage::{
    classifier::inactive_days, decide, run_batch, CiStatus, Decision, DryRunExecutor, Engine,
    Executor, GitHubClient, PolicyConfig, RawPullRequest, Slug,
};

/// Pull request lifecycle triage - labels and nudges inactive PRs
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Pull request lifecycle triage - labels and nudges inactive PRs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every open PR of the given repositories and apply actions
    Run {
        /// Policy config file (YAML)
        #[arg(long, env = "TRIAGE_CONFIG")]
        config: PathBuf,

        /// Repository to triage (owner/repo), may be repeated
        #[arg(long = "repo", required = true)]
        repos: Vec<Slug>,

        /// GitHub token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// GitHub API root
        #[arg(long, default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Login our comments are posted as (defaults to the token's account)
        #[arg(long, env = "TRIAGE_SELF_LOGIN")]
        self_login: Option<String>,

        /// Log actions instead of applying them
        #[arg(long)]
        dry_run: bool,

        /// Pull requests processed in parallel
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Validate a config file and print the resulting rule table
    CheckConfig {
        /// Policy config file (YAML)
        #[arg(long, env = "TRIAGE_CONFIG")]
        config: PathBuf,
    },

    /// Evaluate a single PR from a JSON file without touching the platform
    Evaluate {
        /// Policy config file (YAML)
        #[arg(long, env = "TRIAGE_CONFIG")]
        config: PathBuf,

        /// Raw pull request data (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Login our comments are posted as
        #[arg(long, env = "TRIAGE_SELF_LOGIN")]
        self_login: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_directive = if verbose { "triage=debug" } else { "triage=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: &Path) -> Result<PolicyConfig> {
    PolicyConfig::load(path)
        .with_context(|| format!("Failed to load policy config from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Run {
            config,
            repos,
            github_token,
            api_url,
            self_login,
            dry_run,
            concurrency,
        } => {
            run(
                &config,
                &repos,
                github_token,
                &api_url,
                self_login,
                dry_run,
                concurrency,
            )
            .await
        }
        Commands::CheckConfig { config } => check_config(&config),
        Commands::Evaluate {
            config,
            input,
            now,
            self_login,
            format,
        } => evaluate(
            &config,
            &input,
            now.unwrap_or_else(Utc::now),
            self_login.as_deref(),
            format,
        ),
    }
}

async fn run(
    config_path: &Path,
    repos: &[Slug],
    github_token: Option<String>,
    api_url: &str,
    self_login: Option<String>,
    dry_run: bool,
    concurrency: usize,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut engine = Engine::from_config(&config);

    let has_token = github_token.is_some();
    if !has_token {
        warn!("No GitHub token configured, requests are unauthenticated");
    }
    let client =
        GitHubClient::with_base_url(api_url, github_token).context("Failed to build HTTP client")?;

    let self_login = match self_login {
        Some(login) => Some(login),
        None if has_token => Some(
            client
                .authenticated_login()
                .await
                .context("Failed to resolve the account behind the GitHub token")?,
        ),
        None => None,
    };
    match &self_login {
        Some(login) => {
            info!(login = %login, "Own comments are posted as");
            engine = engine.with_self_login(login);
        }
        None => warn!("Own account unknown, relying on bot_logins to recognise earlier comments"),
    }
    let dry_run_executor = DryRunExecutor;
    let executor: &dyn Executor = if dry_run {
        &dry_run_executor
    } else {
        &client
    };

    info!(
        repos = repos.len(),
        executor = executor.name(),
        concurrency,
        "Starting triage run"
    );
    let report = run_batch(&engine, &client, executor, repos, Utc::now(), concurrency).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::from_config(&config);
    let table = engine.table();

    println!("{} {}", "✓".green(), "Config is valid".bold());
    for rule in table.rules().iter().chain(table.conflict_notice()) {
        println!(
            "  {:<16} {:>4} days  {:<14} label: {}",
            rule.name.to_string().cyan(),
            rule.threshold_days,
            format!("{:?}", rule.precondition).dimmed(),
            rule.label.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn evaluate(
    config_path: &Path,
    input: &Path,
    now: DateTime<Utc>,
    self_login: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut engine = Engine::from_config(&config);
    if let Some(login) = self_login {
        engine = engine.with_self_login(login);
    }

    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let raw: RawPullRequest = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse pull request data from {}", input.display()))?;

    let snapshot = engine
        .extractor()
        .extract(&raw)
        .context("Pull request data is incomplete")?;
    let decision = decide(engine.table(), &snapshot, now).context("Failed to render action")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "pr": snapshot.id().to_string(),
                "inactive_days": inactive_days(&snapshot, now),
                "snapshot": snapshot,
                "decision": decision,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let ci = match snapshot.ci_status {
                CiStatus::Passing => "passing".green(),
                CiStatus::Failing => "failing".red(),
                CiStatus::Pending => "pending".yellow(),
            };
            println!("{}", snapshot.id().to_string().bold());
            println!("  inactive days: {}", inactive_days(&snapshot, now));
            println!(
                "  conflicts:     {}",
                if snapshot.has_conflicts {
                    "yes".red()
                } else {
                    "no".green()
                }
            );
            println!("  ci:            {ci}");
            println!("  head:          {}", snapshot.last_commit_hash);

            match decision {
                Decision::NoAction => println!("{}", "No action".dimmed()),
                Decision::Suppressed { rule } => {
                    println!("{} {}", "Suppressed".yellow(), rule);
                }
                Decision::ClearLabels { labels } => {
                    println!("{} {}", "Clear labels".blue().bold(), labels.join(", "));
                }
                Decision::Apply(action) => {
                    println!("{} {}", "Apply".green().bold(), action.rule);
                    if let Some(label) = &action.label {
                        println!("  label: {}", label.cyan());
                    }
                    println!("  comment:\n{}", action.comment_body);
                }
            }
        }
    }
    Ok(())
}
