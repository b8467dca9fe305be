//! Draftsmith CLI
//!
//! The `draftsmith` command turns an issue into a draft change proposal.
//!
//! ## Commands
//!
//! - `run`: Full pipeline (fallback chain, review, rendering), JSON report on stdout
//! - `validate`: Sanitize and check a raw model response against the contract
//! - `review`: Heuristic review of a proposal file
//! - `render`: Print the PR body and email for a proposal file
//! - `schema`: Print the contract JSON Schema
//! - `backends`: Print the configured fallback chain

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use draftsmith_core::config::parse_backend_list;
use draftsmith_core::obs::PipelineSpan;
use draftsmith_core::telemetry;
use draftsmith_core::{
    contract_schema, credential_from_env, extract_document, fill_defaults, render_change_body,
    render_email, validate, DraftConfig, DraftPipeline, HeuristicReviewer, IssueContext,
    StructuredChangeProposal,
};

#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Draft change proposals from issues", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one issue
    Run {
        /// Issue JSON file (GitHub webhook payload or flat issue object)
        #[arg(long, conflicts_with_all = ["title", "body"])]
        issue: Option<PathBuf>,

        /// Issue title
        #[arg(long, required_unless_present = "issue")]
        title: Option<String>,

        /// Issue body
        #[arg(long, default_value = "")]
        body: String,

        /// File holding spec text
        #[arg(long)]
        spec_file: Option<PathBuf>,

        /// File holding plan text
        #[arg(long)]
        plan_file: Option<PathBuf>,

        /// File holding task list text
        #[arg(long)]
        tasks_file: Option<PathBuf>,

        /// Issue URL substituted into the email
        #[arg(long)]
        issue_url: Option<String>,

        /// Endpoint credential, falls back to OPENROUTER_API_KEY
        #[arg(long)]
        api_key: Option<String>,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Sanitize, default and validate a raw model response
    Validate {
        /// File holding the raw response text
        file: PathBuf,
    },

    /// Run the heuristic reviewer on a proposal
    Review {
        /// Proposal JSON file (or a `run` report)
        file: PathBuf,
    },

    /// Render the PR body and email for a proposal
    Render {
        /// Proposal JSON file (or a `run` report)
        file: PathBuf,

        #[arg(long)]
        issue_url: Option<String>,

        #[arg(long)]
        pr_url: Option<String>,

        #[arg(long)]
        ci_status: Option<String>,
    },

    /// Print the contract JSON Schema
    Schema,

    /// Print the configured fallback chain
    Backends {
        #[command(flatten)]
        chain: ChainArgs,
    },
}

/// Overrides for the endpoint configuration. Unset flags fall back to
/// `DRAFTSMITH_*` environment variables, then built-in defaults.
#[derive(Args, Debug, Default, Clone)]
struct ChainArgs {
    /// Chat completions endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Comma-separated backend identifiers, tried in order
    #[arg(long)]
    backends: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ChainArgs {
    fn config(&self) -> DraftConfig {
        let mut config = DraftConfig::from_env();
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(raw) = &self.backends {
            let list = parse_backend_list(raw);
            if !list.is_empty() {
                config = config.with_backends(list);
            }
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        config
    }
}

/// What a command prints and whether it succeeded.
#[derive(Debug)]
struct Outcome {
    stdout: String,
    ok: bool,
}

impl Outcome {
    fn ok(stdout: String) -> Self {
        Self { stdout, ok: true }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = telemetry::level_for_verbosity(cli.verbose);
    telemetry::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Run {
            issue,
            title,
            body,
            spec_file,
            plan_file,
            tasks_file,
            issue_url,
            api_key,
            chain,
        } => {
            let issue = match issue {
                Some(path) => IssueContext::load(&path)
                    .with_context(|| format!("Failed to load issue from {:?}", path))?,
                None => build_issue(
                    title.unwrap_or_default(),
                    body,
                    spec_file.as_deref(),
                    plan_file.as_deref(),
                    tasks_file.as_deref(),
                )?,
            };
            let issue = match issue_url {
                Some(url) => issue.with_issue_url(url),
                None => issue,
            };
            let credential = resolve_credential(api_key);
            cmd_run(&issue, credential.as_deref(), &chain.config()).await?
        }
        Commands::Validate { file } => {
            let _span = PipelineSpan::enter(&Uuid::new_v4().to_string());
            cmd_validate(&file)?
        }
        Commands::Review { file } => {
            let _span = PipelineSpan::enter(&Uuid::new_v4().to_string());
            cmd_review(&file)?
        }
        Commands::Render {
            file,
            issue_url,
            pr_url,
            ci_status,
        } => cmd_render(
            &file,
            issue_url.as_deref(),
            pr_url.as_deref(),
            ci_status.as_deref(),
        )?,
        Commands::Schema => cmd_schema()?,
        Commands::Backends { chain } => cmd_backends(&chain.config()),
    };

    println!("{}", outcome.stdout);
    Ok(if outcome.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_issue(
    title: String,
    body: String,
    spec_file: Option<&Path>,
    plan_file: Option<&Path>,
    tasks_file: Option<&Path>,
) -> Result<IssueContext> {
    let mut issue = IssueContext::new(title, body);
    if let Some(path) = spec_file {
        issue = issue.with_spec(read_text_file(path)?);
    }
    if let Some(path) = plan_file {
        issue = issue.with_plan(read_text_file(path)?);
    }
    if let Some(path) = tasks_file {
        issue = issue.with_tasks(read_text_file(path)?);
    }
    Ok(issue)
}

async fn cmd_run(issue: &IssueContext, api_key: Option<&str>, config: &DraftConfig) -> Result<Outcome> {
    let pipeline =
        DraftPipeline::from_config(config).context("Failed to build completion client")?;
    info!(backends = pipeline.backends().len(), endpoint = %config.endpoint, "running pipeline");

    let result = pipeline.run(issue, api_key).await;
    Ok(Outcome {
        stdout: result.to_json().context("Failed to serialize pipeline result")?,
        ok: result.success,
    })
}

fn cmd_validate(path: &Path) -> Result<Outcome> {
    let raw = read_text_file(path)?;
    let doc = match extract_document(&raw) {
        Ok(doc) => fill_defaults(doc),
        Err(err) => {
            return Ok(Outcome {
                stdout: format!("invalid: {}", err),
                ok: false,
            })
        }
    };

    let verdict = validate(&Value::Object(doc.clone()));
    if verdict.is_valid() {
        let pretty = serde_json::to_string_pretty(&doc).context("Failed to serialize document")?;
        return Ok(Outcome::ok(pretty));
    }

    let mut lines = vec![format!("invalid: {} error(s)", verdict.errors.len())];
    lines.extend(verdict.errors.iter().map(|e| format!("  {}", e)));
    Ok(Outcome {
        stdout: lines.join("\n"),
        ok: false,
    })
}

fn cmd_review(path: &Path) -> Result<Outcome> {
    let proposal = load_proposal(path)?;
    let outcome = HeuristicReviewer::standard().review(&proposal);
    Ok(Outcome {
        stdout: outcome.summary(),
        ok: outcome.passed,
    })
}

fn cmd_render(
    path: &Path,
    issue_url: Option<&str>,
    pr_url: Option<&str>,
    ci_status: Option<&str>,
) -> Result<Outcome> {
    let proposal = load_proposal(path)?;
    let body = render_change_body(&proposal, None);
    let email = render_email(&proposal, issue_url, pr_url, ci_status);

    Ok(Outcome::ok(format!(
        "# {}\n\n{}\n\n---\nSubject: {}\n\n{}",
        proposal.draft_pr_title, body, email.subject, email.body
    )))
}

fn cmd_schema() -> Result<Outcome> {
    let schema =
        serde_json::to_string_pretty(&contract_schema()).context("Failed to serialize schema")?;
    Ok(Outcome::ok(schema))
}

fn cmd_backends(config: &DraftConfig) -> Outcome {
    let lines: Vec<String> = config
        .backends
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}. {}", i + 1, b))
        .collect();
    Outcome::ok(lines.join("\n"))
}

/// Load a proposal from a proposal file or from the `pipeline_output` of a
/// `run` report. Defaults are applied before validation.
fn load_proposal(path: &Path) -> Result<StructuredChangeProposal> {
    let value: Value = read_json_file(path)?;
    let value = match value {
        Value::Object(mut map) if map.contains_key("pipeline_output") => map
            .remove("pipeline_output")
            .unwrap_or(Value::Null),
        other => other,
    };
    StructuredChangeProposal::from_value(value)
        .with_context(|| format!("Invalid proposal in {:?}", path))
}

/// `--api-key` when given and non-blank, otherwise `OPENROUTER_API_KEY`.
fn resolve_credential(flag: Option<String>) -> Option<String> {
    flag.filter(|key| !key.trim().is_empty())
        .or_else(credential_from_env)
}

fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text_file(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}
