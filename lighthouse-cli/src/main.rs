//! lighthouse-cli — one-shot client for the Lighthouse trace API
//!
//! # Subcommands
//! - `traces [--project <id>] [--json]`  — list traces, newest first
//! - `stats [--project <id>]`            — aggregate cost / requests / latency
//! - `query <prompt> [--db <id>]`        — submit a prompt (grounded with `--db`)
//! - `check <trace-id> --db <id>`        — run a hallucination check
//! - `connections`                       — list database connections
//! - `clear`                             — delete every trace

use clap::{Parser, Subcommand};
use lighthouse_core::{DbConnection, Stats, Trace};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;

const DEFAULT_SERVER: &str = "http://localhost:8080/api";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "lighthouse-cli",
    version,
    about = "Lighthouse AI observability — trace and hallucination-check CLI"
)]
struct Cli {
    /// Backend base URL (overrides LIGHTHOUSE_BACKEND_URL env var)
    #[arg(long, env = "LIGHTHOUSE_BACKEND_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List traces, newest first
    Traces {
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,

        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show aggregate stats
    Stats {
        #[arg(long)]
        project: Option<String>,
    },

    /// Submit a prompt
    Query {
        prompt: String,

        /// Ground the answer in this database connection
        #[arg(long)]
        db: Option<String>,
    },

    /// Run a hallucination check for a trace
    Check {
        trace_id: String,

        /// Database connection to check against
        #[arg(long)]
        db: String,
    },

    /// List database connections
    Connections,

    /// Delete every trace
    Clear,
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_cost(usd: f64) -> String {
    format!("${:.6}", usd)
}

/// Confidence column: "42% Hallucination Detected", or "unchecked".
pub fn format_confidence(trace: &Trace) -> String {
    match (trace.effective_confidence(), trace.confidence_level()) {
        (Some(score), Some(level)) => format!("{:.0}% {}", score, level.label()),
        _ => "unchecked".to_string(),
    }
}

/// One-line summary of a trace.
pub fn format_trace_line(trace: &Trace) -> String {
    let prompt: String = trace.prompt.chars().take(60).collect();
    format!(
        "#{} [{}] {} | {} tok | {}ms | {} | {}",
        trace.id,
        trace.provider,
        prompt,
        trace.tokens_used,
        trace.latency_ms,
        format_cost(trace.cost_usd),
        format_confidence(trace),
    )
}

pub fn format_stats(stats: &Stats) -> String {
    format!(
        "Total cost:     {}\nTotal requests: {}\nAvg latency:    {}ms",
        format_cost(stats.total_cost),
        stats.total_requests,
        stats.average_latency.round() as u64,
    )
}

pub fn format_connection(conn: &DbConnection) -> String {
    let state = if conn.is_connected {
        "connected".to_string()
    } else {
        match &conn.last_error {
            Some(e) => format!("disconnected ({})", e),
            None => "disconnected".to_string(),
        }
    };
    format!(
        "#{} {} — {}@{}:{}/{} [{}]",
        conn.id, conn.name, conn.username, conn.host, conn.port, conn.database, state
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<Client> {
    Ok(Client::builder().build()?)
}

fn send(req: RequestBuilder) -> anyhow::Result<reqwest::blocking::Response> {
    let resp = req.send()?;
    let status = resp.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        anyhow::bail!("backend requires authentication (HTTP 403)");
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        anyhow::bail!("server returned {}: {}", status, body);
    }
    Ok(resp)
}

fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> anyhow::Result<T> {
    Ok(send(req)?.json()?)
}

fn scoped(req: RequestBuilder, project: Option<&str>) -> RequestBuilder {
    match project {
        Some(p) => req.query(&[("projectId", p)]),
        None => req,
    }
}

/// `{server}/traces/{id}/check-hallucinations` with the id percent-encoded.
fn check_url(server: &str, trace_id: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(server)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("server URL {} cannot carry a path", server))?
        .pop_if_empty()
        .extend(&["traces", trace_id, "check-hallucinations"]);
    Ok(url)
}

fn do_traces(server: &str, project: Option<&str>, json_output: bool) -> anyhow::Result<()> {
    let client = client()?;
    let traces: Vec<Trace> = send_json(scoped(client.get(format!("{}/traces", server)), project))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&traces)?);
        return Ok(());
    }
    if traces.is_empty() {
        eprintln!("No traces yet");
        return Ok(());
    }
    for t in &traces {
        println!("{}", format_trace_line(t));
    }
    Ok(())
}

fn do_stats(server: &str, project: Option<&str>) -> anyhow::Result<()> {
    let client = client()?;
    let stats: Stats = send_json(scoped(client.get(format!("{}/traces/stats", server)), project))?;
    println!("{}", format_stats(&stats));
    Ok(())
}

fn do_query(server: &str, prompt: &str, db: Option<&str>) -> anyhow::Result<()> {
    let client = client()?;
    let req = match db {
        Some(id) => client
            .post(format!("{}/traces/query-with-db", server))
            .json(&serde_json::json!({ "prompt": prompt, "dbConnectionId": id })),
        None => client
            .post(format!("{}/traces/query", server))
            .json(&serde_json::json!({ "prompt": prompt })),
    };
    let trace: Trace = send_json(req)?;
    println!("{}", format_trace_line(&trace));
    println!("\n{}", trace.response);
    Ok(())
}

fn do_check(server: &str, trace_id: &str, db: &str) -> anyhow::Result<()> {
    let client = client()?;
    let req = client
        .post(check_url(server, trace_id)?)
        .json(&serde_json::json!({ "dbConnectionId": db }));
    let trace: Trace = send_json(req)?;
    println!("{}", format_trace_line(&trace));

    if let Some(verdict) = trace.verdict() {
        for claim in &verdict.supported_claims {
            println!("  ✓ {}", claim);
        }
        for claim in &verdict.unsupported_claims {
            println!("  ✗ {}", claim);
        }
        if !verdict.ai_review.is_empty() {
            println!("\n{}", verdict.ai_review);
        }
    }
    Ok(())
}

fn do_connections(server: &str) -> anyhow::Result<()> {
    let client = client()?;
    let conns: Vec<DbConnection> = send_json(client.get(format!("{}/db-connections", server)))?;
    if conns.is_empty() {
        eprintln!("No database connections configured");
    }
    for c in &conns {
        println!("{}", format_connection(c));
    }
    Ok(())
}

fn do_clear(server: &str) -> anyhow::Result<()> {
    let client = client()?;
    send(client.delete(format!("{}/traces/clear", server)))?;
    println!("All traces cleared");
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Traces { project, json } => do_traces(&server, project.as_deref(), json),
        Commands::Stats { project } => do_stats(&server, project.as_deref()),
        Commands::Query { prompt, db } => do_query(&server, &prompt, db.as_deref()),
        Commands::Check { trace_id, db } => do_check(&server, &trace_id, &db),
        Commands::Connections => do_connections(&server),
        Commands::Clear => do_clear(&server),
    };

    if let Err(e) = result {
        eprintln!("lighthouse-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
