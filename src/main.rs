use std::sync::Arc;

use bd_surface::budget::{ResourceBudget, ResourceTracker};
use bd_surface::config::AppConfig;
use bd_surface::error::AppError;
use bd_surface::telemetry;
use chrono::Utc;
use bd_surface::workflows::intake::{
    intake_router, IntakeRouter, IntakeService, JsonlAuditLog, MemoryWorkspace, Submission,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "BD Surface",
    about = "Run the business-development intake router from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Route a single submission and print the decision
    Triage(TriageArgs),
    /// Report resource usage for a tracked session
    Budget(BudgetArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct TriageArgs {
    /// Submission identifier
    #[arg(long, default_value = "cli-submission")]
    id: String,
    /// Organization name
    #[arg(long)]
    org_name: Option<String>,
    /// Contact email address
    #[arg(long)]
    email: Option<String>,
    /// Lead source (inbound, referral, research_identified, ...)
    #[arg(long)]
    source: Option<String>,
    /// Declared intent (demo_request, pricing_inquiry, partnership)
    #[arg(long)]
    intent: Option<String>,
    /// Free-text message from the intake form
    #[arg(long)]
    message: Option<String>,
    /// Estimated deal size in dollars
    #[arg(long)]
    deal_size: Option<f64>,
    /// Organization headcount, used to infer deal size when not explicit
    #[arg(long)]
    employees: Option<u32>,
    /// Flag a known existing relationship
    #[arg(long)]
    existing_contact: bool,
}

#[derive(Args, Debug)]
struct BudgetArgs {
    /// Session identifier whose state file to inspect
    #[arg(long)]
    session_id: String,
    /// Delete the state file after reporting
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Triage(args) => run_triage(args),
        Command::Budget(args) => run_budget(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let audit = Arc::new(JsonlAuditLog::open(&config.session.audit_log)?);
    let router = IntakeRouter::default().with_audit(audit);
    let service = Arc::new(IntakeService::new(router, Arc::new(MemoryWorkspace::default())));
    let app = intake_router(service);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(?config.environment, %addr, "bd intake router ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_triage(args: TriageArgs) -> Result<(), AppError> {
    let submission = Submission {
        id: args.id,
        org_name: args.org_name,
        contact_name: None,
        email: args.email,
        source: args.source,
        intent_signal: args.intent,
        message: args.message,
        estimated_deal_size: args.deal_size,
        org_employee_count: args.employees,
        existing_contact: args.existing_contact,
        contact_id: None,
    };

    let router = IntakeRouter::default();
    let result = router.route(&submission);

    println!("Decision: {}", result.decision.label());
    println!(
        "Stage: {}",
        result
            .target_stage
            .map(|stage| stage.label())
            .unwrap_or("N/A")
    );
    println!(
        "Assigned: {}",
        result
            .assigned_team
            .map(|team| team.team())
            .unwrap_or("N/A")
    );
    println!("Confidence: {:.2}", result.confidence);
    println!("Reasoning: {}", result.reasoning);

    Ok(())
}

fn run_budget(args: BudgetArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    // An existing state file wins over the default budget, so this reports
    // whatever the tracked run actually consumed.
    let tracker = ResourceTracker::persistent(
        &args.session_id,
        ResourceBudget::standard(),
        &config.session.state_dir,
    )?;
    let summary = tracker.summary();

    println!("Session: {}", summary.session_id);
    println!(
        "Tokens: {} / {}",
        summary.usage.tokens_used, summary.budget.max_tokens
    );
    println!(
        "API calls: {} / {}",
        summary.usage.api_calls_made, summary.budget.max_api_calls
    );
    println!(
        "Runtime: {:.0}s / {}s",
        summary.usage.runtime_seconds(Utc::now()),
        summary.budget.max_runtime_seconds
    );
    println!(
        "Steps: {} completed, {} failed",
        summary.usage.steps_completed, summary.usage.steps_failed
    );
    if !summary.usage.personas_loaded.is_empty() {
        println!("Personas: {}", summary.usage.personas_loaded.join(", "));
    }
    println!(
        "Within limits: {}",
        if summary.status.ok { "yes" } else { "no" }
    );
    for warning in &summary.status.warnings {
        println!("Warning: {warning}");
    }
    for error in &summary.status.errors {
        println!("Limit: {error}");
    }

    if args.cleanup {
        tracker.cleanup()?;
        println!("State file removed.");
    }

    Ok(())
}
