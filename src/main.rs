use anyhow::Context;
use clap::Parser;
use stocktake::app::commands;
use stocktake::config::cli::{Command, TicketCommand};
use stocktake::core::tickets::TicketReview;
use stocktake::core::ConfigProvider;
use stocktake::utils::error::ErrorSeverity;
use stocktake::utils::logger;
use stocktake::{Cli, LocalStorage, RestBackend, SessionOptions, Settings, StocktakeError, TomlConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting stocktake CLI");

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, settings).await {
        match e.downcast_ref::<StocktakeError>() {
            Some(err) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 {}", err.recovery_suggestion());

                let exit_code = match err.severity() {
                    ErrorSeverity::Low => 4,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                };
                std::process::exit(exit_code);
            }
            None => {
                tracing::error!("❌ {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_settings(cli: &Cli) -> stocktake::Result<Settings> {
    let file = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            Some(TomlConfig::from_file(path)?)
        }
        None => None,
    };
    if let Some(file) = &file {
        stocktake::utils::validation::Validate::validate(file)?;
    }
    let settings = Settings::resolve(file.as_ref(), cli.overrides())?;
    tracing::debug!(
        "Backend: {}, concurrency: {}, output: {}",
        settings.base_url(),
        settings.concurrent_requests(),
        settings.output_path()
    );
    Ok(settings)
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let backend = Arc::new(RestBackend::from_config(&settings)?);
    let options = SessionOptions {
        concurrent_requests: settings.concurrent_requests(),
    };

    match command {
        Command::Warehouses => {
            for option in commands::warehouses(backend, options).await? {
                let marker = if option.disabled { " (counted)" } else { "" };
                println!("{:>6}  {}{}", option.warehouse.id, option.warehouse.name, marker);
            }
        }
        Command::Zones { warehouse } => {
            for option in commands::zones(backend, warehouse).await? {
                let marker = if option.disabled { " (counted)" } else { "" };
                println!("{:>6}  {}{}", option.zone.id, option.zone.name, marker);
            }
        }
        Command::Status => match commands::status(backend, options).await? {
            Some(report) => {
                println!("📋 Audit {} on warehouse {}", report.audit_id, report.warehouse_id);
                println!("   Zones: {:?}", report.zones);
                println!("   Lines: {} ({} with discrepancies)", report.lines, report.delta_lines);
                println!("   Phase: {}", report.phase);
            }
            None => println!("No audit in progress"),
        },
        Command::Export(args) => {
            let storage = LocalStorage::new(settings.output_path());
            let report =
                commands::export(backend, &storage, options, args.warehouse, &args.zones).await?;
            let verb = if report.resumed { "Resumed" } else { "Started" };
            println!("✅ {} audit {} on warehouse {}", verb, report.audit_id, report.warehouse_id);
            println!("📦 {} lines across zones {:?}", report.lines, report.zones);
            println!(
                "📁 Count sheets saved to: {}",
                storage.full_path(&report.bundle_path).display()
            );
        }
        Command::Save(args) => apply_counts(backend, options, &args.counts, false).await?,
        Command::Submit(args) => apply_counts(backend, options, &args.counts, true).await?,
        Command::Tickets(ticket_command) => {
            let review = TicketReview::new(backend);
            match ticket_command {
                TicketCommand::List { kind } => {
                    for ticket in review.pending(kind.map(Into::into)).await? {
                        println!(
                            "{:>6}  {:<10}  {}  {}",
                            ticket.id,
                            ticket.kind.as_str(),
                            ticket.created_at.format("%Y-%m-%d %H:%M"),
                            ticket.created_by.as_deref().unwrap_or("-")
                        );
                    }
                }
                TicketCommand::Approve { id } => {
                    let ticket = review.approve(id).await?;
                    println!("✅ Ticket {} is {}", ticket.id, ticket.status.as_str());
                }
                TicketCommand::Reject { id, reason } => {
                    let ticket = review.reject(id, &reason).await?;
                    println!("🚫 Ticket {} is {}", ticket.id, ticket.status.as_str());
                }
            }
        }
    }

    Ok(())
}

async fn apply_counts(
    backend: Arc<RestBackend>,
    options: SessionOptions,
    paths: &[String],
    submit: bool,
) -> anyhow::Result<()> {
    let mut sheets = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Cannot read count sheet {}", path))?;
        sheets.push(data);
    }

    let report = commands::apply_counts(backend, options, &sheets, submit).await?;
    println!("📝 Applied {} counts to audit {}", report.applied, report.audit_id);
    if report.submitted {
        println!("✅ Submitted {} discrepancy lines", report.delta_lines);
        for line in &report.discrepancies {
            println!(
                "   {}  {}: expected {}, counted {}",
                line.key(),
                line.name,
                line.expected_quantity,
                line.actual_quantity
            );
        }
    } else {
        println!("💾 Progress saved ({} lines differ so far)", report.delta_lines);
    }
    Ok(())
}
