use crate::config::Overrides;
use crate::domain::model::{TicketId, TicketKind, WarehouseId, ZoneId};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "stocktake")]
#[command(about = "Warehouse stocktaking client: count zones, reconcile and submit discrepancies")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(long, global = true, env = "STOCKTAKE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[arg(long, global = true)]
    pub concurrent_requests: Option<usize>,

    #[arg(long, global = true)]
    pub output_path: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List warehouses; fully counted ones are marked
    Warehouses,
    /// List zones of a warehouse; zones counted elsewhere are marked
    Zones {
        #[arg(long)]
        warehouse: WarehouseId,
    },
    /// Show the audit in progress
    Status,
    /// Start (or resume) an audit and export count sheets
    Export(ExportArgs),
    /// Apply a filled-in count sheet and save progress without submitting
    Save(CountsArgs),
    /// Apply a filled-in count sheet and submit the discrepancies
    Submit(CountsArgs),
    /// Review write-off, sale and production tickets
    #[command(subcommand)]
    Tickets(TicketCommand),
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Required when no audit is in progress
    #[arg(long)]
    pub warehouse: Option<WarehouseId>,

    #[arg(long, value_delimiter = ',')]
    pub zones: Vec<ZoneId>,
}

#[derive(Debug, Clone, Args)]
pub struct CountsArgs {
    /// CSV count sheet(s) as exported by `stocktake export`
    #[arg(long = "counts", required = true, num_args = 1..)]
    pub counts: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TicketCommand {
    /// List pending tickets
    List {
        #[arg(long = "type", value_enum)]
        kind: Option<TicketKindArg>,
    },
    Approve {
        id: TicketId,
    },
    Reject {
        id: TicketId,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TicketKindArg {
    WriteOff,
    Sale,
    Production,
}

impl From<TicketKindArg> for TicketKind {
    fn from(arg: TicketKindArg) -> Self {
        match arg {
            TicketKindArg::WriteOff => TicketKind::WriteOff,
            TicketKindArg::Sale => TicketKind::Sale,
            TicketKindArg::Production => TicketKind::Production,
        }
    }
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            timeout_seconds: self.timeout,
            concurrent_requests: self.concurrent_requests,
            output_path: self.output_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_with_zone_list() {
        let cli = Cli::try_parse_from([
            "stocktake",
            "--base-url",
            "http://localhost:8080",
            "export",
            "--warehouse",
            "1",
            "--zones",
            "3,4",
        ])
        .unwrap();

        match &cli.command {
            Command::Export(args) => {
                assert_eq!(args.warehouse, Some(1));
                assert_eq!(args.zones, vec![3, 4]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.overrides().base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_parse_ticket_reject() {
        let cli = Cli::try_parse_from(["stocktake", "tickets", "reject", "7", "--reason", "duplicate"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Tickets(TicketCommand::Reject { id: 7, .. })
        ));
    }

    #[test]
    fn test_submit_requires_counts() {
        assert!(Cli::try_parse_from(["stocktake", "submit"]).is_err());
    }
}
