use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::LedgerService;
use crate::domain::{
    Amount, DEFAULT_WALLET, Deposit, WalletId, Withdrawal, format_amount, parse_amount,
};

/// Purse - Append-only Wallet Ledger
#[derive(Parser)]
#[command(name = "purse")]
#[command(about = "An append-only wallet ledger with overdraft-safe withdrawals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "PURSE_DATABASE", default_value = "purse.db")]
    pub database: String,

    /// Wallet to operate on
    #[arg(short, long, env = "PURSE_WALLET", default_value = DEFAULT_WALLET)]
    pub wallet: WalletId,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show the wallet balance
    Balance {
        /// Show every wallet that has entries
        #[arg(long)]
        all: bool,
    },

    /// Deposit funds into the wallet
    Deposit {
        /// Amount to deposit (e.g., "50.00" or "0.015")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Withdraw funds from the wallet
    Withdraw {
        /// Amount to withdraw (e.g., "50.00" or "0.015")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// List the wallet's ledger entries, newest first
    Entries {
        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Verify ledger integrity for every wallet
    Check,

    /// Export ledger data
    Export {
        /// What to export
        #[arg(value_enum)]
        export_type: ExportType,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Export every wallet instead of only the selected one
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportType {
    Entries,
    Balances,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database)
                    .await
                    .with_context(|| format!("Failed to initialize {}", self.database))?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Balance { all } => {
                let service = connect(&self.database).await?;
                if all {
                    run_all_balances_command(&service).await?;
                } else {
                    let balance = service.wallet(self.wallet.clone()).get_balance().await?;
                    println!("{}: {}", self.wallet, format_amount(balance.amount));
                }
            }

            Commands::Deposit { amount } => {
                let service = connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;

                let balance = service
                    .wallet(self.wallet.clone())
                    .deposit_funds(Deposit { amount })
                    .await?;

                println!(
                    "Deposited {} into {}. Balance: {}",
                    format_amount(amount),
                    self.wallet,
                    format_amount(balance.amount)
                );
            }

            Commands::Withdraw { amount } => {
                let service = connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;

                let balance = service
                    .wallet(self.wallet.clone())
                    .withdraw_funds(Withdrawal { amount })
                    .await?;

                println!(
                    "Withdrew {} from {}. Balance: {}",
                    format_amount(amount),
                    self.wallet,
                    format_amount(balance.amount)
                );
            }

            Commands::Entries { limit } => {
                let service = connect(&self.database).await?;
                run_entries_command(&service, self.wallet, limit).await?;
            }

            Commands::Check => {
                let service = connect(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
                format,
                all,
            } => {
                let service = connect(&self.database).await?;
                let wallet = (!all).then_some(&self.wallet);
                run_export_command(&service, export_type, format, wallet, output.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

async fn connect(database: &str) -> Result<LedgerService> {
    LedgerService::connect(database).await.with_context(|| {
        format!(
            "Failed to open database {}. Run 'purse init' first",
            database
        )
    })
}

fn parse_amount_arg(input: &str) -> Result<Amount> {
    parse_amount(input).context("Invalid amount. Use a non-negative number like '50.00' or '50'")
}

async fn run_all_balances_command(service: &LedgerService) -> Result<()> {
    let balances = service.list_balances().await?;
    if balances.is_empty() {
        println!("No wallets found.");
    } else {
        println!("{:<20} {:>16}", "WALLET", "BALANCE");
        println!("{}", "-".repeat(37));
        for entry in balances {
            println!(
                "{:<20} {:>16}",
                entry.wallet.as_str(),
                format_amount(entry.balance.amount)
            );
        }
    }
    Ok(())
}

async fn run_entries_command(
    service: &LedgerService,
    wallet: WalletId,
    limit: Option<usize>,
) -> Result<()> {
    let entries = service.wallet(wallet.clone()).entries().await?;

    if entries.is_empty() {
        println!("No entries for wallet {}.", wallet);
        return Ok(());
    }

    println!(
        "{:>6} {:<20} {:>14} {:>14} {:>14}",
        "SEQ", "TIME", "AMOUNT", "BEFORE", "AFTER"
    );
    println!("{}", "-".repeat(72));

    let limit = limit.unwrap_or(entries.len());
    for entry in entries.iter().rev().take(limit) {
        println!(
            "{:>6} {:<20} {:>14} {:>14} {:>14}",
            entry.sequence,
            entry.event_time.format("%Y-%m-%d %H:%M:%S"),
            format_amount(entry.amount),
            format_amount(entry.balance_before),
            format_amount(entry.balance_after())
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let reports = service.check_integrity().await?;
    let mut healthy = true;

    println!("{:<20} {:>8} {:>16}  STATUS", "WALLET", "ENTRIES", "BALANCE");
    println!("{}", "-".repeat(54));
    for report in &reports {
        let wallet = report.wallet.as_ref().map_or("?", |w| w.as_str());
        println!(
            "{:<20} {:>8} {:>16}  {}",
            wallet,
            report.entry_count,
            format_amount(report.final_balance),
            if report.is_healthy() { "OK" } else { "BROKEN" }
        );
        healthy &= report.is_healthy();
    }
    println!();

    if healthy {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for report in reports.iter().filter(|r| !r.is_healthy()) {
            for issue in &report.issues {
                let wallet = report.wallet.as_ref().map_or("?", |w| w.as_str());
                println!("  - [{}] {}", wallet, issue);
            }
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: ExportType,
    format: ExportFormat,
    wallet: Option<&WalletId>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match (export_type, format) {
        (ExportType::Entries, ExportFormat::Csv) => {
            let count = exporter.export_entries_csv(wallet, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} entries", count);
            }
        }
        (ExportType::Balances, ExportFormat::Csv) => {
            let count = exporter.export_balances_csv(wallet, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        (ExportType::Balances, ExportFormat::Json) => {
            let snapshot = exporter.export_balances_json(wallet, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", snapshot.balances.len());
            }
        }
        (ExportType::Entries, ExportFormat::Json) => {
            let snapshot = exporter.export_json(wallet, writer).await?;
            if output.is_some() {
                let entries: usize = snapshot.wallets.iter().map(|w| w.entries.len()).sum();
                eprintln!(
                    "Exported {} wallets with {} entries",
                    snapshot.wallets.len(),
                    entries
                );
            }
        }
    }

    Ok(())
}
