//! Bulkops CLI - interactive catalog maintenance session.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::disallowed_macros)]
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use bulkops::errors::BulkOpsError;
use bulkops::storage::{CatalogStore, MemoryStore};
use bulkops::{
    ui, BulkOpsResult, ControlPanel, OperationId, OperationOutcome, ProductFilter, Settings,
    TaxScope,
};

#[derive(Parser)]
#[command(name = "bulkops")]
#[command(about = "Cancellable, reversible bulk maintenance for a product catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Catalog JSON file, saved back on quit
    #[arg(long, env = "BULKOPS_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,

    /// Settings JSON file
    #[arg(long, env = "BULKOPS_CONFIG", default_value = "bulkops.json")]
    config: PathBuf,
}

/// One line typed into the session
#[derive(Parser)]
#[command(no_binary_name = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// List products
    Products,

    /// List undoable operations, newest first
    History,

    /// Undo an operation by id
    Undo { id: String },

    /// Activate the given products
    Activate {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Deactivate the given products
    Deactivate {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Activate or deactivate every product matching a filter
    Toggle {
        /// Deactivate instead of activating
        #[arg(long)]
        off: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Deactivate products with zero or negative stock
    InactivateZeroStock,

    /// Zero every stock level
    ZeroStock,

    /// Zero negative stock levels
    ZeroNegativeStock,

    /// Zero cost and sale prices
    ZeroPrices,

    /// Reassign a tax classification by NCM prefix
    Tax {
        /// state or federal
        #[arg(value_parser = parse_scope)]
        scope: TaxScope,

        /// Tax classification id
        tax_id: String,

        /// NCM prefixes
        #[arg(required = true)]
        ncms: Vec<String>,
    },

    /// Enable MEI stock adjustment on every emitter (cannot be undone)
    EnableMei,

    /// Delete ledger entries dated before a day (cannot be undone)
    Clean {
        /// YYYY-MM-DD
        before: String,
    },

    /// Cancel the running operation
    Cancel,

    /// Forget the undo history
    Clear,

    /// Save the catalog now
    Save,

    /// Save and leave
    Quit,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Description contains
    #[arg(long)]
    name: Option<String>,

    /// NCM prefix, repeatable
    #[arg(long = "ncm")]
    ncms: Vec<String>,

    #[arg(long)]
    state_tax: Option<String>,

    #[arg(long)]
    federal_tax: Option<String>,

    /// Only products currently active (true) or inactive (false)
    #[arg(long)]
    active: Option<bool>,
}

impl From<FilterArgs> for ProductFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            name: args.name,
            ncms: args.ncms,
            state_tax: args.state_tax,
            federal_tax: args.federal_tax,
            active: args.active,
        }
    }
}

impl SessionCommand {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Activate { .. }
                | Self::Deactivate { .. }
                | Self::Toggle { .. }
                | Self::InactivateZeroStock
                | Self::ZeroStock
                | Self::ZeroNegativeStock
                | Self::ZeroPrices
                | Self::Tax { .. }
                | Self::EnableMei
                | Self::Clean { .. }
        )
    }
}

fn parse_scope(s: &str) -> Result<TaxScope, String> {
    s.parse::<TaxScope>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)
        .await
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    let store = Arc::new(
        MemoryStore::load(&cli.catalog)
            .await
            .with_context(|| format!("loading catalog from {}", cli.catalog.display()))?,
    );
    let panel = Arc::new(ControlPanel::new(
        settings,
        Arc::clone(&store) as Arc<dyn CatalogStore>,
    ));

    ui::print_info("Type a command, or 'help'. 'cancel' stops a running operation.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut running: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let words: Vec<&str> = line.split_whitespace().collect();
                if words.is_empty() {
                    continue;
                }

                let command = match SessionLine::try_parse_from(words) {
                    Ok(parsed) => parsed.command,
                    Err(e) => {
                        let _ = e.print();
                        continue;
                    }
                };

                match command {
                    SessionCommand::Quit => break,
                    SessionCommand::Cancel => {
                        panel.cancel_all();
                        ui::print_info("Cancelling…");
                    }
                    command if command.is_mutation() => {
                        if running.as_ref().is_some_and(|h| !h.is_finished()) {
                            ui::print_warning("An operation is already running; type 'cancel' to stop it");
                            continue;
                        }
                        panel.reset();
                        let panel = Arc::clone(&panel);
                        running = Some(tokio::spawn(async move {
                            match execute(&panel, command).await {
                                Ok(outcome) => ui::print_outcome(&outcome),
                                Err(e) => ui::print_error(&e.to_string()),
                            }
                        }));
                    }
                    // Undo waits on the store, so it runs in the background like a mutation.
                    SessionCommand::Undo { id } => {
                        if running.as_ref().is_some_and(|h| !h.is_finished()) {
                            ui::print_warning("An operation is already running; wait for it to finish");
                            continue;
                        }
                        let panel = Arc::clone(&panel);
                        running = Some(tokio::spawn(async move {
                            match panel.undo(&OperationId::from(id)).await {
                                Ok(report) => ui::print_undo_report(&report),
                                Err(e) => ui::print_error(&e.to_string()),
                            }
                        }));
                    }
                    command => {
                        if let Err(e) = query(&panel, &store, &cli.catalog, command).await {
                            ui::print_error(&e.to_string());
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                panel.cancel_all();
                ui::print_warning("Interrupted, cancelling running operation");
            }
        }
    }

    panel.cancel_all();
    if let Some(handle) = running {
        let _ = handle.await;
    }

    store.save(&cli.catalog).await?;
    ui::print_success(&format!("Catalog saved to {}", cli.catalog.display()));
    Ok(())
}

/// Run one bulk operation to completion or cancellation
async fn execute(panel: &ControlPanel, command: SessionCommand) -> BulkOpsResult<OperationOutcome> {
    let ops = panel.operations();
    match command {
        SessionCommand::Activate { ids } => ops.bulk_activate(&ids, true).await,
        SessionCommand::Deactivate { ids } => ops.bulk_activate(&ids, false).await,
        SessionCommand::Toggle { off, filter } => {
            ops.bulk_activate_by_filter(&filter.into(), !off).await
        }
        SessionCommand::InactivateZeroStock => ops.inactivate_zero_stock().await,
        SessionCommand::ZeroStock => ops.zero_all_stock().await,
        SessionCommand::ZeroNegativeStock => ops.zero_negative_stock().await,
        SessionCommand::ZeroPrices => ops.zero_all_prices().await,
        SessionCommand::Tax {
            scope,
            tax_id,
            ncms,
        } => ops.change_tax_by_ncm(scope, &ncms, &tax_id).await,
        SessionCommand::EnableMei => ops.enable_mei().await,
        SessionCommand::Clean { before } => ops.clean_before(&before).await,
        _ => Err(BulkOpsError::InvalidArgument {
            reason: "not a bulk operation".to_string(),
        }),
    }
}

/// Commands that read state or touch the history
async fn query(
    panel: &ControlPanel,
    store: &MemoryStore,
    catalog_path: &Path,
    command: SessionCommand,
) -> Result<()> {
    match command {
        SessionCommand::Products => {
            let products = store.list_products().await?;
            if products.is_empty() {
                ui::print_info("Catalog has no products");
            } else {
                println!("{}", ui::product_table(&products));
            }
        }
        SessionCommand::History => {
            let entries = panel.list_undoable();
            if entries.is_empty() {
                ui::print_info("Nothing to undo");
            } else {
                println!("{}", ui::history_table(&entries));
            }
        }
        SessionCommand::Clear => {
            panel.clear_history();
            ui::print_success("History cleared");
        }
        SessionCommand::Save => {
            store.save(catalog_path).await?;
            ui::print_success(&format!("Catalog saved to {}", catalog_path.display()));
        }
        _ => {}
    }
    Ok(())
}
