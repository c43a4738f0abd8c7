//! Terminal UI helpers for the interactive session.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::compensation::{OperationSummary, UndoReport};
use crate::entities::Product;
use crate::operations::OperationOutcome;

/// Create a table of undoable operations, newest first
pub fn history_table(entries: &[OperationSummary]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Label").fg(Color::Cyan),
    ]);

    for (idx, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1).fg(Color::DarkGrey),
            Cell::new(entry.id.as_str()),
            Cell::new(entry.time_label()),
            Cell::new(entry.op_type.label()).fg(Color::Yellow),
            Cell::new(&entry.label),
        ]);
    }

    table
}

/// Create a table of products
pub fn product_table(products: &[Product]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Active").fg(Color::Cyan),
        Cell::new("NCM").fg(Color::Cyan),
        Cell::new("Cost").fg(Color::Cyan),
        Cell::new("Sale").fg(Color::Cyan),
        Cell::new("State tax").fg(Color::Cyan),
        Cell::new("Federal tax").fg(Color::Cyan),
    ]);

    for product in products {
        let (active, active_color) = if product.active {
            ("yes", Color::Green)
        } else {
            ("no", Color::Red)
        };

        table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(&product.description),
            Cell::new(active).fg(active_color),
            Cell::new(if product.ncm.is_empty() { "-" } else { product.ncm.as_str() }),
            Cell::new(format!("{:.2}", product.cost_price)),
            Cell::new(format!("{:.2}", product.sale_price)),
            Cell::new(product.state_tax_ref.as_deref().unwrap_or("-")),
            Cell::new(product.federal_tax_ref.as_deref().unwrap_or("-")),
        ]);
    }

    table
}

/// Report how a bulk operation ended; cancellation is not an error
pub fn print_outcome(outcome: &OperationOutcome) {
    if outcome.cancelled {
        print_warning(&outcome.summary());
    } else {
        print_success(&outcome.summary());
    }
    if let Some(ref id) = outcome.record {
        println!("  {} {}", "undo id:".dimmed(), id);
    }
}

/// Report an undo, naming entities that could not be restored
pub fn print_undo_report(report: &UndoReport) {
    if report.is_partial() {
        print_warning(&report.summary());
        println!(
            "  {} {}",
            "not restored:".dimmed(),
            report.failed_ids.join(", ")
        );
    } else {
        print_success(&report.summary());
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
