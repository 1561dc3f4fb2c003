//! Terminal output
//!
//! Every command prints through [`Output`], which renders tables and
//! messages for people, JSON for `--json` and bare ids or numbers for
//! `--quiet`. Amounts are shown in rupiah.

use serde::Serialize;

use rentready_core::{DashboardStats, Item, Rental, SyncQueueEntry, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    /// Ids and numbers only, for scripts
    Quiet,
}

impl OutputFormat {
    /// `--quiet` beats `--json`
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a single item
    pub fn print_item(&self, item: &Item) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", item.id);
                println!("Name:        {}", item.name);
                println!("Category:    {}", item.category);
                println!("Per day:     {}", format_rupiah(item.price_per_day));
                if item.price_per_hour > 0.0 {
                    println!("Per hour:    {}", format_rupiah(item.price_per_hour));
                }
                println!("Stock:       {}", item.stock);
                println!("Status:      {}", item.status);
                if !item.description.is_empty() {
                    println!("Description: {}", item.description);
                }
                if !item.image_url.is_empty() {
                    println!("Image:       {}", item.image_url);
                }
            }
            OutputFormat::Json => self.json(item),
            OutputFormat::Quiet => println!("{}", item.id),
        }
    }

    /// Print a list of items
    pub fn print_items(&self, items: &[Item]) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No items found.");
                    return;
                }
                for item in items {
                    println!(
                        "{} | {:<28} | {:<10} | {:>14}/day | {:>3} | {}",
                        short_id(&item.id),
                        truncate(&item.name, 28),
                        truncate(&item.category, 10),
                        format_rupiah(item.price_per_day),
                        item.stock,
                        item.status
                    );
                }
                println!("\n{} item(s)", items.len());
            }
            OutputFormat::Json => self.json(items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
    }

    /// Print a single rental
    pub fn print_rental(&self, rental: &Rental) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", rental.id);
                println!("Item:      {} ({})", rental.item_name, rental.item_id);
                println!("Customer:  {}", rental.customer_name);
                if !rental.user_id.is_empty() {
                    println!("Staff:     {}", rental.user_id);
                }
                println!(
                    "Duration:  {} x {} {}(s)",
                    rental.quantity, rental.duration, rental.time_unit
                );
                println!("Start:     {}", rental.start_date);
                println!("End:       {}", rental.end_date);
                println!("Total:     {}", format_rupiah(rental.total_cost));
                println!("Status:    {}", rental.status);
            }
            OutputFormat::Json => self.json(rental),
            OutputFormat::Quiet => println!("{}", rental.id),
        }
    }

    /// Print a list of rentals
    pub fn print_rentals(&self, rentals: &[Rental]) {
        match self.format {
            OutputFormat::Human => {
                if rentals.is_empty() {
                    println!("No rentals found.");
                    return;
                }
                for rental in rentals {
                    println!(
                        "{} | {:<20} | {:<20} | {:<10} | {:>14} | {}",
                        short_id(&rental.id),
                        truncate(&rental.customer_name, 20),
                        truncate(&rental.item_name, 20),
                        date_part(&rental.end_date),
                        format_rupiah(rental.total_cost),
                        rental.status
                    );
                }
                println!("\n{} rental(s)", rentals.len());
            }
            OutputFormat::Json => self.json(rentals),
            OutputFormat::Quiet => {
                for rental in rentals {
                    println!("{}", rental.id);
                }
            }
        }
    }

    /// Print a list of categories
    pub fn print_categories(&self, categories: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if categories.is_empty() {
                    println!("No categories found.");
                    return;
                }
                for category in categories {
                    println!("{}", category);
                }
                println!("\n{} categor{}", categories.len(), if categories.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => self.json(categories),
            OutputFormat::Quiet => {
                for category in categories {
                    println!("{}", category);
                }
            }
        }
    }

    /// Print dashboard aggregates
    pub fn print_stats(&self, stats: &DashboardStats, pending: usize) {
        match self.format {
            OutputFormat::Human => {
                println!("Dashboard");
                println!("=========");
                println!();
                println!("  Revenue:         {}", format_rupiah(stats.total_revenue));
                println!("  Active rentals:  {}", stats.active_rentals);
                println!("  Late rentals:    {}", stats.late_rentals);
                println!("  Pending changes: {}", pending);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "totalRevenue": stats.total_revenue,
                        "activeRentals": stats.active_rentals,
                        "lateRentals": stats.late_rentals,
                        "pendingChanges": pending
                    })
                );
            }
            OutputFormat::Quiet => println!("{}", pending),
        }
    }

    /// Print pending sync queue entries
    pub fn print_queue(&self, entries: &[SyncQueueEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("Sync queue is empty.");
                    return;
                }
                for entry in entries {
                    let id = entry
                        .payload()
                        .ok()
                        .and_then(|p| p.get("id").and_then(|v| v.as_str()).map(str::to_string))
                        .unwrap_or_else(|| "?".to_string());
                    let queued = chrono::DateTime::from_timestamp_millis(entry.timestamp)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!(
                        "#{:<5} {:<6} {:<8} {} ({})",
                        entry.id,
                        entry.action.as_str(),
                        entry.table.as_str(),
                        id,
                        queued
                    );
                }
                println!("\n{} pending change(s)", entries.len());
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => println!("{}", entries.len()),
        }
    }

    /// Print the outcome of a drain
    pub fn print_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                if report.attempted == 0 {
                    println!("✓ Nothing to sync");
                } else if report.is_clean() {
                    println!("✓ Synced {} change(s)", report.applied);
                } else {
                    println!(
                        "⚠ Synced {} of {} change(s); {} failed and stay queued",
                        report.applied, report.attempted, report.failed
                    );
                }
            }
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => println!("{}", report.remaining),
        }
    }

    /// Print a computed amount
    pub fn print_amount(&self, label: &str, amount: f64) {
        match self.format {
            OutputFormat::Human => println!("{}: {}", label, format_rupiah(amount)),
            OutputFormat::Json => println!("{}", serde_json::json!({ "amount": amount })),
            OutputFormat::Quiet => println!("{}", amount),
        }
    }

    /// Confirmation line after a write
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Prompts only make sense for a person reading the output
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Format an amount the way the shop prices things: `Rp 45.000`
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// First eight characters of an id
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Date portion of an ISO-8601 timestamp, or the text as-is
fn date_part(value: &str) -> &str {
    value.get(..10).filter(|d| d.as_bytes().get(4) == Some(&b'-')).unwrap_or(value)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
