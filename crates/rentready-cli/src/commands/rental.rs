//! Rental command handlers

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use rentready_core::calculator::{calculate_penalty, late_days, parse_date};
use rentready_core::{Rental, RentalStatus, Store, TimeUnit};

use super::item::find_item;
use super::resolve_id;
use crate::output::Output;
use crate::prompt::confirm;

/// Arguments for renting out an item
#[derive(Debug, Clone)]
pub struct Checkout {
    pub item_id: String,
    pub customer: String,
    pub quantity: u32,
    pub duration: u32,
    pub unit: TimeUnit,
    pub start: Option<String>,
    pub staff: Option<String>,
}

fn default_staff() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "staff".to_string())
}

/// Rent out an item
pub fn create(store: &Store, checkout: Checkout, output: &Output) -> Result<()> {
    let item = find_item(store, &checkout.item_id)?;
    let start = match checkout.start {
        Some(ref s) => parse_date(s)?,
        None => Utc::now(),
    };
    let staff = checkout.staff.unwrap_or_else(default_staff);

    let rental = store.rent_item(
        &item.id,
        checkout.customer.trim(),
        &staff,
        checkout.quantity,
        checkout.duration,
        checkout.unit,
        start,
    )?;

    output.success(&format!("Rented {} to {}", rental.item_name, rental.customer_name));
    output.print_rental(&rental);
    Ok(())
}

/// List rentals, optionally filtered by status
pub fn list(store: &Store, status: Option<RentalStatus>, output: &Output) -> Result<()> {
    let mut rentals = store.get_all_rentals()?;
    if let Some(status) = status {
        rentals.retain(|r| r.status == status);
    }

    output.print_rentals(&rentals);
    Ok(())
}

/// Show a single rental
pub fn show(store: &Store, id: &str, output: &Output) -> Result<()> {
    let rental = find_rental(store, id)?;
    output.print_rental(&rental);
    Ok(())
}

/// Mark a rental as returned
pub fn complete(store: &Store, id: &str, output: &Output) -> Result<()> {
    let rental = find_rental(store, id)?;
    if rental.status == RentalStatus::Completed {
        output.message(&format!("Rental {} is already completed.", rental.id));
        return Ok(());
    }

    store.complete_rental(&rental.id)?;

    output.success(&format!(
        "{} returned {}",
        rental.customer_name, rental.item_name
    ));
    if let Some((days, amount)) = late_penalty(store, &rental, Utc::now())? {
        output.message(&format!("Returned {} day(s) late", days));
        output.print_amount("Late penalty", amount);
    }
    Ok(())
}

/// Days late and the penalty owed when `rental` comes back at `returned_at`.
///
/// `None` when it is on time, its end date does not parse, or its item is gone.
fn late_penalty(
    store: &Store,
    rental: &Rental,
    returned_at: DateTime<Utc>,
) -> Result<Option<(i64, f64)>> {
    let Ok(end) = parse_date(&rental.end_date) else {
        return Ok(None);
    };
    let days = late_days(end, returned_at);
    if days <= 0 {
        return Ok(None);
    }
    let Some(item) = store.get_item(&rental.item_id)? else {
        return Ok(None);
    };
    Ok(Some((days, calculate_penalty(item.price_per_day, days))))
}

/// Delete a rental
pub fn delete(store: &Store, id: &str, force: bool, output: &Output) -> Result<()> {
    let rental = find_rental(store, id)?;

    if !force && output.should_prompt() {
        println!(
            "Delete rental: {} - {} ({})",
            rental.id, rental.item_name, rental.customer_name
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_rental(&rental.id)?;

    output.success(&format!("Deleted rental: {}", rental.id));
    Ok(())
}

/// Mark active rentals past their end date as overdue
pub fn overdue(store: &Store, output: &Output) -> Result<()> {
    let changed = store.mark_overdue(Utc::now())?;
    if changed == 0 {
        output.message("No rentals are overdue.");
    } else {
        output.success(&format!("Marked {} rental(s) overdue", changed));
    }
    Ok(())
}

fn find_rental(store: &Store, id: &str) -> Result<Rental> {
    let rentals = store.get_all_rentals()?;
    let resolved = resolve_id(
        "rental",
        id,
        rentals
            .iter()
            .map(|r| (r.id.as_str(), r.customer_name.as_str())),
    )?;
    rentals
        .into_iter()
        .find(|r| r.id == resolved)
        .ok_or_else(|| anyhow!("Rental not found: {}", id))
}
