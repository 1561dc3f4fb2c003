//! Data models for RentReady
//!
//! Defines the core data structures: Item, Rental, and the sync queue entry.
//! Records serialize with camelCase field names; that JSON is both the outbox
//! payload and the document shape the remote store receives.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::calculator;
use crate::error::{Error, Result};

/// Returned when a stored or user-supplied enum value is not recognised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Availability of a rentable item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Available,
    Rented,
    Maintenance,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Rented => "rented",
            ItemStatus::Maintenance => "maintenance",
        }
    }

    /// Status as seen by readers.
    ///
    /// `maintenance` is only ever set by hand and wins. Otherwise the item is
    /// `rented` while at least one active or overdue rental references it.
    pub fn derive(stored: ItemStatus, has_open_rental: bool) -> ItemStatus {
        match stored {
            ItemStatus::Maintenance => ItemStatus::Maintenance,
            _ if has_open_rental => ItemStatus::Rented,
            _ => ItemStatus::Available,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "available" => Ok(ItemStatus::Available),
            "rented" => Ok(ItemStatus::Rented),
            "maintenance" => Ok(ItemStatus::Maintenance),
            other => Err(ParseEnumError::new("item status", other)),
        }
    }
}

/// Lifecycle of a rental
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    #[default]
    Active,
    Completed,
    Overdue,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Active => "active",
            RentalStatus::Completed => "completed",
            RentalStatus::Overdue => "overdue",
        }
    }

    /// Active and overdue rentals still hold the item
    pub fn is_open(&self) -> bool {
        matches!(self, RentalStatus::Active | RentalStatus::Overdue)
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(RentalStatus::Active),
            "completed" => Ok(RentalStatus::Completed),
            "overdue" => Ok(RentalStatus::Overdue),
            other => Err(ParseEnumError::new("rental status", other)),
        }
    }
}

/// Billing unit for a rental duration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Day,
    Hour,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeUnit::Day),
            "hour" => Ok(TimeUnit::Hour),
            other => Err(ParseEnumError::new("time unit", other)),
        }
    }
}

fn default_stock() -> u32 {
    1
}

/// A rentable piece of inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_per_day: f64,
    /// Hourly rate, zero when the item is only rented by the day
    #[serde(default)]
    pub price_per_hour: f64,
    /// Units on hand
    #[serde(default = "default_stock")]
    pub stock: u32,
    /// Stored status; readers see the derived value (see [`ItemStatus::derive`])
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

impl Item {
    /// Create a new item with a fresh ID and a single unit in stock
    pub fn new(name: impl Into<String>, category: impl Into<String>, price_per_day: f64) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, category, price_per_day)
    }

    /// Create an item with a specific ID (for loading from storage)
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price_per_day: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            price_per_day,
            price_per_hour: 0.0,
            stock: default_stock(),
            status: ItemStatus::Available,
            description: String::new(),
            image_url: String::new(),
        }
    }

    pub fn with_price_per_hour(mut self, price_per_hour: f64) -> Self {
        self.price_per_hour = price_per_hour;
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    /// Price for one unit of the given billing unit
    pub fn unit_price(&self, unit: TimeUnit) -> f64 {
        match unit {
            TimeUnit::Day => self.price_per_day,
            TimeUnit::Hour => self.price_per_hour,
        }
    }
}

/// A rental transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    /// Unique identifier
    pub id: String,
    pub item_id: String,
    /// Item name at the time the rental was created
    pub item_name: String,
    /// Staff member who processed the rental
    pub user_id: String,
    pub customer_name: String,
    /// ISO-8601 timestamps; legacy rows may hold free text
    pub start_date: String,
    pub end_date: String,
    pub total_cost: f64,
    pub quantity: u32,
    pub duration: u32,
    pub time_unit: TimeUnit,
    pub status: RentalStatus,
}

impl Rental {
    /// Build an active rental of `item` starting at `start`.
    ///
    /// The end date and total cost are derived from the duration, unit and
    /// quantity. Fails with `InvalidInput` for a zero quantity or duration, or
    /// when more units are requested than the item has in stock.
    pub fn checkout(
        item: &Item,
        customer_name: impl Into<String>,
        user_id: impl Into<String>,
        quantity: u32,
        duration: u32,
        time_unit: TimeUnit,
        start: DateTime<Utc>,
    ) -> Result<Self> {
        let customer_name = customer_name.into();
        if customer_name.trim().is_empty() {
            return Err(Error::InvalidInput("customer name is required".into()));
        }
        if quantity == 0 {
            return Err(Error::InvalidInput("quantity must be at least 1".into()));
        }
        if duration == 0 {
            return Err(Error::InvalidInput("duration must be at least 1".into()));
        }
        if quantity > item.stock {
            return Err(Error::InvalidInput(format!(
                "only {} unit(s) of '{}' available, requested {}",
                item.stock, item.name, quantity
            )));
        }

        let end = calculator::rental_end_date(start, duration, time_unit);
        let total_cost =
            calculator::calculate_checkout_total(item.unit_price(time_unit), duration, quantity);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            user_id: user_id.into(),
            customer_name,
            start_date: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_date: end.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_cost,
            quantity,
            duration,
            time_unit,
            status: RentalStatus::Active,
        })
    }

    /// Whether this rental is still open and past its end date at `now`.
    ///
    /// Rentals whose end date does not parse are never considered late.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        if self.status != RentalStatus::Active {
            return false;
        }
        calculator::parse_date(&self.end_date)
            .map(|end| end < now)
            .unwrap_or(false)
    }
}

/// Mutation kind recorded in the sync queue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "CREATE",
            SyncAction::Update => "UPDATE",
            SyncAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(SyncAction::Create),
            "UPDATE" => Ok(SyncAction::Update),
            "DELETE" => Ok(SyncAction::Delete),
            other => Err(ParseEnumError::new("sync action", other)),
        }
    }
}

/// Table (and remote collection) a queued change belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SyncTable {
    Items,
    Rentals,
}

impl SyncTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTable::Items => "items",
            SyncTable::Rentals => "rentals",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "items" => Ok(SyncTable::Items),
            "rentals" => Ok(SyncTable::Rentals),
            other => Err(ParseEnumError::new("sync table", other)),
        }
    }
}

/// A pending local mutation waiting to be replayed remotely
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueEntry {
    pub id: i64,
    pub action: SyncAction,
    pub table: SyncTable,
    /// JSON snapshot of the affected record (or the changed fields)
    pub data: String,
    /// Epoch milliseconds, non-decreasing in insert order
    pub timestamp: i64,
}

impl SyncQueueEntry {
    /// Decode the JSON payload
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.data)
    }
}

/// Aggregates shown on the dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of total cost over every rental
    pub total_revenue: f64,
    /// Active plus overdue rentals
    pub active_rentals: i64,
    pub late_rentals: i64,
}

/// Demo inventory inserted by `seed_demo_catalog` into an empty store
pub fn demo_catalog() -> Vec<Item> {
    vec![
        Item::with_id("seed-1", "Canon EOS R5", "Camera", 500_000.0)
            .with_price_per_hour(50_000.0)
            .with_stock(5)
            .with_description("Professional mirrorless camera")
            .with_image_url("https://images.unsplash.com/photo-1516035069371-29a1b244cc32"),
        Item::with_id("seed-2", "Sony A7III", "Camera", 350_000.0)
            .with_price_per_hour(35_000.0)
            .with_stock(5)
            .with_description("Versatile full-frame camera")
            .with_image_url("https://images.unsplash.com/photo-1519183071298-a2962feb14f4"),
        Item::with_id("seed-3", "Tent 4 Person", "Camping", 45_000.0)
            .with_price_per_hour(10_000.0)
            .with_stock(10)
            .with_description("Spacious family tent")
            .with_image_url("https://images.unsplash.com/photo-1478131143081-80f7f84ca84d"),
        Item::with_id("seed-4", "Sleeping Bag", "Camping", 15_000.0)
            .with_price_per_hour(5_000.0)
            .with_stock(20)
            .with_description("Warm all-season bag")
            .with_image_url("https://images.unsplash.com/photo-1523987355523-c7b5b0dd90a7"),
    ]
}
