//! RentReady CLI
//!
//! Command-line interface for RentReady - rental inventory that works offline
//! and syncs when it can.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rentready_core::{Config, ItemStatus, RentalStatus, StorageError, Store, TimeUnit};

mod commands;
mod logging;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "rentready")]
#[command(about = "RentReady - Offline-first rental inventory")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log sync and storage activity at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage inventory items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Manage rentals
    Rental {
        #[command(subcommand)]
        command: RentalCommands,
    },
    /// Show dashboard totals
    Stats,
    /// List changes waiting to be synced
    Queue,
    /// Push queued changes to the remote store
    Sync,
    /// Sync automatically whenever the remote store is reachable
    Watch,
    /// Add the demo catalog to an empty store
    Seed,
    /// Rental cost between two dates
    Cost {
        /// Price per day
        price: f64,
        /// Start date (2023-10-01 or RFC 3339)
        start: String,
        /// End date
        end: String,
    },
    /// Late return penalty
    Penalty {
        /// Price per day
        price: f64,
        /// Days late
        #[arg(allow_hyphen_values = true)]
        late_days: i64,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add a new item
    #[command(alias = "create")]
    Add {
        /// Item name
        name: String,
        /// Category (e.g. Camera, Camping)
        #[arg(short, long)]
        category: String,
        /// Price per day
        #[arg(short = 'p', long)]
        price_per_day: f64,
        /// Price per hour
        #[arg(long, default_value_t = 0.0)]
        price_per_hour: f64,
        /// Units on hand
        #[arg(short, long, default_value_t = 1)]
        stock: u32,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List items
    #[command(alias = "ls")]
    List {
        /// Only items in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show item details
    Show {
        /// Item ID (full or prefix)
        id: String,
    },
    /// Edit an item (prompts when no field flags are given)
    Edit {
        /// Item ID (full or prefix)
        id: String,
        #[command(flatten)]
        fields: commands::item::ItemFields,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID (full or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Set the stored status of an item
    Status {
        /// Item ID (full or prefix)
        id: String,
        /// available, rented or maintenance
        status: ItemStatus,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum RentalCommands {
    /// Rent out an item
    #[command(alias = "add")]
    Create {
        /// Item ID (full or prefix)
        item_id: String,
        /// Customer name
        #[arg(short, long)]
        customer: String,
        /// Units to rent
        #[arg(short = 'n', long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long, default_value_t = 1)]
        duration: u32,
        /// day or hour
        #[arg(short, long, default_value_t = TimeUnit::Day)]
        unit: TimeUnit,
        /// Start time (defaults to now)
        #[arg(long)]
        start: Option<String>,
        /// Staff member processing the rental (defaults to $USER)
        #[arg(long)]
        staff: Option<String>,
    },
    /// List rentals
    #[command(alias = "ls")]
    List {
        /// Only rentals with this status
        #[arg(short, long)]
        status: Option<RentalStatus>,
    },
    /// Show rental details
    Show {
        /// Rental ID (full or prefix)
        id: String,
    },
    /// Mark a rental as returned
    #[command(alias = "return")]
    Complete {
        /// Rental ID (full or prefix)
        id: String,
    },
    /// Delete a rental
    #[command(alias = "rm")]
    Delete {
        /// Rental ID (full or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Mark rentals past their end date as overdue
    Overdue,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, storage, remote_url, sync_enabled, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need the store
    match &cli.command {
        Commands::Config { command } => {
            return match command.clone() {
                Some(ConfigCommands::Show) | None => commands::config::show(&output),
                Some(ConfigCommands::Set { key, value }) => {
                    commands::config::set(key, value, &output)
                }
            };
        }
        Commands::Cost { price, start, end } => {
            return commands::calc::cost(*price, start, end, &output);
        }
        Commands::Penalty { price, late_days } => {
            return commands::calc::penalty(*price, *late_days, &output);
        }
        _ => {}
    }

    let config = Config::load().context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    let store = match Store::open_with_config(config) {
        Ok(store) => store,
        Err(e) => {
            print_storage_hint(&e);
            return Err(e);
        }
    };

    let is_write = matches!(
        &cli.command,
        Commands::Item {
            command: ItemCommands::Add { .. }
                | ItemCommands::Edit { .. }
                | ItemCommands::Delete { .. }
                | ItemCommands::Status { .. }
        } | Commands::Rental {
            command: RentalCommands::Create { .. }
                | RentalCommands::Complete { .. }
                | RentalCommands::Delete { .. }
                | RentalCommands::Overdue
        }
    );

    let result = match cli.command {
        Commands::Item { command } => handle_item_command(command, &store, &output),
        Commands::Rental { command } => handle_rental_command(command, &store, &output),
        Commands::Stats => commands::stats::show(&store, &output),
        Commands::Queue => commands::stats::queue(&store, &output),
        Commands::Sync => commands::sync::sync(&store, &output).await,
        Commands::Watch => commands::sync::watch(&store, &output).await,
        Commands::Seed => commands::item::seed(&store, &output),
        Commands::Cost { .. } | Commands::Penalty { .. } | Commands::Config { .. } => Ok(()),
    };

    // Push the change right away when we can
    if is_write && result.is_ok() {
        auto_sync(&store, &output).await;
    }

    if let Err(ref e) = result {
        print_storage_hint(e);
    }
    result
}

/// Print the recovery hint of a storage failure anywhere in the chain
fn print_storage_hint(error: &anyhow::Error) {
    let hint = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion);
    if let Some(hint) = hint {
        eprintln!("hint: {}", hint);
    }
}

fn handle_item_command(command: ItemCommands, store: &Store, output: &Output) -> Result<()> {
    use commands::item;

    match command {
        ItemCommands::Add {
            name,
            category,
            price_per_day,
            price_per_hour,
            stock,
            description,
            image_url,
        } => item::add(
            store,
            item::ItemFields {
                name: Some(name),
                category: Some(category),
                price_per_day: Some(price_per_day),
                price_per_hour: Some(price_per_hour),
                stock: Some(stock),
                description,
                image_url,
            },
            output,
        ),
        ItemCommands::List { category } => item::list(store, category, output),
        ItemCommands::Show { id } => item::show(store, &id, output),
        ItemCommands::Edit { id, fields } => item::edit(store, &id, fields, output),
        ItemCommands::Delete { id, force } => item::delete(store, &id, force, output),
        ItemCommands::Status { id, status } => item::set_status(store, &id, status, output),
        ItemCommands::Categories => item::categories(store, output),
    }
}

fn handle_rental_command(command: RentalCommands, store: &Store, output: &Output) -> Result<()> {
    use commands::rental;

    match command {
        RentalCommands::Create {
            item_id,
            customer,
            quantity,
            duration,
            unit,
            start,
            staff,
        } => rental::create(
            store,
            rental::Checkout {
                item_id,
                customer,
                quantity,
                duration,
                unit,
                start,
                staff,
            },
            output,
        ),
        RentalCommands::List { status } => rental::list(store, status, output),
        RentalCommands::Show { id } => rental::show(store, &id, output),
        RentalCommands::Complete { id } => rental::complete(store, &id, output),
        RentalCommands::Delete { id, force } => rental::delete(store, &id, force, output),
        RentalCommands::Overdue => rental::overdue(store, output),
    }
}

/// Auto-sync if sync is enabled, silently handles errors
async fn auto_sync(store: &Store, output: &Output) {
    let config = store.config();
    if !config.sync_enabled || config.remote_url.is_none() {
        return;
    }

    // Failures stay queued for the next sync
    if let Err(e) = commands::sync::sync_quiet(store).await {
        if !output.is_quiet() {
            eprintln!("⚠ Auto-sync failed: {}", e);
        }
    }
}
