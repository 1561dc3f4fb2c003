//! Item command handlers

use anyhow::{anyhow, bail, Result};
use clap::Args;

use rentready_core::{Item, ItemStatus, Store};

use super::resolve_id;
use crate::output::Output;
use crate::prompt::{confirm, prompt_parsed, prompt_with_default};

/// Editable item fields; unset fields keep their current value
#[derive(Args, Debug, Default, Clone)]
pub struct ItemFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub price_per_day: Option<f64>,
    #[arg(long)]
    pub price_per_hour: Option<f64>,
    #[arg(long)]
    pub stock: Option<u32>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub image_url: Option<String>,
}

impl ItemFields {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price_per_day.is_none()
            && self.price_per_hour.is_none()
            && self.stock.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
    }

    /// Copy the set fields onto `item`
    fn apply(self, item: &mut Item) -> Result<()> {
        if let Some(name) = self.name {
            item.name = name.trim().to_string();
        }
        if let Some(category) = self.category {
            item.category = category.trim().to_string();
        }
        if let Some(price) = self.price_per_day {
            item.price_per_day = price;
        }
        if let Some(price) = self.price_per_hour {
            item.price_per_hour = price;
        }
        if let Some(stock) = self.stock {
            item.stock = stock;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(image_url) = self.image_url {
            item.image_url = image_url;
        }
        validate(item)
    }
}

fn validate(item: &Item) -> Result<()> {
    if item.name.is_empty() {
        bail!("Item name is required");
    }
    if item.category.is_empty() {
        bail!("Item category is required");
    }
    if !(item.price_per_day.is_finite() && item.price_per_day >= 0.0) {
        bail!("Price per day must be zero or more");
    }
    if !(item.price_per_hour.is_finite() && item.price_per_hour >= 0.0) {
        bail!("Price per hour must be zero or more");
    }
    Ok(())
}

/// Add a new item
pub fn add(store: &Store, fields: ItemFields, output: &Output) -> Result<()> {
    let mut item = Item::new("", "", 0.0);
    fields.apply(&mut item)?;

    store.add_item(&item)?;

    output.success(&format!("Added item: {}", item.id));
    output.print_item(&item);
    Ok(())
}

/// List all items, optionally filtered by category
pub fn list(store: &Store, category: Option<String>, output: &Output) -> Result<()> {
    let items = match category {
        Some(ref c) => store.get_items_by_category(c)?,
        None => store.get_all_items()?,
    };

    output.print_items(&items);
    Ok(())
}

/// Show a single item
pub fn show(store: &Store, id: &str, output: &Output) -> Result<()> {
    let item = find_item(store, id)?;
    output.print_item(&item);
    Ok(())
}

/// Edit an item from flags, or interactively when none are given
pub fn edit(store: &Store, id: &str, fields: ItemFields, output: &Output) -> Result<()> {
    let mut item = find_item(store, id)?;

    let fields = if fields.is_empty() && output.should_prompt() {
        prompt_fields(&item)?
    } else {
        fields
    };

    if fields.is_empty() {
        output.message("Nothing to change.");
        return Ok(());
    }

    fields.apply(&mut item)?;
    store.update_item(&item)?;

    output.success("Item updated");
    output.print_item(&item);
    Ok(())
}

fn prompt_fields(item: &Item) -> Result<ItemFields> {
    println!("Editing item: {}", item.id);
    println!("Press Enter to keep current value, or type new value.\n");

    Ok(ItemFields {
        name: prompt_with_default("Name", &item.name)?,
        category: prompt_with_default("Category", &item.category)?,
        price_per_day: prompt_parsed("Price per day", &item.price_per_day)?,
        price_per_hour: prompt_parsed("Price per hour", &item.price_per_hour)?,
        stock: prompt_parsed("Stock", &item.stock)?,
        description: prompt_with_default("Description", &item.description)?,
        image_url: prompt_with_default("Image URL", &item.image_url)?,
    })
}

/// Delete an item
pub fn delete(store: &Store, id: &str, force: bool, output: &Output) -> Result<()> {
    let item = find_item(store, id)?;

    if !force && output.should_prompt() {
        println!("Delete item: {} - {}", item.id, item.name);
        if item.status == ItemStatus::Rented {
            println!("This item still has open rentals.");
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_item(&item.id)?;

    output.success(&format!("Deleted item: {}", item.id));
    Ok(())
}

/// Set the stored status of an item
pub fn set_status(store: &Store, id: &str, status: ItemStatus, output: &Output) -> Result<()> {
    let item = find_item(store, id)?;
    store.set_item_status(&item.id, status)?;

    output.success(&format!("{} is now {}", item.name, status));
    Ok(())
}

/// List categories in order of first use
pub fn categories(store: &Store, output: &Output) -> Result<()> {
    let categories = store.get_categories()?;
    output.print_categories(&categories);
    Ok(())
}

/// Insert the demo catalog
pub fn seed(store: &Store, output: &Output) -> Result<()> {
    let added = store.seed_demo_catalog()?;
    if added == 0 {
        output.message("Store already has items; demo catalog not added.");
    } else {
        output.success(&format!("Added {} demo item(s)", added));
    }
    Ok(())
}

/// Look up an item by full id or unique prefix
pub(crate) fn find_item(store: &Store, id: &str) -> Result<Item> {
    let items = store.get_all_items()?;
    let resolved = resolve_id(
        "item",
        id,
        items.iter().map(|i| (i.id.as_str(), i.name.as_str())),
    )?;
    items
        .into_iter()
        .find(|i| i.id == resolved)
        .ok_or_else(|| anyhow!("Item not found: {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use rentready_core::Config;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> Store {
        Store::open_with_config(Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        })
        .unwrap()
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_add_validates() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let missing_category = ItemFields {
            name: Some("Tent".into()),
            price_per_day: Some(45_000.0),
            ..ItemFields::default()
        };
        assert!(add(&store, missing_category, &quiet()).is_err());

        let negative = ItemFields {
            name: Some("Tent".into()),
            category: Some("Camping".into()),
            price_per_day: Some(-1.0),
            ..ItemFields::default()
        };
        assert!(add(&store, negative, &quiet()).is_err());
        assert!(store.get_all_items().unwrap().is_empty());
    }

    #[test]
    fn test_edit_with_flags() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.seed_demo_catalog().unwrap();

        let fields = ItemFields {
            stock: Some(8),
            description: Some("Family tent, sleeps four".into()),
            ..ItemFields::default()
        };
        edit(&store, "seed-3", fields, &quiet()).unwrap();

        let tent = store.get_item("seed-3").unwrap().unwrap();
        assert_eq!(tent.stock, 8);
        assert_eq!(tent.description, "Family tent, sleeps four");
        assert_eq!(tent.name, "Tent 4 Person");
        // Four seeded creates, then the edit
        assert_eq!(store.pending_count().unwrap(), 5);
    }

    #[test]
    fn test_delete_without_prompt_in_quiet_mode() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.seed_demo_catalog().unwrap();

        delete(&store, "seed-4", false, &quiet()).unwrap();
        assert!(store.get_item("seed-4").unwrap().is_none());
    }

    #[test]
    fn test_find_item_ambiguous_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.seed_demo_catalog().unwrap();

        assert!(find_item(&store, "seed-").is_err());
        assert_eq!(find_item(&store, "seed-2").unwrap().name, "Sony A7III");
    }
}
