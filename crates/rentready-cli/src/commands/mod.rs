//! Command handlers

use anyhow::{bail, Result};

pub mod calc;
pub mod config;
pub mod item;
pub mod rental;
pub mod stats;
pub mod sync;

/// Resolve a full id or unique prefix against `(id, label)` candidates
pub(crate) fn resolve_id<'a, I>(kind: &str, wanted: &str, candidates: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut matches = Vec::new();
    for (id, label) in candidates {
        if id == wanted {
            return Ok(id.to_string());
        }
        if id.starts_with(wanted) {
            matches.push((id, label));
        }
    }

    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, wanted),
        1 => Ok(matches[0].0.to_string()),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, wanted);
            for (id, label) in &matches {
                eprintln!("  {} - {}", id, label);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &[(&str, &str)] = &[
        ("seed-1", "Canon EOS R5"),
        ("seed-10", "Tripod"),
        ("3f2a9c1e", "Kayak"),
    ];

    #[test]
    fn test_exact_id_wins_over_prefix() {
        assert_eq!(resolve_id("item", "seed-1", ITEMS.iter().copied()).unwrap(), "seed-1");
    }

    #[test]
    fn test_unique_prefix() {
        assert_eq!(resolve_id("item", "3f2", ITEMS.iter().copied()).unwrap(), "3f2a9c1e");
    }

    #[test]
    fn test_ambiguous_and_missing() {
        assert!(resolve_id("item", "seed", ITEMS.iter().copied()).is_err());
        assert!(resolve_id("item", "zzz", ITEMS.iter().copied()).is_err());
    }
}
