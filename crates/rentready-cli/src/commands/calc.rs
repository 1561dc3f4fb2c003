//! Pricing calculators

use anyhow::{bail, Result};

use rentready_core::calculator::{calculate_penalty, calculate_rental_cost};

use crate::output::Output;

/// Rental cost between two dates
pub fn cost(price_per_day: f64, start: &str, end: &str, output: &Output) -> Result<()> {
    check_price(price_per_day)?;
    let amount = calculate_rental_cost(price_per_day, start, end)?;
    output.print_amount("Rental cost", amount);
    Ok(())
}

/// Penalty for a late return
pub fn penalty(price_per_day: f64, late_days: i64, output: &Output) -> Result<()> {
    check_price(price_per_day)?;
    output.print_amount("Late penalty", calculate_penalty(price_per_day, late_days));
    Ok(())
}

fn check_price(price_per_day: f64) -> Result<()> {
    if !price_per_day.is_finite() || price_per_day < 0.0 {
        bail!("Price per day must be zero or more, got {}", price_per_day);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_cost_rejects_bad_input() {
        let output = Output::new(OutputFormat::Quiet);
        assert!(cost(-5.0, "2023-10-01", "2023-10-02", &output).is_err());
        assert!(cost(100.0, "someday", "2023-10-02", &output).is_err());
        assert!(cost(100.0, "2023-10-01", "2023-10-03", &output).is_ok());
    }

    #[test]
    fn test_penalty_accepts_early_return() {
        let output = Output::new(OutputFormat::Quiet);
        assert!(penalty(45_000.0, -2, &output).is_ok());
        assert!(penalty(f64::NAN, 1, &output).is_err());
    }
}
