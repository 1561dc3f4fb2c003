//! Interactive prompts
//!
//! Line-based prompts for editing items and confirming deletes.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    Ok(is_yes(&read_line()?))
}

/// Prompt with a default value, returns None if user keeps default
pub fn prompt_with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    io::stdout().flush()?;

    Ok(non_empty(&read_line()?))
}

/// Like [`prompt_with_default`], parsing the answer
pub fn prompt_parsed<T>(prompt: &str, default: &T) -> Result<Option<T>>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match prompt_with_default(prompt, &default.to_string())? {
        Some(answer) => {
            let value = answer
                .parse()
                .with_context(|| format!("Invalid value for {}: '{}'", prompt, answer))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input)
}

fn is_yes(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}

fn non_empty(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        None
    } else {
        Some(input.to_string())
    }
}
