//! OpenAI API key lookup.
//!
//! The key comes from `OPENAI_API_KEY`. When it is unset and stdin is a
//! terminal, the user is asked for it once; the answer is used for this
//! process only and never written to disk.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{CliError, Result};

/// Environment variable holding the key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Find the API key, asking on the terminal if the environment has none.
///
/// # Errors
///
/// Returns [`CliError::MissingCredential`] when the variable is unset and
/// stdin is not a terminal, or the user enters an empty key.
pub fn api_key() -> Result<String> {
    let interactive = io::stdin().is_terminal();
    resolve(std::env::var(API_KEY_VAR).ok(), interactive, prompt)
}

/// Pick the key from `env`, falling back to `ask` when `interactive`.
///
/// # Errors
///
/// See [`api_key`].
pub fn resolve<F>(env: Option<String>, interactive: bool, ask: F) -> Result<String>
where
    F: FnOnce() -> io::Result<String>,
{
    if let Some(key) = env.filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    if !interactive {
        return Err(CliError::MissingCredential(format!(
            "{API_KEY_VAR} is not set"
        )));
    }

    let key = ask()?.trim().to_owned();
    if key.is_empty() {
        return Err(CliError::MissingCredential("no API key entered".into()));
    }
    Ok(key)
}

fn prompt() -> io::Result<String> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{API_KEY_VAR}: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
