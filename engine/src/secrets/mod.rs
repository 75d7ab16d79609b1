//! Credential handling
//!
//! Credentials are resolved once by the shell and passed explicitly into
//! provider construction; nothing here reads global state after startup.
//! Resolution order: explicit value (CLI flag), then the configured
//! environment variable, then an interactive hidden prompt.
//!
//! The module also scrubs secret-looking substrings from text before it is
//! logged or shown to the user.

pub mod string;

pub use string::SecretString;

use regex::Regex;
use sdk::errors::EngineError;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - OpenAI-style keys: sk-[a-zA-Z0-9]{20,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"AIza[0-9A-Za-z\-_]{35}",
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Replace every secret-looking substring with `[REDACTED]`.
pub fn scrub_secrets(text: &str) -> String {
    let mut scrubbed = text.to_string();
    for pattern in get_secret_patterns() {
        scrubbed = pattern.replace_all(&scrubbed, "[REDACTED]").into_owned();
    }
    scrubbed
}

/// Resolve a credential without prompting.
///
/// A blank explicit value falls through to the environment variable.
/// Returns `None` when neither yields a non-empty string.
pub fn lookup_credential(explicit: Option<&str>, env_var: &str) -> Option<SecretString> {
    non_blank(explicit.map(str::to_string))
        .or_else(|| non_blank(std::env::var(env_var).ok()))
        .map(SecretString::from)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve a credential, prompting on the terminal as a last resort.
///
/// # Errors
/// Returns `EngineError::Config` if no credential is available and stdin is
/// not a terminal, or if the prompted value is empty.
pub fn resolve_credential(
    explicit: Option<&str>,
    env_var: &str,
) -> Result<SecretString, EngineError> {
    if let Some(secret) = lookup_credential(explicit, env_var) {
        let source = if explicit.is_some_and(|v| !v.trim().is_empty()) {
            "command line"
        } else {
            env_var
        };
        tracing::debug!("Using credential from {}", source);
        return Ok(secret);
    }

    if !io::stdin().is_terminal() {
        return Err(EngineError::Config(format!(
            "No API key found. Set {} or pass --api-key",
            env_var
        )));
    }

    tracing::warn!("{} not set, prompting for API key", env_var);
    print!("Please enter your API key: ");
    io::stdout().flush()?;

    let value = rpassword::read_password()?;
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::Config("API key cannot be empty".to_string()));
    }

    Ok(SecretString::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_google_key() {
        let key = format!("AIza{}", "x".repeat(35));
        let text = format!("request failed: key={} rejected", key);

        let scrubbed = scrub_secrets(&text);

        assert!(!scrubbed.contains(&key));
        assert_eq!(scrubbed, "request failed: key=[REDACTED] rejected");
    }

    #[test]
    fn test_scrub_leaves_plain_text_alone() {
        let text = "Gemini API error (429): quota exhausted";
        assert_eq!(scrub_secrets(text), text);
    }

    #[test]
    fn test_explicit_credential_wins() {
        let secret = lookup_credential(Some(" from-flag "), "PENWRIGHT_TEST_UNSET_VAR").unwrap();
        assert_eq!(secret.unsecure(), "from-flag");
    }

    #[test]
    fn test_missing_credential() {
        assert!(lookup_credential(None, "PENWRIGHT_TEST_UNSET_VAR").is_none());
        assert!(lookup_credential(Some("   "), "PENWRIGHT_TEST_UNSET_VAR").is_none());
    }

    #[test]
    fn test_blank_flag_falls_back_to_env() {
        std::env::set_var("PENWRIGHT_TEST_BLANK_FLAG_KEY", "from-env");

        let secret = lookup_credential(Some(""), "PENWRIGHT_TEST_BLANK_FLAG_KEY").unwrap();
        assert_eq!(secret.unsecure(), "from-env");

        let secret = lookup_credential(Some("  "), "PENWRIGHT_TEST_BLANK_FLAG_KEY").unwrap();
        assert_eq!(secret.unsecure(), "from-env");

        std::env::remove_var("PENWRIGHT_TEST_BLANK_FLAG_KEY");
    }
}
