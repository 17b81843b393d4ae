pub mod schema;

use crate::error::{DeckError, Result};
use schema::AppConfig;
use std::path::Path;
use tracing::debug;

/// Load configuration from a TOML file.
///
/// A missing file is not an error: the panel works fine on defaults, so we
/// fall back silently. Missing keys fall back per-field via serde defaults.
///
/// # Errors
/// Returns `DeckError::Io` on read errors, `DeckError::TomlParse` on syntax
/// errors, or `DeckError::Config` on validation failures.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        debug!("no config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let content = expand_env_vars(&content);
    let config: AppConfig = toml::from_str(&content).map_err(|source| DeckError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;
    Ok(config)
}

/// Expand `${VAR}` and `$VAR` patterns in the config string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if let Ok(val) = std::env::var(&var_name) {
                    result.push_str(&val);
                } else {
                    // Keep original if env var not found
                    use std::fmt::Write;
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                let var_name: String = chars
                    .by_ref()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if var_name.is_empty() {
                    result.push('$');
                } else if let Ok(val) = std::env::var(&var_name) {
                    result.push_str(&val);
                } else {
                    result.push('$');
                    result.push_str(&var_name);
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Validate config constraints.
fn validate(config: &AppConfig) -> Result<()> {
    if config.streamdeck.brightness > 100 {
        return Err(DeckError::Config("brightness must be 0-100".to_string()));
    }

    if config.obs.host.is_empty() {
        return Err(DeckError::Config("obs.host must not be empty".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load(Path::new("/nonexistent/deckctl-test.toml")).unwrap();
        assert_eq!(config.streamdeck.brightness, 30);
        assert_eq!(config.obs.host, "localhost");
        assert_eq!(config.obs.port, 4455);
        assert_eq!(config.obs.password, "");
    }

    #[test]
    fn env_var_expansion() {
        std::env::set_var("DECKCTL_TEST_VAR", "hello");
        let result = expand_env_vars("host = \"${DECKCTL_TEST_VAR}.lan\"");
        assert_eq!(result, "host = \"hello.lan\"");
        std::env::remove_var("DECKCTL_TEST_VAR");
    }

    #[test]
    fn env_var_missing_kept() {
        let result = expand_env_vars("host = \"${DECKCTL_NONEXISTENT}.lan\"");
        assert_eq!(result, "host = \"${DECKCTL_NONEXISTENT}.lan\"");
    }

    #[test]
    fn brightness_out_of_range_rejected() {
        let config: AppConfig = toml::from_str("[streamdeck]\nbrightness = 101").unwrap();
        assert!(validate(&config).is_err());
    }
}
