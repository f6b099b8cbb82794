//! Environment variable interpolation for the config file.
//!
//! Supported forms:
//! - `${VAR}`: value of `VAR`, an error if it is unset
//! - `${VAR:-default}`: `default` if `VAR` is unset or empty
//! - `${VAR-default}`: `default` only if `VAR` is unset
//! - `$$`: a literal `$`

use std::env;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ConfigError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{
            (?P<name>[A-Za-z_][A-Za-z0-9_]*)
            (?: (?P<op>:?-) (?P<default>[^}]*) )?
        \}
        ",
    )
    .expect("Invalid regex pattern")
});

/// Interpolate from the process environment.
pub fn interpolate(input: &str) -> Result<String, ConfigError> {
    interpolate_with(input, |name| env::var(name).ok())
}

/// Interpolate with a custom variable lookup.
///
/// Every unresolvable placeholder is reported, not only the first.
pub fn interpolate_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let text = PLACEHOLDER.replace_all(input, |caps: &Captures| {
        let Some(name) = caps.name("name").map(|m| m.as_str()) else {
            return "$".to_string();
        };
        let op = caps.name("op").map(|m| m.as_str());
        let default = caps.name("default").map_or("", |m| m.as_str());

        match (lookup(name), op) {
            (Some(value), _) if value.contains(['\n', '\r']) => {
                errors.push(format!("environment variable '{name}' contains newlines"));
                String::new()
            }
            (Some(value), Some(":-")) if value.is_empty() => default.to_string(),
            (Some(value), _) => value,
            (None, Some(_)) => default.to_string(),
            (None, None) => {
                errors.push(format!("environment variable '{name}' is not set"));
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(text.into_owned())
    } else {
        Err(ConfigError::EnvInterpolation {
            message: errors.join("\n"),
        })
    }
}
