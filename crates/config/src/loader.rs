use std::{path::Path, sync::LazyLock};

use indoc::indoc;
use regex::{Captures, Regex};
use serde::Deserialize;
use toml::Value;

use crate::{Config, error::Error};

/// Matches `{{ env.NAME }}` placeholders in string values.
static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern must be valid")
});

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(Error::ConfigOpen)?;

    Ok(parse(&content)?)
}

pub(crate) fn parse(content: &str) -> crate::Result<Config> {
    let mut raw_config: Value = toml::from_str(content)?;

    expand_env_placeholders(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;
    validate(&config)?;

    if config.teamspeak.port == 10022 {
        log::warn!("Port 10022 is the ServerQuery SSH interface; tsauth speaks the raw interface (default 10011)");
    }

    Ok(config)
}

/// Paths served by the HTTP surface regardless of configuration.
const RESERVED_PATHS: &[&str] = &["/", "/auth", "/auth/check", "/auth/refresh", "/status", "/ome/admission"];

pub(crate) fn validate(config: &Config) -> crate::Result<()> {
    if config.authorization.required_server_groups.is_empty() {
        return Err(Error::Invalid(
            indoc! {r#"
                No required server groups configured. At least one group must grant access, for example:

                  [authorization]
                  required_server_groups = [6, 9]
            "#}
            .trim_end()
            .to_string(),
        ));
    }

    if config.cache.ttl.is_zero() {
        return Err(Error::Invalid("cache.ttl must be a positive duration".to_string()));
    }

    if config.teamspeak.timeout.is_zero() {
        return Err(Error::Invalid("teamspeak.timeout must be a positive duration".to_string()));
    }

    if config.teamspeak.host.trim().is_empty() {
        return Err(Error::Invalid("teamspeak.host must not be empty".to_string()));
    }

    if config.server.health.enabled && !config.server.health.path.starts_with('/') {
        return Err(Error::Invalid(format!(
            "server.health.path must start with '/', got '{}'",
            config.server.health.path
        )));
    }

    if config.server.health.enabled && RESERVED_PATHS.contains(&config.server.health.path.as_str()) {
        return Err(Error::Invalid(format!(
            "server.health.path '{}' collides with a built-in endpoint",
            config.server.health.path
        )));
    }

    Ok(())
}

fn expand_env_placeholders<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> crate::Result<()> {
    match value {
        Value::String(s) => {
            let mut missing = None;

            let expanded = ENV_PLACEHOLDER.replace_all(s, |captures: &Captures<'_>| {
                let name = &captures[1];

                match std::env::var(name) {
                    Ok(value) => value,
                    Err(_) => {
                        missing.get_or_insert_with(|| name.to_string());
                        String::new()
                    }
                }
            });

            if let Some(name) = missing {
                return Err(Error::EnvVarSubstitution {
                    path: render_path(path),
                    reason: format!("environment variable '{name}' is not set"),
                });
            }

            *s = expanded.into_owned();
        }
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_env_placeholders(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_env_placeholders(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

/// Renders a TOML location like `authorization.authorized_subnets[0]`.
fn render_path(path: &[Result<&str, usize>]) -> String {
    let mut rendered = String::new();

    for segment in path {
        match segment {
            Ok(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }

                rendered.push_str(key);
            }
            Err(index) => rendered.push_str(&format!("[{index}]")),
        }
    }

    rendered
}
