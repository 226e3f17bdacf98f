use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};

use infragen::defaults::{self, Defaults, InfragenConfig};

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file)
    Show {
        /// Show only built-in defaults (ignore infragen.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Set a configuration value at a JSON pointer path
    Set {
        /// JSON pointer path (e.g., /defaults/terraform/region)
        pointer: String,
        /// Value to set (JSON; bare words are treated as strings)
        value: String,
    },
    /// Reset configuration to built-in defaults (deletes infragen.json)
    Reset,
    /// Show the path to infragen.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<InfragenConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<Defaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
}

impl ConfigOutput {
    fn new(command: &'static str) -> Self {
        Self {
            command,
            config: None,
            defaults: None,
            path: None,
            exists: None,
            pointer: None,
            value: None,
            deleted: None,
        }
    }
}

pub fn run(args: ConfigArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Set { pointer, value } => set(&pointer, &value),
        ConfigCommand::Reset => reset(),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let mut output = ConfigOutput::new("config.show");
    if builtin {
        output.defaults = Some(defaults::builtin_defaults());
    } else {
        output.config = Some(defaults::load_config());
        output.exists = Some(defaults::config_exists());
    }
    Ok((output, 0))
}

/// Parse a CLI value as JSON, treating anything that isn't valid JSON as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Set `value` at `pointer`, creating intermediate objects as needed.
fn set_json_pointer(root: &mut Value, pointer: &str, value: Value) -> infragen::Result<()> {
    let tokens: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();

    let Some((last, parents)) = tokens.split_last() else {
        return Err(infragen::Error::validation_invalid_argument(
            "pointer",
            "JSON pointer must name a key",
            Some(pointer.to_string()),
        ));
    };

    let mut current = root;
    for token in parents {
        let map = current.as_object_mut().ok_or_else(|| not_an_object(pointer))?;
        current = map
            .entry(token.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    current
        .as_object_mut()
        .ok_or_else(|| not_an_object(pointer))?
        .insert(last.clone(), value);
    Ok(())
}

fn not_an_object(pointer: &str) -> infragen::Error {
    infragen::Error::config_invalid_value(
        pointer,
        None,
        "Path passes through a value that is not an object",
    )
}

/// Set `value` at `pointer` and return the config it deserializes to.
///
/// Keys the config does not know about are rejected rather than dropped.
fn apply(config: InfragenConfig, pointer: &str, raw: &str, value: Value) -> infragen::Result<InfragenConfig> {
    let to_json = |config: &InfragenConfig| {
        serde_json::to_value(config).map_err(|e| {
            infragen::Error::internal_unexpected(format!("Failed to serialize config: {}", e))
        })
    };

    let mut config_json = to_json(&config)?;
    set_json_pointer(&mut config_json, pointer, value)?;

    let config: InfragenConfig = serde_json::from_value(config_json).map_err(|e| {
        infragen::Error::config_invalid_value(pointer, Some(raw.to_string()), e.to_string())
    })?;

    if to_json(&config)?.pointer(pointer).is_none() {
        return Err(infragen::Error::config_invalid_value(
            pointer,
            Some(raw.to_string()),
            "Unknown configuration key",
        )
        .with_hint("Run 'infragen config show --builtin' to list the available keys"));
    }

    Ok(config)
}

fn set(pointer: &str, raw: &str) -> CmdResult<ConfigOutput> {
    if !pointer.starts_with('/') {
        return Err(infragen::Error::validation_invalid_argument(
            "pointer",
            "JSON pointer must start with '/'",
            Some(pointer.to_string()),
        ));
    }

    let value = parse_value(raw);
    let config = apply(defaults::load_config(), pointer, raw, value.clone())?;

    defaults::save_config(&config)?;

    let mut output = ConfigOutput::new("config.set");
    output.config = Some(config);
    output.pointer = Some(pointer.to_string());
    output.value = Some(value);
    Ok((output, 0))
}

fn reset() -> CmdResult<ConfigOutput> {
    let deleted = defaults::reset_config()?;
    let mut output = ConfigOutput::new("config.reset");
    output.path = Some(defaults::config_path()?);
    output.deleted = Some(deleted);
    Ok((output, 0))
}

fn path() -> CmdResult<ConfigOutput> {
    let mut output = ConfigOutput::new("config.path");
    output.path = Some(defaults::config_path()?);
    output.exists = Some(defaults::config_exists());
    Ok((output, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_value_accepts_json_and_bare_words() {
        assert_eq!(parse_value("8080"), json!(8080));
        assert_eq!(parse_value("\"t3.small\""), json!("t3.small"));
        assert_eq!(parse_value("eu-west-1"), json!("eu-west-1"));
    }

    #[test]
    fn set_json_pointer_creates_intermediate_objects() {
        let mut root = json!({ "defaults": {} });
        set_json_pointer(&mut root, "/defaults/terraform/region", json!("eu-west-1")).unwrap();
        assert_eq!(root["defaults"]["terraform"]["region"], "eu-west-1");
    }

    #[test]
    fn set_json_pointer_rejects_scalar_parent() {
        let mut root = json!({ "defaults": { "github": "x" } });
        let err = set_json_pointer(&mut root, "/defaults/github/api_url", json!("u")).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn apply_updates_known_key() {
        let config = apply(
            InfragenConfig::default(),
            "/defaults/terraform/region",
            "eu-west-1",
            json!("eu-west-1"),
        )
        .unwrap();
        assert_eq!(config.defaults.terraform.region, "eu-west-1");
    }

    #[test]
    fn apply_accepts_null_for_optional_key() {
        let mut start = InfragenConfig::default();
        start.defaults.terraform.key_name = Some("deploy-key".to_string());
        let config = apply(start, "/defaults/terraform/key_name", "null", json!(null)).unwrap();
        assert_eq!(config.defaults.terraform.key_name, None);
    }

    #[test]
    fn apply_rejects_type_mismatch() {
        let err = apply(
            InfragenConfig::default(),
            "/defaults/container/app_port",
            "abc",
            json!("abc"),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let err = apply(
            InfragenConfig::default(),
            "/defaults/terraform/regoin",
            "eu-west-1",
            json!("eu-west-1"),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "/defaults/terraform/regoin");
    }

    #[test]
    fn apply_rejects_unknown_section() {
        let err = apply(
            InfragenConfig::default(),
            "/defaults/ansible/inventory",
            "hosts",
            json!("hosts"),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }
}
