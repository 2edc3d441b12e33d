//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::audio::CaptureConstraints;
use crate::domain::config::{AppConfig, ConstraintsConfig};
use crate::domain::error::ConfigError;
use crate::domain::recording::{AudioFormat, Duration};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    presenter.output(read_value(&config, key).as_deref().unwrap_or(NOT_SET));

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "format" => {
            let format = value.parse::<AudioFormat>().map_err(|e| invalid(e.to_string()))?;
            config.format = Some(format.to_string());
        }
        "chunk_interval" => {
            let interval = value.parse::<Duration>().map_err(|e| invalid(e.to_string()))?;
            config.chunk_interval = Some(interval.to_string());
        }
        "output_dir" => config.output_dir = Some(value.to_string()),
        "input_device" => config.input_device = Some(value.to_string()),
        "monitor" => config.monitor = Some(parse_bool(value).map_err(|_| invalid(bool_hint()))?),
        _ => {
            let constraints = config
                .constraints
                .get_or_insert_with(ConstraintsConfig::default);
            match key {
                "constraints.auto_gain_control" => {
                    constraints.auto_gain_control =
                        Some(parse_bool(value).map_err(|_| invalid(bool_hint()))?)
                }
                "constraints.echo_cancellation" => {
                    constraints.echo_cancellation =
                        Some(parse_bool(value).map_err(|_| invalid(bool_hint()))?)
                }
                "constraints.noise_suppression" => {
                    constraints.noise_suppression =
                        Some(parse_bool(value).map_err(|_| invalid(bool_hint()))?)
                }
                "constraints.channel_count" => {
                    let channels = parse_channels(value).map_err(invalid)?;
                    constraints.channel_count = Some(channels);
                }
                _ => return Err(invalid("Unknown key".to_string())),
            }
        }
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let constraints = config.constraints.as_ref();
    match key {
        "format" => config.format.clone(),
        "chunk_interval" => config.chunk_interval.clone(),
        "output_dir" => config.output_dir.clone(),
        "input_device" => config.input_device.clone(),
        "monitor" => config.monitor.map(|b| b.to_string()),
        "constraints.auto_gain_control" => constraints
            .and_then(|c| c.auto_gain_control)
            .map(|b| b.to_string()),
        "constraints.echo_cancellation" => constraints
            .and_then(|c| c.echo_cancellation)
            .map(|b| b.to_string()),
        "constraints.noise_suppression" => constraints
            .and_then(|c| c.noise_suppression)
            .map(|b| b.to_string()),
        "constraints.channel_count" => constraints
            .and_then(|c| c.channel_count)
            .map(|n| n.to_string()),
        _ => None,
    }
}

fn parse_channels(value: &str) -> Result<u16, String> {
    let channels: u16 = value
        .parse()
        .map_err(|_| format!("Invalid number '{}'", value))?;
    CaptureConstraints {
        channel_count: channels,
        ..Default::default()
    }
    .validate()
    .map_err(|e| e.to_string())?;
    Ok(channels)
}

fn bool_hint() -> String {
    "Value must be 'true' or 'false'".to_string()
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(()),
    }
}
