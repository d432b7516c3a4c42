//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, SpotifyConfig, MAX_OGG_QUALITY};
use crate::domain::error::ConfigError;
use crate::domain::recording::AudioFormat;

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

    let shown = if is_secret(key) {
        mask_secret(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match display_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        let value = display_value(&config, key).unwrap_or_else(|| NOT_SET.to_string());
        presenter.key_value(key, &value);
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Parse `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "output_directory" => config.output_directory = Some(non_empty(key, value)?),
        "format" => {
            let format = value
                .parse::<AudioFormat>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.format = Some(format.to_string());
        }
        "ogg_quality" => {
            let quality = value
                .parse::<u8>()
                .ok()
                .filter(|q| *q <= MAX_OGG_QUALITY)
                .ok_or_else(|| invalid(key, "Value must be between 0 and 10"))?;
            config.ogg_quality = Some(quality);
        }
        "interval" => {
            let secs = value
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or_else(|| invalid(key, "Value must be a positive number of seconds"))?;
            config.interval = Some(secs);
        }
        "device" => config.device = Some(non_empty(key, value)?),
        "ffmpeg_path" => config.ffmpeg_path = Some(non_empty(key, value)?),
        "skip_existing_file" => config.skip_existing_file = Some(parse_bool_for(key, value)?),
        "min_duration" => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| invalid(key, "Value must be a whole number of seconds"))?;
            config.min_duration = Some(secs);
        }
        "recording_buffer" => {
            let secs = value
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite())
                .ok_or_else(|| invalid(key, "Value must be a number of seconds"))?;
            config.recording_buffer = Some(secs);
        }
        "organize" => config.organize = Some(parse_bool_for(key, value)?),
        spotify_key if spotify_key.starts_with("spotify.") => {
            let value = non_empty(key, value)?;
            let spotify = config.spotify.get_or_insert_with(SpotifyConfig::default);
            match spotify_key {
                "spotify.client_id" => spotify.client_id = Some(value),
                "spotify.client_secret" => spotify.client_secret = Some(value),
                "spotify.refresh_token" => spotify.refresh_token = Some(value),
                "spotify.access_token" => spotify.access_token = Some(value),
                _ => return Err(invalid(key, "Unknown key")),
            }
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

/// Stored value for `key`, with secrets masked
fn display_value(config: &AppConfig, key: &str) -> Option<String> {
    let spotify = config.spotify.as_ref();
    let value = match key {
        "output_directory" => config.output_directory.clone(),
        "format" => config.format.clone(),
        "ogg_quality" => config.ogg_quality.map(|q| q.to_string()),
        "interval" => config.interval.map(|s| s.to_string()),
        "device" => config.device.clone(),
        "ffmpeg_path" => config.ffmpeg_path.clone(),
        "skip_existing_file" => config.skip_existing_file.map(|b| b.to_string()),
        "min_duration" => config.min_duration.map(|s| s.to_string()),
        "recording_buffer" => config.recording_buffer.map(|s| s.to_string()),
        "organize" => config.organize.map(|b| b.to_string()),
        "spotify.client_id" => spotify.and_then(|s| s.client_id.clone()),
        "spotify.client_secret" => spotify.and_then(|s| s.client_secret.clone()),
        "spotify.refresh_token" => spotify.and_then(|s| s.refresh_token.clone()),
        "spotify.access_token" => spotify.and_then(|s| s.access_token.clone()),
        _ => None,
    };

    if is_secret(key) {
        value.map(|v| mask_secret(&v))
    } else {
        value
    }
}

fn is_secret(key: &str) -> bool {
    matches!(
        key,
        "spotify.client_secret" | "spotify.refresh_token" | "spotify.access_token"
    )
}

fn non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(invalid(key, "Value must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_bool_for(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

/// Mask a secret for display (show first 4 and last 4 chars)
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
