//! TOML settings file under the user config directory
//!
//! Lives at `$XDG_CONFIG_HOME/spytorec/config.toml` (or the platform
//! equivalent). Holds Spotify secrets, so it is written owner-only.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

const APP_DIR: &str = "spytorec";
const FILE_NAME: &str = "config.toml";

pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join(APP_DIR).join(FILE_NAME),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    async fn write_private(&self, content: &str) -> Result<(), ConfigError> {
        let write_err = |e: std::io::Error| ConfigError::WriteError(e.to_string());

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(write_err)?;
        file.write_all(content.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        // `mode` only applies on creation; tighten files left by older versions
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }
        Ok(())
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.exists() {
            return Ok(AppConfig::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse_toml(&content)
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        let content = Self::to_toml(config)?;
        self.write_private(&content).await
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }
        self.save(&AppConfig::defaults()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::SpotifyConfig;

    #[test]
    fn default_path_is_xdg() {
        let store = XdgConfigStore::new();
        let path = store.path();
        assert!(path.to_string_lossy().contains("spytorec"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn custom_path() {
        let store = XdgConfigStore::with_path("/custom/path/config.toml");
        assert_eq!(store.path(), PathBuf::from("/custom/path/config.toml"));
    }

    #[test]
    fn parse_toml_with_spotify_section() {
        let content = r#"
output_directory = "/music"
format = "ogg"
ogg_quality = 5
organize = true

[spotify]
client_id = "id"
refresh_token = "refresh"
"#;

        let config = XdgConfigStore::parse_toml(content).unwrap();
        assert_eq!(config.output_directory, Some("/music".to_string()));
        assert_eq!(config.format, Some("ogg".to_string()));
        assert_eq!(config.ogg_quality, Some(5));
        assert_eq!(config.organize, Some(true));
        let spotify = config.spotify.unwrap();
        assert_eq!(spotify.client_id, Some("id".to_string()));
        assert_eq!(spotify.refresh_token, Some("refresh".to_string()));
        assert!(spotify.client_secret.is_none());
    }

    #[test]
    fn parse_toml_rejects_wrong_types() {
        let result = XdgConfigStore::parse_toml("interval = \"fast\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn to_toml_round_trip() {
        let config = AppConfig {
            format: Some("flac".to_string()),
            interval: Some(1.5),
            recording_buffer: Some(-0.2),
            spotify: Some(SpotifyConfig {
                client_secret: Some("secret".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let toml = XdgConfigStore::to_toml(&config).unwrap();
        let parsed = XdgConfigStore::parse_toml(&toml).unwrap();

        assert_eq!(config.format, parsed.format);
        assert_eq!(config.interval, parsed.interval);
        assert_eq!(config.recording_buffer, parsed.recording_buffer);
        assert_eq!(
            parsed.spotify.and_then(|s| s.client_secret),
            Some("secret".to_string())
        );
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("spytorec").join("config.toml"));

        store.init().await.unwrap();
        assert!(store.exists());
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.format, Some("flac".to_string()));

        assert!(matches!(
            store.init().await,
            Err(ConfigError::AlreadyExists(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        store.save(&AppConfig::defaults()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resave_tightens_loose_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "format = \"ogg\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = XdgConfigStore::with_path(&path);
        let mut config = store.load().await.unwrap();
        config.spotify = Some(SpotifyConfig {
            client_secret: Some("secret".to_string()),
            ..Default::default()
        });
        store.save(&config).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.format, Some("ogg".to_string()));
        assert_eq!(
            reloaded.spotify.and_then(|s| s.client_secret),
            Some("secret".to_string())
        );
    }

    #[tokio::test]
    async fn directory_at_config_path_is_not_a_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path());
        assert!(!store.exists());
        assert!(store.load().await.unwrap().format.is_none());
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("absent.toml"));
        let config = store.load().await.unwrap();
        assert!(config.format.is_none());
    }
}
