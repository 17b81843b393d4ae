use serde::Deserialize;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub streamdeck: StreamdeckConfig,
    #[serde(default)]
    pub obs: ObsConfig,
}

/// Panel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamdeckConfig {
    /// Display brightness 0-100.
    #[serde(default = "default_brightness")]
    pub brightness: u8,
}

impl Default for StreamdeckConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
        }
    }
}

/// obs-websocket endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ObsConfig {
    #[serde(default = "default_obs_host")]
    pub host: String,

    #[serde(default = "default_obs_port")]
    pub port: u16,

    #[serde(default)]
    pub password: String,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: default_obs_host(),
            port: default_obs_port(),
            password: String::new(),
        }
    }
}

// --- Defaults ---

fn default_brightness() -> u8 {
    30
}

fn default_obs_host() -> String {
    "localhost".to_string()
}

fn default_obs_port() -> u16 {
    4455
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.streamdeck.brightness, 30);
        assert_eq!(config.obs.host, "localhost");
        assert_eq!(config.obs.port, 4455);
        assert_eq!(config.obs.password, "");
    }

    #[test]
    fn parse_partial_config_keeps_other_defaults() {
        let toml_str = r#"
[streamdeck]
brightness = 80
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.streamdeck.brightness, 80);
        assert_eq!(config.obs.port, 4455);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[streamdeck]
brightness = 55

[obs]
host = "studio-pc.lan"
port = 4456
password = "hunter2"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.streamdeck.brightness, 55);
        assert_eq!(config.obs.host, "studio-pc.lan");
        assert_eq!(config.obs.port, 4456);
        assert_eq!(config.obs.password, "hunter2");
    }
}
