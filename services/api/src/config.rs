use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;
use vox_core::{Credentials, speech::DEFAULT_VOICE};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which browser origins may open the WebSocket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub credentials_path: PathBuf,
    pub credentials: Credentials,
    pub speech_language: String,
    pub default_voice: String,
    pub allowed_origins: AllowedOrigins,
    pub record_seconds: u64,
}

const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,null";

/// The documented defaults with no credentials.
impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            log_level: Level::INFO,
            credentials_path: PathBuf::from(".env"),
            credentials: Credentials::default(),
            speech_language: "en-US".to_string(),
            default_voice: DEFAULT_VOICE.to_string(),
            allowed_origins: AllowedOrigins::List(
                DEFAULT_ORIGINS.split(',').map(str::to_string).collect(),
            ),
            record_seconds: 5,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Outside tests the dotenv file named by `CREDENTIALS_PATH` is loaded
    /// first; variables already set in the process win over the file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = std::env::var("CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".env"));

        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::from_path(&credentials_path).ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let credentials = Credentials::new(
            std::env::var("KEY").unwrap_or_default(),
            std::env::var("REGION").unwrap_or_default(),
        );

        let speech_language =
            std::env::var("SPEECH_LANGUAGE").unwrap_or_else(|_| "en-US".to_string());
        let default_voice =
            std::env::var("DEFAULT_VOICE").unwrap_or_else(|_| DEFAULT_VOICE.to_string());

        let origins_str =
            std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
        let allowed_origins = parse_origins(&origins_str)?;

        let record_seconds_str =
            std::env::var("RECORD_SECONDS").unwrap_or_else(|_| "5".to_string());
        let record_seconds = match record_seconds_str.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "RECORD_SECONDS".to_string(),
                    format!("'{}' is not a positive integer", record_seconds_str),
                ));
            }
        };

        Ok(Self {
            bind_address,
            log_level,
            credentials_path,
            credentials,
            speech_language,
            default_voice,
            allowed_origins,
            record_seconds,
        })
    }
}

fn parse_origins(raw: &str) -> Result<AllowedOrigins, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|o| o == "*") {
        return Ok(AllowedOrigins::Any);
    }
    if origins.is_empty() {
        return Err(ConfigError::InvalidValue(
            "ALLOWED_ORIGINS".to_string(),
            "at least one origin is required".to_string(),
        ));
    }
    Ok(AllowedOrigins::List(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("RUST_LOG");
            env::remove_var("CREDENTIALS_PATH");
            env::remove_var("KEY");
            env::remove_var("REGION");
            env::remove_var("SPEECH_LANGUAGE");
            env::remove_var("DEFAULT_VOICE");
            env::remove_var("ALLOWED_ORIGINS");
            env::remove_var("RECORD_SECONDS");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.credentials_path, PathBuf::from(".env"));
        assert!(!config.credentials.is_configured());
        assert_eq!(config.speech_language, "en-US");
        assert_eq!(config.default_voice, "en-GB-RyanNeural");
        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "null".to_string(),
            ])
        );
        assert_eq!(config.record_seconds, 5);
    }

    #[test]
    #[serial]
    fn test_default_matches_empty_environment() {
        clear_env_vars();
        let from_env = Config::from_env().expect("Config should load successfully");
        let default = Config::default();

        assert_eq!(from_env.bind_address, default.bind_address);
        assert_eq!(from_env.credentials, default.credentials);
        assert_eq!(from_env.allowed_origins, default.allowed_origins);
        assert_eq!(from_env.record_seconds, default.record_seconds);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:9000");
            env::set_var("RUST_LOG", "debug");
            env::set_var("CREDENTIALS_PATH", "/etc/vox/.env");
            env::set_var("KEY", "abc123");
            env::set_var("REGION", "westeurope");
            env::set_var("SPEECH_LANGUAGE", "en-GB");
            env::set_var("DEFAULT_VOICE", "en-US-JennyNeural");
            env::set_var("ALLOWED_ORIGINS", " https://app.example.com , * ");
            env::set_var("RECORD_SECONDS", "8");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:9000");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.credentials_path, PathBuf::from("/etc/vox/.env"));
        assert_eq!(config.credentials, Credentials::new("abc123", "westeurope"));
        assert!(config.credentials.is_configured());
        assert_eq!(config.speech_language, "en-GB");
        assert_eq!(config.default_voice, "en-US-JennyNeural");
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert_eq!(config.record_seconds, 8);
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_placeholder_key_is_not_configured() {
        clear_env_vars();
        unsafe {
            env::set_var("KEY", "your_azure_speech_key");
            env::set_var("REGION", "eastus");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert!(!config.credentials.is_configured());
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_record_seconds() {
        for value in ["0", "-3", "five"] {
            clear_env_vars();
            unsafe {
                env::set_var("RECORD_SECONDS", value);
            }

            let err = Config::from_env().unwrap_err();
            match err {
                ConfigError::InvalidValue(var, _) => assert_eq!(var, "RECORD_SECONDS"),
                _ => panic!("Expected InvalidValue for RECORD_SECONDS"),
            }
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_empty_origins() {
        clear_env_vars();
        unsafe {
            env::set_var("ALLOWED_ORIGINS", " , ");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "ALLOWED_ORIGINS"),
            _ => panic!("Expected InvalidValue for ALLOWED_ORIGINS"),
        }
        clear_env_vars();
    }
}
