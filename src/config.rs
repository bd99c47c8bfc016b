use std::env;
use std::fs;
use std::path::PathBuf;

use rand::{distributions::Alphanumeric, Rng};
use serde::de::DeserializeOwned;

use crate::credentials::CredentialsConfig;
use crate::error::{AppError, AppResult};
use crate::network::NetworkConfig;

pub const DEFAULT_PROXIMITY_THRESHOLD_KM: f64 = 1.0;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub artifact_dir: PathBuf,
    pub proximity_threshold_km: f64,
    pub network_file: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            // Without a configured secret, tokens only live as long as the process
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, generating a random one");
                random_secret()
            }),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            artifact_dir: env::var("ARTIFACT_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            proximity_threshold_km: env::var("PROXIMITY_THRESHOLD_KM")
                .map(|v| v.parse().expect("PROXIMITY_THRESHOLD_KM must be a number"))
                .unwrap_or(DEFAULT_PROXIMITY_THRESHOLD_KM),
            network_file: env::var("NETWORK_FILE").ok().map(PathBuf::from),
            credentials_file: env::var("CREDENTIALS_FILE").ok().map(PathBuf::from),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Fare table and city coordinates, from `NETWORK_FILE` or the built-in defaults
    pub fn load_network(&self) -> AppResult<NetworkConfig> {
        load_or_default(self.network_file.as_ref())
    }

    /// Login accounts, from `CREDENTIALS_FILE` or the built-in defaults
    pub fn load_credentials(&self) -> AppResult<CredentialsConfig> {
        load_or_default(self.credentials_file.as_ref())
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: Option<&PathBuf>) -> AppResult<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Failed to parse {}: {}", path.display(), e)))
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let network: NetworkConfig = load_or_default(None).unwrap();
        assert_eq!(network.fares.len(), 3);
    }

    #[test]
    fn test_credentials_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"managers": {{"boss": "s3cret"}}}}"#).unwrap();

        let creds: CredentialsConfig = load_or_default(Some(&file.path().to_path_buf())).unwrap();
        assert!(creds.passengers.is_empty());
        assert_eq!(creds.managers.get("boss").map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn test_random_secret_length() {
        let secret = random_secret();
        assert_eq!(secret.len(), 32);
        assert_ne!(secret, random_secret());
    }
}
