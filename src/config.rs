use url::Url;

use crate::error::{AppError, Result};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_SAMPLE_SIZE: usize = 400;
/// Largest sample accepted; every 50 tracks cost one Spotify request per page view.
pub const MAX_SAMPLE_SIZE: usize = 2_000;

pub const SPOTIFY_SCOPES: &[&str] = &[
    "user-read-recently-played",
    "user-top-read",
    "playlist-read-collaborative",
    "playlist-read-private",
    "user-library-read",
    "playlist-modify-private",
    "playlist-modify-public",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    /// Number of top tracks fetched for the listing, bucket and average pages.
    pub sample_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_ID not set".into()))?;

        let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_SECRET not set".into()))?;

        let spotify_redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());

        let sample_size = match std::env::var("POPFILTER_SAMPLE_SIZE") {
            Ok(raw) => parse_sample_size(&raw)?,
            Err(_) => DEFAULT_SAMPLE_SIZE,
        };

        let config = Self {
            spotify_client_id,
            spotify_client_secret,
            spotify_redirect_uri,
            sample_size,
        };
        config.validate_redirect_uri()?;

        Ok(config)
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_client_id.is_empty() {
            missing.push("SPOTIFY_CLIENT_ID".to_string());
        }
        if self.spotify_client_secret.is_empty() {
            missing.push("SPOTIFY_CLIENT_SECRET".to_string());
        }

        missing
    }

    /// The callback route is always `/callback`, so only the scheme and host are free.
    pub fn validate_redirect_uri(&self) -> Result<()> {
        let url = Url::parse(&self.spotify_redirect_uri)
            .map_err(|e| AppError::Config(format!("Invalid SPOTIFY_REDIRECT_URI: {}", e)))?;

        if url.path() != "/callback" {
            return Err(AppError::Config(format!(
                "SPOTIFY_REDIRECT_URI must end in /callback, got {}",
                url.path()
            )));
        }

        Ok(())
    }
}

fn parse_sample_size(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(AppError::Config(format!(
            "POPFILTER_SAMPLE_SIZE must be a positive integer, got '{}'",
            raw
        ))),
        Ok(size) if size > MAX_SAMPLE_SIZE => Err(AppError::Config(format!(
            "POPFILTER_SAMPLE_SIZE must be at most {}, got {}",
            MAX_SAMPLE_SIZE, size
        ))),
        Ok(size) => Ok(size),
    }
}

#[cfg(test)]
impl Config {
    pub fn mock() -> Self {
        Self {
            spotify_client_id: "client-id".to_string(),
            spotify_client_secret: "client-secret".to_string(),
            spotify_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_empty_credentials() {
        let mut config = Config::mock();
        config.spotify_client_secret.clear();

        assert_eq!(config.get_missing_config(), vec!["SPOTIFY_CLIENT_SECRET"]);
    }

    #[test]
    fn test_redirect_uri_must_point_at_callback() {
        let mut config = Config::mock();
        assert!(config.validate_redirect_uri().is_ok());

        config.spotify_redirect_uri = "http://127.0.0.1:8080/auth".to_string();
        assert!(matches!(
            config.validate_redirect_uri(),
            Err(AppError::Config(_))
        ));

        config.spotify_redirect_uri = "not a url".to_string();
        assert!(config.validate_redirect_uri().is_err());
    }

    #[test]
    fn test_sample_size_parsing() {
        assert_eq!(parse_sample_size("100").unwrap(), 100);
        assert_eq!(parse_sample_size(" 40 ").unwrap(), 40);
        assert!(parse_sample_size("0").is_err());
        assert!(parse_sample_size("-5").is_err());
        assert!(parse_sample_size("lots").is_err());
    }

    #[test]
    fn test_sample_size_upper_bound() {
        assert_eq!(parse_sample_size("2000").unwrap(), MAX_SAMPLE_SIZE);
        assert!(matches!(parse_sample_size("2001"), Err(AppError::Config(_))));
        assert!(matches!(
            parse_sample_size(&usize::MAX.to_string()),
            Err(AppError::Config(_))
        ));
        assert!(parse_sample_size("99999999999999999999999999").is_err());
    }
}
