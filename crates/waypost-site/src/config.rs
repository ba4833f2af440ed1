use std::path::PathBuf;

use crate::error::AppError;

const CONTACT_FILE_NAME: &str = "contact-submissions.json";
const ITINERARY_FILE_NAME: &str = "itinerary-requests.json";

/// Application configuration loaded explicitly from environment variables.
///
/// The guides directory must exist at startup; the data directory is created
/// if absent. Feed configuration lives with the feed client itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub bind_addr: String,
    /// Directory of markdown guide files.
    pub guides_dir: PathBuf,
    /// Contact submissions file.
    pub contact_file: PathBuf,
    /// Itinerary request submissions file.
    pub itinerary_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `WAYPOST_ADDR`: bind address (default `0.0.0.0:8080`)
    /// - `WAYPOST_GUIDES_DIR`: guides directory (default `content/guides`)
    /// - `WAYPOST_DATA_DIR`: submissions directory (default `.`)
    pub fn from_env() -> Result<Self, AppError> {
        let bind_addr =
            std::env::var("WAYPOST_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let guides_dir = PathBuf::from(
            std::env::var("WAYPOST_GUIDES_DIR").unwrap_or_else(|_| "content/guides".to_string()),
        );
        if !guides_dir.is_dir() {
            return Err(AppError::Config(format!(
                "guides directory not found at {}",
                guides_dir.display()
            )));
        }

        let data_dir = PathBuf::from(
            std::env::var("WAYPOST_DATA_DIR").unwrap_or_else(|_| ".".to_string()),
        );
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            AppError::Config(format!(
                "cannot create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        Ok(Self {
            bind_addr,
            guides_dir,
            contact_file: data_dir.join(CONTACT_FILE_NAME),
            itinerary_file: data_dir.join(ITINERARY_FILE_NAME),
        })
    }
}
