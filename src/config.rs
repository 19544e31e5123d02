//! Configuration for civicconnect
//!
//! CLI arguments and environment variable handling using clap.
//! A `.env` file in the working directory is loaded by `main` before parsing.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Minimum length accepted for `JWT_SECRET` outside dev mode
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// civicconnect - civic issue reporting backend
#[derive(Parser, Debug, Clone)]
#[command(name = "civicconnect")]
#[command(about = "REST backend for civic issue reporting and resolution")]
pub struct Args {
    /// Unique node identifier for this server instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure JWT secret, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "civicconnect")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 90 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "7776000")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// City that issues and wards belong to
    #[arg(long, env = "CITY", default_value = "Madurai")]
    pub city: String,

    /// Latitude of the city centre (used for demo issue seeding)
    #[arg(long, env = "CITY_CENTER_LAT", default_value = "9.9252")]
    pub city_center_lat: f64,

    /// Longitude of the city centre (used for demo issue seeding)
    #[arg(long, env = "CITY_CENTER_LNG", default_value = "78.1198")]
    pub city_center_lng: f64,

    /// Ward lookup CSV file name, searched in `datasets/` and the working directory
    #[arg(
        long,
        env = "WARD_SEED_FILE",
        default_value = "madurai_comprehensive_location_lookup.csv"
    )]
    pub ward_seed_file: PathBuf,
}

impl Args {
    /// Candidate paths for the ward seed CSV, in lookup order
    pub fn ward_seed_candidates(&self) -> Vec<PathBuf> {
        if self.ward_seed_file.is_absolute() {
            return vec![self.ward_seed_file.clone()];
        }
        vec![
            PathBuf::from("datasets").join(&self.ward_seed_file),
            self.ward_seed_file.clone(),
        ]
    }

    /// Whether structured JSON logs were requested
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_JWT_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if !(-90.0..=90.0).contains(&self.city_center_lat)
            || !(-180.0..=180.0).contains(&self.city_center_lng)
        {
            return Err("CITY_CENTER_LAT/CITY_CENTER_LNG out of range".to_string());
        }

        if self.city.trim().is_empty() {
            return Err("CITY must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["civicconnect"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.city, "Madurai");
        assert_eq!(args.jwt_expiry_seconds, 90 * 24 * 60 * 60);
        assert_eq!(args.listen.port(), 5000);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = parse(&["--jwt-secret", "short"]);
        assert!(args.validate().is_err());

        let args = parse(&["--jwt-secret", "a-production-secret-that-is-long-enough"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_ward_seed_candidates() {
        let args = parse(&["--dev-mode", "--ward-seed-file", "wards.csv"]);
        let candidates = args.ward_seed_candidates();
        assert_eq!(candidates[0], PathBuf::from("datasets/wards.csv"));
        assert_eq!(candidates[1], PathBuf::from("wards.csv"));

        let args = parse(&["--dev-mode", "--ward-seed-file", "/srv/wards.csv"]);
        assert_eq!(args.ward_seed_candidates(), vec![PathBuf::from("/srv/wards.csv")]);
    }
}
