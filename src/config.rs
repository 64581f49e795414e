// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Longest stem accepted by the structural rules.
pub const MAX_STEM_LENGTH: usize = 1000;
/// Longest single option text.
pub const MAX_OPTION_LENGTH: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// Upper bounds for numbers appearing in arithmetic questions, per difficulty.
pub const ARITHMETIC_MAX_EASY: f64 = 100.0;
pub const ARITHMETIC_MAX_MEDIUM: f64 = 1_000.0;
pub const ARITHMETIC_MAX_HARD: f64 = 10_000.0;

pub const DEFAULT_ENROLLMENT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_ENROLLMENT_BATCH: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub port: u16,
    /// Number of students created in parallel within one batch. 1 means sequential.
    pub enrollment_concurrency: usize,
    /// Largest batch the admin boundary accepts in one request.
    pub max_enrollment_batch: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = parse_or("APP_PORT", 3000);

        let enrollment_concurrency =
            parse_or("ENROLLMENT_CONCURRENCY", DEFAULT_ENROLLMENT_CONCURRENCY).max(1);

        let max_enrollment_batch =
            parse_or("MAX_ENROLLMENT_BATCH", DEFAULT_MAX_ENROLLMENT_BATCH);

        Self {
            database_url,
            rust_log,
            port,
            enrollment_concurrency,
            max_enrollment_batch,
        }
    }
}

/// Reads an optional numeric variable, falling back (with a warning) when it
/// is missing or unparsable.
fn parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{}' for {}, using {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}
