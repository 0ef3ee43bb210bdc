use std::{env, path::PathBuf, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Flat fee added to every non-empty order.
    pub delivery_fee: Decimal,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let delivery_fee = match env::var("DELIVERY_FEE") {
            Ok(raw) => Decimal::from_str(raw.trim())
                .with_context(|| format!("DELIVERY_FEE is not a decimal: {raw}"))?,
            Err(_) => default_delivery_fee(),
        };
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(5 * 1024 * 1024);

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            delivery_fee,
            upload_dir,
            public_base_url,
            max_upload_bytes,
        })
    }
}

pub fn default_delivery_fee() -> Decimal {
    Decimal::new(500, 2)
}
