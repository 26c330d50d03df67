use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Storefront header shown on the landing payload. Fixed at bootstrap,
    /// never mutated at runtime.
    pub site_title: String,
    /// Directory holding the DejaVuSans TTF family used for invoice rendering.
    /// The invoice labels are Cyrillic, so built-in PDF fonts are not enough.
    pub invoice_font_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let site_title = env::var("SITE_TITLE").unwrap_or_else(|_| "Sportswear Shop".to_string());
        let invoice_font_dir =
            env::var("INVOICE_FONT_DIR").unwrap_or_else(|_| "./fonts".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            site_title,
            invoice_font_dir,
        })
    }
}
