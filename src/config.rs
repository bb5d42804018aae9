use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_nav_timeout")]
    pub nav_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Cap for the document-order element scan used when no price-like
    /// container pattern matches at all.
    #[serde(default = "default_max_fallback_scan")]
    pub max_fallback_scan: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Coalescing window for ambient triggers (mutations, ticks).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay after a variant/SKU interaction, long enough for the page's own
    /// async price update to land first.
    #[serde(default = "default_interaction_delay_ms")]
    pub interaction_delay_ms: u64,
    #[serde(default = "default_state_poll_ms")]
    pub state_poll_ms: u64,
    #[serde(default = "default_mutation_poll_ms")]
    pub mutation_poll_ms: u64,
    /// Low-frequency full reparse, the safety net for updates the watchers
    /// cannot see.
    #[serde(default = "default_reparse_interval_ms")]
    pub reparse_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_supplier")]
    pub supplier: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_nav_timeout() -> u64 {
    30
}

fn default_max_fallback_scan() -> usize {
    400
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_interaction_delay_ms() -> u64 {
    80
}

fn default_state_poll_ms() -> u64 {
    700
}

fn default_mutation_poll_ms() -> u64 {
    300
}

fn default_reparse_interval_ms() -> u64 {
    3000
}

fn default_endpoint() -> String {
    "https://dropbridge.onrender.com/import-from-extension".to_string()
}

fn default_supplier() -> String {
    "aliexpress".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            chrome_path: None,
            user_agent: default_user_agent(),
            nav_timeout_secs: default_nav_timeout(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            max_fallback_scan: default_max_fallback_scan(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            debounce_ms: default_debounce_ms(),
            interaction_delay_ms: default_interaction_delay_ms(),
            state_poll_ms: default_state_poll_ms(),
            mutation_poll_ms: default_mutation_poll_ms(),
            reparse_interval_ms: default_reparse_interval_ms(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            endpoint: default_endpoint(),
            supplier: default_supplier(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "DROPBRIDGE"
            .add_source(Environment::with_prefix("DROPBRIDGE").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.capture.chrome_path.is_none() {
            config.capture.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.import.endpoint).is_err() {
            return Err(ConfigError::Message("Invalid import endpoint URL".into()));
        }

        if self.import.supplier.trim().is_empty() {
            return Err(ConfigError::Message("Import supplier must not be empty".into()));
        }

        if self.reconcile.debounce_ms == 0 {
            return Err(ConfigError::Message(
                "Reconcile debounce_ms must be greater than 0".into(),
            ));
        }

        if self.reconcile.state_poll_ms == 0 || self.reconcile.mutation_poll_ms == 0 {
            return Err(ConfigError::Message(
                "Reconcile poll intervals must be greater than 0".into(),
            ));
        }

        if self.extraction.max_fallback_scan == 0 {
            return Err(ConfigError::Message(
                "Extraction max_fallback_scan must be greater than 0".into(),
            ));
        }

        if self.import.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Import request timeout must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
