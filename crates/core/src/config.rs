use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `GYMLEDGER__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Minimum digit count for a client contact phone, after stripping
    /// every non-digit character.
    #[serde(default = "default_min_phone_digits")]
    pub min_phone_digits: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Fixed zero-pad width for sequential invoice numbers.
    #[serde(default = "default_invoice_width")]
    pub invoice_width: usize,
}

// Default functions
fn default_min_phone_digits() -> usize {
    10
}
fn default_invoice_width() -> usize {
    4
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            min_phone_digits: default_min_phone_digits(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            invoice_width: default_invoice_width(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("GYMLEDGER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
