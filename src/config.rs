use crate::model::{ConfigError, FareQuery};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const ENV_CLIENT_ID: &str = "AMADEUS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AMADEUS_CLIENT_SECRET";
pub const ENV_HOSTNAME: &str = "AMADEUS_HOSTNAME";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hostname {
    #[default]
    Test,
    Production,
}

impl Hostname {
    pub fn base_url(self) -> &'static str {
        match self {
            Hostname::Test => "https://test.api.amadeus.com",
            Hostname::Production => "https://api.amadeus.com",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Hostname::Test),
            "production" => Ok(Hostname::Production),
            other => Err(ConfigError::Invalid(format!("unknown hostname '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub hostname: Hostname,
    /// Overrides the host derived from `hostname`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.hostname.base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Csv { data_dir: PathBuf },
    Sqlite { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Csv {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub origin: String,
    pub destination: String,
    /// Fixed departure date. Takes precedence over `days_ahead`.
    #[serde(default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub days_ahead: Option<u64>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub airline: Option<String>,
    /// Also log every raw offer in list mode.
    #[serde(default)]
    pub list_offers: bool,
}

impl RouteConfig {
    pub fn to_query(&self, today: NaiveDate) -> Result<FareQuery, ConfigError> {
        let travel_date = match (self.travel_date, self.days_ahead) {
            (Some(date), _) => date,
            (None, Some(days)) => today.checked_add_days(Days::new(days)).ok_or_else(|| {
                ConfigError::Invalid(format!("days_ahead {} overflows the calendar", days))
            })?,
            (None, None) => {
                return Err(ConfigError::Invalid(format!(
                    "route {}-{} needs travel_date or days_ahead",
                    self.origin, self.destination
                )));
            }
        };

        Ok(FareQuery {
            origin: self.origin.trim().to_ascii_uppercase(),
            destination: self.destination.trim().to_ascii_uppercase(),
            travel_date,
            adults: self.adults,
            airline: self.airline.as_deref().and_then(airline_codes),
        })
    }

    pub fn label(&self) -> String {
        match &self.airline {
            Some(airline) => format!("{}-{} [{}]", self.origin, self.destination, airline),
            None => format!("{}-{}", self.origin, self.destination),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    /// Settlement currency requested for every query.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    /// Zero runs a single pass and exits.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
}

impl AppConfig {
    /// Environment values win over the file so secrets can stay out of it.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup(ENV_CLIENT_ID) {
            self.provider.client_id = id;
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.provider.client_secret = secret;
        }
        if let Some(host) = lookup(ENV_HOSTNAME) {
            self.provider.hostname = Hostname::parse(&host)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.client_id.trim().is_empty() || self.provider.client_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("provider credentials are missing".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency must not be empty".into()));
        }
        if self.max_results == 0 {
            return Err(ConfigError::Invalid("max_results must be positive".into()));
        }
        for route in &self.routes {
            if route.adults == 0 {
                return Err(ConfigError::Invalid(format!(
                    "route {} needs at least one adult",
                    route.label()
                )));
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = serde_json::from_str(&content)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// "ke, oz" -> "KE,OZ"; `None` when no code is left.
fn airline_codes(raw: &str) -> Option<String> {
    let codes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    (!codes.is_empty()).then(|| codes.join(","))
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_adults() -> u32 {
    1
}

fn default_currency() -> String {
    "KRW".to_string()
}

fn default_max_results() -> u32 {
    50
}

fn default_check_interval() -> u64 {
    3600
}
