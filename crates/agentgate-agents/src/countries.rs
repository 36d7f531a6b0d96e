//! Country information: REST client, tools and gate

use std::sync::Arc;
use std::time::Duration;

use agentgate_core::Context;
use agentgate_kernel::{DispatchGate, GateBuildError, Route};
use agentgate_llm::LLMRouter;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::tools::{missing_arg, string_arg, Tool, ToolBox, ToolHandler};

pub const REST_COUNTRIES_BASE_URL: &str = "https://restcountries.com/v3.1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryError {
    #[error("No country named '{country}'")]
    NotFound { country: String },

    #[error("Country service returned HTTP {status}")]
    Http { status: u16 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Unexpected response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid country service URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

/// Read-only lookup of country facts by exact name
#[async_trait]
pub trait CountryDirectory: Send + Sync {
    async fn capital(&self, country: &str) -> Result<String, CountryError>;

    async fn languages(&self, country: &str) -> Result<Vec<String>, CountryError>;

    async fn population(&self, country: &str) -> Result<u64, CountryError>;
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    #[serde(default)]
    capital: Vec<String>,
    #[serde(default)]
    languages: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    population: Option<u64>,
}

/// Client for the public REST Countries service
#[derive(Clone)]
pub struct RestCountriesClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl RestCountriesClient {
    pub fn new() -> Result<Self, CountryError> {
        Self::with_base_url(REST_COUNTRIES_BASE_URL)
    }

    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self, CountryError> {
        let raw = base_url.as_ref();
        let base_url = reqwest::Url::parse(raw).map_err(|e| CountryError::InvalidBaseUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CountryError::InvalidBaseUrl {
                url: raw.to_string(),
                message: "URL cannot carry a path".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CountryError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    /// `{base}/name/{country}` with the country as a single encoded segment
    fn name_url(&self, country: &str) -> Result<reqwest::Url, CountryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CountryError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                message: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push("name")
            .push(country);
        Ok(url)
    }

    async fn fetch(&self, country: &str, field: &str) -> Result<CountryRecord, CountryError> {
        let url = self.name_url(country)?;
        tracing::debug!(%url, field, "querying country service");

        let response = self
            .client
            .get(url)
            .query(&[("fullText", "true"), ("fields", field)])
            .send()
            .await
            .map_err(|e| CountryError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CountryError::NotFound {
                country: country.to_string(),
            });
        }
        if !status.is_success() {
            return Err(CountryError::Http {
                status: status.as_u16(),
            });
        }

        let records: Vec<CountryRecord> =
            response
                .json()
                .await
                .map_err(|e| CountryError::InvalidResponse {
                    message: e.to_string(),
                })?;

        records.into_iter().next().ok_or_else(|| CountryError::NotFound {
            country: country.to_string(),
        })
    }
}

#[async_trait]
impl CountryDirectory for RestCountriesClient {
    async fn capital(&self, country: &str) -> Result<String, CountryError> {
        self.fetch(country, "capital")
            .await?
            .capital
            .into_iter()
            .next()
            .ok_or_else(|| CountryError::InvalidResponse {
                message: format!("no capital listed for {}", country),
            })
    }

    async fn languages(&self, country: &str) -> Result<Vec<String>, CountryError> {
        let record = self.fetch(country, "languages").await?;
        Ok(record
            .languages
            .values()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    async fn population(&self, country: &str) -> Result<u64, CountryError> {
        self.fetch(country, "population")
            .await?
            .population
            .ok_or_else(|| CountryError::InvalidResponse {
                message: format!("no population listed for {}", country),
            })
    }
}

fn country_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "country": {"type": "string", "description": "Full country name, e.g. Pakistan"}
        },
        "required": ["country"]
    })
}

fn lookup_failed(country: &str, error: &CountryError) -> String {
    format!("Could not look up {}: {}", country, error)
}

pub struct CapitalTool {
    directory: Arc<dyn CountryDirectory>,
}

impl CapitalTool {
    pub fn new(directory: Arc<dyn CountryDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CapitalTool {
    fn name(&self) -> &str {
        "get_capital"
    }

    fn description(&self) -> &str {
        "Fetch the capital of the given country"
    }

    fn parameters(&self) -> serde_json::Value {
        country_parameters()
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        let Some(country) = string_arg(args, "country") else {
            return missing_arg("country");
        };
        match self.directory.capital(&country).await {
            Ok(capital) => format!("The capital of {} is {}", country, capital),
            Err(e) => lookup_failed(&country, &e),
        }
    }
}

pub struct LanguageTool {
    directory: Arc<dyn CountryDirectory>,
}

impl LanguageTool {
    pub fn new(directory: Arc<dyn CountryDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for LanguageTool {
    fn name(&self) -> &str {
        "get_language"
    }

    fn description(&self) -> &str {
        "Fetch the spoken languages of the given country"
    }

    fn parameters(&self) -> serde_json::Value {
        country_parameters()
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        let Some(country) = string_arg(args, "country") else {
            return missing_arg("country");
        };
        match self.directory.languages(&country).await {
            Ok(languages) => format!("The spoken language of {} is {}", country, languages.join(",")),
            Err(e) => lookup_failed(&country, &e),
        }
    }
}

pub struct PopulationTool {
    directory: Arc<dyn CountryDirectory>,
}

impl PopulationTool {
    pub fn new(directory: Arc<dyn CountryDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for PopulationTool {
    fn name(&self) -> &str {
        "get_population"
    }

    fn description(&self) -> &str {
        "Fetch the population of the given country"
    }

    fn parameters(&self) -> serde_json::Value {
        country_parameters()
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        let Some(country) = string_arg(args, "country") else {
            return missing_arg("country");
        };
        match self.directory.population(&country).await {
            Ok(population) => format!(
                "The current population of {} is approximately {}",
                country, population
            ),
            Err(e) => lookup_failed(&country, &e),
        }
    }
}

/// Static gate over a tool handler with the three country tools
pub fn country_gate(
    llm: LLMRouter,
    directory: Arc<dyn CountryDirectory>,
) -> Result<DispatchGate, GateBuildError> {
    let tools = ToolBox::new()
        .with(CapitalTool::new(directory.clone()))
        .with(LanguageTool::new(directory.clone()))
        .with(PopulationTool::new(directory));

    DispatchGate::builder("country")
        .handler(ToolHandler::new(
            "country_info",
            "Capital, languages and population of a country",
            "You are a helpful agent. You take the country name from the user and use all tools \
             to give complete info about that country.",
            llm,
            tools,
        ))
        .route(Route::fixed("country_info"))
        .build()
}
