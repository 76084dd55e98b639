use crate::config::ProviderConfig;
use crate::gateway::traits::SearchGateway;
use crate::model::{GatewayError, OfferQuery};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
/// Tokens are refreshed this long before the provider expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Amadeus Flight Offers Search client using OAuth2 client credentials.
pub struct AmadeusGateway {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusGateway {
    pub fn new(config: &ProviderConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent("fare-sniper/0.1")
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Returns a cached token or fetches a fresh one. The lock is held during
    /// the fetch so concurrent searches share a single token request.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        info!("🔑 Requesting Amadeus access token...");
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Auth(oauth_error_message(status, &body)));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let value = parsed.access_token.clone();
        *guard = Some(AccessToken {
            value: parsed.access_token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        });
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait::async_trait]
impl SearchGateway for AmadeusGateway {
    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<Value>, GatewayError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, OFFERS_PATH);
        debug!("GET {} for {}-{} on {}", url, query.origin, query.destination, query.departure_date);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&query_params(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.forget_token().await;
            }
            let message = api_error_message(status, &body);
            warn!("❌ Amadeus responded [{}]: {}", status, message);
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OffersResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }
}

pub(crate) fn query_params(query: &OfferQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("originLocationCode", query.origin.clone()),
        ("destinationLocationCode", query.destination.clone()),
        ("departureDate", query.departure_date.format("%Y-%m-%d").to_string()),
        ("adults", query.adults.to_string()),
        ("currencyCode", query.currency.clone()),
        ("max", query.max.to_string()),
    ];
    if let Some(airline) = &query.included_airline {
        params.push(("includedAirlineCodes", airline.clone()));
    }
    params
}

/// Joins `errors[].detail` (or `title`) from a provider error body.
pub(crate) fn api_error_message(status: StatusCode, body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|parsed| {
            parsed
                .errors
                .into_iter()
                .filter_map(|e| e.detail.or(e.title))
                .filter(|m| !m.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        status.to_string()
    } else {
        messages.join("; ")
    }
}

fn oauth_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(OAuthErrorResponse {
            error_description: Some(description),
            ..
        }) => description,
        Ok(OAuthErrorResponse { error: Some(error), .. }) => error,
        _ => status.to_string(),
    }
}
