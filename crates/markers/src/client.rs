use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use shared::config::MarkerConfig;
use shared::Marker;
use tracing::{debug, warn};

use crate::error::{MarkerError, Result};

pub const MARKERS_PATH: &str = "/api/base_markers";

/// Source of the full marker list
#[async_trait]
pub trait MarkerSource: Send + Sync {
    /// `None` when the list could not be fetched
    async fn fetch_markers(&self) -> Option<Vec<Marker>>;
}

#[derive(Debug, Deserialize)]
struct MarkerListResponse {
    #[serde(default)]
    success: bool,
    /// Entries are decoded one at a time so a bad one is skipped alone
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Marker as served; ids and coordinates arrive as numbers or strings
#[derive(Debug, Deserialize)]
struct WireMarker {
    id: Value,
    latitude: Value,
    longitude: Value,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    blockchain: Option<String>,
    #[serde(default, rename = "publicKey")]
    public_key: Option<String>,
    #[serde(default, rename = "assetCode")]
    asset_code: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
}

fn coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|c| c.is_finite())
}

impl WireMarker {
    fn decode(entry: Value) -> Option<Marker> {
        match serde_json::from_value::<WireMarker>(entry) {
            Ok(wire) => wire.into_marker(),
            Err(e) => {
                debug!("Skipping malformed marker: {}", e);
                None
            }
        }
    }

    fn into_marker(self) -> Option<Marker> {
        let id = match self.id {
            Value::String(id) if !id.is_empty() => id,
            Value::Number(id) => id.to_string(),
            other => {
                debug!("Skipping marker with id {}", other);
                return None;
            }
        };

        let (Some(latitude), Some(longitude)) =
            (coordinate(&self.latitude), coordinate(&self.longitude))
        else {
            debug!(
                "Skipping marker {} with coordinates {}, {}",
                id, self.latitude, self.longitude
            );
            return None;
        };

        Some(Marker {
            id,
            latitude,
            longitude,
            label: self.label.unwrap_or_default(),
            blockchain: self.blockchain.unwrap_or_default(),
            public_key: self.public_key.unwrap_or_default(),
            asset_code: self.asset_code.unwrap_or_default(),
            amount: self.amount,
        })
    }
}

/// HTTP client for the marker service
pub struct MarkerClient {
    client: Client,
    url: String,
    api_token: Option<String>,
}

impl MarkerClient {
    pub fn new(config: &MarkerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MarkerError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}{}", config.api_url.trim_end_matches('/'), MARKERS_PATH),
            api_token: config.api_token.clone(),
        })
    }

    pub async fn list(&self) -> Result<Vec<Marker>> {
        debug!("GET {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarkerError::Protocol(format!(
                "{} returned status {}",
                MARKERS_PATH, status
            )));
        }

        let body: MarkerListResponse = response.json().await?;
        if !body.success {
            return Err(MarkerError::Protocol(
                body.message
                    .unwrap_or_else(|| "marker service reported failure".to_string()),
            ));
        }

        let total = body.data.len();
        let markers: Vec<Marker> = body.data.into_iter().filter_map(WireMarker::decode).collect();
        if markers.len() < total {
            warn!("Skipped {} of {} markers", total - markers.len(), total);
        }
        Ok(markers)
    }
}

#[async_trait]
impl MarkerSource for MarkerClient {
    async fn fetch_markers(&self) -> Option<Vec<Marker>> {
        match self.list().await {
            Ok(markers) => Some(markers),
            Err(e) => {
                warn!("Marker fetch failed: {}", e);
                None
            }
        }
    }
}
