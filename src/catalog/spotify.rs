use std::cell::OnceCell;

use serde::Deserialize;
use serde_json::Value;

use super::{Catalog, CatalogError, Result, RetryPolicy};
use crate::config::AppConfig;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// The audio-features endpoint accepts at most this many ids per request.
const FEATURES_BATCH: usize = 100;

/// Client-credentials token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Audio-features response; only the list is used.
#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    audio_features: Vec<Value>,
}

/// Blocking Spotify Web API client.
///
/// The client-credentials token is requested on the first API call, so runs
/// served entirely from the cache never authenticate. A run is short enough
/// that the hour-long token never needs refreshing.
pub struct SpotifyClient {
    agent: ureq::Agent,
    username: String,
    credentials: Option<(String, String)>,
    token: OnceCell<String>,
    retry: RetryPolicy,
}

impl SpotifyClient {
    /// Build a client from config credentials (already overlaid with env).
    /// Missing credentials surface as [`CatalogError::MissingCredentials`]
    /// on the first API call.
    pub fn from_config(config: &AppConfig) -> Self {
        let credentials = match (&config.catalog.client_id, &config.catalog.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };
        let user = config.username.as_deref().unwrap_or("anonymous");
        Self::new(user, credentials, RetryPolicy::from(&config.catalog))
    }

    pub fn new(username: &str, credentials: Option<(String, String)>, retry: RetryPolicy) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            username: username.to_string(),
            credentials,
            token: OnceCell::new(),
            retry,
        }
    }

    /// The access token, requested on first use.
    fn token(&self) -> Result<&str> {
        if let Some(token) = self.token.get() {
            return Ok(token.as_str());
        }
        let (client_id, client_secret) = self.credentials.as_ref().ok_or(CatalogError::MissingCredentials)?;
        let token = self.request_token(client_id, client_secret)?;
        Ok(self.token.get_or_init(|| token).as_str())
    }

    fn request_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let token: TokenResponse = self.retry.run("access token", || {
            self.agent
                .post(TOKEN_URL)
                .send_form([
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ])
                .map_err(|source| CatalogError::Http {
                    what: "access token".to_string(),
                    source,
                })?
                .body_mut()
                .read_json()
                .map_err(|source| CatalogError::Http {
                    what: "access token".to_string(),
                    source,
                })
        })?;

        if token.access_token.is_empty() {
            return Err(CatalogError::Response {
                what: "access token".to_string(),
                message: "empty access_token".to_string(),
            });
        }
        log::info!(
            "Catalog session for {} (token valid {}s)",
            self.username,
            token.expires_in
        );
        Ok(token.access_token)
    }

    /// Authenticated GET returning the JSON body.
    fn get_json(&self, what: &str, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let token = self.token()?;
        log::debug!("Fetching {url}");
        self.retry.run(what, || {
            let mut req = self
                .agent
                .get(url)
                .header("Authorization", format!("Bearer {token}"));
            for (k, v) in query {
                req = req.query(*k, *v);
            }
            req.call()
                .map_err(|source| CatalogError::Http {
                    what: what.to_string(),
                    source,
                })?
                .body_mut()
                .read_json::<Value>()
                .map_err(|source| CatalogError::Http {
                    what: what.to_string(),
                    source,
                })
        })
    }
}

impl Catalog for SpotifyClient {
    fn album(&self, id: &str) -> Result<Value> {
        let url = format!("{API_BASE}/albums/{}", encode_id(id));
        self.get_json(&format!("album {id}"), &url, &[])
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<Value> {
        let url = format!("{API_BASE}/audio-features");
        let mut all = Vec::with_capacity(track_ids.len());

        for batch in track_ids.chunks(FEATURES_BATCH) {
            let ids = batch.join(",");
            let what = format!("audio features ({} tracks)", batch.len());
            let body = self.get_json(&what, &url, &[("ids", ids.as_str())])?;
            let resp: FeaturesResponse =
                serde_json::from_value(body).map_err(|source| CatalogError::Decode { what, source })?;
            all.extend(resp.audio_features);
        }

        Ok(Value::Array(all))
    }

    fn audio_analysis(&self, track_id: &str) -> Result<Value> {
        let url = format!("{API_BASE}/audio-analysis/{}", encode_id(track_id));
        self.get_json(&format!("audio analysis {track_id}"), &url, &[])
    }

    fn image(&self, url: &str) -> Result<Vec<u8>> {
        let what = format!("image {url}");
        self.retry.run(&what, || {
            self.agent
                .get(url)
                .call()
                .map_err(|source| CatalogError::Http {
                    what: what.clone(),
                    source,
                })?
                .body_mut()
                .read_to_vec()
                .map_err(|source| CatalogError::Http {
                    what: what.clone(),
                    source,
                })
        })
    }
}

/// Catalog ids are base62, but config values are user input: keep only the
/// characters that can't break the URL path.
fn encode_id(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
