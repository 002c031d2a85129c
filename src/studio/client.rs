use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StudioError;

const SAVE_ART: &str = "mutation SaveArt($data: String!, $title: String, $palette: String, $complexity: Int) {
  saveArt(data: $data, title: $title, palette: $palette, complexity: $complexity) {
    id title palette complexity createdAt
  }
}";

const LIST_ARTS: &str = "query Arts { arts { id title palette complexity createdAt } }";

/// Variables of the `saveArt` mutation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveRequest {
    pub data: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
}

/// Artwork summary returned by the server; the image payload is not
/// fetched back.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedArt {
    pub id: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
    pub created_at: Option<String>,
}

/// Where the studio sends finished pieces.
pub trait ArtSink: Send + Sync {
    fn save_art(&self, request: &SaveRequest) -> Result<SavedArt, StudioError>;
    fn list_arts(&self) -> Result<Vec<SavedArt>, StudioError>;
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveArtData {
    save_art: SavedArt,
}

#[derive(Deserialize)]
struct ArtsData {
    arts: Vec<SavedArt>,
}

/// Blocking GraphQL-over-HTTP client for the art server.
pub struct GraphqlClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StudioError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, StudioError> {
        let response: GraphqlResponse<T> = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()?
            .error_for_status()?
            .json()?;

        if let Some(err) = response.errors.into_iter().next() {
            return Err(StudioError::Api(err.message));
        }
        response
            .data
            .ok_or_else(|| StudioError::Api("Art server returned no data".to_string()))
    }
}

impl ArtSink for GraphqlClient {
    fn save_art(&self, request: &SaveRequest) -> Result<SavedArt, StudioError> {
        let variables = serde_json::to_value(request)
            .map_err(|e| StudioError::Api(format!("Could not encode request: {e}")))?;
        let data: SaveArtData = self.execute(SAVE_ART, variables)?;
        Ok(data.save_art)
    }

    fn list_arts(&self) -> Result<Vec<SavedArt>, StudioError> {
        let data: ArtsData = self.execute(LIST_ARTS, json!({}))?;
        Ok(data.arts)
    }
}
