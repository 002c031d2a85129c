use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::database::repo::{ArtRecord, ArtStore, NewArt};
use crate::error::{ArtError, Operation};

/// Input to the create operation.
#[derive(Debug, Clone, Default)]
pub struct SaveArtInput {
    pub data: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAck {
    pub id: String,
    pub success: bool,
}

/// The four artwork operations. Every storage failure is logged here and
/// replaced by a sanitized [`ArtError`].
#[derive(Clone)]
pub struct ArtService {
    store: Arc<dyn ArtStore>,
}

impl ArtService {
    pub fn new(store: Arc<dyn ArtStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<ArtRecord>, ArtError> {
        self.store.find_all().await.map_err(|e| {
            error!("Error fetching arts: {e:#}");
            ArtError::storage(Operation::List, e)
        })
    }

    pub async fn get(&self, id: &str) -> Result<ArtRecord, ArtError> {
        let key = parse_id(Operation::Get, id)?;
        match self.store.find_by_id(key).await {
            Ok(Some(art)) => Ok(art),
            Ok(None) => {
                warn!(%id, "Artwork not found");
                Err(ArtError::NotFound { op: Operation::Get, id: id.to_string() })
            }
            Err(e) => {
                error!(%id, "Error fetching art: {e:#}");
                Err(ArtError::storage(Operation::Get, e))
            }
        }
    }

    pub async fn save(&self, input: SaveArtInput) -> Result<ArtRecord, ArtError> {
        if input.data.is_empty() {
            return Err(ArtError::DataRequired);
        }

        let title = input
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(default_title);

        let art = self
            .store
            .insert(NewArt {
                data: input.data,
                title: Some(title),
                palette: input.palette,
                complexity: input.complexity,
            })
            .await
            .map_err(|e| {
                error!("Error saving art: {e:#}");
                ArtError::storage(Operation::Save, e)
            })?;

        info!(id = art.id, title = ?art.title, "Artwork saved");
        Ok(art)
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteAck, ArtError> {
        let key = parse_id(Operation::Delete, id)?;
        match self.store.delete_by_id(key).await {
            Ok(true) => {
                info!(%id, "Artwork deleted");
                Ok(DeleteAck { id: id.to_string(), success: true })
            }
            Ok(false) => {
                warn!(%id, "Artwork not found for deletion");
                Err(ArtError::NotFound { op: Operation::Delete, id: id.to_string() })
            }
            Err(e) => {
                error!(%id, "Error deleting art: {e:#}");
                Err(ArtError::storage(Operation::Delete, e))
            }
        }
    }
}

/// An id that is not an integer cannot name a row, so it is reported as
/// not found rather than as a separate validation failure.
fn parse_id(op: Operation, id: &str) -> Result<i64, ArtError> {
    id.trim().parse::<i64>().map_err(|_| {
        warn!(%id, "Artwork id is not numeric");
        ArtError::NotFound { op, id: id.to_string() }
    })
}

fn default_title() -> String {
    format!("Artwork-{}", Utc::now().timestamp_millis())
}
