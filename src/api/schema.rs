use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject, ID,
};

use crate::api::handlers::{ArtService, DeleteAck, SaveArtInput};
use crate::database::repo::{format_timestamp, ArtRecord};
use crate::error::ArtError;

pub type ArtSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// A saved artwork as exposed over GraphQL.
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Art")]
pub struct ArtObject {
    pub id: ID,
    pub data: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<ArtRecord> for ArtObject {
    fn from(art: ArtRecord) -> Self {
        Self {
            id: ID::from(art.id.to_string()),
            data: art.data,
            title: art.title,
            palette: art.palette,
            complexity: art.complexity,
            created_at: Some(format_timestamp(&art.created_at)),
            updated_at: Some(format_timestamp(&art.updated_at)),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "DeleteResponse")]
pub struct DeleteResponse {
    pub id: ID,
    pub success: bool,
}

impl From<DeleteAck> for DeleteResponse {
    fn from(ack: DeleteAck) -> Self {
        Self {
            id: ID::from(ack.id),
            success: ack.success,
        }
    }
}

impl ErrorExtensions for ArtError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.public_message())
            .extend_with(|_, ext| ext.set("code", self.code()))
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All saved artworks, newest first.
    async fn arts(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ArtObject>> {
        let service = ctx.data::<ArtService>()?;
        let arts = service.list().await.map_err(|e| e.extend())?;
        Ok(arts.into_iter().map(ArtObject::from).collect())
    }

    async fn art(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<ArtObject> {
        let service = ctx.data::<ArtService>()?;
        let art = service.get(&id).await.map_err(|e| e.extend())?;
        Ok(art.into())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn save_art(
        &self,
        ctx: &Context<'_>,
        data: String,
        title: Option<String>,
        palette: Option<String>,
        complexity: Option<i32>,
    ) -> async_graphql::Result<ArtObject> {
        let service = ctx.data::<ArtService>()?;
        let art = service
            .save(SaveArtInput { data, title, palette, complexity })
            .await
            .map_err(|e| e.extend())?;
        Ok(art.into())
    }

    async fn delete_art(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<DeleteResponse> {
        let service = ctx.data::<ArtService>()?;
        let ack = service.delete(&id).await.map_err(|e| e.extend())?;
        Ok(ack.into())
    }
}

/// Builds the schema with the service injected as context data.
pub fn build_schema(service: ArtService) -> ArtSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}
