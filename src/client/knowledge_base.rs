//! Knowledge base endpoints: `/api/knowledge-base`.

use reqwest::Method;
use tracing::debug;

use super::{read_json, read_verdict, ChatClient, ClientError};
use crate::models::KnowledgeBaseItem;

const KB: &str = "knowledge-base";

impl ChatClient {
    /// All knowledge base items.
    pub async fn kb_list(&self) -> Result<Vec<KnowledgeBaseItem>, ClientError> {
        self.get_json(&[KB]).await
    }

    /// A single item by id.
    pub async fn kb_get(&self, item_id: &str) -> Result<KnowledgeBaseItem, ClientError> {
        self.get_json(&[KB, item_id]).await
    }

    /// Store a new item; the returned copy carries the assigned id.
    pub async fn kb_create(
        &self,
        item: &KnowledgeBaseItem,
    ) -> Result<KnowledgeBaseItem, ClientError> {
        let url = self.endpoint(&[KB])?;
        debug!(%url, title = %item.title, "Creating knowledge base item");
        let response = self.send(self.request(Method::POST, url).json(item)).await?;
        read_json(response).await
    }

    /// Replace an existing item.
    pub async fn kb_update(
        &self,
        item_id: &str,
        item: &KnowledgeBaseItem,
    ) -> Result<KnowledgeBaseItem, ClientError> {
        let url = self.endpoint(&[KB, item_id])?;
        debug!(%url, "Updating knowledge base item");
        let response = self.send(self.request(Method::PUT, url).json(item)).await?;
        read_json(response).await
    }

    /// Delete an item. Returns the backend's verdict; an empty body counts as success.
    pub async fn kb_delete(&self, item_id: &str) -> Result<bool, ClientError> {
        let url = self.endpoint(&[KB, item_id])?;
        debug!(%url, "Deleting knowledge base item");
        let response = self.send(self.request(Method::DELETE, url)).await?;
        read_verdict(response).await
    }

    /// Items closest to `text` by embedding distance, best match first.
    pub async fn kb_find_nearest(&self, text: &str) -> Result<Vec<KnowledgeBaseItem>, ClientError> {
        let url = self.endpoint(&[KB, "find-nearest"])?;
        debug!(%url, "Querying knowledge base");
        let body = serde_json::json!({ "text": text });
        let response = self.send(self.request(Method::POST, url).json(&body)).await?;
        read_json(response).await
    }
}
