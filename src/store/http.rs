use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::HostConfig;
use crate::error::{Result, TodoError};
use crate::query::QuerySpec;
use crate::store::{BlockData, BlockStore, InsertOpts, NotifyLevel, Page};

#[derive(Debug, Serialize)]
struct ApiCall {
    method: String,
    args: Vec<serde_json::Value>,
}

/// Adapter speaking the host's local HTTP API: a single `/api` endpoint
/// taking `{method, args}` calls with bearer-token auth.
#[derive(Clone)]
pub struct HostClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HostClient {
    pub fn new(endpoint: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(&config.endpoint, &config.token)
    }

    async fn call(&self, method: &str, args: Vec<serde_json::Value>) -> Result<serde_json::Value> {
        let req = ApiCall {
            method: method.to_string(),
            args,
        };
        let resp = self
            .client
            .post(format!("{}/api", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(TodoError::Api { status, message });
        }

        let body = resp.json::<serde_json::Value>().await?;
        Ok(body)
    }
}

#[async_trait]
impl BlockStore for HostClient {
    async fn get_page(&self, name: &str) -> Result<Option<Page>> {
        let result = self
            .call("logseq.Editor.getPage", vec![serde_json::json!(name)])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(Page::from_json(&result)))
    }

    async fn create_page(&self, name: &str, journal: bool) -> Result<Page> {
        let result = self
            .call(
                "logseq.Editor.createPage",
                vec![
                    serde_json::json!(name),
                    serde_json::json!({}),
                    serde_json::json!({ "journal": journal, "redirect": false }),
                ],
            )
            .await?;
        if result.is_null() {
            return Err(TodoError::PageConflict(name.to_string()));
        }
        Ok(Page::from_json(&result))
    }

    async fn insert_block(
        &self,
        page_name: &str,
        text: &str,
        opts: InsertOpts,
    ) -> Result<BlockData> {
        let result = self
            .call(
                "logseq.Editor.insertBlock",
                vec![
                    serde_json::json!(page_name),
                    serde_json::json!(text),
                    serde_json::json!({
                        "isPageBlock": opts.is_page_block,
                        "before": opts.before,
                    }),
                ],
            )
            .await?;
        Ok(BlockData::from_json(&result))
    }

    async fn query_blocks(&self, spec: &QuerySpec) -> Result<Vec<BlockData>> {
        let result = self
            .call("todo-sync.query", vec![serde_json::to_value(spec)?])
            .await?;
        let blocks = result
            .as_array()
            .map(|arr| arr.iter().map(BlockData::from_json).collect())
            .unwrap_or_default();
        Ok(blocks)
    }

    async fn update_block_text(&self, block_id: &str, text: &str) -> Result<()> {
        self.call(
            "logseq.Editor.updateBlock",
            vec![serde_json::json!(block_id), serde_json::json!(text)],
        )
        .await?;
        Ok(())
    }

    async fn notify(&self, level: NotifyLevel, message: &str) -> Result<()> {
        self.call(
            "logseq.UI.showMsg",
            vec![serde_json::json!(message), serde_json::json!(level.as_str())],
        )
        .await?;
        Ok(())
    }
}
