pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::Result;
use crate::query::QuerySpec;

/// A page in the note graph. Journal pages carry the day they represent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub journal_day: Option<NaiveDate>,
}

/// A raw block as returned by the store, before task parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub id: String,
    pub text: String,
    pub page_id: String,
    pub page_name: String,
    pub journal_day: Option<NaiveDate>,
}

impl Page {
    pub fn from_json(val: &serde_json::Value) -> Self {
        let id = val
            .get("uuid")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let name = val
            .get("originalName")
            .or_else(|| val.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let journal_day = val
            .get("journalDay")
            .and_then(|v| v.as_u64())
            .and_then(|n| dates::journal_day_to_date(n as u32));
        Self {
            id,
            name,
            journal_day,
        }
    }
}

impl BlockData {
    pub fn from_json(val: &serde_json::Value) -> Self {
        let id = val
            .get("uuid")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let text = val
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let page = val.get("page");
        let page_id = page
            .and_then(|p| p.get("uuid"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let page_name = page
            .and_then(|p| p.get("originalName").or_else(|| p.get("name")))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let journal_day = page
            .and_then(|p| p.get("journalDay"))
            .and_then(|v| v.as_u64())
            .and_then(|n| dates::journal_day_to_date(n as u32));
        Self {
            id,
            text,
            page_id,
            page_name,
            journal_day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertOpts {
    pub is_page_block: bool,
    pub before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Capability set the engine needs from the note graph. Injected rather than
/// reached through a global so tests can substitute the in-memory fake.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get_page(&self, name: &str) -> Result<Option<Page>>;

    async fn create_page(&self, name: &str, journal: bool) -> Result<Page>;

    async fn insert_block(
        &self,
        page_name: &str,
        text: &str,
        opts: InsertOpts,
    ) -> Result<BlockData>;

    async fn query_blocks(&self, spec: &QuerySpec) -> Result<Vec<BlockData>>;

    async fn update_block_text(&self, block_id: &str, text: &str) -> Result<()>;

    async fn notify(&self, level: NotifyLevel, message: &str) -> Result<()>;
}
