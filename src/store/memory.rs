use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::error::{Result, TodoError};
use crate::query::QuerySpec;
use crate::store::{BlockData, BlockStore, InsertOpts, NotifyLevel, Page};
use crate::task::Task;

#[derive(Default)]
struct Inner {
    pages: Vec<Page>,
    blocks: Vec<BlockData>,
    /// Journal page names the host would resolve to a day. The real host
    /// derives this from the page name; the fake is told explicitly.
    journal_names: HashMap<String, NaiveDate>,
    notices: Vec<(NotifyLevel, String)>,
    next_id: u64,
    fail_queries: bool,
    fail_writes: bool,
    fail_create_page: bool,
    fail_get_page: bool,
}

/// In-memory block store. Page lookup is case-insensitive, matching the
/// host's behavior, which is what makes the get-before-create path of
/// task creation testable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_page(&self, name: &str, journal_day: Option<NaiveDate>) -> Page {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let page = Page {
            id: format!("page-{}", inner.next_id),
            name: name.to_string(),
            journal_day,
        };
        inner.pages.push(page.clone());
        page
    }

    pub async fn add_block(&self, page: &Page, text: &str) -> BlockData {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let block = BlockData {
            id: format!("block-{}", inner.next_id),
            text: text.to_string(),
            page_id: page.id.clone(),
            page_name: page.name.clone(),
            journal_day: page.journal_day,
        };
        inner.blocks.push(block.clone());
        block
    }

    /// Teach the fake which day a journal page name stands for, so that
    /// `create_page(name, journal: true)` can stamp the page like the host.
    pub async fn register_journal_name(&self, name: &str, day: NaiveDate) {
        self.inner
            .lock()
            .await
            .journal_names
            .insert(name.to_lowercase(), day);
    }

    pub async fn set_fail_queries(&self, fail: bool) {
        self.inner.lock().await.fail_queries = fail;
    }

    pub async fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().await.fail_writes = fail;
    }

    pub async fn set_fail_create_page(&self, fail: bool) {
        self.inner.lock().await.fail_create_page = fail;
    }

    pub async fn set_fail_get_page(&self, fail: bool) {
        self.inner.lock().await.fail_get_page = fail;
    }

    pub async fn block_text(&self, id: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .blocks
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.text.clone())
    }

    pub async fn notices(&self) -> Vec<(NotifyLevel, String)> {
        self.inner.lock().await.notices.clone()
    }

    pub async fn page_count(&self) -> usize {
        self.inner.lock().await.pages.len()
    }

    pub async fn block_count(&self) -> usize {
        self.inner.lock().await.blocks.len()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn get_page(&self, name: &str) -> Result<Option<Page>> {
        let inner = self.inner.lock().await;
        if inner.fail_get_page {
            return Err(TodoError::Api {
                status: 503,
                message: "getPage failed".into(),
            });
        }
        Ok(inner
            .pages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn create_page(&self, name: &str, journal: bool) -> Result<Page> {
        let mut inner = self.inner.lock().await;
        if inner.fail_create_page {
            return Err(TodoError::Api {
                status: 500,
                message: "createPage failed".into(),
            });
        }
        if inner
            .pages
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
        {
            return Err(TodoError::PageConflict(name.to_string()));
        }
        let journal_day = if journal {
            inner.journal_names.get(&name.to_lowercase()).copied()
        } else {
            None
        };
        inner.next_id += 1;
        let page = Page {
            id: format!("page-{}", inner.next_id),
            name: name.to_string(),
            journal_day,
        };
        inner.pages.push(page.clone());
        Ok(page)
    }

    async fn insert_block(
        &self,
        page_name: &str,
        text: &str,
        _opts: InsertOpts,
    ) -> Result<BlockData> {
        let mut inner = self.inner.lock().await;
        if inner.fail_writes {
            return Err(TodoError::Api {
                status: 500,
                message: "insertBlock failed".into(),
            });
        }
        let page = inner
            .pages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(page_name))
            .cloned()
            .ok_or_else(|| TodoError::Api {
                status: 404,
                message: format!("no such page: {}", page_name),
            })?;
        inner.next_id += 1;
        let block = BlockData {
            id: format!("block-{}", inner.next_id),
            text: text.to_string(),
            page_id: page.id,
            page_name: page.name,
            journal_day: page.journal_day,
        };
        inner.blocks.push(block.clone());
        Ok(block)
    }

    async fn query_blocks(&self, spec: &QuerySpec) -> Result<Vec<BlockData>> {
        let inner = self.inner.lock().await;
        if inner.fail_queries {
            return Err(TodoError::Api {
                status: 503,
                message: "store unavailable".into(),
            });
        }
        Ok(inner
            .blocks
            .iter()
            .filter(|b| Task::parse(b).is_some_and(|t| spec.matches(&t)))
            .cloned()
            .collect())
    }

    async fn update_block_text(&self, block_id: &str, text: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_writes {
            return Err(TodoError::Api {
                status: 500,
                message: "updateBlock failed".into(),
            });
        }
        let block = inner
            .blocks
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or_else(|| TodoError::Api {
                status: 404,
                message: format!("no such block: {}", block_id),
            })?;
        block.text = text.to_string();
        Ok(())
    }

    async fn notify(&self, level: NotifyLevel, message: &str) -> Result<()> {
        self.inner
            .lock()
            .await
            .notices
            .push((level, message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ViewName;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn get_page_is_case_insensitive() {
        let store = MemoryStore::new();
        store.add_page("Mar 5th, 2024", Some(day(2024, 3, 5))).await;

        let page = store.get_page("mar 5th, 2024").await.unwrap().unwrap();
        assert_eq!(page.name, "Mar 5th, 2024");
    }

    #[tokio::test]
    async fn create_page_conflicts_on_existing_casing_variant() {
        let store = MemoryStore::new();
        store.add_page("Mar 5th, 2024", None).await;

        let err = store.create_page("MAR 5TH, 2024", true).await;
        assert!(matches!(err, Err(TodoError::PageConflict(_))));
    }

    #[tokio::test]
    async fn create_journal_page_uses_registered_day() {
        let store = MemoryStore::new();
        store
            .register_journal_name("Mar 5th, 2024", day(2024, 3, 5))
            .await;

        let page = store.create_page("Mar 5th, 2024", true).await.unwrap();
        assert_eq!(page.journal_day, Some(day(2024, 3, 5)));
    }

    #[tokio::test]
    async fn query_blocks_applies_the_spec() {
        let store = MemoryStore::new();
        let journal = store.add_page("Mar 5th, 2024", Some(day(2024, 3, 5))).await;
        let other = store.add_page("Projects", None).await;
        store.add_block(&journal, "TODO on today's page").await;
        store.add_block(&other, "TODO anytime").await;
        store.add_block(&other, "DONE finished").await;
        store.add_block(&other, "not a task").await;

        let today = QuerySpec::for_view(ViewName::Today, day(2024, 3, 5));
        let blocks = store.query_blocks(&today).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "TODO on today's page");

        let anytime = QuerySpec::for_view(ViewName::Anytime, day(2024, 3, 5));
        let blocks = store.query_blocks(&anytime).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "TODO anytime");
    }

    #[tokio::test]
    async fn failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_queries(true).await;
        let spec = QuerySpec::for_view(ViewName::Today, day(2024, 3, 5));
        assert!(store.query_blocks(&spec).await.is_err());

        store.set_fail_writes(true).await;
        assert!(store.update_block_text("nope", "x").await.is_err());

        store.set_fail_get_page(true).await;
        assert!(store.get_page("anything").await.is_err());
    }

    #[tokio::test]
    async fn update_block_text_rewrites_in_place() {
        let store = MemoryStore::new();
        let page = store.add_page("Projects", None).await;
        let block = store.add_block(&page, "TODO Buy milk").await;

        store
            .update_block_text(&block.id, "DONE Buy milk")
            .await
            .unwrap();
        assert_eq!(
            store.block_text(&block.id).await.unwrap(),
            "DONE Buy milk"
        );
    }

    #[tokio::test]
    async fn insert_block_requires_page() {
        let store = MemoryStore::new();
        let err = store
            .insert_block(
                "Nowhere",
                "TODO x",
                InsertOpts {
                    is_page_block: true,
                    before: false,
                },
            )
            .await;
        assert!(matches!(err, Err(TodoError::Api { status: 404, .. })));
    }

    #[tokio::test]
    async fn notify_is_captured() {
        let store = MemoryStore::new();
        store.notify(NotifyLevel::Error, "boom").await.unwrap();
        let notices = store.notices().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].1, "boom");
    }
}
