use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;

use crate::cache::{CacheStatus, ViewCache};
use crate::config::UserPrefs;
use crate::dates;
use crate::error::{ErrorInfo, Notice, Result, TodoError};
use crate::query::{classify, QuerySpec, ViewName};
use crate::store::{BlockStore, InsertOpts, NotifyLevel, Page};
use crate::task::{self, Marker, Task};

/// Completion of a background store call, fed back into the engine by the
/// host's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    ViewLoaded {
        view: ViewName,
        generation: u64,
        tasks: Vec<Task>,
    },
    ViewFailed {
        view: ViewName,
        generation: u64,
        error: ErrorInfo,
    },
}

/// Task synchronization engine: view cache, background revalidation and
/// optimistic mutations against an injected block store.
///
/// All cache transitions happen on the caller's thread; the only suspension
/// points are store calls. Background queries report back through the
/// message channel handed out at construction.
pub struct TodoEngine<S> {
    store: S,
    prefs: UserPrefs,
    today: NaiveDate,
    cache: ViewCache,
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl<S: BlockStore + Clone + Send + Sync + 'static> TodoEngine<S> {
    pub fn new(store: S, prefs: UserPrefs) -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        Self::with_today(store, prefs, Local::now().date_naive())
    }

    /// Construct with an explicit "today". The host refreshes it across
    /// midnight via [`set_today`](Self::set_today).
    pub fn with_today(
        store: S,
        prefs: UserPrefs,
        today: NaiveDate,
    ) -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                prefs,
                today,
                cache: ViewCache::new(),
                tx,
            },
            rx,
        )
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        if self.today != today {
            self.today = today;
            self.cache.invalidate_all();
        }
    }

    /// Last known tasks for a view, returned immediately; schedules a
    /// background revalidation when the entry is stale and none is in
    /// flight.
    pub fn get_view(&mut self, view: ViewName) -> &[Task] {
        self.spawn_revalidate(view);
        self.cache.data(view)
    }

    pub fn view_status(&self, view: ViewName) -> CacheStatus {
        self.cache.status(view)
    }

    /// Invalidate every view and refetch. Used when the panel becomes
    /// visible again after the graph may have changed underneath it.
    pub fn refresh_all(&mut self) {
        self.cache.invalidate_all();
        for view in ViewName::ALL {
            self.spawn_revalidate(view);
        }
    }

    pub fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::ViewLoaded {
                view,
                generation,
                tasks,
            } => {
                if !self.cache.apply_success(view, generation, tasks) {
                    log::debug!("discarded superseded result for {} view", view.as_str());
                }
            }
            EngineMessage::ViewFailed {
                view,
                generation,
                error,
            } => {
                if self.cache.apply_failure(view, generation) {
                    log::warn!(
                        "revalidation of {} view failed: {:?}",
                        view.as_str(),
                        error
                    );
                    self.spawn_notify(Notice::from_error_info(&error));
                }
            }
        }
    }

    fn spawn_revalidate(&mut self, view: ViewName) {
        let Some(generation) = self.cache.begin_revalidation(view) else {
            return;
        };
        log::debug!(
            "revalidating {} view (generation {})",
            view.as_str(),
            generation
        );
        let store = self.store.clone();
        let spec = QuerySpec::for_view(view, self.today);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match store.query_blocks(&spec).await {
                Ok(blocks) => {
                    let tasks = blocks.iter().filter_map(Task::parse).collect();
                    let _ = tx.send(EngineMessage::ViewLoaded {
                        view,
                        generation,
                        tasks,
                    });
                }
                Err(e) => {
                    let _ = tx.send(EngineMessage::ViewFailed {
                        view,
                        generation,
                        error: ErrorInfo::from_todo_error(&e),
                    });
                }
            }
        });
    }

    fn spawn_notify(&self, notice: Notice) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let _ = store.notify(NotifyLevel::Error, &notice.as_toast()).await;
        });
    }

    /// Flip a task's completion, optimistically in every cached view, then
    /// rewrite the marker in the store. Failure reverts; success invalidates
    /// all views so the completed task drops out everywhere.
    pub async fn toggle_completion(&mut self, task_id: &str) -> Result<()> {
        let task = self
            .cache
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| TodoError::TaskNotFound(task_id.to_string()))?;

        let new_marker = if task.completed {
            self.prefs.todo_marker()
        } else {
            Marker::Done
        };
        let new_raw = task::rewrite_marker(&task.raw, new_marker);
        let was_completed = task.completed;

        self.cache.update_task(task_id, |t| {
            t.completed = !was_completed;
            t.marker = new_marker;
            t.raw = new_raw.clone();
        });

        match self.store.update_block_text(task_id, &new_raw).await {
            Ok(()) => {
                // the forced refetch restores the authoritative state, so
                // any store-side normalization of the rewrite is picked up
                self.cache.invalidate_all();
                for view in ViewName::ALL {
                    self.spawn_revalidate(view);
                }
                Ok(())
            }
            Err(e) => {
                self.cache.update_task(task_id, |t| {
                    t.completed = was_completed;
                    t.marker = task.marker;
                    t.raw = task.raw.clone();
                });
                self.spawn_notify(Notice::from_error_info(&ErrorInfo::from_write_failure(&e)));
                Err(e)
            }
        }
    }

    /// Reschedule (or unschedule) a task, optimistically moving it between
    /// cached views, then rewrite the date annotation in the store.
    pub async fn set_scheduled(
        &mut self,
        task_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<()> {
        let task = self
            .cache
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| TodoError::TaskNotFound(task_id.to_string()))?;

        let new_raw = task::rewrite_scheduled(&task.raw, date);
        let snapshot = self.cache.snapshot();

        let mut updated = task.clone();
        updated.scheduled = date;
        updated.raw = new_raw.clone();

        let mut affected = self.cache.remove_task(task_id);
        let target = classify(&updated, self.today);
        if let Some(view) = target {
            self.cache.insert_task(view, updated);
            if !affected.contains(&view) {
                affected.push(view);
            }
        }

        match self.store.update_block_text(task_id, &new_raw).await {
            Ok(()) => {
                // re-pull authoritative categorization, guarding against
                // drift between local and store-side normalization
                for view in affected {
                    self.cache.invalidate(view);
                    self.spawn_revalidate(view);
                }
                Ok(())
            }
            Err(e) => {
                self.cache.restore(snapshot);
                self.spawn_notify(Notice::from_error_info(&ErrorInfo::from_write_failure(&e)));
                Err(e)
            }
        }
    }

    /// Page lookup that surfaces a notice when the store cannot answer,
    /// so a failed creation is never silent.
    async fn lookup_page(&self, name: &str) -> Result<Option<Page>> {
        match self.store.get_page(name).await {
            Ok(page) => Ok(page),
            Err(e) => {
                self.spawn_notify(Notice::from_error_info(&ErrorInfo::from_todo_error(&e)));
                Err(e)
            }
        }
    }

    /// Append a new task to today's journal page, creating the page only on
    /// genuine absence (get before create, one re-get on a create race).
    pub async fn create_task(&mut self, content: &str) -> Result<()> {
        let page_name = dates::format_user_date(self.today, &self.prefs.preferred_date_format);

        let page = match self.lookup_page(&page_name).await? {
            Some(page) => page,
            None => match self.store.create_page(&page_name, true).await {
                Ok(page) => page,
                Err(create_err) => match self.lookup_page(&page_name).await? {
                    Some(page) => {
                        log::debug!("create of {} lost a race, reusing existing page", page_name);
                        page
                    }
                    None => {
                        self.spawn_notify(Notice::from_error_info(&ErrorInfo::PageConflict(
                            page_name.clone(),
                        )));
                        return Err(create_err);
                    }
                },
            },
        };

        let text = format!("{} {}", self.prefs.todo_marker().as_str(), content.trim());
        match self
            .store
            .insert_block(
                &page.name,
                &text,
                InsertOpts {
                    is_page_block: true,
                    before: false,
                },
            )
            .await
        {
            Ok(_) => {
                self.cache.invalidate(ViewName::Today);
                self.spawn_revalidate(ViewName::Today);
                Ok(())
            }
            Err(e) => {
                self.spawn_notify(Notice::from_error_info(&ErrorInfo::from_write_failure(&e)));
                Err(e)
            }
        }
    }
}
