use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// The four derived views. Their union partitions the incomplete tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewName {
    Today,
    Expired,
    Scheduled,
    Anytime,
}

impl ViewName {
    pub const ALL: [ViewName; 4] = [
        ViewName::Today,
        ViewName::Expired,
        ViewName::Scheduled,
        ViewName::Anytime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Expired => "expired",
            Self::Scheduled => "scheduled",
            Self::Anytime => "anytime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "date")]
pub enum ScheduledFilter {
    Any,
    Absent,
    On(NaiveDate),
    Before(NaiveDate),
    After(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "date")]
pub enum JournalFilter {
    Any,
    On(NaiveDate),
    NotOn(NaiveDate),
}

/// One conjunctive constraint over marker state, scheduled date and the
/// containing page's journal day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClause {
    pub completed: bool,
    pub scheduled: ScheduledFilter,
    pub journal: JournalFilter,
}

/// Declarative filter consumed by the store adapter: a union of clauses.
/// The builder never executes anything; for a fixed (view, day) the spec is
/// always identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub clauses: Vec<QueryClause>,
}

impl QuerySpec {
    pub fn for_view(view: ViewName, today: NaiveDate) -> Self {
        let clauses = match view {
            // Scheduled for today, or living on today's journal page
            ViewName::Today => vec![
                QueryClause {
                    completed: false,
                    scheduled: ScheduledFilter::On(today),
                    journal: JournalFilter::Any,
                },
                QueryClause {
                    completed: false,
                    scheduled: ScheduledFilter::Any,
                    journal: JournalFilter::On(today),
                },
            ],
            // The journal exclusions below keep the four views disjoint:
            // anything on today's page belongs to Today alone
            ViewName::Expired => vec![QueryClause {
                completed: false,
                scheduled: ScheduledFilter::Before(today),
                journal: JournalFilter::NotOn(today),
            }],
            ViewName::Scheduled => vec![QueryClause {
                completed: false,
                scheduled: ScheduledFilter::After(today),
                journal: JournalFilter::NotOn(today),
            }],
            ViewName::Anytime => vec![QueryClause {
                completed: false,
                scheduled: ScheduledFilter::Absent,
                journal: JournalFilter::NotOn(today),
            }],
        };
        Self { clauses }
    }

    /// Reference evaluation of the spec against a parsed task. The real
    /// store may evaluate natively; the in-memory store and the partition
    /// tests both go through this.
    pub fn matches(&self, task: &Task) -> bool {
        self.clauses.iter().any(|c| c.matches(task))
    }
}

impl QueryClause {
    pub fn matches(&self, task: &Task) -> bool {
        if task.completed != self.completed {
            return false;
        }
        let scheduled_ok = match self.scheduled {
            ScheduledFilter::Any => true,
            ScheduledFilter::Absent => task.scheduled.is_none(),
            ScheduledFilter::On(d) => task.scheduled == Some(d),
            ScheduledFilter::Before(d) => task.scheduled.is_some_and(|s| s < d),
            ScheduledFilter::After(d) => task.scheduled.is_some_and(|s| s > d),
        };
        let journal_ok = match self.journal {
            JournalFilter::Any => true,
            JournalFilter::On(d) => task.journal_day == Some(d),
            JournalFilter::NotOn(d) => task.journal_day != Some(d),
        };
        scheduled_ok && journal_ok
    }
}

/// Map an incomplete task to the single view it belongs to. Completed tasks
/// belong to no view. Today wins over every other view.
pub fn classify(task: &Task, today: NaiveDate) -> Option<ViewName> {
    if task.completed {
        return None;
    }
    if task.scheduled == Some(today) || task.journal_day == Some(today) {
        return Some(ViewName::Today);
    }
    match task.scheduled {
        Some(d) if d < today => Some(ViewName::Expired),
        Some(_) => Some(ViewName::Scheduled),
        None => Some(ViewName::Anytime),
    }
}
