use serde::{Deserialize, Serialize};

/// A title/link pair extracted from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    pub title: String,
    /// Absolute URL of the detail page, `None` when the heading had no anchor.
    pub link: Option<String>,
}

impl ListingItem {
    pub fn new(title: impl Into<String>, link: Option<String>) -> Self {
        Self {
            title: title.into(),
            link,
        }
    }
}

/// A titled block of free text on a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section: String,
    pub content: String,
}

/// Structured content extracted from a detail page.
///
/// Every field is independently optional; a selector that matches nothing
/// leaves its field `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub company_name: Option<String>,
    pub company_description: Option<String>,
    pub job_pills: Vec<String>,
    pub skills_pills: Vec<String>,
    pub apply_link: Option<String>,
    pub sections: Vec<Section>,
}

/// What happened when a single listing item's detail page was visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DetailOutcome {
    /// A challenge page was served instead of the job.
    Blocked {
        #[serde(flatten)]
        item: ListingItem,
    },
    /// Navigation or extraction failed.
    Failed {
        #[serde(flatten)]
        item: ListingItem,
        error: String,
    },
    /// The page loaded and was extracted.
    Detail {
        #[serde(flatten)]
        item: ListingItem,
        #[serde(flatten)]
        detail: JobDetail,
    },
}

impl DetailOutcome {
    pub fn item(&self) -> &ListingItem {
        match self {
            DetailOutcome::Blocked { item }
            | DetailOutcome::Failed { item, .. }
            | DetailOutcome::Detail { item, .. } => item,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            DetailOutcome::Blocked { .. } => OutcomeKind::Blocked,
            DetailOutcome::Failed { .. } => OutcomeKind::Failed,
            DetailOutcome::Detail { .. } => OutcomeKind::Detail,
        }
    }
}

/// Discriminant of a [`DetailOutcome`], used for tallies and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Detail,
    Blocked,
    Failed,
}

/// Result envelope of a listing crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingBatch {
    pub ok: bool,
    pub count: usize,
    pub jobs: Vec<ListingItem>,
}

/// Result envelope of a detail crawl. `results` is index-aligned with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailBatch {
    pub ok: bool,
    pub count: usize,
    pub results: Vec<DetailOutcome>,
}

/// Envelope returned for a whole-operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: String,
}

impl FailureEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// A rendered document captured from a browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// URL the document was captured from (after redirects).
    pub url: String,
    pub html: String,
}
