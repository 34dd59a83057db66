//! # Source Catalog
//!
//! Read-only access to data source maturity records.
//!
//! - `SourceLookup` is the only capability the chat core needs (`find_by_id`).
//! - `StaticCatalog` is the in-memory demo catalog used by the dashboard,
//!   with search/min-score filtering and the owner selector pagination.

use serde::{Deserialize, Serialize};

/// Owner selector shows this many sources per page.
pub const OWNED_PAGE_SIZE: usize = 5;

/// Sub-scores of a source, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDetails {
    pub reliability: u8,
    pub accuracy: u8,
    pub completeness: u8,
}

/// A data source with its overall maturity index.
///
/// `score` is stored as-is and is not derived from `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub score: u8,
    pub details: SourceDetails,
}

impl Source {
    pub fn new(
        id: &str,
        name: &str,
        owner: &str,
        score: u8,
        (reliability, accuracy, completeness): (u8, u8, u8),
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            score: score.min(100),
            details: SourceDetails {
                reliability: reliability.min(100),
                accuracy: accuracy.min(100),
                completeness: completeness.min(100),
            },
        }
    }
}

/// Lookup collaborator injected into the chat transport.
pub trait SourceLookup: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<Source>;
}

/// One page of the owner source selector.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedPage {
    pub page: usize,
    pub total_pages: usize,
    pub sources: Vec<Source>,
}

/// Static, process-lifetime catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    sources: Vec<Source>,
    owned_ids: Vec<String>,
}

impl StaticCatalog {
    pub fn new(sources: Vec<Source>, owned_ids: Vec<String>) -> Self {
        Self { sources, owned_ids }
    }

    /// Built-in demo data shown by the dashboard.
    pub fn demo() -> Self {
        Self::new(
            vec![
                Source::new("1", "CRM system", "Sales department", 85, (90, 80, 85)),
                Source::new(
                    "2",
                    "Financial reporting",
                    "Finance department",
                    72,
                    (75, 70, 71),
                ),
                Source::new(
                    "3",
                    "Customer base",
                    "Marketing department",
                    93,
                    (95, 92, 92),
                ),
                Source::new(
                    "4",
                    "Inventory system",
                    "Logistics department",
                    68,
                    (65, 70, 69),
                ),
                Source::new("5", "HR data", "HR department", 78, (80, 75, 79)),
            ],
            vec!["1".to_string(), "4".to_string()],
        )
    }

    pub fn all(&self) -> &[Source] {
        &self.sources
    }

    /// Case-insensitive substring match on name or owner, plus `score >= min_score`.
    pub fn filter(&self, search: &str, min_score: u8) -> Vec<Source> {
        let needle = search.trim().to_lowercase();
        self.sources
            .iter()
            .filter(|s| {
                let matches_search = needle.is_empty()
                    || s.name.to_lowercase().contains(&needle)
                    || s.owner.to_lowercase().contains(&needle);
                matches_search && s.score >= min_score
            })
            .cloned()
            .collect()
    }

    /// Sources owned by the current user, in catalog order.
    pub fn owned(&self) -> Vec<Source> {
        self.owned_ids
            .iter()
            .filter_map(|id| self.find_by_id(id))
            .collect()
    }

    pub fn owned_ids(&self) -> &[String] {
        &self.owned_ids
    }

    /// Owner selector page: name filter, then `OWNED_PAGE_SIZE` per page.
    /// A page past the end is clamped to the last page.
    pub fn owned_page(&self, search: &str, page: usize) -> OwnedPage {
        let needle = search.trim().to_lowercase();
        let filtered: Vec<Source> = self
            .owned()
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect();

        let total_pages = filtered.len().div_ceil(OWNED_PAGE_SIZE);
        let page = page.min(total_pages.saturating_sub(1));
        let sources = filtered
            .into_iter()
            .skip(page * OWNED_PAGE_SIZE)
            .take(OWNED_PAGE_SIZE)
            .collect();

        OwnedPage {
            page,
            total_pages,
            sources,
        }
    }
}

impl SourceLookup for StaticCatalog {
    fn find_by_id(&self, id: &str) -> Option<Source> {
        self.sources.iter().find(|s| s.id == id).cloned()
    }
}
