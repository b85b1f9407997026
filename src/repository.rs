use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Analysis, AnalysisEntry};

/// AnalysisRepository
///
/// Persistence contract for analyses. Handlers only see `Arc<dyn AnalysisRepository>`,
/// so tests can swap in their own implementation.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn insert(&self, id: String, analysis: Analysis);
    async fn get(&self, id: &str) -> Option<Analysis>;
    // Newest first.
    async fn list_for_user(&self, user_id: &str) -> Vec<AnalysisEntry>;
    // Newest first.
    async fn list_all(&self) -> Vec<AnalysisEntry>;
}

pub type RepositoryState = Arc<dyn AnalysisRepository>;

/// InMemoryRepository
///
/// Process-lifetime store. Everything is lost on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    analyses: RwLock<HashMap<String, Analysis>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut entries: Vec<AnalysisEntry>) -> Vec<AnalysisEntry> {
        entries.sort_by(|a, b| {
            b.analysis
                .timestamp
                .cmp(&a.analysis.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryRepository {
    async fn insert(&self, id: String, analysis: Analysis) {
        self.analyses.write().await.insert(id, analysis);
    }

    async fn get(&self, id: &str) -> Option<Analysis> {
        self.analyses.read().await.get(id).cloned()
    }

    async fn list_for_user(&self, user_id: &str) -> Vec<AnalysisEntry> {
        let entries = self
            .analyses
            .read()
            .await
            .iter()
            .filter(|(_, analysis)| analysis.user_id == user_id)
            .map(|(id, analysis)| AnalysisEntry {
                id: id.clone(),
                analysis: analysis.clone(),
            })
            .collect();
        Self::newest_first(entries)
    }

    async fn list_all(&self) -> Vec<AnalysisEntry> {
        let entries = self
            .analyses
            .read()
            .await
            .iter()
            .map(|(id, analysis)| AnalysisEntry {
                id: id.clone(),
                analysis: analysis.clone(),
            })
            .collect();
        Self::newest_first(entries)
    }
}
