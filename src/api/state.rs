use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::Cache,
    error::AppResult,
    models::{DatasetInfo, Metric, RatingScale},
    services::{load_matrix, NeighborhoodParams, RatingMatrix, RatingSource},
};

/// Engine settings fixed for the lifetime of the service
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineSettings {
    pub scale: RatingScale,
    pub params: NeighborhoodParams,
    pub default_metric: Metric,
}

/// One built matrix together with its metadata
pub struct Dataset {
    pub matrix: RatingMatrix,
    pub info: DatasetInfo,
}

/// Shared application state
///
/// The current dataset sits behind an `Arc` that is swapped on reload, so
/// requests already in flight keep computing against their own snapshot.
#[derive(Clone)]
pub struct AppState {
    dataset: Arc<RwLock<Arc<Dataset>>>,
    source: Arc<dyn RatingSource>,
    pub cache: Option<Cache>,
    pub settings: EngineSettings,
}

impl AppState {
    /// Loads the initial dataset from `source`
    pub async fn load(
        source: Arc<dyn RatingSource>,
        settings: EngineSettings,
        cache: Option<Cache>,
    ) -> AppResult<Self> {
        let dataset = build_dataset(source.as_ref(), settings.scale).await?;

        Ok(Self {
            dataset: Arc::new(RwLock::new(Arc::new(dataset))),
            source,
            cache,
            settings,
        })
    }

    /// Current dataset snapshot; the lock is released before returning
    pub async fn snapshot(&self) -> Arc<Dataset> {
        self.dataset.read().await.clone()
    }

    /// Rebuilds the matrix from the source and swaps it in
    ///
    /// On failure the previous dataset stays active.
    pub async fn reload(&self) -> AppResult<DatasetInfo> {
        let dataset = build_dataset(self.source.as_ref(), self.settings.scale).await?;
        let info = dataset.info.clone();

        *self.dataset.write().await = Arc::new(dataset);

        tracing::info!(generation = %info.generation, "Dataset reloaded");
        Ok(info)
    }

    pub fn source(&self) -> &dyn RatingSource {
        self.source.as_ref()
    }
}

async fn build_dataset(source: &dyn RatingSource, scale: RatingScale) -> AppResult<Dataset> {
    let matrix = load_matrix(source, scale).await?;
    let info = DatasetInfo {
        generation: Uuid::new_v4(),
        source: source.name(),
        loaded_at: Utc::now(),
        user_count: matrix.user_count(),
        item_count: matrix.item_count(),
        rating_count: matrix.rating_count(),
    };

    Ok(Dataset { matrix, info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;
    use crate::services::sources::{MockRatingSource, StaticRatingSource};

    fn source() -> Arc<dyn RatingSource> {
        Arc::new(StaticRatingSource::new(vec![
            Rating::new("u1", "i1", 4.0),
            Rating::new("u2", "i1", 3.0),
            Rating::new("u2", "i2", 5.0),
        ]))
    }

    #[tokio::test]
    async fn test_load_builds_dataset_info() {
        let state = AppState::load(source(), EngineSettings::default(), None)
            .await
            .unwrap();

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.info.user_count, 2);
        assert_eq!(snapshot.info.item_count, 2);
        assert_eq!(snapshot.info.rating_count, 3);
        assert_eq!(snapshot.info.source, "static");
    }

    #[tokio::test]
    async fn test_reload_changes_generation_but_not_old_snapshot() {
        let state = AppState::load(source(), EngineSettings::default(), None)
            .await
            .unwrap();
        let before = state.snapshot().await;

        let info = state.reload().await.unwrap();

        assert_ne!(info.generation, before.info.generation);
        assert_eq!(state.snapshot().await.info.generation, info.generation);
        // The old snapshot is still intact for anyone holding it
        assert_eq!(before.matrix.rating_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_dataset() {
        let mut source = MockRatingSource::new();
        let mut loads = 0;
        source.expect_load().times(2).returning(move || {
            loads += 1;
            if loads == 1 {
                Ok(vec![Rating::new("u1", "i1", 4.0), Rating::new("u2", "i1", 3.0)])
            } else {
                Ok(vec![Rating::new("u1", "i1", 4.0), Rating::new("u1", "i1", 2.0)])
            }
        });
        source.expect_name().returning(|| "mock".to_string());

        let state = AppState::load(Arc::new(source), EngineSettings::default(), None)
            .await
            .unwrap();
        let before = state.snapshot().await.info.generation;

        assert!(state.reload().await.is_err());

        let after = state.snapshot().await;
        assert_eq!(after.info.generation, before);
        assert_eq!(after.matrix.rating_count(), 2);
    }
}
