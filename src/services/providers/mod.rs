/// Streaming availability providers
///
/// A provider answers "where can I watch this title?" for any [`TitleId`] it
/// can resolve. WatchMode is the only implementation today.
use tokio::task::JoinSet;

use crate::{
    error::{AppError, AppResult},
    models::{StreamingAvailability, TitleId},
};

pub mod watchmode;

pub use watchmode::WatchmodeProvider;

#[async_trait::async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Availability of a single title
    async fn fetch_availability(&self, title_id: &TitleId) -> AppResult<StreamingAvailability>;

    /// Availability of several titles, looked up concurrently
    ///
    /// Results keep the order of `title_ids`. Titles whose lookup failed are
    /// logged and left out; the call only fails when nothing succeeded.
    async fn fetch_availability_batch(
        &self,
        title_ids: Vec<TitleId>,
    ) -> AppResult<Vec<StreamingAvailability>> {
        if title_ids.is_empty() {
            return Ok(Vec::new());
        }

        let requested = title_ids.len();
        let mut lookups = JoinSet::new();
        for (index, title_id) in title_ids.into_iter().enumerate() {
            let provider = self.clone_for_task();
            lookups.spawn(async move {
                let result = provider.fetch_availability(&title_id).await;
                (index, title_id, result)
            });
        }

        let mut found: Vec<(usize, StreamingAvailability)> = Vec::with_capacity(requested);
        let mut failed = 0usize;

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, _, Ok(availability))) => found.push((index, availability)),
                Ok((_, title_id, Err(e))) => {
                    failed += 1;
                    tracing::warn!(
                        title_id = %title_id,
                        provider = self.name(),
                        error = %e,
                        "Availability lookup failed"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, provider = self.name(), "Availability task aborted");
                }
            }
        }

        if found.is_empty() {
            return Err(AppError::ExternalApi(format!(
                "All {} availability lookups failed",
                requested
            )));
        }

        if failed > 0 {
            tracing::warn!(
                requested,
                failed,
                provider = self.name(),
                "Batch availability partially failed"
            );
        }

        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, availability)| availability).collect())
    }

    /// Owned copy that can move into a spawned task
    fn clone_for_task(&self) -> Box<dyn StreamingProvider>;

    /// Short provider name used in logs
    fn name(&self) -> &'static str;
}
