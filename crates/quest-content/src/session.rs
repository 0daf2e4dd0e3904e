use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::warn;

use crate::llm::contracts::GatePayload;
use crate::llm::engine::{ContentEngine, ContentError, Generated};
use crate::models::{EducationStatus, GateRequest, PolyPathChoice};

type GateSlot = Arc<OnceCell<Generated<GatePayload>>>;

/// Everything `gen_gate` threads into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GateSceneKey {
    option_name: String,
    work_path: bool,
    education_status: Option<EducationStatus>,
    poly_path_choice: Option<PolyPathChoice>,
}

impl From<&GateRequest> for GateSceneKey {
    fn from(request: &GateRequest) -> Self {
        Self {
            option_name: request.option_name.clone(),
            work_path: request.work_path,
            education_status: request.education_status,
            poly_path_choice: request.poly_path_choice,
        }
    }
}

/// Caller-owned cache of gate scenes for one play session.
///
/// Keyed by the whole [`GateRequest`], so the same option asked for from a
/// different stage or path choice gets its own scene. Concurrent callers
/// asking for the same key share a single generation; failed generations
/// are not stored.
#[derive(Debug, Default)]
pub struct GateSceneCache {
    slots: Mutex<HashMap<GateSceneKey, GateSlot>>,
}

impl GateSceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_generate(
        &self,
        engine: &ContentEngine,
        request: &GateRequest,
    ) -> Result<Generated<GatePayload>, ContentError> {
        let key = GateSceneKey::from(request);
        let slot = self.slot_for(&key);
        match slot.get_or_try_init(|| engine.gen_gate(request)).await {
            Ok(generated) => Ok(generated.clone()),
            Err(err) => {
                self.evict_if_empty(&key, &slot);
                Err(err)
            }
        }
    }

    /// Warms the cache for every option in turn. Failures are logged and skipped.
    pub async fn prefetch(&self, engine: &ContentEngine, requests: &[GateRequest]) -> usize {
        let mut ready = 0;
        for request in requests {
            match self.get_or_generate(engine, request).await {
                Ok(_) => ready += 1,
                Err(err) => warn!(
                    option_name = request.option_name.as_str(),
                    work_path = request.work_path,
                    "gate scene prefetch failed: {err}"
                ),
            }
        }
        ready
    }

    pub fn get(&self, request: &GateRequest) -> Option<Generated<GatePayload>> {
        self.lock_slots()
            .get(&GateSceneKey::from(request))
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots held, including ones with a generation still in flight.
    pub fn slot_count(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn clear(&self) {
        self.lock_slots().clear();
    }

    fn slot_for(&self, key: &GateSceneKey) -> GateSlot {
        self.lock_slots().entry(key.clone()).or_default().clone()
    }

    // A waiter may have filled the slot after our attempt failed; keep it then.
    fn evict_if_empty(&self, key: &GateSceneKey, slot: &GateSlot) {
        let mut slots = self.lock_slots();
        if slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized())
        {
            slots.remove(key);
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<GateSceneKey, GateSlot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GateSceneCache;
    use crate::llm::engine::ContentEngine;
    use crate::models::{EducationStatus, GateRequest, PolyPathChoice};

    #[tokio::test]
    async fn caches_by_option_and_work_path() {
        let engine = ContentEngine::fallback_only();
        let cache = GateSceneCache::new();
        assert!(cache.is_empty());

        let study = GateRequest::new("Digital Design", false);
        cache
            .get_or_generate(&engine, &study)
            .await
            .expect("gate should generate");
        cache
            .get_or_generate(&engine, &GateRequest::new("Digital Design", true))
            .await
            .expect("gate should generate");

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&study).is_some());
        assert!(cache.get(&GateRequest::new("Business Management", false)).is_none());

        cache.clear();
        assert!(cache.get(&study).is_none());
    }

    #[tokio::test]
    async fn stage_and_path_choice_are_part_of_the_key() {
        let engine = ContentEngine::fallback_only();
        let cache = GateSceneCache::new();

        let bare = GateRequest::new("Junior Data Analyst", true);
        let poly_work = GateRequest::new("Junior Data Analyst", true)
            .with_stage(EducationStatus::Poly, Some(PolyPathChoice::Work));
        for request in [&bare, &poly_work] {
            cache
                .get_or_generate(&engine, request)
                .await
                .expect("gate should generate");
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&poly_work).is_some());
        assert!(
            cache
                .get(
                    &GateRequest::new("Junior Data Analyst", true)
                        .with_stage(EducationStatus::Poly, Some(PolyPathChoice::GoToUni))
                )
                .is_none()
        );
    }

    #[tokio::test]
    async fn prefetch_skips_failures_without_keeping_their_slots() {
        let engine = ContentEngine::fallback_only();
        let cache = GateSceneCache::new();

        let ready = cache
            .prefetch(
                &engine,
                &[
                    GateRequest::new("Computer Engineering", false),
                    GateRequest::new("", false),
                    GateRequest::new("Business Management", false),
                ],
            )
            .await;

        assert_eq!(ready, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.slot_count(), 2);
    }
}
