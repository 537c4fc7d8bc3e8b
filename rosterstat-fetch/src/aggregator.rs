//! Per-character fan-out and merge.
//!
//! The aggregator runs every source fetcher for one character concurrently,
//! waits for all of them, and merges the successful partial records. A failed
//! source never fails the character: its fields stay absent and the error is
//! recorded.
//!
//! When a pass leaves both item level and combat-log data absent and at least
//! one source failed with a recoverable error, the failed sources are retried
//! as a whole, up to `max_extra_passes` more times.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use rosterstat_core::{
    CharacterRecord, ErrorKind, PartialRecord, RosterEntry, SourceFailure, SourceKind,
};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelSignal;
use crate::context::FetchContext;
use crate::error::FetchError;
use crate::source::SourceFetcher;

// ============================================================================
// Character Outcome
// ============================================================================

/// The merged record for one character and the failures behind it.
#[derive(Debug, Clone)]
pub struct CharacterOutcome {
    /// Merged record.
    pub record: CharacterRecord,
    /// One entry per source that ended in failure.
    pub failures: Vec<SourceFailure>,
}

impl CharacterOutcome {
    /// Returns the first failure that should abort the whole run.
    pub fn run_fatal_failure(&self) -> Option<&SourceFailure> {
        self.failures.iter().find(|f| f.kind.is_run_fatal())
    }
}

// ============================================================================
// Character Aggregator
// ============================================================================

/// Fans out every configured source for one character.
pub struct CharacterAggregator {
    sources: Vec<Arc<dyn SourceFetcher>>,
}

impl CharacterAggregator {
    /// Creates an aggregator over the given sources.
    pub fn new(sources: Vec<Arc<dyn SourceFetcher>>) -> Self {
        Self { sources }
    }

    /// Returns the number of configured sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no source is configured.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns the configured source kinds.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    /// Fetches and merges every source for `entry`.
    ///
    /// Sources still in flight when `cancel` fires are recorded as
    /// [`ErrorKind::Cancelled`].
    #[instrument(skip_all, fields(character = %entry.label()))]
    pub async fn aggregate(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
        cancel: &CancelSignal,
    ) -> CharacterOutcome {
        let max_passes = ctx.settings.max_extra_passes.saturating_add(1);
        let mut partials: BTreeMap<SourceKind, PartialRecord> = BTreeMap::new();
        let mut errors: BTreeMap<SourceKind, FetchError> = BTreeMap::new();
        let mut pending: Vec<&Arc<dyn SourceFetcher>> = self.sources.iter().collect();
        let mut passes = 0;

        loop {
            passes += 1;
            debug!(pass = passes, sources = pending.len(), "Fetching sources");

            let results = join_all(
                pending
                    .iter()
                    .map(|source| fetch_source(source.as_ref(), entry, ctx, cancel)),
            )
            .await;

            for (source, result) in pending.iter().zip(results) {
                let kind = source.kind();
                match result {
                    Ok(partial) => {
                        debug!(
                            source = %source.id(),
                            attempts = partial.attempts,
                            "Source succeeded"
                        );
                        errors.remove(&kind);
                        partials.insert(kind, partial);
                    }
                    Err(error) => {
                        warn!(source = %source.id(), error = %error, "Source failed");
                        errors.insert(kind, error);
                    }
                }
            }

            let record =
                CharacterRecord::merge(entry, partials.values(), failed_kinds(&errors), passes);

            if passes >= max_passes
                || cancel.is_cancelled()
                || !needs_another_pass(&record, &errors)
            {
                info!(
                    passes,
                    failed = errors.len(),
                    complete = record.is_complete(),
                    "Character aggregated"
                );
                return CharacterOutcome {
                    failures: failures_for(entry, &errors),
                    record,
                };
            }

            pending = self
                .sources
                .iter()
                .filter(|s| {
                    errors
                        .get(&s.kind())
                        .is_some_and(|e| e.kind().is_recoverable())
                })
                .collect();

            info!(
                pass = passes,
                retrying = pending.len(),
                delay_ms = u64::try_from(ctx.settings.character_retry_delay.as_millis())
                    .unwrap_or(u64::MAX),
                "No item level or logs, retrying character"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                () = tokio::time::sleep(ctx.settings.character_retry_delay) => {}
            }
        }
    }
}

impl std::fmt::Debug for CharacterAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterAggregator")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Runs one fetcher, giving up as soon as the run is cancelled.
async fn fetch_source(
    source: &dyn SourceFetcher,
    entry: &RosterEntry,
    ctx: &FetchContext,
    cancel: &CancelSignal,
) -> Result<PartialRecord, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = source.fetch(entry, ctx) => result,
    }
}

/// True when the character has neither item level nor logs and a retry could help.
fn needs_another_pass(
    record: &CharacterRecord,
    errors: &BTreeMap<SourceKind, FetchError>,
) -> bool {
    if record.item_level.is_some() || record.log_performance.is_some() {
        return false;
    }
    let kinds: Vec<ErrorKind> = errors.values().map(FetchError::kind).collect();
    kinds.iter().any(ErrorKind::is_recoverable) && !kinds.iter().any(ErrorKind::is_run_fatal)
}

fn failed_kinds(errors: &BTreeMap<SourceKind, FetchError>) -> BTreeMap<SourceKind, ErrorKind> {
    errors.iter().map(|(source, e)| (*source, e.kind())).collect()
}

fn failures_for(
    entry: &RosterEntry,
    errors: &BTreeMap<SourceKind, FetchError>,
) -> Vec<SourceFailure> {
    errors
        .iter()
        .map(|(source, error)| SourceFailure {
            character: entry.name.clone(),
            server: entry.server_slug.clone(),
            source: *source,
            kind: error.kind(),
            message: error.to_string(),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rosterstat_core::{CombatLogData, MythicPlusData, ProfileData, Role, SourcePayload};

    use crate::cancel;
    use crate::context::FetchSettings;

    type Script = Box<dyn Fn(u32) -> Result<SourcePayload, FetchError> + Send + Sync>;

    struct ScriptedSource {
        kind: SourceKind,
        calls: AtomicU32,
        delay: Duration,
        script: Script,
    }

    impl ScriptedSource {
        fn new(
            kind: SourceKind,
            script: impl Fn(u32) -> Result<SourcePayload, FetchError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
                script: Box::new(script),
            })
        }

        fn slow(kind: SourceKind, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicU32::new(0),
                delay,
                script: Box::new(|_| Ok(SourcePayload::MythicPlus(MythicPlusData::default()))),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceFetcher for ScriptedSource {
        fn id(&self) -> &str {
            self.kind.as_str()
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(
            &self,
            _entry: &RosterEntry,
            _ctx: &FetchContext,
        ) -> Result<PartialRecord, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.script)(call).map(|payload| PartialRecord::new(payload, 1))
        }
    }

    fn entry() -> RosterEntry {
        RosterEntry::new("Alpha", "azshara", Role::Damage, "Mage")
    }

    fn ctx() -> FetchContext {
        FetchContext::with_settings(
            FetchSettings::default().with_character_retries(2, Duration::from_secs(2)),
        )
        .unwrap()
    }

    fn profile(spec: &str, item_level: f64) -> SourcePayload {
        SourcePayload::Profile(ProfileData {
            spec: Some(spec.to_string()),
            item_level: Some(item_level),
            equipment: Some(Vec::new()),
        })
    }

    fn logs(spec: &str, best: f64) -> SourcePayload {
        SourcePayload::CombatLog(CombatLogData {
            metric: "dps".to_string(),
            has_logs: true,
            spec: Some(spec.to_string()),
            best_average: Some(best),
            ..CombatLogData::default()
        })
    }

    fn mplus(score: f64) -> SourcePayload {
        SourcePayload::MythicPlus(MythicPlusData {
            score: Some(score),
            season: Some("season-tww-1".to_string()),
        })
    }

    #[tokio::test]
    async fn test_all_sources_succeed() {
        let aggregator = CharacterAggregator::new(vec![
            ScriptedSource::new(SourceKind::Profile, |_| Ok(profile("Fire", 639.4))),
            ScriptedSource::new(SourceKind::MythicPlus, |_| Ok(mplus(2875.5))),
            ScriptedSource::new(SourceKind::CombatLog, |_| Ok(logs("Frost", 91.2))),
        ]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        let record = outcome.record;
        assert!(outcome.failures.is_empty());
        assert!(record.is_complete());
        assert_eq!(record.item_level, Some(639.4));
        assert_eq!(record.mythic_plus_score, Some(2875.5));
        assert_eq!(record.spec.as_deref(), Some("Frost"));
        assert_eq!(record.passes, 1);
    }

    #[tokio::test]
    async fn test_not_found_source_is_isolated() {
        let logs_source = ScriptedSource::new(SourceKind::CombatLog, |_| {
            Err(FetchError::NotFound {
                url: "/api/v2/client".to_string(),
            })
        });
        let aggregator = CharacterAggregator::new(vec![
            ScriptedSource::new(SourceKind::Profile, |_| Ok(profile("Fire", 630.0))),
            ScriptedSource::new(SourceKind::MythicPlus, |_| Ok(mplus(1500.0))),
            logs_source.clone(),
        ]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.record.item_level, Some(630.0));
        assert!(outcome.record.log_performance.is_none());
        assert_eq!(
            outcome.record.failed_sources.get(&SourceKind::CombatLog),
            Some(&ErrorKind::NotFound)
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].kind, ErrorKind::NotFound);
        assert_eq!(logs_source.calls(), 1);
        assert!(outcome.run_fatal_failure().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_character_retry_reruns_failed_sources() {
        let profile_source = ScriptedSource::new(SourceKind::Profile, |call| {
            if call == 1 {
                Err(FetchError::Transient("connection reset".to_string()))
            } else {
                Ok(profile("Fire", 635.0))
            }
        });
        let mplus_source = ScriptedSource::new(SourceKind::MythicPlus, |_| Ok(mplus(2000.0)));
        let logs_source = ScriptedSource::new(SourceKind::CombatLog, |_| {
            Err(FetchError::NotFound {
                url: "/api/v2/client".to_string(),
            })
        });
        let aggregator = CharacterAggregator::new(vec![
            profile_source.clone(),
            mplus_source.clone(),
            logs_source.clone(),
        ]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.record.passes, 2);
        assert_eq!(outcome.record.item_level, Some(635.0));
        assert_eq!(profile_source.calls(), 2);
        assert_eq!(mplus_source.calls(), 1);
        assert_eq!(logs_source.calls(), 1);
        assert!(!outcome.record.failed_sources.contains_key(&SourceKind::Profile));
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_character_retry_is_bounded() {
        let profile_source = ScriptedSource::new(SourceKind::Profile, |_| Err(FetchError::Timeout));
        let aggregator = CharacterAggregator::new(vec![profile_source.clone()]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.record.passes, 3);
        assert_eq!(profile_source.calls(), 3);
        assert_eq!(
            outcome.record.failed_sources.get(&SourceKind::Profile),
            Some(&ErrorKind::TransientNetwork)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_extra_pass_when_item_level_present() {
        let logs_source = ScriptedSource::new(SourceKind::CombatLog, |_| {
            Err(FetchError::RateLimited { retry_after: None })
        });
        let aggregator = CharacterAggregator::new(vec![
            ScriptedSource::new(SourceKind::Profile, |_| Ok(profile("Arcane", 620.0))),
            logs_source.clone(),
        ]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.record.passes, 1);
        assert_eq!(logs_source.calls(), 1);
        assert_eq!(outcome.record.has_raid_logs(), None);
    }

    #[tokio::test]
    async fn test_auth_provider_down_is_run_fatal() {
        let aggregator = CharacterAggregator::new(vec![
            ScriptedSource::new(SourceKind::Profile, |_| {
                Err(FetchError::AuthProviderDown("token endpoint returned 503".to_string()))
            }),
            ScriptedSource::new(SourceKind::MythicPlus, |_| Err(FetchError::Timeout)),
        ]);

        let outcome = aggregator
            .aggregate(&entry(), &ctx(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.record.passes, 1);
        let fatal = outcome.run_fatal_failure().unwrap();
        assert_eq!(fatal.source, SourceKind::Profile);
        assert!(fatal.message.contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_marks_in_flight_sources() {
        let aggregator = CharacterAggregator::new(vec![
            ScriptedSource::new(SourceKind::Profile, |_| Ok(profile("Fire", 630.0))),
            ScriptedSource::slow(SourceKind::MythicPlus, Duration::from_secs(30)),
        ]);
        let (handle, signal) = cancel::channel();

        let ctx = ctx();
        let entry = entry();
        let run = aggregator.aggregate(&entry, &ctx, &signal);
        let cancel_later = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel(rosterstat_core::AbortReason::Timeout { after_secs: 1 });
        };
        let (outcome, ()) = tokio::join!(run, cancel_later);

        assert_eq!(outcome.record.item_level, Some(630.0));
        assert_eq!(
            outcome.record.failed_sources.get(&SourceKind::MythicPlus),
            Some(&ErrorKind::Cancelled)
        );
    }
}
