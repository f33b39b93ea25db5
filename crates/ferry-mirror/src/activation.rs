// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle state machine that arms and disarms the mirror.
//!
//! `activate` initializes the secondary (once), runs the rolling migration,
//! and only then subscribes a fresh [`ChangeMirror`] to the primary feed.
//! `deactivate` unsubscribes and waits for the queue to drain, so the mirror
//! and the migrator never write to the secondary at the same time.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ferry_core::{FerryError, Policy, PolicySource};

use crate::context::EngineContext;
use crate::migrator::{MigrationOutcome, RollingMigrator};
use crate::mirror::{ChangeMirror, MirrorProgress, MirrorTask};

/// Whether the mirror is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Disabled,
    Enabled,
}

type InitFuture = Shared<BoxFuture<'static, Result<(), String>>>;

/// Secondary store initialization guard.
enum InitState {
    NotStarted,
    /// `attempt` numbers each started initialization so a late waiter of a
    /// failed attempt cannot reset a newer one.
    InProgress { attempt: u64, future: InitFuture },
    Done,
}

struct InitGuard {
    state: InitState,
    attempts: u64,
}

struct Inner {
    state: ActivationState,
    task: Option<MirrorTask>,
    last_migration: Option<MigrationOutcome>,
}

/// Converges the engine onto the enabled or disabled state.
pub struct ActivationController {
    ctx: EngineContext,
    policy: Option<Arc<dyn PolicySource>>,
    inner: tokio::sync::Mutex<Inner>,
    init: Mutex<InitGuard>,
}

impl ActivationController {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            policy: None,
            inner: tokio::sync::Mutex::new(Inner {
                state: ActivationState::Disabled,
                task: None,
                last_migration: None,
            }),
            init: Mutex::new(InitGuard {
                state: InitState::NotStarted,
                attempts: 0,
            }),
        }
    }

    /// Re-check `policy` whenever `activate` is called on an enabled engine.
    pub fn with_policy(mut self, policy: Arc<dyn PolicySource>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub async fn state(&self) -> ActivationState {
        self.inner.lock().await.state
    }

    pub async fn is_enabled(&self) -> bool {
        self.state().await == ActivationState::Enabled
    }

    /// Counters of the live mirror, if any.
    pub async fn mirror_progress(&self) -> Option<MirrorProgress> {
        self.inner
            .lock()
            .await
            .task
            .as_ref()
            .map(MirrorTask::snapshot)
    }

    /// Progress receiver of the live mirror, if any.
    pub async fn watch_progress(&self) -> Option<watch::Receiver<MirrorProgress>> {
        self.inner.lock().await.task.as_ref().map(MirrorTask::progress)
    }

    /// Outcome of the migration run by the most recent successful activation.
    pub async fn last_migration(&self) -> Option<MigrationOutcome> {
        self.inner.lock().await.last_migration.clone()
    }

    /// Initialize the secondary store exactly once.
    ///
    /// Concurrent callers await the same in-flight attempt. A failed attempt
    /// is forgotten so a later call tries again.
    pub async fn ensure_initialized(&self) -> Result<(), FerryError> {
        let (attempt, pending) = {
            let mut init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
            match &init.state {
                InitState::Done => return Ok(()),
                InitState::InProgress { attempt, future } => (*attempt, future.clone()),
                InitState::NotStarted => {
                    let secondary = Arc::clone(&self.ctx.secondary);
                    let future: InitFuture = async move {
                        secondary.initialize().await.map_err(|e| match e {
                            FerryError::Initialization(msg) => msg,
                            other => other.to_string(),
                        })
                    }
                    .boxed()
                    .shared();
                    init.attempts += 1;
                    let attempt = init.attempts;
                    init.state = InitState::InProgress {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = pending.await;
        let mut init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) => {
                init.state = InitState::Done;
                Ok(())
            }
            Err(msg) => {
                let ours = matches!(
                    init.state,
                    InitState::InProgress { attempt: current, .. } if current == attempt
                );
                if ours {
                    init.state = InitState::NotStarted;
                }
                Err(FerryError::Initialization(msg))
            }
        }
    }

    /// Arm the mirror.
    ///
    /// On an enabled engine this only re-checks the policy, if one is set. On
    /// a disabled engine it initializes the secondary, runs the rolling
    /// migration, then subscribes the mirror. A failed migration does not stop
    /// the mirror from being armed; a failed initialization does.
    pub async fn activate(&self) -> Result<(), FerryError> {
        let mut inner = self.inner.lock().await;

        if inner.state == ActivationState::Enabled {
            if let Some(policy) = &self.policy
                && !policy.current().permits_mirroring()
            {
                info!("policy no longer permits mirroring");
                self.disarm(&mut inner).await;
            }
            return Ok(());
        }

        if let Err(e) = self.ensure_initialized().await {
            error!(error = %e, "secondary store initialization failed, staying disabled");
            return Err(e);
        }

        match RollingMigrator::new(self.ctx.clone()).run_if_needed().await {
            Ok(outcome) => inner.last_migration = Some(outcome),
            Err(e) => {
                // Recorded by the migrator. Mirroring is still armed.
                warn!(error = %e, "arming mirror after failed migration");
                inner.last_migration = None;
            }
        }

        if let Some(stale) = inner.task.take() {
            debug!(subscription = %stale.subscription_id(), "replacing stale mirror subscription");
            stale.stop(self.ctx.primary.as_ref()).await;
        }
        let subscription = self.ctx.primary.subscribe();
        let task = ChangeMirror::new(self.ctx.clone()).spawn(subscription);
        info!(subscription = %task.subscription_id(), "mirroring enabled");
        inner.task = Some(task);
        inner.state = ActivationState::Enabled;
        Ok(())
    }

    /// Disarm the mirror. Already-mirrored data is left in place.
    pub async fn deactivate(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == ActivationState::Enabled {
            self.disarm(&mut inner).await;
        }
    }

    async fn disarm(&self, inner: &mut Inner) {
        if let Some(task) = inner.task.take() {
            let progress = task.stop(self.ctx.primary.as_ref()).await;
            info!(
                applied = progress.applied,
                failed = progress.failed,
                "mirroring disabled"
            );
        }
        inner.state = ActivationState::Disabled;
    }

    /// Converge on the state `policy` asks for.
    pub async fn reconcile(&self, policy: Policy) -> Result<ActivationState, FerryError> {
        if policy.permits_mirroring() {
            self.activate().await?;
        } else {
            self.deactivate().await;
        }
        Ok(self.state().await)
    }

    /// Reconcile on every policy change until `cancel` fires or the policy
    /// sender goes away, then deactivate.
    pub async fn run_policy_loop(
        &self,
        mut policy: watch::Receiver<Policy>,
        cancel: CancellationToken,
    ) {
        let initial = *policy.borrow_and_update();
        self.reconcile_logged(initial).await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("policy loop cancelled");
                    break;
                }
                changed = policy.changed() => {
                    if changed.is_err() {
                        debug!("policy source closed");
                        break;
                    }
                    let current = *policy.borrow_and_update();
                    self.reconcile_logged(current).await;
                }
            }
        }

        self.deactivate().await;
    }

    async fn reconcile_logged(&self, policy: Policy) {
        match self.reconcile(policy).await {
            Ok(state) => debug!(?state, ?policy, "reconciled activation state"),
            Err(e) => error!(error = %e, "activation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ferry_core::{
        Fingerprint, HealthStatus, LoginQuery, Record, SecondaryStore, StoreAdapter,
    };
    use ferry_storage::MemoryPrimaryStore;
    use ferry_test_utils::RecordingMetrics;

    use crate::context::MirrorSettings;

    /// Secondary whose `initialize` fails a set number of times, slowly.
    ///
    /// With a `gate`, each attempt waits for a permit instead of sleeping.
    struct SlowInit {
        calls: AtomicUsize,
        failures: usize,
        gate: Option<tokio::sync::Semaphore>,
    }

    #[async_trait]
    impl StoreAdapter for SlowInit {
        fn name(&self) -> &str {
            "slow-init"
        }
        async fn health_check(&self) -> Result<HealthStatus, FerryError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl SecondaryStore for SlowInit {
        async fn initialize(&self) -> Result<(), FerryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.gate {
                Some(gate) => gate
                    .acquire()
                    .await
                    .map_err(|e| FerryError::Initialization(e.to_string()))?
                    .forget(),
                None => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
            }
            if n < self.failures {
                Err(FerryError::Initialization("disk unavailable".into()))
            } else {
                Ok(())
            }
        }
        async fn checkpoint(&self) -> Result<Option<Fingerprint>, FerryError> {
            Ok(None)
        }
        async fn set_checkpoint(&self, _: &Fingerprint) -> Result<(), FerryError> {
            Ok(())
        }
        async fn clear_all(&self) -> Result<(), FerryError> {
            Ok(())
        }
        async fn bulk_insert(&self, records: &[Record]) -> Result<Vec<String>, FerryError> {
            Ok(records.iter().map(|r| r.id.clone()).collect())
        }
        async fn insert(&self, record: &Record) -> Result<Record, FerryError> {
            Ok(record.clone())
        }
        async fn update(&self, _: &str, record: &Record) -> Result<Record, FerryError> {
            Ok(record.clone())
        }
        async fn delete(&self, _: &str) -> Result<(), FerryError> {
            Ok(())
        }
        async fn delete_many(&self, _: &[String]) -> Result<(), FerryError> {
            Ok(())
        }
        async fn list(&self) -> Result<Vec<Record>, FerryError> {
            Ok(Vec::new())
        }
        async fn get(&self, _: &str) -> Result<Option<Record>, FerryError> {
            Ok(None)
        }
        async fn find_match(&self, _: &LoginQuery) -> Result<Option<Record>, FerryError> {
            Ok(None)
        }
        async fn count(&self) -> Result<usize, FerryError> {
            Ok(0)
        }
    }

    fn controller(failures: usize) -> (Arc<SlowInit>, ActivationController) {
        controller_with(SlowInit {
            calls: AtomicUsize::new(0),
            failures,
            gate: None,
        })
    }

    fn controller_with(secondary: SlowInit) -> (Arc<SlowInit>, ActivationController) {
        let secondary = Arc::new(secondary);
        let ctx = EngineContext::new(
            Arc::new(MemoryPrimaryStore::new()),
            secondary.clone(),
            Arc::new(RecordingMetrics::new()),
            MirrorSettings::default(),
        );
        (secondary, ActivationController::new(ctx))
    }

    #[tokio::test]
    async fn concurrent_initialization_runs_once() {
        let (secondary, controller) = controller(0);
        let (a, b, c) = tokio::join!(
            controller.ensure_initialized(),
            controller.ensure_initialized(),
            controller.ensure_initialized()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);

        controller.ensure_initialized().await.unwrap();
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_waiter_of_failed_attempt_keeps_newer_attempt() {
        use futures::poll;
        use std::pin::pin;

        let (secondary, controller) = controller_with(SlowInit {
            calls: AtomicUsize::new(0),
            failures: 1,
            gate: Some(tokio::sync::Semaphore::new(0)),
        });
        let gate = secondary.gate.as_ref().unwrap();

        // a and b share the first attempt, which fails.
        let mut a = pin!(controller.ensure_initialized());
        let mut b = pin!(controller.ensure_initialized());
        assert!(poll!(a.as_mut()).is_pending());
        assert!(poll!(b.as_mut()).is_pending());
        gate.add_permits(1);
        assert!(a.await.is_err());

        // c starts the second attempt before b observes the first failure.
        let mut c = pin!(controller.ensure_initialized());
        assert!(poll!(c.as_mut()).is_pending());
        assert!(b.await.is_err());

        // d must join c's attempt rather than start a third.
        let mut d = pin!(controller.ensure_initialized());
        assert!(poll!(d.as_mut()).is_pending());
        gate.add_permits(1);
        let (c, d) = tokio::join!(c, d);
        assert!(c.is_ok() && d.is_ok());
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_initialization_keeps_engine_disabled_and_retries() {
        let (secondary, controller) = controller(1);

        let err = controller.activate().await.unwrap_err();
        assert!(matches!(err, FerryError::Initialization(ref m) if m == "disk unavailable"));
        assert_eq!(controller.state().await, ActivationState::Disabled);

        controller.activate().await.unwrap();
        assert_eq!(controller.state().await, ActivationState::Enabled);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn redundant_reconcile_converges() {
        let (_secondary, controller) = controller(0);
        let on = Policy {
            mirroring_enabled: true,
            secret_store_locked: false,
        };
        for _ in 0..3 {
            assert_eq!(controller.reconcile(on).await.unwrap(), ActivationState::Enabled);
        }
        let primary = controller.context().primary.clone();
        assert_eq!(controller.mirror_progress().await, Some(MirrorProgress::default()));

        let locked = Policy {
            secret_store_locked: true,
            ..on
        };
        for _ in 0..3 {
            assert_eq!(
                controller.reconcile(locked).await.unwrap(),
                ActivationState::Disabled
            );
        }
        assert_eq!(controller.mirror_progress().await, None);
        // The mirror's subscription is gone.
        let sub = primary.subscribe();
        assert!(primary.unsubscribe(sub.id()));
    }
}
