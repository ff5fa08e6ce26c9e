//! TopErrorHandler: a per-context supervisor installed into a
//! task-local slot for the duration of `run`. Drives the top task to
//! completion, then funnels any error through ordered recovery callbacks —
//! `on_error`, `clean_shutdown`, `forced_shutdown` — with async variants
//! tried before their sync twins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use palaver_foundation::error::{CoreError, PalaverError};
use tokio::task::JoinHandle;

type AsyncCallback =
    Box<dyn Fn(&PalaverError) -> Pin<Box<dyn Future<Output = Result<(), PalaverError>> + Send>> + Send + Sync>;
type SyncCallback = Box<dyn Fn(&PalaverError) -> Result<(), PalaverError> + Send + Sync>;

#[derive(Default)]
pub struct RecoveryCallbacks {
    pub on_error_async: Option<AsyncCallback>,
    pub on_error_sync: Option<SyncCallback>,
    pub clean_shutdown_async: Option<AsyncCallback>,
    pub clean_shutdown_sync: Option<SyncCallback>,
    pub forced_shutdown_async: Option<AsyncCallback>,
    pub forced_shutdown_sync: Option<SyncCallback>,
}

tokio::task_local! {
    static CURRENT_SUPERVISOR: Arc<TopErrorHandler>;
}

/// Context-scoped task supervisor. Exactly one instance is active per
/// `run` call; nested `run()`s are serialized by the task-local slot
/// rather than a process-wide singleton.
pub struct TopErrorHandler {
    callbacks: RecoveryCallbacks,
}

impl TopErrorHandler {
    pub fn new(callbacks: RecoveryCallbacks) -> Arc<Self> {
        Arc::new(Self { callbacks })
    }

    /// Installs `self` into the task-local slot for the duration of
    /// `fut`, then runs the recovery chain if `fut` returned an error.
    pub async fn run<F, T>(self: Arc<Self>, fut: F) -> Result<T, PalaverError>
    where
        F: Future<Output = Result<T, PalaverError>>,
    {
        let sup = self.clone();
        let result = CURRENT_SUPERVISOR.scope(sup, fut).await;
        match result {
            Ok(v) => Ok(v),
            Err(err) => {
                self.handle(err).await?;
                Err(PalaverError::Fatal("supervised task failed".into()))
            }
        }
    }

    /// Spawns `f` as a background task; any error it returns is routed
    /// through this supervisor's recovery chain rather than silently
    /// dropped.
    pub fn wrap_task<F>(self: &Arc<Self>, f: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), PalaverError>> + Send + 'static,
    {
        let sup = self.clone();
        tokio::spawn(async move {
            if let Err(err) = f.await {
                let _ = sup.handle(err).await;
            }
        })
    }

    pub fn current() -> Option<Arc<TopErrorHandler>> {
        CURRENT_SUPERVISOR.try_with(|s| s.clone()).ok()
    }

    /// Runs the ordered recovery chain for `err`: `on_error`, then
    /// (unless swallowed) `clean_shutdown`, then (unless that succeeded)
    /// `forced_shutdown`. Each slot tries its async callback first, its
    /// sync twin second; if both raise, the error escalates to the next
    /// slot. If every slot raises, `ErrorHandlingException` surfaces.
    async fn handle(&self, err: PalaverError) -> Result<(), PalaverError> {
        if self.try_slot(&self.callbacks.on_error_async, &self.callbacks.on_error_sync, &err).await.is_ok() {
            return Ok(());
        }

        if self
            .try_slot(&self.callbacks.clean_shutdown_async, &self.callbacks.clean_shutdown_sync, &err)
            .await
            .is_ok()
        {
            return Ok(());
        }

        if self
            .try_slot(&self.callbacks.forced_shutdown_async, &self.callbacks.forced_shutdown_sync, &err)
            .await
            .is_ok()
        {
            return Ok(());
        }

        Err(PalaverError::Core(CoreError::ErrorHandlingException(format!(
            "all recovery callbacks exhausted for: {err}"
        ))))
    }

    async fn try_slot(
        &self,
        async_cb: &Option<AsyncCallback>,
        sync_cb: &Option<SyncCallback>,
        err: &PalaverError,
    ) -> Result<(), ()> {
        if let Some(cb) = async_cb {
            if cb(err).await.is_ok() {
                return Ok(());
            }
        }
        if let Some(cb) = sync_cb {
            if cb(err).is_ok() {
                return Ok(());
            }
        }
        Err(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn on_error_swallowing_skips_shutdown_callbacks() {
        let shutdown_calls = Arc::new(AtomicUsize::new(0));
        let shutdown_calls_clone = shutdown_calls.clone();
        let callbacks = RecoveryCallbacks {
            on_error_sync: Some(Box::new(|_| Ok(()))),
            clean_shutdown_sync: Some(Box::new(move |_| {
                shutdown_calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..Default::default()
        };
        let sup = TopErrorHandler::new(callbacks);
        let result: Result<(), PalaverError> = sup
            .run(async { Err(PalaverError::Fatal("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(shutdown_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_through_to_forced_shutdown_when_others_raise() {
        let forced_called = Arc::new(AtomicUsize::new(0));
        let forced_clone = forced_called.clone();
        let callbacks = RecoveryCallbacks {
            on_error_sync: Some(Box::new(|_| Err(PalaverError::Fatal("still bad".into())))),
            clean_shutdown_sync: Some(Box::new(|_| Err(PalaverError::Fatal("still bad".into())))),
            forced_shutdown_sync: Some(Box::new(move |_| {
                forced_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..Default::default()
        };
        let sup = TopErrorHandler::new(callbacks);
        let _: Result<(), PalaverError> = sup
            .run(async { Err(PalaverError::Fatal("boom".into())) })
            .await;
        assert_eq!(forced_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_callbacks_raising_surfaces_error_handling_exception() {
        let callbacks = RecoveryCallbacks {
            on_error_sync: Some(Box::new(|_| Err(PalaverError::Fatal("x".into())))),
            clean_shutdown_sync: Some(Box::new(|_| Err(PalaverError::Fatal("x".into())))),
            forced_shutdown_sync: Some(Box::new(|_| Err(PalaverError::Fatal("x".into())))),
            ..Default::default()
        };
        let sup = TopErrorHandler::new(callbacks);
        // directly exercise handle() via a task wrapped failure
        let handle = sup.wrap_task(async { Err(PalaverError::Fatal("boom".into())) });
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn get_current_supervisor_inside_run() {
        let sup = TopErrorHandler::new(RecoveryCallbacks::default());
        let seen = sup
            .clone()
            .run(async {
                assert!(TopErrorHandler::current().is_some());
                Ok(())
            })
            .await;
        assert!(seen.is_ok());
    }
}
