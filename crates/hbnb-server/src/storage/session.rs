//! Request-scoped unit of work
//!
//! Requests run one at a time against the shared storage: each holds the
//! process-wide lock from before its handler starts until `Storage::close`
//! has finished, whether the handler returned a response, an error, or never
//! finished.

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hbnb_core::Storage;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// Closes the storage session when the request is done with it, then
/// releases the lock. Dropped without [`SessionGuard::finish`] (cancelled or
/// panicking handler), it hands both to a background task.
struct SessionGuard {
    held: Option<(Arc<dyn Storage>, OwnedMutexGuard<()>)>,
}

impl SessionGuard {
    async fn acquire(state: AppState) -> Self {
        let lock = state.unit_of_work.lock_owned().await;
        Self {
            held: Some((state.storage, lock)),
        }
    }

    async fn finish(mut self) {
        if let Some((storage, lock)) = self.held.take() {
            close(storage, lock).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some((storage, lock)) = self.held.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Request abandoned, closing storage in background");
                handle.spawn(close(storage, lock));
            }
            Err(_) => warn!("No runtime to close storage session"),
        }
    }
}

async fn close(storage: Arc<dyn Storage>, lock: OwnedMutexGuard<()>) {
    if let Err(e) = storage.close().await {
        warn!("Failed to close storage session: {}", e);
    }
    drop(lock);
}

pub async fn close_storage(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let guard = SessionGuard::acquire(state).await;
    let response = next.run(req).await;
    guard.finish().await;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use hbnb_core::{Entity, Kind, StorageResult};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    #[derive(Default)]
    struct SpyStorage {
        closes: AtomicUsize,
        busy: AtomicBool,
        overlapped: AtomicBool,
    }

    #[async_trait]
    impl Storage for SpyStorage {
        async fn all(&self, _kind: Option<Kind>) -> StorageResult<BTreeMap<String, Entity>> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.busy.store(false, Ordering::SeqCst);
            Ok(BTreeMap::new())
        }

        async fn get(&self, _kind: Kind, _id: &str) -> StorageResult<Option<Entity>> {
            Ok(None)
        }

        async fn new(&self, _entity: Entity) -> StorageResult<()> {
            Ok(())
        }

        async fn save(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn delete(&self, _entity: &Entity) -> StorageResult<()> {
            Ok(())
        }

        async fn reload(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn close(&self) -> StorageResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn boom() -> &'static str {
        panic!("handler failure")
    }

    async fn slow(State(state): State<AppState>) -> &'static str {
        let _ = state.storage.all(None).await;
        "slow"
    }

    fn app(spy: Arc<SpyStorage>) -> Router {
        let state = AppState::new(spy);
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route("/boom", get(boom))
            .route("/slow", get(slow))
            .layer(middleware::from_fn_with_state(state.clone(), close_storage))
            .layer(CatchPanicLayer::new())
            .with_state(state)
    }

    async fn call_with(app: Router, uri: &str) -> StatusCode {
        let request = axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    async fn call(spy: &Arc<SpyStorage>, uri: &str) -> StatusCode {
        call_with(app(spy.clone()), uri).await
    }

    #[tokio::test]
    async fn test_closes_after_success_and_error() {
        let spy = Arc::new(SpyStorage::default());
        assert_eq!(call(&spy, "/ok").await, StatusCode::OK);
        assert_eq!(spy.closes.load(Ordering::SeqCst), 1);

        assert_eq!(call(&spy, "/missing").await, StatusCode::NOT_FOUND);
        assert_eq!(spy.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closes_after_panic() {
        let spy = Arc::new(SpyStorage::default());
        assert_eq!(call(&spy, "/boom").await, StatusCode::INTERNAL_SERVER_ERROR);

        for _ in 0..100 {
            if spy.closes.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(spy.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_requests_run_one_at_a_time() {
        let spy = Arc::new(SpyStorage::default());
        let app = app(spy.clone());

        let calls: Vec<_> = (0..20)
            .map(|_| tokio::spawn(call_with(app.clone(), "/slow")))
            .collect();
        for call in calls {
            assert_eq!(call.await.unwrap(), StatusCode::OK);
        }

        assert!(!spy.overlapped.load(Ordering::SeqCst));
        assert_eq!(spy.closes.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_lock_released_after_panic() {
        let spy = Arc::new(SpyStorage::default());
        let app = app(spy.clone());
        assert_eq!(
            call_with(app.clone(), "/boom").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let next = tokio::time::timeout(Duration::from_secs(5), call_with(app, "/ok")).await;
        assert_eq!(next.unwrap(), StatusCode::OK);
        assert_eq!(spy.closes.load(Ordering::SeqCst), 2);
    }
}
