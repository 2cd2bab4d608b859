use super::session_registry::SharedSession;
use crate::domain::error::{AppError, Result};
use crate::domain::session::{EngineTask, SessionState};
use std::future::Future;

/// Drive an engine call for a session that has already been claimed with
/// `SessionState::begin(task)`.
///
/// The call runs on its own tokio task, so it completes (and the busy flag
/// is released) even if the request that started it goes away. `on_success`
/// runs under the session lock; on failure the session is left as it was.
pub async fn run_engine_task<T, F, S>(
    session: SharedSession,
    task: EngineTask,
    call: F,
    on_success: S,
) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
    S: FnOnce(&mut SessionState, &T) + Send + 'static,
{
    let task_session = session.clone();
    let handle = tokio::spawn(async move {
        let result = call.await;
        let mut state = task_session.lock().await;
        state.finish(task);
        if let Ok(value) = &result {
            on_success(&mut state, value);
        }
        result
    });

    match handle.await {
        Ok(result) => {
            if let Err(e) = &result {
                tracing::warn!(%task, error = %e, "Engine task failed");
            }
            result
        }
        Err(join_error) => {
            session.lock().await.finish(task);
            tracing::error!(%task, error = %join_error, "Engine task aborted");
            Err(AppError::Internal(format!("{} task aborted: {}", task, join_error)))
        }
    }
}
