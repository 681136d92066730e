//! Usage: Run blocking store work on the tokio blocking pool with a stable label.

use crate::shared::error::{AppError, AppResult, CODE_TASK_JOIN};

pub async fn run<T, E>(
    label: &'static str,
    f: impl FnOnce() -> Result<T, E> + Send + 'static,
) -> AppResult<T>
where
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(Into::into),
        Err(join_err) => {
            // Panic payloads may carry user content (usernames, readings); never forward them.
            if join_err.is_panic() {
                tracing::error!(label, "blocking task panicked");
                return Err(AppError::new(
                    CODE_TASK_JOIN,
                    format!("{label}: task panicked"),
                ));
            }

            tracing::warn!(label, "blocking task cancelled");
            Err(AppError::new(
                CODE_TASK_JOIN,
                format!("{label}: task cancelled"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::shared::error::AppError;

    #[tokio::test]
    async fn run_returns_closure_value() {
        let value = run("test_ok", || Ok::<_, AppError>(42)).await.expect("ok");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn run_converts_string_errors() {
        let err = run("test_err", || Err::<(), _>("DB_ERROR: boom".to_string()))
            .await
            .expect_err("err");
        assert_eq!(err.code(), "DB_ERROR");
    }

    #[tokio::test]
    async fn run_maps_panic_to_task_join() {
        let err = run("test_panic", || -> Result<(), AppError> { panic!("secret payload") })
            .await
            .expect_err("panic");
        assert_eq!(err.code(), "TASK_JOIN");
        assert!(!err.to_string().contains("secret"));
    }
}
