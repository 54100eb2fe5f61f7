use crate::utils::error::{Result, StocktakeError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// 同時對多個 id 發出請求，最多 `limit` 個並行。
///
/// 請求送出後不會被取消：即使其中一個失敗，也會等全部結束後才回傳第一個錯誤。
/// 結果依 id 排序，與完成順序無關。
pub async fn fetch_concurrently<T, F, Fut>(ids: Vec<i64>, limit: usize, fetch: F) -> Result<Vec<(i64, T)>>
where
    T: Send + 'static,
    F: Fn(i64) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for id in ids {
        let semaphore = semaphore.clone();
        let request = fetch(id);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| StocktakeError::ProcessingError {
                    message: format!("Request limiter closed: {}", e),
                })?;
            request.await.map(|value| (id, value))
        });
    }

    let mut results = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(pair)) => results.push(pair),
            Ok(Err(e)) => {
                tracing::debug!("📡 Concurrent request failed: {}", e);
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(StocktakeError::ProcessingError {
                    message: format!("Request task failed: {}", e),
                });
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    results.sort_by_key(|(id, _)| *id);
    Ok(results)
}
