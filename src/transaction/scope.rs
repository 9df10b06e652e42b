use crate::core::Result;
use crate::storage::{StoreTransaction, TransactionalStore};
use futures::future::BoxFuture;
use tracing::warn;

/// Run `work` inside a fresh transaction.
///
/// Commits when `work` returns `Ok`; rolls back when it returns `Err`.
/// If `work` panics or its future is cancelled the transaction is dropped,
/// which releases its locks and discards its writes.
///
/// ```ignore
/// let numbers = sequences.clone();
/// let number = run_in_transaction(&store, move |tx| {
///     Box::pin(async move { numbers.next_number_by_module(tx, "PO").await })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<S, T, F>(store: &S, work: F) -> Result<T>
where
    S: TransactionalStore,
    T: Send,
    F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T>> + Send,
{
    let mut tx = store.begin().await?;
    let result = work(&mut tx).await;
    finish(tx, result).await
}

/// End `tx` according to `result`: commit on `Ok`, roll back on `Err`.
///
/// A rollback failure is logged and the original error is returned.
pub(crate) async fn finish<X, T>(tx: X, result: Result<T>) -> Result<T>
where
    X: StoreTransaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            let id = tx.id();
            if let Err(rollback_err) = tx.rollback().await {
                warn!(txn = %id, error = %rollback_err, "rollback after failure did not complete");
            }
            Err(err)
        }
    }
}
