//! Ordered fallback over alternative strategies.

use futures::future::BoxFuture;

/// Await `attempts` one after another and return the first success.
///
/// Later attempts are never polled once one succeeds. If every attempt
/// fails, all errors are returned in attempt order.
///
/// # Errors
///
/// Returns the collected errors when no attempt succeeds (an empty list for
/// no attempts).
pub async fn first_ok<'a, T, E>(attempts: Vec<BoxFuture<'a, Result<T, E>>>) -> Result<T, Vec<E>> {
    let mut errors = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        match attempt.await {
            Ok(value) => return Ok(value),
            Err(e) => errors.push(e),
        }
    }
    Err(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let polled = AtomicUsize::new(0);
        let attempt = |result: Result<u32, &'static str>| {
            let polled = &polled;
            async move {
                polled.fetch_add(1, Ordering::SeqCst);
                result
            }
            .boxed()
        };

        let value = first_ok(vec![attempt(Err("by id")), attempt(Ok(7)), attempt(Ok(9))])
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_collects_all_errors() {
        let errors = first_ok::<(), _>(vec![
            async { Err("by id") }.boxed(),
            async { Err("by tag") }.boxed(),
        ])
        .await
        .unwrap_err();

        assert_eq!(errors, ["by id", "by tag"]);
        assert!(first_ok::<(), ()>(Vec::new()).await.is_err());
    }
}
