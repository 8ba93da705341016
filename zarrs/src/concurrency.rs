//! Concurrent dispatch over a collection of chunks.
//!
//! A sharded chunk's inner codec work and the outer per-chunk dispatch could in principle
//! oversubscribe the machine together if split independently, but this workspace's
//! [`zarrs_codec::CodecOptions`] only models a single [`concurrent_limit`](zarrs_codec::CodecOptions::concurrent_limit),
//! so there is no outer/inner split to compute — this module just runs `f` over every item, in
//! parallel up to that limit (or fully parallel, `rayon`'s default, if unset).

use rayon::prelude::*;
use zarrs_codec::CodecOptions;

/// Run `f` over every item of `items`, honoring `options`'s concurrency limit.
///
/// # Errors
/// Returns the first error `f` produces. Every item is still attempted (not short-circuited)
/// since `rayon`'s `par_iter` has no cheap way to stop early once underway; the first error in
/// iteration order is the one returned.
pub fn try_for_each<T, E, F>(items: &[T], options: &CodecOptions, f: F) -> Result<(), E>
where
    T: Sync,
    E: Send,
    F: Fn(&T) -> Result<(), E> + Sync,
{
    match options.concurrent_limit() {
        None => items.par_iter().try_for_each(f),
        Some(1) => items.iter().try_for_each(f),
        Some(limit) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(limit)
                .build()
                .expect("failed to build a rayon thread pool");
            pool.install(|| items.par_iter().try_for_each(f))
        }
    }
}

/// Run `f` over every item of `items`, honoring `options`'s concurrency limit, collecting each
/// item's result in order.
///
/// # Errors
/// Returns the first error `f` produces. Every item is still attempted (not short-circuited),
/// matching [`try_for_each`].
pub fn try_map<T, R, E, F>(items: &[T], options: &CodecOptions, f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    match options.concurrent_limit() {
        None => items.par_iter().map(f).collect(),
        Some(1) => items.iter().map(f).collect(),
        Some(limit) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(limit)
                .build()
                .expect("failed to build a rayon thread pool");
            pool.install(|| items.par_iter().map(f).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn visits_every_item_with_unbounded_concurrency() {
        let items = vec![1, 2, 3, 4, 5];
        let count = AtomicUsize::new(0);
        try_for_each::<_, (), _>(&items, &CodecOptions::new(), |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn propagates_the_first_error() {
        let items = vec![1, 2, 3];
        let result: Result<(), &'static str> = try_for_each(&items, &CodecOptions::new(), |&v| {
            if v == 2 {
                Err("boom")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn honors_a_concurrency_limit_of_one() {
        let items = vec![1, 2, 3];
        let order = std::sync::Mutex::new(Vec::new());
        try_for_each::<_, (), _>(&items, &CodecOptions::with_concurrent_limit(1), |&v| {
            order.lock().unwrap().push(v);
            Ok(())
        })
        .unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn try_map_collects_results_in_order() {
        let items = vec![1, 2, 3, 4];
        let result: Result<Vec<i32>, ()> =
            try_map(&items, &CodecOptions::new(), |&v| Ok(v * 2));
        assert_eq!(result.unwrap(), vec![2, 4, 6, 8]);
    }

    #[test]
    fn try_map_propagates_the_first_error() {
        let items = vec![1, 2, 3];
        let result: Result<Vec<i32>, &'static str> = try_map(&items, &CodecOptions::new(), |&v| {
            if v == 2 {
                Err("boom")
            } else {
                Ok(v)
            }
        });
        assert_eq!(result, Err("boom"));
    }
}
