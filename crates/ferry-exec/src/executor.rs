//! Bounded fan-out/fan-in over scoped worker threads.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use crossbeam_channel::unbounded;

use ferry_common::constants::DEFAULT_MAX_WORKERS;
use ferry_common::error::{FerryError, FerryResult};

use crate::chunk::Chunk;

/// Runs batches of independent tasks on at most `max_workers` threads.
///
/// Workers are created per batch and joined before the batch returns, so
/// tasks may borrow from the caller's stack. Tasks are handed out in
/// submission order from a shared queue; results are slotted by submission
/// index, so `result[i]` always belongs to `tasks[i]`.
///
/// A failing task does not stop its siblings. Every submitted task runs to
/// completion before the batch reports.
#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    max_workers: usize,
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl ParallelExecutor {
    /// Creates an executor with the given concurrency bound.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::InvalidArgument`] if `max_workers` is zero.
    pub fn new(max_workers: usize) -> FerryResult<Self> {
        if max_workers == 0 {
            return Err(FerryError::invalid_argument("max_workers must be at least 1"));
        }
        Ok(Self { max_workers })
    }

    /// Returns the concurrency bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs all tasks and returns their results in submission order, or the
    /// failure of the lowest-indexed failing task.
    pub fn run_all<T, F>(&self, tasks: Vec<F>) -> FerryResult<Vec<T>>
    where
        T: Send,
        F: FnOnce() -> FerryResult<T> + Send,
    {
        let outcomes = self.run_settled(tasks)?;
        let failed = outcomes.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                "{} of {} tasks failed; reporting the first",
                failed,
                outcomes.len()
            );
        }
        outcomes.into_iter().collect()
    }

    /// Runs all tasks and returns every individual outcome in submission
    /// order.
    ///
    /// The outer error is reserved for executor faults; task failures and
    /// panics are reported in their own slots.
    pub fn run_settled<T, F>(&self, tasks: Vec<F>) -> FerryResult<Vec<FerryResult<T>>>
    where
        T: Send,
        F: FnOnce() -> FerryResult<T> + Send,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.max_workers.min(total);
        let start = Instant::now();

        let (task_tx, task_rx) = unbounded::<(usize, F)>();
        for entry in tasks.into_iter().enumerate() {
            task_tx
                .send(entry)
                .map_err(|_| FerryError::internal("task queue closed before dispatch"))?;
        }
        drop(task_tx);

        let (result_tx, result_rx) = unbounded::<(usize, FerryResult<T>)>();
        thread::scope(|scope| {
            for worker in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok((index, task)) = task_rx.recv() {
                        tracing::trace!("worker {} running task {}", worker, index);
                        let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                            .unwrap_or_else(|payload| {
                                Err(FerryError::TaskPanicked {
                                    task: index,
                                    message: panic_message(payload.as_ref()),
                                })
                            });
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<FerryResult<T>>> = (0..total).map(|_| None).collect();
        for (index, outcome) in result_rx.try_iter() {
            slots[index] = Some(outcome);
        }

        tracing::debug!(
            "ran {} tasks on {} workers in {:?}",
            total,
            workers,
            start.elapsed()
        );

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| FerryError::internal(format!("task {} produced no result", index)))
            })
            .collect()
    }

    /// Runs `work` once per chunk and returns the results in chunk order.
    pub fn map_chunks<T, W>(&self, chunks: &[Chunk], work: W) -> FerryResult<Vec<T>>
    where
        T: Send,
        W: Fn(Chunk) -> FerryResult<T> + Sync,
    {
        let work = &work;
        let tasks: Vec<_> = chunks
            .iter()
            .map(|&chunk| move || work(chunk))
            .collect();
        self.run_all(tasks)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::plan_chunks;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(ParallelExecutor::new(0).is_err());
        assert_eq!(ParallelExecutor::default().max_workers(), 8);
    }

    #[test]
    fn test_results_follow_submission_order() {
        let executor = ParallelExecutor::new(4).unwrap();
        // Later tasks finish first.
        let tasks: Vec<_> = (0..16u64)
            .map(|i| {
                move || {
                    thread::sleep(Duration::from_millis(16 - i));
                    Ok(i * 10)
                }
            })
            .collect();
        let results = executor.run_all(tasks).unwrap();
        assert_eq!(results, (0..16u64).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let executor = ParallelExecutor::new(3).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let (active, peak) = (&active, &peak);
                move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .collect();
        executor.run_all(tasks).unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_failure_drains_siblings() {
        let executor = ParallelExecutor::new(2).unwrap();
        let ran = Mutex::new(Vec::new());
        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let ran = &ran;
                move || {
                    ran.lock().push(i);
                    if i == 1 || i == 4 {
                        Err(FerryError::internal(format!("task {} failed", i)))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let err = executor.run_all(tasks).unwrap_err();
        assert!(err.to_string().contains("task 1 failed"));
        assert_eq!(ran.lock().len(), 6);
    }

    #[test]
    fn test_panic_becomes_error() {
        let executor = ParallelExecutor::new(2).unwrap();
        let tasks: Vec<Box<dyn FnOnce() -> FerryResult<i32> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| panic!("boom")),
            Box::new(|| Ok(3)),
        ];
        let outcomes = executor.run_settled(tasks).unwrap();
        assert_eq!(outcomes[0].as_ref().unwrap(), &1);
        assert!(matches!(
            outcomes[1],
            Err(FerryError::TaskPanicked { task: 1, ref message }) if message == "boom"
        ));
        assert_eq!(outcomes[2].as_ref().unwrap(), &3);
    }

    #[test]
    fn test_empty_batch() {
        let executor = ParallelExecutor::default();
        let tasks: Vec<fn() -> FerryResult<()>> = Vec::new();
        assert!(executor.run_all(tasks).unwrap().is_empty());
    }

    #[test]
    fn test_map_chunks_borrows_input() {
        let data: Vec<u32> = (0..25).collect();
        let chunks = plan_chunks(data.len(), 4).unwrap();
        let executor = ParallelExecutor::new(3).unwrap();
        let sums = executor
            .map_chunks(&chunks, |chunk| Ok(data[chunk.range()].iter().sum::<u32>()))
            .unwrap();
        assert_eq!(sums.len(), 7);
        assert_eq!(sums.iter().sum::<u32>(), data.iter().sum::<u32>());
        assert_eq!(sums[6], 24);
    }
}
