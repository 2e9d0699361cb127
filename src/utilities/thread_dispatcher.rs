use crossbeam_utils::thread;
use std::panic;

/// Provides multithreading dispatch primitives and a thread count for the solver to use.
///
/// Note that the solver does not require a true load balancing for loop implementation. All that's needed is a way to
/// jumpstart some threads over a list of independent tasks.
///
/// The solver dispatches once per batch round of every cell-batch in every pass, so a solve issues many short
/// dispatches. Implementations backed by persistent workers, such as a thread pool the user already owns, pay less per
/// dispatch than [`ScopedThreadDispatcher`].
pub trait ThreadDispatcher: Send + Sync {
    /// Gets the number of workers available in the thread dispatcher.
    fn thread_count(&self) -> usize;

    /// Runs `task_body` once per task and returns the results in task order.
    ///
    /// # Arguments
    ///
    /// * `tasks` - Independent units of work. Tasks must not alias each other's mutable state.
    /// * `task_body` - Invoked with the index of the worker executing it and the task.
    ///
    /// Returns only after every task has completed. A panic inside a task is propagated to the caller.
    fn dispatch_tasks<T, R, F>(&self, tasks: Vec<T>, task_body: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync;
}

/// Dispatcher that spins up scoped worker threads for each dispatch.
///
/// Every dispatch with more than one task spawns and joins up to `thread_count` threads. Dispatches with a single task
/// run on the calling thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopedThreadDispatcher {
    thread_count: usize,
}

impl ScopedThreadDispatcher {
    /// Creates a dispatcher using the given number of workers. Zero is treated as one.
    pub fn new(thread_count: usize) -> Self {
        Self {
            thread_count: thread_count.max(1),
        }
    }
}

impl Default for ScopedThreadDispatcher {
    fn default() -> Self {
        let thread_count = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::new(thread_count)
    }
}

impl ThreadDispatcher for ScopedThreadDispatcher {
    #[inline(always)]
    fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn dispatch_tasks<T, R, F>(&self, tasks: Vec<T>, task_body: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        let task_count = tasks.len();
        let worker_count = self.thread_count.min(task_count);
        if worker_count <= 1 {
            return tasks
                .into_iter()
                .map(|task| task_body(0, task))
                .collect();
        }

        // Round robin keeps the per-worker task count within one of each other.
        let mut assignments: Vec<Vec<(usize, T)>> = (0..worker_count).map(|_| Vec::new()).collect();
        for (task_index, task) in tasks.into_iter().enumerate() {
            assignments[task_index % worker_count].push((task_index, task));
        }

        let task_body = &task_body;
        let joined = thread::scope(|scope| {
            let handles: Vec<_> = assignments
                .into_iter()
                .enumerate()
                .map(|(worker_index, assigned)| {
                    scope.spawn(move |_| {
                        assigned
                            .into_iter()
                            .map(|(task_index, task)| (task_index, task_body(worker_index, task)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Vec<_>>()
        });

        let mut slots: Vec<Option<R>> = (0..task_count).map(|_| None).collect();
        match joined {
            Ok(worker_results) => {
                for worker_result in worker_results {
                    match worker_result {
                        Ok(results) => {
                            for (task_index, result) in results {
                                slots[task_index] = Some(result);
                            }
                        }
                        Err(payload) => panic::resume_unwind(payload),
                    }
                }
            }
            Err(payload) => panic::resume_unwind(payload),
        }
        slots.into_iter().flatten().collect()
    }
}

/// Dispatcher that executes every task on the calling thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InlineDispatcher;

impl ThreadDispatcher for InlineDispatcher {
    #[inline(always)]
    fn thread_count(&self) -> usize {
        1
    }

    fn dispatch_tasks<T, R, F>(&self, tasks: Vec<T>, task_body: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        tasks.into_iter().map(|task| task_body(0, task)).collect()
    }
}
