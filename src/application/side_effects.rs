//! Non-critical follow-up work (emails, coupon bookkeeping) fired after an
//! order mutation has been committed.
//!
//! Each task runs in isolation: an error or a panic in one task is logged and
//! recorded in the [`DispatchReport`], and the remaining tasks still run.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

type Task = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

#[derive(Default)]
pub struct NonCriticalTasks {
    tasks: Vec<(&'static str, Task)>,
}

impl NonCriticalTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F, E>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        self.tasks
            .push((name, Box::new(move || task().map_err(|e| e.to_string()))));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task to completion on the current thread.
    pub fn run(self) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (name, task) in self.tasks {
            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => report.succeeded.push(name),
                Ok(Err(e)) => {
                    log::warn!("Non-critical task '{}' failed: {}", name, e);
                    report.failed.push((name, e));
                }
                Err(_) => {
                    log::error!("Non-critical task '{}' panicked", name);
                    report.failed.push((name, "task panicked".to_string()));
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for NonCriticalTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonCriticalTasks")
            .field("tasks", &self.names())
            .finish()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}
