// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Single-thread task runner for user callbacks.
//!
//! Watcher and state callbacks are handed off here so user code can never
//! stall the client library's dispatcher thread. Tasks run one at a time in
//! submission order; a panicking task is logged and the runner keeps going.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::error;

enum Task {
    Run(Box<dyn FnOnce() + Send>),
    Stop,
}

pub(crate) struct TaskRunner {
    queue: Mutex<Sender<Task>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskRunner {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Task>();
        let worker = thread::spawn(move || {
            while let Ok(task) = rx.recv() {
                match task {
                    Task::Run(f) => {
                        if catch_unwind(AssertUnwindSafe(f)).is_err() {
                            error!("task runner caught a panicking callback");
                        }
                    }
                    Task::Stop => break,
                }
            }
        });
        TaskRunner { queue: Mutex::new(tx), worker: Mutex::new(Some(worker)) }
    }

    /// Queue a task; returns immediately. No-op after [`TaskRunner::stop`].
    pub(crate) fn submit(&self, f: impl FnOnce() + Send + 'static) {
        let _ = self.queue.lock().send(Task::Run(Box::new(f)));
    }

    /// Stop after draining everything already queued. Idempotent.
    pub(crate) fn stop(&self) {
        let _ = self.queue.lock().send(Task::Stop);
        if let Some(worker) = self.worker.lock().take() {
            // A callback may stop its own runner; the worker exits on the
            // sentinel either way.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }

    /// Block until every task submitted so far has run.
    #[cfg(test)]
    pub(crate) fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        self.submit(move || {
            let _ = tx.send(());
        });
        let _ = rx.recv();
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
