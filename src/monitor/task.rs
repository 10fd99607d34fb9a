// Stowage: backups for container data volumes.
// Copyright 2026 Stowage contributors.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Tasks: named, possibly long-running units of work with progress.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Weak};

/// The tasks started through a monitor, held weakly so that they drop out
/// of the list when they finish.
#[derive(Default)]
pub struct TaskList {
    tasks: Vec<Weak<TaskInner>>,
}

impl TaskList {
    pub fn start_task(&mut self, name: String) -> Task {
        let inner = Arc::new(TaskInner {
            name,
            total: 0.into(),
            done: 0.into(),
        });
        self.tasks.push(Arc::downgrade(&inner));
        Task(inner)
    }

    /// Tasks that are still running.
    pub fn active_tasks(&mut self) -> impl Iterator<Item = Task> {
        let mut v = Vec::new();
        self.tasks.retain(|task| {
            if let Some(inner) = task.upgrade() {
                v.push(Task(inner));
                true
            } else {
                false
            }
        });
        v.into_iter()
    }
}

#[derive(Debug, Clone)]
pub struct Task(Arc<TaskInner>);

impl Task {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn set_total(&self, total: usize) {
        self.0.total.store(total, Relaxed)
    }

    pub fn increment(&self, increment: usize) {
        self.0.done.fetch_add(increment, Relaxed);
    }

    /// Units done and total units, if known.
    pub fn progress(&self) -> (usize, usize) {
        (self.0.done.load(Relaxed), self.0.total.load(Relaxed))
    }
}

#[derive(Debug)]
struct TaskInner {
    name: String,
    total: AtomicUsize,
    done: AtomicUsize,
}
