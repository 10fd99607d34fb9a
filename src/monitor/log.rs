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

//! A monitor that reports through `tracing`, for non-interactive use such as
//! the command line run from a scheduler.

use std::sync::Mutex;

use tracing::{debug, warn};

use super::task::{Task, TaskList};
use super::Monitor;
use crate::counters::{Counter, Counters};
use crate::Error;

/// Logs errors and task starts, and keeps counter totals for a final
/// summary.
#[derive(Default)]
pub struct LogMonitor {
    counters: Counters,
    task_list: Mutex<TaskList>,
}

impl LogMonitor {
    pub fn new() -> Self {
        LogMonitor::default()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Log all non-zero counters at debug level.
    pub fn log_counters(&self) {
        for (counter, value) in self.counters.iter().filter(|(_, v)| *v > 0) {
            debug!(?counter, value);
        }
    }
}

impl Monitor for LogMonitor {
    fn count(&self, counter: Counter, increment: usize) {
        self.counters.count(counter, increment)
    }

    fn set_counter(&self, counter: Counter, value: usize) {
        self.counters.set(counter, value)
    }

    fn error(&self, error: Error) {
        warn!(category = %error.category(), "{error}");
    }

    fn start_task(&self, name: String) -> Task {
        debug!(task = %name, "Start");
        match self.task_list.lock() {
            Ok(mut list) => list.start_task(name),
            Err(_) => TaskList::default().start_task(name),
        }
    }
}
