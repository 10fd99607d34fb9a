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

//! A monitor that discards everything.

use super::task::{Task, TaskList};
use super::Monitor;
use crate::counters::Counter;

#[derive(Debug, Clone)]
pub struct VoidMonitor;

impl Monitor for VoidMonitor {
    fn count(&self, _counter: Counter, _increment: usize) {}

    fn set_counter(&self, _counter: Counter, _value: usize) {}

    fn error(&self, _error: crate::Error) {}

    fn start_task(&self, name: String) -> Task {
        // The task is forgotten as soon as the caller drops it.
        TaskList::default().start_task(name)
    }
}
