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

use std::fs;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;

use super::Deployment;

#[test]
fn restore_conflict_then_force() {
    let deployment = Deployment::new(&["db"]);
    deployment.volume_file("db", "table").write_str("saved").unwrap();
    let id = deployment.backup("full");
    deployment.volume_file("db", "table").write_str("changed").unwrap();
    deployment.volume_file("db", "junk").write_str("stale").unwrap();

    deployment
        .stowage()
        .args(["restore", &id, "--component", "volume:db"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("skipped  volume:db"));
    deployment.volume_file("db", "table").assert("changed");

    deployment
        .stowage()
        .args(["restore", &id, "-C", "volume:db", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored volume:db"));
    deployment.volume_file("db", "table").assert("saved");
    deployment.volume_file("db", "junk").assert(predicate::path::missing());
}

#[test]
fn restore_into_empty_volume() {
    let deployment = Deployment::new(&["db"]);
    deployment.volume_file("db", "table").write_str("saved").unwrap();
    let id = deployment.backup("full");
    fs::remove_file(deployment.volume_file("db", "table").path()).unwrap();

    deployment
        .stowage()
        .args(["--json", "restore", &id, "--component", "volume:db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"checksum\": \"verified\""));
    deployment.volume_file("db", "table").assert("saved");
}

#[test]
fn restore_dry_run_shows_plan() {
    let deployment = Deployment::new(&["db", "web"]);
    let full = deployment.backup("full");
    let incr = deployment.backup("incremental");
    deployment
        .stowage()
        .args(["restore", &incr, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("volume:web").and(predicate::str::contains(full)));
}

#[test]
fn bad_component_name_is_a_usage_error() {
    let deployment = Deployment::new(&["db"]);
    deployment
        .stowage()
        .args(["restore", "anything", "--component", "volume:"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid component"));
}
