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

//! Run the stowage CLI as a subprocess and test it.

use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use indoc::formatdoc;
use predicates::prelude::*;

mod restore;

fn run_stowage() -> Command {
    Command::cargo_bin("stowage").expect("locate stowage binary")
}

/// A deployment on disk with a config file, for driving the binary.
struct Deployment {
    dir: TempDir,
}

impl Deployment {
    fn new(volumes: &[&str]) -> Deployment {
        let dir = TempDir::new().unwrap();
        dir.child("etc").create_dir_all().unwrap();
        dir.child("etc/app.conf").write_str("port = 80\n").unwrap();
        let mut volume_tables = String::new();
        for name in volumes {
            dir.child(format!("vols/{name}")).create_dir_all().unwrap();
            volume_tables.push_str(&format!("\n[[volumes]]\nname = \"{name}\"\n"));
        }
        dir.child("stowage.toml")
            .write_str(&formatdoc! {r#"
                backup_root = "backups"
                config_dir = "etc"
                volumes_root = "vols"
                hostname = "clitest"
                {volume_tables}
            "#})
            .unwrap();
        Deployment { dir }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.child("stowage.toml").path().to_owned()
    }

    fn volume_file(&self, volume: &str, name: &str) -> assert_fs::fixture::ChildPath {
        self.dir.child(format!("vols/{volume}/{name}"))
    }

    fn backup_root(&self) -> PathBuf {
        self.dir.child("backups").path().to_owned()
    }

    /// A command with `--config` already set.
    fn stowage(&self) -> Command {
        let mut command = run_stowage();
        command.arg("--config").arg(self.config_path());
        command
    }

    /// Make a backup and return its id, parsed from the json result.
    fn backup(&self, backup_type: &str) -> String {
        let output = self
            .stowage()
            .args(["--json", "backup", backup_type])
            .output()
            .unwrap();
        assert!(output.status.success(), "{output:?}");
        let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        result["id"].as_str().unwrap().to_owned()
    }
}

#[test]
fn no_args() {
    run_stowage()
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn help() {
    run_stowage()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("restore"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    run_stowage()
        .arg("--config")
        .arg(dir.child("nope.toml").path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read configuration file"));
}

#[test]
fn list_empty_root() {
    let deployment = Deployment::new(&["db"]);
    deployment
        .stowage()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
