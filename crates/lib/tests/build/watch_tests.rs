//! Tests for the polling watch loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use assetgen_lib::{WatchOptions, WatchSummary, Watcher};

use super::common::Project;

const CONFIG: &str = "output.directory: out\ngenerate:\n  - a.txt:\n      type: binary\n      source: a.src\n";

fn quick() -> WatchOptions {
  WatchOptions {
    interval: Duration::from_millis(1),
    cooldown: Duration::from_millis(1),
  }
}

#[test]
fn defaults_poll_every_second() {
  let options = WatchOptions::default();
  assert_eq!(options.interval, Duration::from_secs(1));
  assert_eq!(options.cooldown, Duration::from_secs(3));
}

#[test]
fn run_builds_until_stopped() {
  let project = Project::new(CONFIG);
  project.source("a.src", "a");
  let mut watcher = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path)).unwrap();

  let mut remaining = 3;
  let summary = watcher.run(|| {
    if remaining == 0 {
      return true;
    }
    remaining -= 1;
    false
  });

  assert_eq!(
    summary,
    WatchSummary {
      iterations: 3,
      aborts: 0,
      reloads: 0,
    }
  );
  assert_eq!(project.read("out/a.txt"), "a");
}

#[test]
fn abort_is_survived() {
  let project = Project::new(CONFIG);
  let mut watcher = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path)).unwrap();
  let mut summary = WatchSummary::default();

  assert!(!watcher.poll(&mut summary));
  assert_eq!(summary.aborts, 1);

  project.source("a.src", "late");
  assert!(watcher.poll(&mut summary));
  assert_eq!(project.read("out/a.txt"), "late");
}

#[test]
fn config_change_reloads_engine() {
  let project = Project::new(CONFIG);
  project.source("a.src", "a");
  project.source("b.src", "b");
  let mut watcher = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path)).unwrap();
  let mut summary = WatchSummary::default();

  assert!(watcher.poll(&mut summary));
  assert!(!project.path("out/b.txt").exists());

  project.write_config(&format!("{}  - b.txt:\n      type: binary\n      source: b.src\n", CONFIG));
  project.touch("assetgen.yaml", 10);
  assert!(watcher.poll(&mut summary));
  assert_eq!(summary.reloads, 1);

  assert!(watcher.poll(&mut summary));
  assert_eq!(project.read("out/b.txt"), "b");
}

#[test]
fn broken_config_pauses_until_fixed() {
  let project = Project::new(CONFIG);
  project.source("a.src", "a");
  let mut watcher = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path)).unwrap();
  let mut summary = WatchSummary::default();
  assert!(watcher.poll(&mut summary));

  project.write_config("output.directory: out\n");
  project.touch("assetgen.yaml", 10);
  assert!(!watcher.poll(&mut summary));
  assert_eq!(watcher.engines().count(), 0);

  // Nothing to run and no change: stays idle without further errors.
  assert!(watcher.poll(&mut summary));
  assert_eq!(summary.aborts, 1);

  project.write_config(CONFIG);
  project.touch("assetgen.yaml", 20);
  assert!(watcher.poll(&mut summary));
  assert_eq!(watcher.engines().count(), 1);
  assert_eq!(summary.reloads, 2);
}

#[test]
fn initial_open_failure_is_fatal() {
  let project = Project::new("output.directory: out\n");
  let result = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path));
  assert!(result.is_err());
}

#[test]
fn abort_is_followed_by_the_cooldown() {
  let project = Project::new(CONFIG);
  let options = WatchOptions {
    interval: Duration::from_millis(1),
    cooldown: Duration::from_millis(300),
  };
  let mut watcher = Watcher::new(&[project.config_path()], options, |path| project.open_at(path)).unwrap();

  let mut remaining = 1;
  let started = Instant::now();
  let summary = watcher.run(|| {
    if remaining == 0 {
      return true;
    }
    remaining -= 1;
    false
  });

  assert_eq!(summary.aborts, 1);
  assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn clean_iteration_waits_only_the_interval() {
  let project = Project::new(CONFIG);
  project.source("a.src", "a");
  let options = WatchOptions {
    interval: Duration::from_millis(1),
    cooldown: Duration::from_secs(30),
  };
  let mut watcher = Watcher::new(&[project.config_path()], options, |path| project.open_at(path)).unwrap();

  let mut remaining = 1;
  let started = Instant::now();
  let summary = watcher.run(|| {
    if remaining == 0 {
      return true;
    }
    remaining -= 1;
    false
  });

  assert_eq!(summary.aborts, 0);
  assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
fn interrupt_is_not_an_abort_and_stops_the_loop() {
  let mut project = Project::new(CONFIG);
  project.source("a.src", "a");
  let flag = Arc::new(AtomicBool::new(true));
  project.interrupt = Some(Arc::clone(&flag));
  let mut watcher = Watcher::new(&[project.config_path()], quick(), |path| project.open_at(path)).unwrap();

  let mut summary = WatchSummary::default();
  assert!(watcher.poll(&mut summary));
  assert_eq!(summary.aborts, 0);
  assert!(!project.path("out/a.txt").exists());

  let summary = watcher.run(|| flag.load(Ordering::Relaxed));
  assert_eq!(summary.iterations, 0);
}
