// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Multiplex waits over real pipes

use std::time::{Duration, Instant};

use oscore_select::{wait, wait_in_place, DescriptorSet, Timeout, WaitError};
use oscore_test_utils::{write_all, Pipe, TestLogger};
use serial_test::serial;

#[test]
#[serial]
fn test_ready_pipe_without_timeout_returns_one() {
    let mut logger = TestLogger::new("test_ready_pipe_without_timeout_returns_one").unwrap();
    let ready = Pipe::new().unwrap();
    let idle = Pipe::new().unwrap();
    write_all(ready.write_fd(), b"data").unwrap();

    let interest = DescriptorSet::from_fds([ready.read_fd(), idle.read_fd()]).unwrap();
    let started = Instant::now();
    let outcome = wait(Some(&interest), None, None, Timeout::Indefinite).unwrap();
    logger.log_json("outcome", &outcome).unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.ready, 1);
    let read = outcome.read.unwrap();
    assert!(read.contains(ready.read_fd()));
    assert!(!read.contains(idle.read_fd()));
    assert_eq!(read.max(), Some(ready.read_fd()));

    // The caller's set is reusable as it was
    assert!(interest.contains(idle.read_fd()));
    assert_eq!(interest.len(), 2);
    logger.finish_success().unwrap();
}

#[test]
#[serial]
fn test_zero_timeout_with_nothing_ready_returns_immediately() {
    let idle = Pipe::new().unwrap();
    let interest = DescriptorSet::from_fds([idle.read_fd()]).unwrap();

    let started = Instant::now();
    let outcome = wait(Some(&interest), None, None, Timeout::Micros(0)).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(outcome.ready, 0);
    assert!(outcome.read.unwrap().is_empty());
}

#[test]
#[serial]
fn test_short_timeout_elapses() {
    let idle = Pipe::new().unwrap();
    let interest = DescriptorSet::from_fds([idle.read_fd()]).unwrap();

    let started = Instant::now();
    let outcome = wait(
        Some(&interest),
        None,
        None,
        Timeout::SecsMicros { secs: 0, micros: 50_000 },
    )
    .unwrap();
    assert_eq!(outcome.ready, 0);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
#[serial]
fn test_in_place_overwrites_caller_sets() {
    let ready = Pipe::new().unwrap();
    let idle = Pipe::new().unwrap();
    write_all(ready.write_fd(), b"x").unwrap();

    let mut read = DescriptorSet::from_fds([ready.read_fd(), idle.read_fd()]).unwrap();
    let mut write = DescriptorSet::from_fds([ready.write_fd()]).unwrap();
    let count = wait_in_place(Some(&mut read), Some(&mut write), None, Timeout::ZERO).unwrap();

    assert_eq!(count, 2);
    assert_eq!(read.iter().collect::<Vec<_>>(), vec![ready.read_fd()]);
    assert_eq!(read.max(), Some(ready.read_fd()));
    assert_eq!(write.iter().collect::<Vec<_>>(), vec![ready.write_fd()]);
}

#[test]
#[serial]
fn test_negative_timeouts_in_either_encoding_are_rejected() {
    let ready = Pipe::new().unwrap();
    write_all(ready.write_fd(), b"x").unwrap();
    let mut read = DescriptorSet::from_fds([ready.read_fd()]).unwrap();

    for timeout in [Timeout::Micros(-1), Timeout::SecsMicros { secs: 1, micros: -1 }] {
        let err = wait_in_place(Some(&mut read), None, None, timeout).unwrap_err();
        assert!(matches!(err, WaitError::NegativeTimeout { .. }));
    }
    assert!(read.contains(ready.read_fd()));
}

#[test]
#[serial]
fn test_closed_descriptor_reports_wait_failure() {
    let pipe = Pipe::new().unwrap();
    let fd = pipe.read_fd();
    drop(pipe);

    let interest = DescriptorSet::from_fds([fd]).unwrap();
    let err = wait(Some(&interest), None, None, Timeout::ZERO).unwrap_err();
    assert_eq!(err, WaitError::Select { source: nix::errno::Errno::EBADF });
    assert!(err.to_string().starts_with("wait failed"));
}

#[test]
#[serial]
fn test_outcome_serializes_members() {
    let ready = Pipe::new().unwrap();
    write_all(ready.write_fd(), b"x").unwrap();
    let interest = DescriptorSet::from_fds([ready.read_fd()]).unwrap();
    let outcome = wait(Some(&interest), None, None, Timeout::ZERO).unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["ready"], 1);
    assert_eq!(json["read"], serde_json::json!([ready.read_fd()]));
    assert!(json["write"].is_null());
}
