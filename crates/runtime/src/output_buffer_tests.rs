// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn append_under_cap_is_never_truncated() {
    let mut buf = OutputBuffer::new(16);
    buf.append(b"hello");
    assert_eq!(buf.as_str(), "hello");
    assert!(!buf.is_truncated());
    assert_eq!(buf.len(), 5);
}

#[test]
fn append_past_cap_drops_from_the_head_and_sets_truncated() {
    let mut buf = OutputBuffer::new(5);
    buf.append(b"abcde");
    buf.append(b"fgh");
    assert_eq!(buf.as_str(), "defgh");
    assert!(buf.is_truncated());
    assert!(buf.len() <= 5);
}

#[test]
fn len_never_exceeds_cap_i5() {
    let mut buf = OutputBuffer::new(4);
    for _ in 0..1000 {
        buf.append(b"xy");
        assert!(buf.len() <= 4);
    }
}

#[test]
fn read_from_before_the_window_reports_the_actual_start_and_truncated_flag() {
    let mut buf = OutputBuffer::new(5);
    buf.append(b"abcdefgh");
    let result = buf.read(0);
    assert_eq!(result.data, "defgh");
    assert_eq!(result.offset, 3);
    assert!(result.truncated);
}

#[test]
fn read_from_within_the_window_returns_only_the_tail() {
    let mut buf = OutputBuffer::new(10);
    buf.append(b"0123456789");
    let result = buf.read(5);
    assert_eq!(result.data, "56789");
    assert!(!result.truncated);
}

#[test]
fn last_byte_emitted_is_the_last_byte_of_the_buffer_scenario_6() {
    let mut buf = OutputBuffer::new(1024 * 1024);
    let chunk = vec![b'x'; 3 * 1024 * 1024];
    buf.append(&chunk);
    assert!(buf.is_truncated());
    assert_eq!(buf.len(), 1024 * 1024);
    assert_eq!(buf.as_str().chars().last(), Some('x'));
}
