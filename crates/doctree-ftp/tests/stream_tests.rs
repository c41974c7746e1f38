mod common;

use std::io::{Read, Write};

use common::Scenario;
use doctree_ftp::FileSystemView;
use pretty_assertions::assert_eq;
use rstest::*;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn upload(view: &FileSystemView, path: &str, offset: u64, data: &[u8]) {
    let mut writer = view.get_file(path).create_output_stream(offset).unwrap();
    writer.write_all(data).unwrap();
    writer.flush().unwrap();
}

fn download(view: &FileSystemView, path: &str, offset: u64) -> Vec<u8> {
    let mut reader = view.get_file(path).create_input_stream(offset).unwrap();
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).unwrap();
    buf
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(65536)]
fn test_roundtrip_memory(#[case] len: usize) {
    let view = common::memory_view();
    let data = payload(len);

    upload(&view, "/data.bin", 0, &data);

    assert_eq!(download(&view, "/data.bin", 0), data);
    assert_eq!(view.get_file("/data.bin").size(), len as u64);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(65536)]
fn test_roundtrip_local(#[case] len: usize) {
    let (view, temp_dir) = common::local_view();
    let data = payload(len);

    upload(&view, "/data.bin", 0, &data);

    assert_eq!(download(&view, "/data.bin", 0), data);
    assert_eq!(std::fs::read(temp_dir.path().join("data.bin")).unwrap(), data);
}

#[rstest]
fn test_positive_offset_appends() {
    let scenario = Scenario::new();
    let view = scenario.view();

    upload(&view, "/docs/a.txt", 4, b"-more");
    assert_eq!(download(&view, "/docs/a.txt", 0), b"test-more");
}

#[rstest]
fn test_zero_offset_truncates() {
    let scenario = Scenario::new();
    let view = scenario.view();

    upload(&view, "/docs/a.txt", 0, b"x");
    assert_eq!(download(&view, "/docs/a.txt", 0), b"x");
    assert_eq!(view.get_file("/docs/a.txt").size(), 1);
}

#[rstest]
fn test_offset_modes_local() {
    let (view, temp_dir) = common::local_view();
    std::fs::write(temp_dir.path().join("log.txt"), b"one").unwrap();

    upload(&view, "/log.txt", 3, b"two");
    assert_eq!(download(&view, "/log.txt", 0), b"onetwo");

    upload(&view, "/log.txt", 0, b"three");
    assert_eq!(download(&view, "/log.txt", 0), b"three");
}

#[rstest]
#[case(0, b"test".as_slice())]
#[case(2, b"st".as_slice())]
#[case(4, b"".as_slice())]
#[case(100, b"".as_slice())]
fn test_read_from_offset(#[case] offset: u64, #[case] expected: &[u8]) {
    let scenario = Scenario::new();
    let view = scenario.view();
    assert_eq!(download(&view, "/docs/a.txt", offset), expected);
}

#[rstest]
fn test_write_creates_missing_file() {
    let scenario = Scenario::new();
    let mut view = scenario.view();
    assert!(view.change_working_directory("other"));

    upload(&view, "upload.txt", 0, b"hello");

    let created = scenario.child(&scenario.other, "upload.txt").unwrap();
    assert!(created.is_file());
    assert_eq!(download(&view, "/other/upload.txt", 0), b"hello");
}

#[rstest]
fn test_write_denied_without_parent_grant() {
    let scenario = Scenario::new();
    scenario
        .provider
        .set_permissions(&scenario.other, true, false)
        .unwrap();
    let view = scenario.view();

    assert!(view
        .get_file("/other/upload.txt")
        .create_output_stream(0)
        .is_none());
    assert!(scenario.child(&scenario.other, "upload.txt").is_none());
}

#[rstest]
fn test_write_into_missing_directory_fails() {
    let scenario = Scenario::new();
    let view = scenario.view();
    assert!(view
        .get_file("/nowhere/upload.txt")
        .create_output_stream(0)
        .is_none());
}

#[rstest]
#[case("/docs")]
#[case("/")]
fn test_directories_have_no_streams(#[case] path: &str) {
    let scenario = Scenario::new();
    let view = scenario.view();
    let dir = view.get_file(path);
    assert!(dir.create_input_stream(0).is_none());
    assert!(dir.create_output_stream(0).is_none());
}

#[rstest]
fn test_read_missing_file_fails() {
    let scenario = Scenario::new();
    let view = scenario.view();

    let missing = view.get_file("/docs/missing.txt");
    // Readable through the parent, but there is nothing to open
    assert!(missing.is_readable());
    assert!(missing.create_input_stream(0).is_none());
}

#[rstest]
fn test_read_denied_without_grant() {
    let scenario = Scenario::new();
    let a = scenario.child(&scenario.docs, "a.txt").unwrap();
    scenario.provider.set_permissions(&a, false, true).unwrap();
    let view = scenario.view();

    assert!(view.get_file("/docs/a.txt").create_input_stream(0).is_none());
}

#[rstest]
fn test_dropped_writer_flushes() {
    let view = common::memory_view();
    {
        let mut writer = view.get_file("/late.txt").create_output_stream(0).unwrap();
        writer.write_all(b"buffered").unwrap();
    }
    assert_eq!(download(&view, "/late.txt", 0), b"buffered");
}

#[rstest]
fn test_stream_survives_later_deletion() {
    let scenario = Scenario::new();
    let view = scenario.view();

    let mut reader = view.get_file("/docs/a.txt").create_input_stream(0).unwrap();
    assert!(view.get_file("/docs/a.txt").delete());

    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"test");
}
