//! Integration tests for the pdp11 binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow as _;
use clap as _;
use env_logger as _;
use log as _;
use pdp11 as _;
use pdp11_core as _;

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdp11"))
}

fn write_image(dir: &Path, name: &str, program: &[u16]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = program.iter().flat_map(|word| word.to_le_bytes()).collect();
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn boots_image_and_prints_to_stdout() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = write_image(
        temp_dir.path(),
        "rk0",
        &[
            0o012_737, 0o117, 0o177_566, // MOV #'O, @#XBUF
            0o105_737, 0o177_564, // TSTB @#XCSR
            0o100_375, // BPL .-4
            0o012_737, 0o113, 0o177_566, // MOV #'K, @#XBUF
            0o105_737, 0o177_564, // TSTB @#XCSR
            0o100_375, // BPL .-4
            0o000_000, // HALT
        ],
    );

    let output = Command::new(binary_path())
        .args(["--disk", image.to_str().unwrap(), "--max-steps", "1000000"])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pdp11");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"OK");
}

#[test]
fn dump_reports_halted_processor() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = write_image(temp_dir.path(), "rk0", &[0o012_700, 0o1234, 0o000_000]);

    let output = Command::new(binary_path())
        .args(["--disk", image.to_str().unwrap(), "--dump"])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pdp11");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("001234"), "{stderr}");
    assert!(stderr.contains("Halted"), "{stderr}");
}

#[test]
fn missing_disk_image_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let status = Command::new(binary_path())
        .args(["--disk", temp_dir.path().join("absent").to_str().unwrap()])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to run pdp11");

    assert!(!status.success());
}
