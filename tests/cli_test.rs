//! Tests for the ptxc binary: exit codes and output files.

mod common;

use std::io::Write;
use std::process::{Command, Stdio};

use common::{write_file, LIBRARY_KERNEL, PLAIN_KERNEL};

fn ptxc() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ptxc"));
    command.env_remove("PTXC_LIBDEVICE");
    command
}

#[test]
fn compiles_with_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "foo.ll", PLAIN_KERNEL);
    let output = dir.path().join("out.ptx");

    let status = ptxc()
        .arg("-O2")
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(output.exists());
}

#[test]
fn invalid_level_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "foo.ll", PLAIN_KERNEL);

    let result = ptxc().arg("-O9").arg(&input).output().unwrap();

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("-O9"));
    assert!(!dir.path().join("foo.ptx").exists());
}

#[test]
fn missing_library_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "kernel.ll", LIBRARY_KERNEL);
    let missing = dir.path().join("libdevice.10.bc");

    let result = ptxc()
        .arg("--libdevice")
        .arg(&missing)
        .arg(&input)
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("libdevice.10.bc"));
    assert!(!dir.path().join("kernel.ptx").exists());
}

#[test]
fn malformed_input_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "bad.ll", "not llvm ir at all\n");

    let result = ptxc().arg(&input).output().unwrap();

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("bad.ll"));
    assert!(!dir.path().join("bad.ptx").exists());
}

#[test]
fn stdin_input_goes_to_stdout() {
    let mut child = ptxc()
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(PLAIN_KERNEL.as_bytes())
        .unwrap();

    let result = child.wait_with_output().unwrap();
    assert_eq!(result.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&result.stdout).contains(".target"));
}

#[test]
fn malformed_stdin_is_named_in_diagnostic() {
    let mut child = ptxc()
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"define void @f() {\n  frobnicate\n}\n")
        .unwrap();

    let result = child.wait_with_output().unwrap();
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("<stdin>"));
    assert!(result.stdout.is_empty());
}

#[test]
fn legacy_mcpu_spelling_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "foo.ll", PLAIN_KERNEL);

    let status = ptxc()
        .args(["-mcpu", "sm_70"])
        .arg(&input)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(dir.path().join("foo.ptx").exists());
}
