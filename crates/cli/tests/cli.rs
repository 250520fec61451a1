//! End-to-end tests driving the built `siew` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn siew() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_siew"));
    // Point HOME at an empty directory so a developer's ~/.siew.toml cannot
    // leak into the assertions.
    command.env("HOME", std::env::temp_dir());
    command
}

fn write_script(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".siew")
        .tempfile()
        .expect("temp file");
    write!(file, "{}", source).expect("write script");
    file
}

fn run_script(source: &str) -> Output {
    let script = write_script(source);
    siew().arg(script.path()).output().expect("run siew")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_prints_expression_result() {
    let output = run_script("1 + 2 * 3");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "7\n");
}

#[test]
fn test_grouping_and_unary() {
    assert_eq!(stdout_of(&run_script("(1 + 2) * 3")), "9\n");
    assert_eq!(stdout_of(&run_script("-(5 - 1)")), "-4\n");
    assert_eq!(stdout_of(&run_script("!true")), "false\n");
    assert_eq!(stdout_of(&run_script("!(5 - 4 > 3 * 2 == !nil)")), "true\n");
}

#[test]
fn test_string_concatenation() {
    let output = run_script("\"st\" + \"ri\" + \"ng\"");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "string\n");
}

#[test]
fn test_runtime_error_exits_70() {
    let output = run_script("1 + \"x\"");
    assert_eq!(output.status.code(), Some(70));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Operands must be numbers or strings."));
    assert!(stderr.contains("[line 1] in script"));
    assert_eq!(stdout_of(&output), "");
}

#[test]
fn test_compile_error_exits_65() {
    let output = run_script("1 +");
    assert_eq!(output.status.code(), Some(65));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[line 1] Error at end: Expect expression."));
}

#[test]
fn test_compile_error_names_the_offending_token() {
    let output = run_script("1 ! 2");
    assert_eq!(output.status.code(), Some(65));
    assert!(stderr_of(&output).contains("Error at '!'"));
}

#[test]
fn test_lexical_error_has_no_location_clause() {
    let output = run_script("@");
    assert_eq!(output.status.code(), Some(65));
    assert!(stderr_of(&output).contains("[line 1] Error: Unexpected character."));
}

#[test]
fn test_missing_file_exits_74() {
    let output = siew()
        .arg("definitely/not/a/real/file.siew")
        .output()
        .expect("run siew");
    assert_eq!(output.status.code(), Some(74));
    assert!(stderr_of(&output).contains("Could not open file"));
}

#[test]
fn test_extra_arguments_exit_64() {
    let output = siew().arg("one.siew").arg("two.siew").output().expect("run siew");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn test_help_exits_zero() {
    let output = siew().arg("--help").output().expect("run siew");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Usage"));
}

#[test]
fn test_repl_over_a_pipe() {
    let mut child = siew()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn siew");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"1 + 2\n\"a\" + \"b\"\n")
        .expect("write to repl");
    let output = child.wait_with_output().expect("wait for siew");

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("siew> "));
    assert!(stdout.contains("3\n"));
    assert!(stdout.contains("ab\n"));
}

#[test]
fn test_repl_keeps_going_after_errors() {
    let mut child = siew()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn siew");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"1 +\n1 + nil\n40 + 2\n")
        .expect("write to repl");
    let output = child.wait_with_output().expect("wait for siew");

    assert!(output.status.success());
    assert!(stdout_of(&output).contains("42\n"));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Expect expression."));
    assert!(stderr.contains("Operands must be numbers."));
}

#[test]
fn test_dump_bytecode_goes_to_stderr() {
    let script = write_script("1 + 2 * 3");
    let output = siew()
        .arg("--dump-bytecode")
        .arg(script.path())
        .output()
        .expect("run siew");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "7\n");
    let stderr = stderr_of(&output);
    assert!(stderr.contains("== code =="));
    assert!(stderr.contains("CONSTANT"));
    assert!(stderr.contains("MULTIPLY"));
    assert!(stderr.contains("RETURN"));
}

#[test]
fn test_trace_goes_to_stderr() {
    let script = write_script("1 + 2");
    let output = siew()
        .arg("--trace")
        .arg(script.path())
        .output()
        .expect("run siew");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "3\n");
    let stderr = stderr_of(&output);
    assert!(stderr.contains("ADD"));
    assert!(stderr.contains("[ 1 ][ 2 ]"));
}
