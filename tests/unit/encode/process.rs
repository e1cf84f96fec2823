use super::*;

#[test]
fn missing_program_is_a_terminal_encoder_error() {
    let mut cmd = Command::new("sketchcast-definitely-missing-binary");
    let err = run_checked(&mut cmd, "missing", None).unwrap_err();
    assert!(matches!(err, SketchError::Encoder { transient: false, .. }));
    assert!(err.to_string().contains("PATH"));
}

#[test]
fn stderr_tail_keeps_the_end() {
    let long = format!("{}END", "x".repeat(5000));
    let tail = stderr_tail(long.as_bytes());
    assert_eq!(tail.len(), STDERR_TAIL_BYTES);
    assert!(tail.ends_with("END"));
}

#[cfg(unix)]
#[test]
fn non_zero_exit_reports_stderr() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo broken pipe >&2; exit 3"]);
    let err = run_checked(&mut cmd, "sh", Some(Duration::from_secs(10))).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("broken pipe"), "{msg}");
    assert!(!err.is_transient());
}

#[cfg(unix)]
#[test]
fn deadline_kills_and_is_transient() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "sleep 5"]);
    let started = Instant::now();
    let err = run_checked(&mut cmd, "sh", Some(Duration::from_millis(100))).unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[test]
fn captures_stdout() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "printf hello"]);
    let out = run_checked(&mut cmd, "sh", Some(Duration::from_secs(10))).unwrap();
    assert_eq!(out.stdout, b"hello");
}
