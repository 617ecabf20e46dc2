//! CLI integration tests for fieldmatch
//!
//! Runs the fieldmatch binary on synthetic Y4M files and checks its output.

mod common;

use common::{interlaced_clip, native_clip, pulldown_fields};
use fieldmatch::format::{read_y4m, write_y4m, Y4mClip};
use fieldmatch::util::FieldOrder;
use fieldmatch::{FrameSource, PipelineConfig};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

// ============================================================================
// Helper Functions
// ============================================================================

fn run_fieldmatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fieldmatch"))
        .args(args)
        .output()
        .expect("Failed to execute fieldmatch")
}

fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// 3:2 pulldown input of `frames` frames plus its field-rate counterpart
fn write_inputs(frames: usize) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let fields = pulldown_fields(&[2, 3, 2, 3], 0, 2 * frames + 4);
    let input = dir.path().join("telecined.y4m");
    let native = dir.path().join("native.y4m");
    write_y4m(&input, &interlaced_clip(&fields, frames)).unwrap();
    write_y4m(&native, &native_clip(&fields, 2 * frames)).unwrap();
    (dir, input, native)
}

fn frame_count(path: &Path) -> usize {
    match read_y4m(path, FieldOrder::TopFieldFirst).unwrap() {
        Y4mClip::Eight(clip) => clip.num_frames(),
        Y4mClip::Deep(clip) => clip.num_frames(),
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_help() {
    let output = run_fieldmatch(&["--help"]);
    assert!(output.status.success());
    let stdout = stdout_string(&output);
    for command in ["analyze", "telecine", "switch", "merge", "config"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_analyze_json() {
    let (_dir, input, _) = write_inputs(20);
    let output = run_fieldmatch(&["analyze", arg(&input), "--json"]);
    assert!(output.status.success(), "{}", stderr_string(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout_string(&output)).unwrap();
    let cycles = report.as_array().unwrap();
    assert_eq!(cycles.len(), 4);
    assert_eq!(cycles[1]["pattern"], 0);
    assert_eq!(cycles[1]["cost"], 0.0);
}

#[test]
fn test_analyze_writes_flag_overlay() {
    let (dir, input, _) = write_inputs(10);
    let flags = dir.path().join("flags.y4m");
    let output = run_fieldmatch(&["analyze", arg(&input), "--flags", arg(&flags)]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert!(stdout_string(&output).contains("2-3-2-3"));
    assert_eq!(frame_count(&flags), 10);
}

#[test]
fn test_telecine_command() {
    let (dir, input, _) = write_inputs(20);
    let out = dir.path().join("film.y4m");
    let output = run_fieldmatch(&["telecine", arg(&input), "-o", arg(&out)]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert_eq!(frame_count(&out), 16);

    let out = dir.path().join("decombed.y4m");
    let output = run_fieldmatch(&["telecine", arg(&input), "-o", arg(&out), "--decomb"]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert_eq!(frame_count(&out), 16);
}

#[test]
fn test_telecine_show_blocks() {
    let (dir, input, _) = write_inputs(20);
    let out = dir.path().join("blocks.y4m");
    let output = run_fieldmatch(&[
        "telecine",
        arg(&input),
        "-o",
        arg(&out),
        "--decomb",
        "--show-blocks",
    ]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert_eq!(frame_count(&out), 16);

    // clean film has no dirty blocks to paint
    let decombed = dir.path().join("decombed.y4m");
    run_fieldmatch(&["telecine", arg(&input), "-o", arg(&decombed), "--decomb"]);
    assert_eq!(std::fs::read(&out).unwrap(), std::fs::read(&decombed).unwrap());

    let output = run_fieldmatch(&["telecine", arg(&input), "-o", arg(&out), "--show-blocks"]);
    assert!(!output.status.success());
}

#[test]
fn test_switch_command() {
    let (dir, input, native) = write_inputs(20);
    let out = dir.path().join("adaptive.y4m");
    let output = run_fieldmatch(&[
        "-v",
        "switch",
        arg(&input),
        "--native",
        arg(&native),
        "-o",
        arg(&out),
    ]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert_eq!(frame_count(&out), 40);
}

#[test]
fn test_merge_command() {
    let (dir, input, native) = write_inputs(20);
    let out = dir.path().join("merged.y4m");
    let output = run_fieldmatch(&[
        "merge",
        arg(&input),
        "--native",
        arg(&native),
        "-o",
        arg(&out),
    ]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    assert_eq!(frame_count(&out), 40);

    let output = run_fieldmatch(&["merge", arg(&input), "--native", arg(&input), "-o", arg(&out)]);
    assert!(!output.status.success());
}

#[test]
fn test_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, r#"{ "switch": { "cost_threshold": 0.5 } }"#).unwrap();

    let output = run_fieldmatch(&["--config", arg(&path), "config"]);
    assert!(output.status.success(), "{}", stderr_string(&output));
    let config = PipelineConfig::from_json_str(&stdout_string(&output)).unwrap();
    assert_eq!(config.switch.cost_threshold, 0.5);
    assert_eq!(config.decomb, PipelineConfig::default().decomb);

    std::fs::write(&path, r#"{ "decomb": { "ratio1": 9 } }"#).unwrap();
    let output = run_fieldmatch(&["--config", arg(&path), "config"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_input() {
    let output = run_fieldmatch(&["analyze", "/nonexistent/input.y4m"]);
    assert!(!output.status.success());
    assert!(stderr_string(&output).contains("input.y4m"));
}
