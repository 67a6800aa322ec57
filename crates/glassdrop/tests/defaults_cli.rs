use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn print_config_emits_bundled_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_glassdrop"))
        .arg("--print-config")
        .output()
        .expect("failed to run glassdrop --print-config");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    assert!(stdout.contains("waveSpeed"));
    assert!(stdout.contains("colorNum = 4"));
    assert!(stdout.contains("pixelSize = 2"));
    assert!(stdout.contains("chromaticAberration"));
}

#[test]
fn print_config_reads_a_config_file() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("effects.toml");
    fs::write(
        &config_path,
        "[dither]\ncolorNum = 8\npixelSize = 3\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_glassdrop"))
        .arg("--print-config")
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("failed to run glassdrop");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    assert!(stdout.contains("colorNum = 8"));
    assert!(stdout.contains("pixelSize = 3"));
}

#[test]
fn invalid_config_file_fails_with_context() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("effects.toml");
    fs::write(&config_path, "[dither]\ncolorNum = 1\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_glassdrop"))
        .arg("--print-config")
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("failed to run glassdrop");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("colorNum"));
}

#[test]
fn missing_config_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_glassdrop"))
        .arg("--print-config")
        .arg("--config")
        .arg("/nonexistent/effects.toml")
        .output()
        .expect("failed to run glassdrop");

    assert!(!output.status.success());
}
