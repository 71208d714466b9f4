//! Integration tests for sfvoice-cli.
//!
//! Runs the `sfvoice` binary end to end against temporary directories.

use std::process::Command;

use tempfile::TempDir;

/// Helper to get the path to the `sfvoice` binary built by cargo.
fn sfvoice_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sfvoice"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn render_writes_float_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("note.wav");

    let output = sfvoice_bin()
        .current_dir(dir.path())
        .args(["render", "--hold", "0.5", "--tail", "0.25", "--key", "64"])
        .arg(&out)
        .output()
        .expect("failed to run sfvoice render");
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let mut reader = hound::WavReader::open(&out).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);

    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    // 0.75 s rounded up to whole 64-frame blocks, two channels
    assert_eq!(samples.len(), (345 + 173) * 64 * 2);
    assert!(samples.iter().all(|s| s.is_finite()));
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.01 && peak < 1.0, "peak {peak}");
}

#[test]
fn render_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().join("engine.toml");
    std::fs::write(&cfg, "[audio]\nsample_rate = 22050\nbuffer_size = 128\n").unwrap();
    let out = dir.path().join("note.wav");

    let status = sfvoice_bin()
        .current_dir(dir.path())
        .args(["render", "--hold", "0.1", "--tail", "0", "--config"])
        .arg(&cfg)
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let reader = hound::WavReader::open(&out).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    // ceil(0.1 * 22050 / 128) = 18 blocks
    assert_eq!(reader.duration(), 18 * 128);
}

#[test]
fn render_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().join("engine.toml");
    std::fs::write(&cfg, "[audio]\nbuffer_size = 0\n").unwrap();

    let output = sfvoice_bin()
        .current_dir(dir.path())
        .args(["render", "--config"])
        .arg(&cfg)
        .arg(dir.path().join("x.wav"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("audio.buffer_size"), "stderr: {stderr}");
}

#[test]
fn inspect_lists_generators() {
    let dir = TempDir::new().unwrap();
    let output = sfvoice_bin()
        .current_dir(dir.path())
        .args(["inspect", "--key", "72"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sample 'demo-cycle'"), "stdout: {stdout}");
    assert!(stdout.contains("key 72"), "stdout: {stdout}");
    assert!(stdout.contains("sampleModes"), "stdout: {stdout}");
    assert!(stdout.contains("initialFilterFc"), "stdout: {stdout}");
}

#[test]
fn config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf").join("sfvoice.toml");

    let status = sfvoice_bin()
        .args(["config", "init"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(path.exists());

    // refuses to overwrite without --force
    let status = sfvoice_bin()
        .args(["config", "init"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(!status.success());

    let output = sfvoice_bin()
        .args(["config", "show", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sample_rate = 44100"), "stdout: {stdout}");
}
