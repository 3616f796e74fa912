use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use image::{ImageBuffer, LumaA, Rgb};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn write_rgb_texture(dir: &Path) -> PathBuf {
    let path = dir.join("checker.png");
    let image = ImageBuffer::from_fn(8, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([200u8, 80, 40])
        } else {
            Rgb([40u8, 40, 40])
        }
    });
    image.save(&path).expect("write rgb texture");
    path
}

fn write_gray_alpha_texture(dir: &Path) -> PathBuf {
    let path = dir.join("gray.png");
    let image = ImageBuffer::from_pixel(4, 4, LumaA([128u8, 255]));
    image.save(&path).expect("write gray texture");
    path
}

fn summary_command(texture: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--summary-only").arg("--texture").arg(texture);
    cmd
}

#[test]
fn summary_reports_orbited_lights() {
    let dir = TempDir::new().expect("temp dir");
    let texture = write_rgb_texture(dir.path());
    summary_command(&texture)
        .args(["--frames", "60"])
        .assert()
        .success()
        .stdout(contains("18 vertices"))
        .stdout(contains("(8x4, 3 channels)"))
        .stdout(contains("Simulated 60 frames"))
        .stdout(contains("Orbit on at 45.0 deg/s"))
        .stdout(contains("Light 1 pos=(2.12, 0.50, -0.71)"))
        .stdout(contains("Camera pos=(0.00, 0.50, 7.00)"))
        .stdout(contains(" - face 6 rgb="));
}

#[test]
fn held_actions_drive_the_simulation() {
    let dir = TempDir::new().expect("temp dir");
    let texture = write_rgb_texture(dir.path());
    summary_command(&texture)
        .args(["--frames", "60", "--hold", "forward", "--hold", "stop-orbit"])
        .assert()
        .success()
        .stdout(contains("Camera pos=(0.00, 0.50, 4.50)"))
        .stdout(contains("Orbit off"))
        .stdout(contains("Light 1 pos=(2.00, 0.50, 1.00)"));
}

#[test]
fn scene_file_overrides_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let texture = write_rgb_texture(dir.path());
    let scene = dir.path().join("scene.xml");
    std::fs::write(
        &scene,
        r#"<scene>
  <window><title>Test Pyramid</title></window>
  <orbit><enabled>false</enabled></orbit>
  <light><position>1 1 1</position></light>
  <light><position>-1 1 -1</position><intensity>0.5</intensity></light>
</scene>"#,
    )
    .expect("write scene");

    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--summary-only")
        .arg("--scene")
        .arg(&scene)
        .arg("--texture")
        .arg(&texture)
        .args(["--frames", "10"])
        .assert()
        .success()
        .stdout(contains("Scene \"Test Pyramid\" 800x600"))
        .stdout(contains("Light 1 pos=(1.00, 1.00, 1.00)"))
        .stdout(contains("intensity=0.50"));
}

#[test]
fn two_channel_texture_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let texture = write_gray_alpha_texture(dir.path());
    summary_command(&texture)
        .assert()
        .failure()
        .stderr(contains("unsupported texture format"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_texture_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    summary_command(&dir.path().join("absent.jpg"))
        .assert()
        .failure()
        .stderr(contains("absent.jpg"));
}

#[test]
fn unknown_argument_prints_usage() {
    Command::cargo_bin("lit-pyramid")
        .expect("binary exists")
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Usage: lit-pyramid"));
}
