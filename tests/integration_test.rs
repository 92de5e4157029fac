use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tirada-pdf"))
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn fixture() -> &'static str {
    "tests/fixtures/fees.json"
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) -> PathBuf {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
    path
}

/// Asset directory holding the logo the member copy expects.
fn assets_with_logo() -> TempDir {
    let dir = TempDir::new().expect("Failed to create asset directory");
    image::RgbImage::from_pixel(60, 30, image::Rgb([30, 60, 90]))
        .save(dir.path().join("logo.jpg"))
        .expect("Failed to write logo");
    dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_pdf(path: &Path) {
    assert!(path.exists(), "PDF file was not created");
    let metadata = fs::metadata(path).expect("Failed to get file metadata");
    assert!(metadata.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

#[test]
fn test_print_from_json_file() {
    setup();
    let path = cleanup_file("test-print-json.pdf");
    let assets = assets_with_logo();

    let output = cargo_bin()
        .args(["print", "--input", fixture(), "-o", path.to_str().unwrap()])
        .arg("--assets")
        .arg(assets.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&path);

    let out = stdout(&output);
    assert!(out.contains("Pages: 2"), "{}", out);
    assert!(out.contains("Receipts: 8"), "{}", out);
    assert!(out.contains("Not billable: 1"), "{}", out);
    assert!(out.contains("Invalid records: 1"), "{}", out);
}

#[test]
fn test_print_selected_ids_with_lines() {
    setup();
    let path = cleanup_file("test-print-ids.pdf");
    let assets = assets_with_logo();

    let output = cargo_bin()
        .args([
            "print",
            "--input", fixture(),
            "--ids", "662464,662472",
            "--lines",
            "--offset-x", "-1.5",
            "-o", path.to_str().unwrap(),
        ])
        .arg("--assets")
        .arg(assets.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&path);
    let out = stdout(&output);
    assert!(out.contains("Pages: 1"), "{}", out);
    assert!(out.contains("Receipts: 2"), "{}", out);
}

#[test]
fn test_missing_logo_aborts_the_run() {
    setup();
    let path = cleanup_file("test-missing-logo.pdf");
    let empty_assets = TempDir::new().unwrap();

    let output = cargo_bin()
        .args(["print", "--input", fixture(), "-o", path.to_str().unwrap()])
        .arg("--assets")
        .arg(empty_assets.path())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should fail without a logo");
    assert!(stderr(&output).contains("Rendering surface failure"), "{}", stderr(&output));
}

#[test]
fn test_zero_dpi_is_rejected() {
    setup();
    let path = cleanup_file("test-zero-dpi.pdf");

    let output = cargo_bin()
        .args(["print", "--input", fixture(), "--dpi", "0", "-o", path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid configuration"), "{}", stderr(&output));
    assert!(!path.exists(), "No PDF should be written");
}

#[test]
fn test_print_requires_a_source() {
    let output = cargo_bin()
        .args(["print", "-o", "tests/output/never.pdf"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("--input or --server"), "{}", stderr(&output));
}

#[test]
fn test_ruler_page() {
    setup();
    let path = cleanup_file("test-ruler.pdf");

    let output = cargo_bin()
        .args(["ruler", "-o", path.to_str().unwrap(), "--no-matrix"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&path);
}

#[test]
fn test_templates_dump_is_json() {
    let output = cargo_bin()
        .arg("templates")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let templates: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid JSON");
    let names: Vec<_> = templates
        .as_array()
        .expect("Expected an array")
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["administration-copy", "member-copy"]);
}

#[test]
fn test_lint_builtin_templates() {
    let output = cargo_bin()
        .arg("lint")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("✓ member-copy"));
}

#[test]
fn test_lint_flags_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("typo.json");
    let json = serde_json::json!({
        "name": "typo",
        "items": [{
            "kind": "text",
            "text": "Cuota: #fee_mont",
            "font": "Calibri",
            "bold": true,
            "center": false,
            "size_mm": 4.0,
            "window": {"x_mm": 5.0, "y_mm": 29.0, "width_mm": 42.0, "height_mm": 5.0}
        }]
    });
    fs::write(&template, json.to_string()).unwrap();

    let output = cargo_bin()
        .arg("lint")
        .arg(&template)
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stdout(&output).contains("fee_mont"), "{}", stdout(&output));
}

#[test]
fn test_lint_accepts_a_templates_dump() {
    let dump = cargo_bin()
        .arg("templates")
        .output()
        .expect("Failed to execute command");
    assert!(dump.status.success(), "Command failed: {:?}", dump);

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("templates.json");
    fs::write(&file, &dump.stdout).unwrap();

    let output = cargo_bin()
        .arg("lint")
        .arg(&file)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let out = stdout(&output);
    assert!(out.contains("✓ administration-copy"), "{}", out);
    assert!(out.contains("✓ member-copy"), "{}", out);
}

#[test]
fn test_page_excludes_other_selections() {
    let output = cargo_bin()
        .args(["print", "--server", "http://localhost:3000", "--page", "2", "--ids", "5"])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be used with"), "{}", stderr(&output));

    let output = cargo_bin()
        .args(["print", "--input", fixture(), "--page", "2"])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success(), "--page needs --server");
}
