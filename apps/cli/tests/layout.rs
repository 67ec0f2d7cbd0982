use std::error::Error;
use std::fs;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

const LETTER: &str = r#"{
    "page_size": { "width": 612, "height": 792 },
    "content_size": { "width": 540, "height": 720 },
    "printable_area": { "x": 18, "y": 18, "width": 576, "height": 756 },
    "margin_top": 36,
    "margin_left": 36,
    "dpi": 72.0,
    "desired_dpi": 72,
    "scaling_option": "fit_to_printable_area",
    "document_cookie": 1
}"#;

fn run_layout(args: &[&str]) -> Result<Value, Box<dyn Error>> {
    let output = Command::cargo_bin("folio-cli")?
        .arg("layout")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    Ok(serde_json::from_slice(&output)?)
}

#[test]
fn layout_without_declarations_keeps_device_margins() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let settings = dir.path().join("letter.json");
    fs::write(&settings, LETTER)?;

    let report = run_layout(&["--settings", settings.to_str().unwrap()])?;
    assert_eq!(report["scale_factor"], 1.0);
    assert_eq!(report["layout"]["content_width"], 540);
    assert_eq!(report["layout"]["margin_right"], 36);
    assert_eq!(report["page_size"]["width"], 612);
    assert_eq!(report["content_area"]["y"], 36);
    Ok(())
}

#[test]
fn oversized_declared_page_is_fitted() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let settings = dir.path().join("letter.json");
    fs::write(&settings, LETTER)?;
    let hints = dir.path().join("hints.json");
    fs::write(&hints, r#"{ "page_size": { "width": 1632, "height": 2112 } }"#)?;

    let report = run_layout(&[
        "--settings",
        settings.to_str().unwrap(),
        "--hints",
        hints.to_str().unwrap(),
    ])?;
    assert_eq!(report["scale_factor"], 0.5);
    assert_eq!(report["page_size"]["width"], 612);
    assert_eq!(report["page_size"]["height"], 792);
    assert_eq!(report["content_area"]["x"], 18);
    assert_eq!(report["content_area"]["width"], 576);
    Ok(())
}

#[test]
fn ignored_margins_use_the_device_margins() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let settings = dir.path().join("letter.json");
    fs::write(&settings, LETTER)?;
    let hints = dir.path().join("hints.json");
    fs::write(&hints, r#"{ "margin_top": 0, "margin_left": 0 }"#)?;

    let declared = run_layout(&[
        "--settings",
        settings.to_str().unwrap(),
        "--hints",
        hints.to_str().unwrap(),
    ])?;
    assert_eq!(declared["layout"]["margin_top"], 0);

    let ignored = run_layout(&[
        "--settings",
        settings.to_str().unwrap(),
        "--hints",
        hints.to_str().unwrap(),
        "--ignore-css-margins",
    ])?;
    assert_eq!(ignored["layout"]["margin_top"], 36);
    assert_eq!(ignored["layout"]["margin_left"], 36);
    Ok(())
}

#[test]
fn layout_reports_unreadable_settings() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.json");
    Command::cargo_bin("folio-cli")?
        .args(["layout", "--settings", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("missing.json"));
    Ok(())
}

#[test]
fn layout_refuses_settings_without_a_resolution() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let settings = dir.path().join("no-dpi.json");
    fs::write(&settings, LETTER.replace(r#""dpi": 72.0"#, r#""dpi": 0.0"#))?;
    Command::cargo_bin("folio-cli")?
        .args(["layout", "--settings", settings.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("does not describe a usable printer"));
    Ok(())
}
