use std::fs;
use std::process::Command;

const DEFINITION: &str = r#"{
    "name": "toy",
    "gaze": {
        "filename_format": "{subject_id:d}.csv",
        "schema_overrides": {"subject_id": "int64"}
    },
    "time_column": "t",
    "pixel_columns": ["x", "y"]
}"#;

#[test]
fn convert_lists_every_destination_when_output_is_redirected() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join("1.csv"), "t,x,y\n0,1.5,2.5\n2,1.5,2.5\n").unwrap();
    fs::write(raw.join("2.csv"), "t,x,y\n0,3.5,4.5\n").unwrap();
    let definition = dir.path().join("definition.json");
    fs::write(&definition, DEFINITION).unwrap();

    // both streams piped, so the progress bar is hidden
    let output = Command::new(env!("CARGO_BIN_EXE_gazekit"))
        .arg("convert")
        .arg("--definition")
        .arg(&definition)
        .arg("--root")
        .arg(dir.path())
        .arg("-vv")
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().filter(|l| l.starts_with("Save file to")).collect();
    assert_eq!(lines.len(), 2, "{stdout}");
    assert!(lines[0].ends_with("1.feather"));
    assert!(dir.path().join("preprocessed/2.feather").is_file());
}

#[test]
fn convert_is_quiet_below_verbosity_two() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join("1.csv"), "t,x,y\n0,1.5,2.5\n").unwrap();
    let definition = dir.path().join("definition.json");
    fs::write(&definition, DEFINITION).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_gazekit"))
        .arg("convert")
        .arg("--definition")
        .arg(&definition)
        .arg("--root")
        .arg(dir.path())
        .arg("-v")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Save file to"));
}
