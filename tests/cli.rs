use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

/// `<tmp>/proj` with sources, a dependency folder and a .gitignore
fn setup_project() -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let root = temp.path().join("proj");
    fs::create_dir_all(root.join("src"))?;
    fs::create_dir_all(root.join("node_modules").join("dep"))?;
    fs::create_dir_all(root.join("logs"))?;
    fs::write(root.join("src").join("main.rs"), "fn main() {}\n")?;
    fs::write(root.join("src").join("lib.rs"), "pub fn lib() {}\n")?;
    fs::write(root.join("README.md"), "# Proj\n")?;
    fs::write(root.join("node_modules").join("dep").join("index.js"), "module.exports = 1;\n")?;
    fs::write(root.join("logs").join("run.txt"), "secret log line\n")?;
    fs::write(root.join(".gitignore"), "logs/\n")?;
    Ok((temp, root))
}

fn codepack(settings: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("codepack")?;
    cmd.arg("--settings").arg(settings).arg("-q");
    Ok(cmd)
}

#[test]
fn test_stdout_json_respects_exclusions() -> TestResult {
    let (temp, root) = setup_project()?;
    let settings = temp.path().join("settings.json");

    codepack(&settings)?
        .arg(&root)
        .args(["--stdout", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"proj/src/main.rs\""))
        .stdout(predicate::str::contains("node_modules").not())
        .stdout(predicate::str::contains("secret log line").not());

    // the chosen format is remembered
    let stored: serde_json::Value = serde_json::from_str(&fs::read_to_string(&settings)?)?;
    assert_eq!(stored["outputFormat"], "json");

    codepack(&settings)?
        .arg(&root)
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
    Ok(())
}

#[test]
fn test_priority_orders_content() -> TestResult {
    let (temp, root) = setup_project()?;
    let settings = temp.path().join("settings.json");

    let output = codepack(&settings)?
        .arg(&root)
        .args(["--stdout", "-f", "plain", "--priority", "src/main.rs=5"])
        .output()?;
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout)?;
    let main = text.find("--- proj/src/main.rs ⭐5 ---").ok_or("main.rs missing")?;
    let readme = text.find("--- proj/README.md").ok_or("README missing")?;
    assert!(main < readme);
    Ok(())
}

#[test]
fn test_include_path_overrides_gitignore() -> TestResult {
    let (temp, root) = setup_project()?;
    let settings = temp.path().join("settings.json");

    codepack(&settings)?
        .arg(&root)
        .args(["--stdout", "-f", "markdown", "--include-path", "logs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("secret log line"));
    Ok(())
}

#[test]
fn test_writes_output_file() -> TestResult {
    let (temp, root) = setup_project()?;
    let settings = temp.path().join("settings.json");
    let out = temp.path().join("packed.xml");

    codepack(&settings)?
        .arg(&root)
        .args(["-f", "xml", "-o"])
        .arg(&out)
        .assert()
        .success();

    let xml = fs::read_to_string(&out)?;
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("proj/src/lib.rs"));
    Ok(())
}

#[test]
fn test_missing_directory_fails() -> TestResult {
    let temp = TempDir::new()?;
    codepack(&temp.path().join("settings.json"))?
        .arg(temp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target directory not found"));
    Ok(())
}

#[test]
fn test_invalid_priority_fails() -> TestResult {
    let (temp, root) = setup_project()?;
    codepack(&temp.path().join("settings.json"))?
        .arg(&root)
        .args(["--stdout", "--priority", "src/main.rs=7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("priority must be between 0 and 5"));
    Ok(())
}

#[test]
fn test_generate_completions() -> TestResult {
    Command::cargo_bin("codepack")?
        .args(["--generate", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("codepack"));
    Ok(())
}
