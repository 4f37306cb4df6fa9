use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tpth() -> Command {
    Command::cargo_bin("tpth").unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn renders_variables() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo {{.USER}}\n");
    tpth()
        .arg(&template)
        .arg("USER=alice")
        .assert()
        .success()
        .stdout("echo alice\n");
}

#[test]
fn unset_variable_takes_else_branch() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "{{if .X}}echo yes{{else}}echo no{{end}}");
    tpth().arg(&template).assert().success().stdout("echo no\n");
}

#[test]
fn formats_with_indent_option() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "for f in a b; do echo $f; done");
    tpth()
        .arg("--indent")
        .arg("4")
        .arg(&template)
        .assert()
        .success()
        .stdout("for f in a b; do\n    echo $f\ndone\n");
    tpth()
        .arg("--indent=0")
        .arg(&template)
        .assert()
        .success()
        .stdout("for f in a b; do\n\techo $f\ndone\n");
}

#[test]
fn include_and_partials() {
    let dir = TempDir::new().unwrap();
    let parts = dir.path().join("parts");
    fs::create_dir(&parts).unwrap();
    fs::write(parts.join("cleanup"), "rm -f {{.}}").unwrap();
    let prelude = write(&dir, "prelude.sh", "set -eu");
    let template = write(&dir, "main.tpl", "{{template \"cleanup\" .TMP}}\n{{listTemplates}}");
    tpth()
        .arg("-i")
        .arg(&prelude)
        .arg("-I")
        .arg(&parts)
        .arg(&template)
        .arg("TMP=/tmp/x")
        .assert()
        .success()
        .stdout("set -eu\nrm -f /tmp/x\n__main__\ncleanup\n");
}

#[test]
fn secrets_file_is_overridden_by_arguments() {
    let dir = TempDir::new().unwrap();
    let secrets = write(&dir, "secrets.yaml", "TOKEN: filetoken\nHOST: db\n");
    let template = write(&dir, "main.tpl", "connect {{.HOST}} {{.TOKEN}}\n");
    tpth()
        .arg("--secrets")
        .arg(&secrets)
        .arg(&template)
        .arg("TOKEN=cli")
        .assert()
        .success()
        .stdout("connect db cli\n");
}

#[test]
fn secrets_directory_precedes_secrets_file() {
    let dir = TempDir::new().unwrap();
    let secdir = dir.path().join("secrets.d");
    fs::create_dir(&secdir).unwrap();
    fs::write(secdir.join("a.yaml"), "HOST: a\nUSER: a\nTOKEN: a\n").unwrap();
    fs::write(secdir.join("b.yaml"), "HOST: b\n").unwrap();
    let secrets = write(&dir, "secrets.yaml", "USER: file\n");
    let template = write(&dir, "main.tpl", "connect {{.HOST}} {{.USER}} {{.TOKEN}}\n");
    tpth()
        .arg("-S")
        .arg(&secdir)
        .arg("--secrets")
        .arg(&secrets)
        .arg(&template)
        .arg("TOKEN=cli")
        .assert()
        .success()
        .stdout("connect b file cli\n");
    tpth()
        .arg("--secpath")
        .arg(dir.path().join("absent"))
        .arg(&template)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("# cannot read"));
}

#[test]
fn printf_pads_to_width() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo \"{{printf \"%5s|%-4s|%03d\" .A .A 7}}\"\n");
    tpth()
        .arg(&template)
        .arg("A=x")
        .assert()
        .success()
        .stdout("echo \"    x|x   |007\"\n");
}

#[test]
fn malformed_variable_fails() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo\n");
    tpth()
        .arg(&template)
        .arg("NOEQUALS")
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("# malformed variable \"NOEQUALS\""));
}

#[test]
fn shell_syntax_error_reports_position() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "if true; then echo hi");
    tpth()
        .arg(&template)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("# syntax error: line 1"))
        .stdout(predicate::str::contains("expected `fi`, found end of input"));
}

#[test]
fn template_errors_are_comments() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo {{nosuchfunc}}\n");
    tpth()
        .arg(&template)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("function \"nosuchfunc\" not defined"))
        .stdout(predicate::str::starts_with("# template: __main__:1:"));
}

#[test]
fn missing_template_file() {
    let dir = TempDir::new().unwrap();
    tpth()
        .arg(dir.path().join("absent.tpl"))
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("# cannot read"));
}

#[test]
fn ast_output_is_json() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo hi\n");
    let output = tpth().arg("--ast").arg(&template).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json.get("body").is_some());
}

#[test]
fn diff_output() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "echo a;echo b\n");
    tpth()
        .arg("--diff")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("-echo a;echo b"))
        .stdout(predicate::str::contains("+echo a\n+echo b\n"));
}

#[test]
fn empty_render_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let template = write(&dir, "main.tpl", "{{if .X}}echo x{{end}}");
    tpth().arg(&template).assert().success().stdout("");
}

#[test]
fn missing_template_argument_is_usage_error() {
    tpth().assert().code(2);
}
