use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use indoc::indoc;
use tempfile::TempDir;

fn pl0c() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pl0c"))
}

fn program(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run(args: &[&Path]) -> Output {
    pl0c().args(args).output().unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn translates_to_stdout() {
    let dir = TempDir::new().unwrap();
    let path = program(&dir, "ok.pl0", "var y; y := 1.");

    let output = run(&[path.as_path()]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("long y;\n"));
    assert!(stdout.ends_with(" */\n"));
}

#[test]
fn translates_to_file() {
    let dir = TempDir::new().unwrap();
    let path = program(&dir, "ok.pl0", "writeInt 7.");
    let target = dir.path().join("ok.c");

    let output = pl0c().arg(&path).arg("-o").arg(&target).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(fs::read_to_string(&target)
        .unwrap()
        .contains("(void) fprintf(stdout, \"%ld\", (long) 7);"));
}

#[test]
fn reports_semantic_errors() {
    let dir = TempDir::new().unwrap();
    let path = program(
        &dir,
        "bad.pl0",
        indoc! {"
            const x = 1;
            begin
              x := 2
            end.
        "},
    );

    let output = run(&[path.as_path()]);
    let message = stderr(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(message.starts_with("pl0c: semantic error: "));
    assert!(message.contains("bad.pl0:3: `x` must be a variable"));
}

#[test]
fn reports_lexical_errors() {
    let dir = TempDir::new().unwrap();
    let path = program(&dir, "bad.pl0", "var x;\nx := 1 !\n.");

    let output = run(&[path.as_path()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("pl0c: lexical error: "));
    assert!(stderr(&output).contains("bad.pl0:2: "));
}

#[test]
fn rejects_other_extensions() {
    let dir = TempDir::new().unwrap();
    let path = program(&dir, "ok.txt", "var y; y := 1.");

    let output = run(&[path.as_path()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_input_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.pl0");

    let output = run(&[path.as_path()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to read"));
}

#[test]
fn requires_exactly_one_file() {
    let dir = TempDir::new().unwrap();
    let first = program(&dir, "a.pl0", ".");
    let second = program(&dir, "b.pl0", ".");

    assert_eq!(run(&[]).status.code(), Some(1));
    assert_eq!(run(&[first.as_path(), second.as_path()]).status.code(), Some(1));
}

#[test]
fn lists_tokens() {
    let dir = TempDir::new().unwrap();
    let path = program(&dir, "ok.pl0", "var y;\n.");

    let output = pl0c().arg("--tokens").arg(&path).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "(1|VAR) 'var'\n(1|IDENT) 'y'\n(1|SEMICOLON) ;\n(2|DOT) .\n"
    );
}
