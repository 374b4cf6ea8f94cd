use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

fn plc_binary() -> &'static str {
    env!("CARGO_BIN_EXE_plc")
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn plc(args: &[&str], script: &Path) -> Output {
    Command::new(plc_binary())
        .current_dir(workspace_root())
        .args(args)
        .arg(script)
        .output()
        .expect("run plc")
}

#[test]
fn exits_with_main_result() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("exit.plc");
    fs::write(
        &script_path,
        "FUN main(): Integer DO\n    print(\"exiting\");\n    RETURN 3;\nEND\n",
    )?;

    for args in [&[][..], &["run"][..]] {
        let output = plc(args, &script_path);
        assert_eq!(output.status.code(), Some(3), "args {args:?}");
        assert_eq!(String::from_utf8_lossy(&output.stdout), "exiting\n");
    }
    Ok(())
}

#[test]
fn runs_bundled_demo() {
    let output = plc(&[], &workspace_root().join("demos").join("hello.plc"));
    assert!(output.status.success(), "hello.plc should exit with 0");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello, World!\n");
}

#[test]
fn build_writes_java_to_output_path() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("hello.plc");
    fs::write(
        &script_path,
        "FUN main(): Integer DO print(\"Hello, World!\"); RETURN 0; END",
    )?;
    let java_path = tmp.path().join("out").join("Main.java");

    let output = Command::new(plc_binary())
        .arg("build")
        .arg(&script_path)
        .arg("-o")
        .arg(&java_path)
        .output()
        .expect("run plc build");

    assert!(output.status.success(), "build should succeed: {output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        java_path.display().to_string()
    );
    let java = fs::read_to_string(&java_path)?;
    assert!(java.starts_with("public class Main {\n"), "{java}");
    assert!(
        java.contains("        System.out.println(\"Hello, World!\");"),
        "{java}"
    );
    assert!(java.ends_with("}\n"), "{java}");
    Ok(())
}

#[test]
fn build_defaults_to_main_java_beside_input() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("program.plc");
    fs::write(&script_path, "FUN main(): Integer DO RETURN 0; END")?;

    let output = plc(&["build"], &script_path);
    assert!(output.status.success(), "build should succeed: {output:?}");
    assert!(tmp.path().join("Main.java").exists());
    Ok(())
}

#[test]
fn build_prints_java_for_dash() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("program.plc");
    fs::write(
        &script_path,
        "VAL answer: Integer = 42;\nFUN main(): Integer DO RETURN answer; END",
    )?;

    let output = Command::new(plc_binary())
        .args(["build", "-o", "-"])
        .arg(&script_path)
        .output()
        .expect("run plc build");

    assert!(output.status.success(), "build should succeed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("    final int answer = 42;"), "{stdout}");
    assert!(stdout.contains("        return answer;"), "{stdout}");
    Ok(())
}

#[test]
fn reports_diagnostics_with_location() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("broken.plc");
    fs::write(
        &script_path,
        "VAR x: Integer = 1\nFUN main(): Integer DO RETURN x; END\n",
    )?;

    let output = plc(&[], &script_path);
    assert!(!output.status.success(), "expected non-zero exit");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Diagnostics:"), "{stderr}");
    assert!(stderr.contains("error: Missing semicolon"), "{stderr}");
    assert!(
        stderr.contains(&format!("--> {}:1:19", script_path.display())),
        "{stderr}"
    );
    assert!(stderr.contains("      VAR x: Integer = 1\n"), "{stderr}");
    assert!(stderr.contains(&format!("      {}^", " ".repeat(18))), "{stderr}");
    assert!(stderr.contains("Compilation failed"), "{stderr}");
    Ok(())
}

#[test]
fn reports_analysis_errors() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("untyped.plc");
    fs::write(&script_path, "FUN main(): String DO RETURN \"s\"; END")?;

    let output = plc(&[], &script_path);
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error: Expected type Integer, received String."),
        "{stderr}"
    );
    assert!(!stderr.contains("-->"), "{stderr}");
    Ok(())
}

#[test]
fn reports_runtime_errors() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("bounds.plc");
    fs::write(
        &script_path,
        "LIST list: Integer = [1];\nFUN main(): Integer DO RETURN list[5]; END",
    )?;

    let output = plc(&[], &script_path);
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Runtime error in"), "{stderr}");
    assert!(
        stderr.contains("Index 5 is out of bounds for a list of length 1."),
        "{stderr}"
    );
    Ok(())
}

#[test]
fn no_run_only_checks_the_program() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("quiet.plc");
    fs::write(
        &script_path,
        "FUN main(): Integer DO print(\"loud\"); RETURN 7; END",
    )?;

    let output = plc(&["--no-run"], &script_path);
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn dumps_tokens_and_ast() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("dump.plc");
    fs::write(&script_path, "FUN main(): Integer DO RETURN 0; END")?;

    let output = plc(&["--dump-tokens", "--emit", "ast", "--no-run"], &script_path);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Token { kind: Identifier, literal: \"FUN\", index: 0 }"),
        "{stdout}"
    );
    assert!(stdout.contains("Source {"), "{stdout}");
    assert!(stdout.contains("name: \"main\""), "{stdout}");
    Ok(())
}
