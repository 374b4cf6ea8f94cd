use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use num_traits::ToPrimitive;
use plc_compiler::{
    Compilation, CompileOptions, Compiler, Diagnostic, SourceFile, SourceId, Value,
};

const RUN_AFTER_HELP: &str = "\
Subcommands:
  plc build <INPUT>        Translate a PLC source file to Java.

See `plc <subcommand> --help` for command-specific options.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Ast,
}

#[derive(Parser)]
#[command(
    name = "plc",
    version,
    about = "Interpret PLC source files.",
    long_about = "Run a PLC program directly. The process exits with the value returned by main.",
    after_help = RUN_AFTER_HELP
)]
struct RunCli {
    /// Path to a PLC source file.
    input: PathBuf,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit additional compiler output (e.g. `ast`).
    #[arg(long, value_enum)]
    emit: Vec<Emit>,

    /// Check the program without running it.
    #[arg(long)]
    no_run: bool,
}

#[derive(Parser)]
#[command(
    name = "plc build",
    version,
    about = "Translate a PLC source file to a Java class."
)]
struct BuildCli {
    /// Path to a PLC source file.
    input: PathBuf,

    /// Destination for the generated Java (defaults to `Main.java` beside the input, `-` for stdout).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit additional compiler output alongside the Java source.
    #[arg(long, value_enum)]
    emit: Vec<Emit>,
}

fn main() -> Result<()> {
    let mut raw: Vec<OsString> = std::env::args_os().collect();
    if raw.get(1).map(|arg| arg == "build").unwrap_or(false) {
        raw.remove(1);
        return build_program(BuildCli::parse_from(raw));
    }
    if raw.get(1).map(|arg| arg == "run").unwrap_or(false) {
        raw.remove(1);
    }

    let run_cli = RunCli::parse_from(raw);
    let code = run_program(run_cli)?;
    process::exit(code);
}

fn run_program(cli: RunCli) -> Result<i32> {
    let compilation = compile_input(&cli.input, cli.dump_tokens, &cli.emit)?;
    if cli.no_run {
        return Ok(0);
    }

    let stdout = io::stdout();
    let (value, mut output) = compilation
        .run(stdout.lock())
        .with_context(|| format!("Runtime error in {}", cli.input.display()))?;
    output.flush()?;

    Ok(match value {
        Value::Integer(code) => code.to_i32().unwrap_or(1),
        _ => 0,
    })
}

fn build_program(cli: BuildCli) -> Result<()> {
    let compilation = compile_input(&cli.input, cli.dump_tokens, &cli.emit)?;
    let java = compilation.generate();

    let output = cli
        .output
        .unwrap_or_else(|| default_java_path(&cli.input));
    if output.as_os_str() == "-" {
        println!("{java}");
        return Ok(());
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(&output, format!("{java}\n"))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}

fn compile_input(input: &Path, dump_tokens: bool, emit: &[Emit]) -> Result<Compilation> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?;

    let source = SourceFile::new(SourceId(0), input.to_path_buf(), contents);
    let mut compiler = Compiler::new(CompileOptions { dump_tokens });

    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(err) => {
            if !compiler.diagnostics().is_empty() {
                eprintln!("Diagnostics:");
                for diagnostic in compiler.diagnostics().entries() {
                    print_diagnostic(&source, diagnostic);
                }
            }
            return Err(err.context("Compilation failed"));
        }
    };

    if emit.contains(&Emit::Ast) {
        println!("{:#?}", compilation.source);
    }

    Ok(compilation)
}

fn print_diagnostic(source: &SourceFile, diagnostic: &Diagnostic) {
    eprintln!("  - error: {}", diagnostic.message);

    let Some(index) = diagnostic.index else {
        return;
    };
    let (line, column) = source.location(index);
    eprintln!("     --> {}:{}:{}", source.path.display(), line, column);

    if let Some(raw_line) = source.line(line) {
        eprintln!("      {}", raw_line.replace('\t', "    "));

        let mut caret_line = String::from("      ");
        for ch in raw_line.chars().take(column.saturating_sub(1)) {
            match ch {
                '\t' => caret_line.push_str("    "),
                _ => caret_line.push(' '),
            }
        }
        caret_line.push('^');
        eprintln!("{}", caret_line);
    }
}

fn default_java_path(input: &Path) -> PathBuf {
    input.with_file_name("Main.java")
}
