use std::io::Write;

use anyhow::{bail, Result};

use crate::analyzer::Analyzer;
use crate::ast::Source;
use crate::diagnostics::Diagnostics;
use crate::environment::RuntimeError;
use crate::generator::Generator;
use crate::interpreter::{Interpreter, Value};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source::SourceFile;

#[derive(Debug, Default)]
pub struct CompileOptions {
    pub dump_tokens: bool,
}

/// An analyzed program, ready to run or to emit as Java.
#[derive(Debug)]
pub struct Compilation {
    pub source: Source,
}

impl Compilation {
    /// Interprets the program, writing `print` output to `output`.
    pub fn run<W: Write>(&self, output: W) -> Result<(Value, W), RuntimeError> {
        let mut interpreter = Interpreter::new(output);
        let value = interpreter.evaluate(&self.source)?;
        Ok((value, interpreter.into_output()))
    }

    pub fn generate(&self) -> String {
        Generator::new().generate(&self.source)
    }
}

pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Lexes, parses and analyzes `source`. Each failing phase records one
    /// diagnostic before the error is returned.
    pub fn compile(&mut self, source: &SourceFile) -> Result<Compilation> {
        let tokens = match Lexer::new(&source.contents).lex() {
            Ok(tokens) => tokens,
            Err(err) => {
                self.diagnostics
                    .push_error_at(err.message.clone(), Some(err.index));
                bail!("Lexing failed");
            }
        };

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let mut ast = match Parser::new(tokens).parse_source() {
            Ok(ast) => ast,
            Err(err) => {
                self.diagnostics
                    .push_error_at(err.message.clone(), Some(err.index));
                bail!("Parsing failed");
            }
        };

        if let Err(err) = Analyzer::new().analyze(&mut ast) {
            self.diagnostics.push_error_at(err.to_string(), None);
            bail!("Analysis failed");
        }

        Ok(Compilation { source: ast })
    }
}
