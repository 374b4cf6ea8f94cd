mod analyzer;
mod ast;
mod compiler;
mod diagnostics;
mod environment;
mod generator;
mod interpreter;
mod lexer;
mod parser;
mod source;

pub use crate::analyzer::{Analyzer, AnalyzerScope};
pub use crate::ast::{
    AccessExpression, AssignmentStatement, BinaryExpression, BinaryOperator, CallExpression, Case,
    DeclarationStatement, Expression, Function, Global, GroupExpression, IfStatement, ListLiteral,
    Literal, LiteralExpression, ReturnStatement, Source, Statement, SwitchStatement,
    WhileStatement,
};
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, Diagnostics};
pub use crate::environment::{
    require_assignable, FunctionSignature, RuntimeError, Scope, Type, Variable,
};
pub use crate::generator::Generator;
pub use crate::interpreter::{
    Interpreter, InterpreterScope, RuntimeFunction, RuntimeVariable, Value,
};
pub use crate::lexer::{lex, LexError, Lexer, Token, TokenKind};
pub use crate::parser::{parse, ParseError, Parser};
pub use crate::source::{SourceFile, SourceId};
