use crate::ast::*;
use crate::environment::{Type, Variable};

const INDENT: &str = "    ";

/// Emits an analyzed [`Source`] as a single Java class named `Main`.
///
/// Names and types come from the analyzer's annotations, so `print` lowers
/// to `System.out.println` and every declaration gets a concrete Java type.
/// Unannotated nodes fall back to their source names.
#[derive(Debug, Default)]
pub struct Generator {
    output: String,
    indent: usize,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(mut self, source: &Source) -> String {
        self.write_source(source);
        self.output
    }

    pub fn global(mut self, global: &Global) -> String {
        self.write_global(global);
        self.output
    }

    pub fn function(mut self, function: &Function) -> String {
        self.write_function(function);
        self.output
    }

    pub fn statement(mut self, statement: &Statement) -> String {
        self.write_statement(statement);
        self.output
    }

    pub fn expression(mut self, expression: &Expression) -> String {
        self.write_expression(expression);
        self.output
    }

    fn write_source(&mut self, source: &Source) {
        self.print("public class Main {");
        self.newline(0);

        self.indent += 1;
        if !source.globals.is_empty() {
            for global in &source.globals {
                self.newline(self.indent);
                self.write_global(global);
            }
            self.newline(0);
        }

        self.newline(self.indent);
        self.print("public static void main(String[] args) {");
        self.newline(self.indent + 1);
        self.print("System.exit(new Main().main());");
        self.newline(self.indent);
        self.print("}");
        self.newline(0);

        for function in &source.functions {
            self.newline(self.indent);
            self.write_function(function);
            self.newline(0);
        }
        self.indent -= 1;

        self.newline(0);
        self.print("}");
    }

    fn write_global(&mut self, global: &Global) {
        if !global.mutable {
            self.print("final ");
        }
        let ty = declared_type(
            global.variable.as_ref(),
            global.type_name.as_deref(),
            global.value.as_ref(),
        );
        self.print(ty.jvm_name());
        if global.is_list() {
            self.print("[]");
        }
        self.print(" ");
        self.print(variable_name(global.variable.as_ref(), &global.name));
        if let Some(value) = &global.value {
            self.print(" = ");
            self.write_expression(value);
        }
        self.print(";");
    }

    fn write_function(&mut self, function: &Function) {
        let (parameter_types, return_type, name) = match &function.function {
            Some(signature) => (
                signature.parameter_types.clone(),
                signature.return_type,
                signature.jvm_name.as_str(),
            ),
            None => (
                function
                    .parameter_type_names
                    .iter()
                    .map(|name| Type::from_name(name).unwrap_or(Type::Any))
                    .collect(),
                function
                    .return_type_name
                    .as_deref()
                    .and_then(Type::from_name)
                    .unwrap_or(Type::Nil),
                function.name.as_str(),
            ),
        };

        self.print(return_type.jvm_name());
        self.print(" ");
        self.print(name);
        self.print("(");
        for (position, (parameter, ty)) in function
            .parameters
            .iter()
            .zip(&parameter_types)
            .enumerate()
        {
            if position > 0 {
                self.print(", ");
            }
            self.print(ty.jvm_name());
            self.print(" ");
            self.print(parameter);
        }
        self.print(") ");
        self.write_block(&function.body);
    }

    fn write_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expression) => {
                self.write_expression(expression);
                self.print(";");
            }
            Statement::Declaration(declaration) => {
                let ty = declared_type(
                    declaration.variable.as_ref(),
                    declaration.type_name.as_deref(),
                    declaration.value.as_ref(),
                );
                self.print(ty.jvm_name());
                self.print(" ");
                self.print(variable_name(
                    declaration.variable.as_ref(),
                    &declaration.name,
                ));
                if let Some(value) = &declaration.value {
                    self.print(" = ");
                    self.write_expression(value);
                }
                self.print(";");
            }
            Statement::Assignment(assignment) => {
                self.write_expression(&assignment.receiver);
                self.print(" = ");
                self.write_expression(&assignment.value);
                self.print(";");
            }
            Statement::If(statement) => {
                self.print("if (");
                self.write_expression(&statement.condition);
                self.print(") ");
                self.write_block(&statement.then_body);
                if !statement.else_body.is_empty() {
                    self.print(" else ");
                    self.write_block(&statement.else_body);
                }
            }
            Statement::Switch(statement) => {
                self.print("switch (");
                self.write_expression(&statement.condition);
                self.print(") {");
                self.indent += 1;
                for case in &statement.cases {
                    self.newline(self.indent);
                    self.write_case(case);
                }
                self.indent -= 1;
                self.newline(self.indent);
                self.print("}");
            }
            Statement::While(statement) => {
                self.print("while (");
                self.write_expression(&statement.condition);
                self.print(") ");
                self.write_block(&statement.body);
            }
            Statement::Return(statement) => {
                self.print("return ");
                self.write_expression(&statement.value);
                self.print(";");
            }
        }
    }

    fn write_case(&mut self, case: &Case) {
        match &case.value {
            Some(value) => {
                self.print("case ");
                self.write_expression(value);
                self.print(":");
            }
            None => self.print("default:"),
        }

        self.indent += 1;
        for statement in &case.body {
            self.newline(self.indent);
            self.write_statement(statement);
        }
        if case.value.is_some() {
            self.newline(self.indent);
            self.print("break;");
        }
        self.indent -= 1;
    }

    /// Writes `{}` for an empty block, otherwise one statement per line.
    fn write_block(&mut self, statements: &[Statement]) {
        if statements.is_empty() {
            self.print("{}");
            return;
        }

        self.print("{");
        self.indent += 1;
        for statement in statements {
            self.newline(self.indent);
            self.write_statement(statement);
        }
        self.indent -= 1;
        self.newline(self.indent);
        self.print("}");
    }

    fn write_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(literal) => self.write_literal(&literal.value),
            Expression::Group(group) => {
                self.print("(");
                self.write_expression(&group.inner);
                self.print(")");
            }
            Expression::Binary(binary) if binary.operator == BinaryOperator::Power => {
                self.print("Math.pow(");
                self.write_expression(&binary.left);
                self.print(", ");
                self.write_expression(&binary.right);
                self.print(")");
            }
            Expression::Binary(binary) => {
                self.write_expression(&binary.left);
                self.print(" ");
                self.print(binary.operator.as_str());
                self.print(" ");
                self.write_expression(&binary.right);
            }
            Expression::Access(access) => {
                self.print(variable_name(access.variable.as_ref(), &access.name));
                if let Some(offset) = &access.offset {
                    self.print("[");
                    self.write_expression(offset);
                    self.print("]");
                }
            }
            Expression::Call(call) => {
                let name = call
                    .function
                    .as_ref()
                    .map_or(call.name.as_str(), |function| function.jvm_name.as_str());
                self.print(name);
                self.print("(");
                self.write_comma_separated(&call.arguments);
                self.print(")");
            }
            Expression::List(list) => {
                self.print("{");
                self.write_comma_separated(&list.elements);
                self.print("}");
            }
        }
    }

    fn write_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Nil => self.print("null"),
            Literal::Boolean(value) => self.print(if *value { "true" } else { "false" }),
            Literal::Character(value) => {
                self.print("'");
                self.print(&escape(&value.to_string(), '\''));
                self.print("'");
            }
            Literal::String(value) => {
                self.print("\"");
                self.print(&escape(value, '"'));
                self.print("\"");
            }
            Literal::Integer(value) => self.print(&value.to_string()),
            Literal::Decimal(value) => self.print(&value.to_string()),
        }
    }

    fn write_comma_separated(&mut self, expressions: &[Expression]) {
        for (position, expression) in expressions.iter().enumerate() {
            if position > 0 {
                self.print(", ");
            }
            self.write_expression(expression);
        }
    }

    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn newline(&mut self, indent: usize) {
        self.output.push('\n');
        for _ in 0..indent {
            self.output.push_str(INDENT);
        }
    }
}

fn variable_name<'v>(variable: Option<&'v Variable>, fallback: &'v str) -> &'v str {
    variable.map_or(fallback, |variable| variable.jvm_name.as_str())
}

fn declared_type(
    variable: Option<&Variable>,
    type_name: Option<&str>,
    value: Option<&Expression>,
) -> Type {
    variable
        .map(|variable| variable.ty)
        .or_else(|| type_name.and_then(Type::from_name))
        .or_else(|| value.and_then(Expression::ty))
        .unwrap_or(Type::Any)
}

/// Escapes `text` for a Java literal delimited by `quote`.
fn escape(text: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{8}' => escaped.push_str("\\b"),
            ch if ch == quote => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ch => escaped.push(ch),
        }
    }
    escaped
}
