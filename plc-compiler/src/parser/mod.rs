use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub index: usize,
}

type ParseResult<T> = Result<T, ParseError>;

/// Binary operator tiers, lowest precedence first. All tiers are left-associative.
const PRECEDENCE_TIERS: [&[&str]; 4] = [
    &["&&", "||"],
    &["<", ">", "==", "!="],
    &["+", "-"],
    &["*", "/", "^"],
];

/// Parses a full token stream into a [`Source`].
pub fn parse(tokens: Vec<Token>) -> ParseResult<Source> {
    Parser::new(tokens).parse_source()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse_source(&mut self) -> ParseResult<Source> {
        let mut globals = Vec::new();
        let mut functions = Vec::new();

        while !self.is_at_end() {
            if self.check_keyword("LIST") || self.check_keyword("VAR") || self.check_keyword("VAL")
            {
                if !functions.is_empty() {
                    return Err(self.error("Function Before Global"));
                }
                globals.push(self.parse_global()?);
            } else if self.check_keyword("FUN") {
                functions.push(self.parse_function()?);
            } else {
                return Err(self.error("Expected global or function"));
            }
        }

        Ok(Source::new(globals, functions))
    }

    pub fn parse_global(&mut self) -> ParseResult<Global> {
        let global = if self.match_keyword("LIST") {
            self.parse_list_global()?
        } else if self.match_keyword("VAR") {
            let name = self.expect_identifier("Invalid identifier")?;
            let type_name = self.parse_type_annotation()?;
            let value = if self.match_operator("=") {
                Some(self.parse_required_expression("Missing Assign Value")?)
            } else {
                None
            };
            Global::new(name, type_name, true, value)
        } else if self.match_keyword("VAL") {
            let name = self.expect_identifier("Invalid identifier")?;
            let type_name = self.parse_type_annotation()?;
            self.expect_operator("=", "Missing =")?;
            let value = self.parse_required_expression("Missing Assign Value")?;
            Global::new(name, type_name, false, Some(value))
        } else {
            return Err(self.error("Expected global"));
        };

        self.expect_operator(";", "Missing semicolon")?;
        Ok(global)
    }

    fn parse_list_global(&mut self) -> ParseResult<Global> {
        let name = self.expect_identifier("Invalid identifier")?;
        let type_name = self.parse_type_annotation()?;
        self.expect_operator("=", "Missing =")?;
        self.expect_operator("[", "Missing [")?;
        if self.check_operator("]") {
            return Err(self.error("Missing Arg"));
        }
        let elements = self.parse_arguments("]")?;
        self.expect_operator("]", "Missing ]")?;
        Ok(Global::new(
            name,
            type_name,
            true,
            Some(Expression::list(elements)),
        ))
    }

    pub fn parse_function(&mut self) -> ParseResult<Function> {
        self.expect_keyword("FUN", "Expected function")?;
        let name = self.expect_identifier("Invalid identifier")?;
        self.expect_operator("(", "Missing (")?;

        let mut parameters = Vec::new();
        let mut parameter_type_names = Vec::new();
        if !self.check_operator(")") {
            loop {
                let parameter = self.expect_identifier("Invalid argument")?;
                let type_name = self
                    .parse_type_annotation()?
                    .unwrap_or_else(|| "Any".to_string());
                parameters.push(parameter);
                parameter_type_names.push(type_name);

                if !self.match_operator(",") {
                    break;
                }
                if self.check_operator(")") {
                    return Err(self.error("Trailing comma"));
                }
            }
        }
        self.expect_operator(")", "Missing )")?;

        let return_type_name = self.parse_type_annotation()?;
        self.expect_keyword("DO", "Missing DO")?;
        let body = self.parse_block(&["END"])?;
        self.expect_keyword("END", "Missing END")?;

        Ok(Function::new(
            name,
            parameters,
            parameter_type_names,
            return_type_name,
            body,
        ))
    }

    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        if self.match_keyword("LET") {
            self.parse_declaration_statement()
        } else if self.match_keyword("SWITCH") {
            self.parse_switch_statement()
        } else if self.match_keyword("IF") {
            self.parse_if_statement()
        } else if self.match_keyword("WHILE") {
            self.parse_while_statement()
        } else if self.match_keyword("RETURN") {
            let value = self.parse_required_expression("Missing Value")?;
            self.expect_operator(";", "Missing semicolon")?;
            Ok(Statement::Return(ReturnStatement { value }))
        } else {
            let expression = self.parse_expression()?;
            let statement = if self.match_operator("=") {
                let value = self.parse_required_expression("Missing Assign Value")?;
                Statement::Assignment(AssignmentStatement {
                    receiver: expression,
                    value,
                })
            } else {
                Statement::Expression(expression)
            };
            self.expect_operator(";", "Missing semicolon")?;
            Ok(statement)
        }
    }

    fn parse_declaration_statement(&mut self) -> ParseResult<Statement> {
        let name = self.expect_identifier("Invalid identifier")?;
        let type_name = self.parse_type_annotation()?;
        let value = if self.match_operator("=") {
            Some(self.parse_required_expression("Missing Assign Value")?)
        } else {
            None
        };
        self.expect_operator(";", "Missing semicolon")?;
        Ok(Statement::Declaration(DeclarationStatement::new(
            name, type_name, value,
        )))
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        let mut cases = Vec::new();

        loop {
            if self.match_keyword("CASE") {
                let value = self.parse_expression()?;
                self.expect_operator(":", "Missing :")?;
                let body = self.parse_block(&["CASE", "DEFAULT", "END"])?;
                cases.push(Case {
                    value: Some(value),
                    body,
                });
            } else if self.match_keyword("DEFAULT") {
                let body = self.parse_block(&["CASE", "DEFAULT", "END"])?;
                cases.push(Case { value: None, body });
                if !self.check_keyword("END") {
                    return Err(self.error("Default Case Must Be Last"));
                }
                self.advance();
                break;
            } else if self.is_at_end() {
                return Err(self.error("Missing END"));
            } else {
                return Err(self.error("Missing Default Case"));
            }
        }

        Ok(Statement::Switch(SwitchStatement { condition, cases }))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        self.expect_keyword("DO", "Missing DO")?;
        let then_body = self.parse_block(&["ELSE", "END"])?;
        let else_body = if self.match_keyword("ELSE") {
            self.parse_block(&["END"])?
        } else {
            Vec::new()
        };
        self.expect_keyword("END", "Missing END")?;
        Ok(Statement::If(IfStatement {
            condition,
            then_body,
            else_body,
        }))
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        self.expect_keyword("DO", "Missing DO")?;
        let body = self.parse_block(&["END"])?;
        self.expect_keyword("END", "Missing END")?;
        Ok(Statement::While(WhileStatement { condition, body }))
    }

    /// Parses statements until one of `terminators` is next. The terminator is
    /// left for the caller to consume.
    fn parse_block(&mut self, terminators: &[&str]) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(self.error("Missing END"));
            }
            if terminators.iter().any(|keyword| self.check_keyword(keyword)) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
        }
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, tier: usize) -> ParseResult<Expression> {
        let Some(operators) = PRECEDENCE_TIERS.get(tier) else {
            return self.parse_primary();
        };

        let mut expression = self.parse_binary(tier + 1)?;
        while let Some(operator) = self.match_binary_operator(operators) {
            let right = self.parse_binary(tier + 1)?;
            expression = Expression::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn match_binary_operator(&mut self, operators: &[&str]) -> Option<BinaryOperator> {
        let token = self.peek()?;
        if token.kind != TokenKind::Operator || !operators.contains(&token.literal.as_str()) {
            return None;
        }
        let operator = BinaryOperator::from_literal(&token.literal)?;
        self.advance();
        Some(operator)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("Invalid expression"));
        };

        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                match token.literal.as_str() {
                    "NIL" => Ok(Expression::literal(Literal::Nil)),
                    "TRUE" => Ok(Expression::literal(Literal::Boolean(true))),
                    "FALSE" => Ok(Expression::literal(Literal::Boolean(false))),
                    _ => self.parse_identifier_expression(token.literal),
                }
            }
            TokenKind::Integer => {
                self.advance();
                let value = BigInt::from_str(&token.literal)
                    .map_err(|_| self.error("Invalid integer literal"))?;
                Ok(Expression::literal(Literal::Integer(value)))
            }
            TokenKind::Decimal => {
                self.advance();
                let value = BigDecimal::from_str(&token.literal)
                    .map_err(|_| self.error("Invalid decimal literal"))?;
                Ok(Expression::literal(Literal::Decimal(value)))
            }
            TokenKind::Character => {
                self.advance();
                let text = unescape(strip_quotes(&token.literal));
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Expression::literal(Literal::Character(ch))),
                    _ => Err(self.error("Invalid character literal")),
                }
            }
            TokenKind::String => {
                self.advance();
                let value = unescape(strip_quotes(&token.literal));
                Ok(Expression::literal(Literal::String(value)))
            }
            TokenKind::Operator if token.literal == "(" => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_operator(")", "Missing )")?;
                Ok(Expression::group(inner))
            }
            TokenKind::Operator => Err(self.error("Invalid expression")),
        }
    }

    fn parse_identifier_expression(&mut self, name: String) -> ParseResult<Expression> {
        if self.match_operator("(") {
            let arguments = if self.check_operator(")") {
                Vec::new()
            } else {
                self.parse_arguments(")")?
            };
            self.expect_operator(")", "Missing )")?;
            Ok(Expression::call(name, arguments))
        } else if self.match_operator("[") {
            let offset = self.parse_expression()?;
            self.expect_operator("]", "Missing ]")?;
            Ok(Expression::access(name, Some(offset)))
        } else {
            Ok(Expression::access(name, None))
        }
    }

    /// Parses a non-empty comma separated expression list that ends at `closing`.
    fn parse_arguments(&mut self, closing: &str) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_required_expression("Invalid Arg")?);
            if !self.match_operator(",") {
                return Ok(arguments);
            }
            if self.check_operator(closing) {
                return Err(self.error("Trailing comma"));
            }
        }
    }

    fn parse_required_expression(&mut self, message: &str) -> ParseResult<Expression> {
        if !self.starts_expression() {
            return Err(self.error(message));
        }
        self.parse_expression()
    }

    fn starts_expression(&self) -> bool {
        match self.peek() {
            Some(token) => match token.kind {
                TokenKind::Operator => token.literal == "(",
                _ => true,
            },
            None => false,
        }
    }

    fn parse_type_annotation(&mut self) -> ParseResult<Option<String>> {
        if !self.match_operator(":") {
            return Ok(None);
        }
        self.expect_identifier("Invalid type").map(Some)
    }

    fn expect_identifier(&mut self, message: &str) -> ParseResult<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = token.literal.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    fn expect_keyword(&mut self, keyword: &str, message: &str) -> ParseResult<()> {
        if self.match_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_operator(&mut self, operator: &str, message: &str) -> ParseResult<()> {
        if self.match_operator(operator) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    fn match_operator(&mut self, operator: &str) -> bool {
        let matched = self.check_operator(operator);
        if matched {
            self.advance();
        }
        matched
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.check(TokenKind::Identifier, keyword)
    }

    fn check_operator(&self, operator: &str) -> bool {
        self.check(TokenKind::Operator, operator)
    }

    fn check(&self, kind: TokenKind, literal: &str) -> bool {
        matches!(self.peek(), Some(token) if token.kind == kind && token.literal == literal)
    }

    /// Builds an error positioned just past the last consumed token.
    fn error(&self, message: &str) -> ParseError {
        let index = match self.current.checked_sub(1) {
            Some(previous) => self.tokens[previous].end(),
            None => self.tokens.first().map_or(0, |token| token.index),
        };
        ParseError {
            message: message.to_string(),
            index,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }
}

fn strip_quotes(literal: &str) -> &str {
    let mut chars = literal.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Replaces the escape sequences accepted by the lexer with their characters.
fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('b') => value.push('\u{8}'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('t') => value.push('\t'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }
    value
}
