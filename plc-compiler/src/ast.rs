use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::environment::{FunctionSignature, Type, Variable};

/// Root of a compilation unit: all globals, then all functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Source {
    pub fn new(globals: Vec<Global>, functions: Vec<Function>) -> Self {
        Self { globals, functions }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub type_name: Option<String>,
    pub mutable: bool,
    pub value: Option<Expression>,
    pub variable: Option<Variable>,
}

impl Global {
    pub fn new(
        name: impl Into<String>,
        type_name: Option<String>,
        mutable: bool,
        value: Option<Expression>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name,
            mutable,
            value,
            variable: None,
        }
    }

    /// Globals declared with `LIST` always carry a list literal initializer.
    pub fn is_list(&self) -> bool {
        matches!(self.value, Some(Expression::List(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    /// One entry per parameter; `"Any"` when the source omits the annotation.
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub body: Vec<Statement>,
    pub function: Option<FunctionSignature>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<String>,
        parameter_type_names: Vec<String>,
        return_type_name: Option<String>,
        body: Vec<Statement>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            parameter_type_names,
            return_type_name,
            body,
            function: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Declaration(DeclarationStatement),
    Assignment(AssignmentStatement),
    If(IfStatement),
    Switch(SwitchStatement),
    While(WhileStatement),
    Return(ReturnStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationStatement {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Expression>,
    pub variable: Option<Variable>,
}

impl DeclarationStatement {
    pub fn new(name: impl Into<String>, type_name: Option<String>, value: Option<Expression>) -> Self {
        Self {
            name: name.into(),
            type_name,
            value,
            variable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStatement {
    pub receiver: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_body: Vec<Statement>,
    pub else_body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    pub condition: Expression,
    /// The last case is always the default and has no match value.
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralExpression),
    Group(GroupExpression),
    Binary(BinaryExpression),
    Access(AccessExpression),
    Call(CallExpression),
    List(ListLiteral),
}

impl Expression {
    pub fn literal(value: Literal) -> Self {
        Expression::Literal(LiteralExpression { value, ty: None })
    }

    pub fn group(inner: Expression) -> Self {
        Expression::Group(GroupExpression {
            inner: Box::new(inner),
            ty: None,
        })
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty: None,
        })
    }

    pub fn access(name: impl Into<String>, offset: Option<Expression>) -> Self {
        Expression::Access(AccessExpression {
            name: name.into(),
            offset: offset.map(Box::new),
            variable: None,
        })
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::Call(CallExpression {
            name: name.into(),
            arguments,
            function: None,
        })
    }

    pub fn list(elements: Vec<Expression>) -> Self {
        Expression::List(ListLiteral { elements, ty: None })
    }

    /// The static type attached by the analyzer, if it has run.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Expression::Literal(literal) => literal.ty,
            Expression::Group(group) => group.ty,
            Expression::Binary(binary) => binary.ty,
            Expression::Access(access) => access.variable.as_ref().map(|variable| variable.ty),
            Expression::Call(call) => call.function.as_ref().map(|function| function.return_type),
            Expression::List(list) => list.ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    pub value: Literal,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupExpression {
    pub inner: Box<Expression>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    Less,
    Greater,
    Equal,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
        }
    }

    pub fn from_literal(literal: &str) -> Option<Self> {
        let operator = match literal {
            "&&" => BinaryOperator::And,
            "||" => BinaryOperator::Or,
            "<" => BinaryOperator::Less,
            ">" => BinaryOperator::Greater,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "^" => BinaryOperator::Power,
            _ => return None,
        };
        Some(operator)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessExpression {
    pub name: String,
    pub offset: Option<Box<Expression>>,
    pub variable: Option<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub function: Option<FunctionSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral {
    pub elements: Vec<Expression>,
    pub ty: Option<Type>,
}
