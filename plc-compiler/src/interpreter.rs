use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::mem;
use std::rc::{Rc, Weak};

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::ast::*;
use crate::environment::{RuntimeError, Scope};

pub type InterpreterScope<'a> = Scope<RuntimeVariable, RuntimeFunction<'a>>;

type EvalResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
    /// Lists are shared: copying the value aliases the same elements.
    List(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Character(_) => "Character",
            Value::String(_) => "String",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::List(_) => "List",
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(BigInt::from(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("null"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Character(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Decimal(value) => write!(f, "{value}"),
            Value::List(elements) => {
                f.write_str("[")?;
                for (position, element) in elements.borrow().iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug)]
pub struct RuntimeVariable {
    pub name: String,
    pub mutable: bool,
    value: RefCell<Value>,
}

impl RuntimeVariable {
    pub fn new(name: impl Into<String>, mutable: bool, value: Value) -> Self {
        Self {
            name: name.into(),
            mutable,
            value: RefCell::new(value),
        }
    }

    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }
}

#[derive(Debug)]
pub enum RuntimeFunction<'a> {
    Print,
    Declared {
        function: &'a Function,
        closure: Weak<InterpreterScope<'a>>,
    },
}

/// Result of executing a statement: either fall through or unwind to the
/// nearest call with a value.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Normal,
    Return(Value),
}

/// Tree-walking evaluator. `print` writes to `output`.
pub struct Interpreter<'a, W> {
    scope: Rc<InterpreterScope<'a>>,
    output: W,
}

impl<'a, W: Write> Interpreter<'a, W> {
    pub fn new(output: W) -> Self {
        let scope = InterpreterScope::with_functions([(("print", 1), RuntimeFunction::Print)]);
        Self { scope, output }
    }

    pub fn scope(&self) -> &Rc<InterpreterScope<'a>> {
        &self.scope
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs globals, registers functions, then calls `main/0`.
    pub fn evaluate(&mut self, source: &'a Source) -> EvalResult<Value> {
        for global in &source.globals {
            self.define_global(global)?;
        }
        for function in &source.functions {
            self.define_function(function)?;
        }

        let main = match self.scope.lookup_function("main", 0) {
            Ok(main) => main,
            Err(_) if source.functions.iter().any(|function| function.name == "main") => {
                return Err(RuntimeError::invalid("Invalid main arity"));
            }
            Err(err) => return Err(err),
        };
        self.invoke(&main, Vec::new())
    }

    pub fn define_global(&mut self, global: &Global) -> EvalResult<()> {
        let value = match &global.value {
            Some(value) => self.evaluate_expression(value)?,
            None => Value::Nil,
        };
        self.scope.define_variable(
            &global.name,
            RuntimeVariable::new(global.name.clone(), global.mutable, value),
        )?;
        Ok(())
    }

    /// Registers `function` as a closure over the current scope.
    pub fn define_function(&mut self, function: &'a Function) -> EvalResult<()> {
        let closure = Rc::downgrade(&self.scope);
        self.scope.define_function(
            &function.name,
            function.parameters.len(),
            RuntimeFunction::Declared { function, closure },
        )?;
        Ok(())
    }

    /// Executes a statement outside of any function.
    pub fn execute(&mut self, statement: &Statement) -> EvalResult<()> {
        match self.execute_statement(statement)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(RuntimeError::invalid(
                "RETURN is only allowed inside a function.",
            )),
        }
    }

    fn execute_statement(&mut self, statement: &Statement) -> EvalResult<Flow> {
        match statement {
            Statement::Expression(expression) => {
                self.evaluate_expression(expression)?;
                Ok(Flow::Normal)
            }
            Statement::Declaration(declaration) => {
                let value = match &declaration.value {
                    Some(value) => self.evaluate_expression(value)?,
                    None => Value::Nil,
                };
                self.scope.define_variable(
                    &declaration.name,
                    RuntimeVariable::new(declaration.name.clone(), true, value),
                )?;
                Ok(Flow::Normal)
            }
            Statement::Assignment(assignment) => {
                self.assign(&assignment.receiver, &assignment.value)?;
                Ok(Flow::Normal)
            }
            Statement::If(statement) => {
                let body = if self.evaluate_condition(&statement.condition)? {
                    &statement.then_body
                } else {
                    &statement.else_body
                };
                self.execute_scoped_block(body)
            }
            Statement::Switch(statement) => {
                let condition = self.evaluate_expression(&statement.condition)?;
                for case in &statement.cases {
                    let matches = match &case.value {
                        Some(value) => self.evaluate_expression(value)? == condition,
                        None => true,
                    };
                    if matches {
                        return self.execute_scoped_block(&case.body);
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::While(statement) => {
                while self.evaluate_condition(&statement.condition)? {
                    if let Flow::Return(value) = self.execute_scoped_block(&statement.body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(statement) => {
                Ok(Flow::Return(self.evaluate_expression(&statement.value)?))
            }
        }
    }

    fn assign(&mut self, receiver: &Expression, value: &Expression) -> EvalResult<()> {
        let Expression::Access(access) = receiver else {
            return Err(RuntimeError::invalid(
                "Assignment receivers must be variables or list elements.",
            ));
        };

        let variable = self.scope.lookup_variable(&access.name)?;
        if !variable.mutable {
            return Err(RuntimeError::ImmutableAssignment(access.name.clone()));
        }

        match &access.offset {
            Some(offset) => {
                let offset = self.evaluate_expression(offset)?;
                let value = self.evaluate_expression(value)?;
                let Value::List(elements) = variable.value() else {
                    return Err(RuntimeError::invalid(format!(
                        "The variable {} is not a list.",
                        access.name
                    )));
                };
                let mut elements = elements.borrow_mut();
                let index = list_index(&offset, elements.len())?;
                elements[index] = value;
            }
            None => {
                let value = self.evaluate_expression(value)?;
                variable.set(value);
            }
        }
        Ok(())
    }

    fn execute_scoped_block(&mut self, statements: &[Statement]) -> EvalResult<Flow> {
        let child = InterpreterScope::child(&self.scope);
        self.with_scope(child, |interpreter| interpreter.execute_block(statements))
    }

    fn execute_block(&mut self, statements: &[Statement]) -> EvalResult<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.execute_statement(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    /// Makes `scope` current for the duration of `body`. The previous scope is
    /// restored on every exit path, errors included.
    fn with_scope<T>(
        &mut self,
        scope: Rc<InterpreterScope<'a>>,
        body: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let previous = mem::replace(&mut self.scope, scope);
        let result = body(self);
        self.scope = previous;
        result
    }

    fn invoke(&mut self, function: &RuntimeFunction<'a>, arguments: Vec<Value>) -> EvalResult<Value> {
        match function {
            RuntimeFunction::Print => {
                for argument in &arguments {
                    writeln!(self.output, "{argument}").map_err(|err| {
                        RuntimeError::invalid(format!("Failed to write output: {err}"))
                    })?;
                }
                Ok(Value::Nil)
            }
            RuntimeFunction::Declared { function, closure } => {
                let function: &'a Function = *function;
                let closure = closure.upgrade().ok_or_else(|| {
                    RuntimeError::invalid(format!(
                        "The scope of function {} is no longer available.",
                        function.name
                    ))
                })?;

                let frame = InterpreterScope::child(&closure);
                for (parameter, argument) in function.parameters.iter().zip(arguments) {
                    frame.define_variable(
                        parameter,
                        RuntimeVariable::new(parameter.clone(), true, argument),
                    )?;
                }

                let flow = self.with_scope(frame, |interpreter| {
                    interpreter.execute_block(&function.body)
                })?;
                Ok(match flow {
                    Flow::Return(value) => value,
                    Flow::Normal => Value::Nil,
                })
            }
        }
    }

    pub fn evaluate_expression(&mut self, expression: &Expression) -> EvalResult<Value> {
        match expression {
            Expression::Literal(literal) => Ok(literal_value(&literal.value)),
            Expression::Group(group) => self.evaluate_expression(&group.inner),
            Expression::Binary(binary) => self.evaluate_binary(binary),
            Expression::Access(access) => {
                let variable = self.scope.lookup_variable(&access.name)?;
                let Some(offset) = &access.offset else {
                    return Ok(variable.value());
                };
                let offset = self.evaluate_expression(offset)?;
                let Value::List(elements) = variable.value() else {
                    return Err(RuntimeError::invalid(format!(
                        "The variable {} is not a list.",
                        access.name
                    )));
                };
                let elements = elements.borrow();
                let index = list_index(&offset, elements.len())?;
                Ok(elements[index].clone())
            }
            Expression::Call(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|argument| self.evaluate_expression(argument))
                    .collect::<EvalResult<Vec<_>>>()?;
                let function = self.scope.lookup_function(&call.name, arguments.len())?;
                self.invoke(&function, arguments)
            }
            Expression::List(list) => {
                let elements = list
                    .elements
                    .iter()
                    .map(|element| self.evaluate_expression(element))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::list(elements))
            }
        }
    }

    fn evaluate_binary(&mut self, binary: &BinaryExpression) -> EvalResult<Value> {
        let left = self.evaluate_expression(&binary.left)?;
        let decisive = match binary.operator {
            BinaryOperator::And => Some(false),
            BinaryOperator::Or => Some(true),
            _ => None,
        };
        if let Some(decisive) = decisive {
            match &left {
                Value::Boolean(value) if *value == decisive => return Ok(Value::Boolean(decisive)),
                Value::Boolean(_) => {}
                other => return Err(RuntimeError::type_mismatch("Boolean", other.type_name())),
            }
        }
        let right = self.evaluate_expression(&binary.right)?;
        apply_binary(binary.operator, left, right)
    }

    fn evaluate_condition(&mut self, condition: &Expression) -> EvalResult<bool> {
        match self.evaluate_expression(condition)? {
            Value::Boolean(value) => Ok(value),
            other => Err(RuntimeError::type_mismatch("Boolean", other.type_name())),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(value) => Value::Boolean(*value),
        Literal::Character(value) => Value::Character(*value),
        Literal::String(value) => Value::String(value.clone()),
        Literal::Integer(value) => Value::Integer(value.clone()),
        Literal::Decimal(value) => Value::Decimal(value.clone()),
    }
}

/// Applies `operator` to two already evaluated operands.
fn apply_binary(operator: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    match operator {
        BinaryOperator::And | BinaryOperator::Or => match (left, right) {
            (Value::Boolean(left), Value::Boolean(right)) => Ok(Value::Boolean(
                if operator == BinaryOperator::And {
                    left && right
                } else {
                    left || right
                },
            )),
            (Value::Boolean(_), other) | (other, _) => {
                Err(RuntimeError::type_mismatch("Boolean", other.type_name()))
            }
        },
        BinaryOperator::Less => Ok(Value::Boolean(compare(&left, &right)? == Ordering::Less)),
        BinaryOperator::Greater => Ok(Value::Boolean(compare(&left, &right)? == Ordering::Greater)),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::Add => match (left, right) {
            (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
                Ok(Value::String(format!("{left}{right}")))
            }
            (Value::Integer(left), Value::Integer(right)) => Ok(Value::Integer(left + right)),
            (Value::Decimal(left), Value::Decimal(right)) => Ok(Value::Decimal(left + right)),
            (left, right) => Err(operand_error(operator, &left, &right)),
        },
        BinaryOperator::Subtract => match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => Ok(Value::Integer(left - right)),
            (Value::Decimal(left), Value::Decimal(right)) => Ok(Value::Decimal(left - right)),
            (left, right) => Err(operand_error(operator, &left, &right)),
        },
        BinaryOperator::Multiply => match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => Ok(Value::Integer(left * right)),
            (Value::Decimal(left), Value::Decimal(right)) => Ok(Value::Decimal(left * right)),
            (left, right) => Err(operand_error(operator, &left, &right)),
        },
        BinaryOperator::Divide => match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
                if right.is_zero() {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(Value::Integer(left / right))
            }
            // Rounded half-even to the scale of the dividend.
            (Value::Decimal(left), Value::Decimal(right)) => {
                if right.is_zero() {
                    return Err(RuntimeError::DivisionByZero);
                }
                let (_, scale) = left.as_bigint_and_exponent();
                let quotient = &left / &right;
                Ok(Value::Decimal(
                    quotient.with_scale_round(scale, RoundingMode::HalfEven),
                ))
            }
            (left, right) => Err(operand_error(operator, &left, &right)),
        },
        BinaryOperator::Power => match (left, right) {
            (Value::Integer(base), Value::Integer(exponent)) => {
                let exponent = exponent.to_u32().ok_or_else(|| {
                    RuntimeError::invalid(format!(
                        "Exponent {exponent} must be a non-negative 32-bit integer."
                    ))
                })?;
                Ok(Value::Integer(base.pow(exponent)))
            }
            (left, right) => Err(operand_error(operator, &left, &right)),
        },
    }
}

fn list_index(offset: &Value, length: usize) -> EvalResult<usize> {
    let Value::Integer(offset) = offset else {
        return Err(RuntimeError::type_mismatch("Integer", offset.type_name()));
    };
    match offset.to_usize() {
        Some(index) if index < length => Ok(index),
        _ => Err(RuntimeError::IndexOutOfBounds {
            index: offset.to_string(),
            length,
        }),
    }
}

fn compare(left: &Value, right: &Value) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => Ok(left.cmp(right)),
        (Value::Decimal(left), Value::Decimal(right)) => Ok(left.cmp(right)),
        (Value::Character(left), Value::Character(right)) => Ok(left.cmp(right)),
        (Value::String(left), Value::String(right)) => Ok(left.cmp(right)),
        _ => Err(RuntimeError::type_mismatch(left.type_name(), right.type_name())),
    }
}

fn operand_error(operator: BinaryOperator, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::invalid(format!(
        "Operator {} cannot be applied to {} and {}.",
        operator.as_str(),
        left.type_name(),
        right.type_name()
    ))
}
