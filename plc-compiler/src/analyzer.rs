use std::mem;
use std::rc::Rc;

use num_traits::ToPrimitive;

use crate::ast::*;
use crate::environment::{require_assignable, FunctionSignature, RuntimeError, Scope, Type, Variable};

pub type AnalyzerScope = Scope<Variable, FunctionSignature>;

type AnalyzeResult<T = ()> = Result<T, RuntimeError>;

/// Resolves names and attaches a static type to every expression.
///
/// The analyzer walks the tree once, left to right, and stops at the first
/// violation. Annotation slots on the tree are filled in place.
pub struct Analyzer {
    scope: Rc<AnalyzerScope>,
    return_type: Option<Type>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        let mut print = FunctionSignature::new("print", vec![Type::Any], Type::Nil);
        print.jvm_name = "System.out.println".to_string();
        Self {
            scope: AnalyzerScope::with_functions([(("print", 1), print)]),
            return_type: None,
        }
    }

    pub fn scope(&self) -> &Rc<AnalyzerScope> {
        &self.scope
    }

    pub fn analyze(&mut self, source: &mut Source) -> AnalyzeResult {
        for global in &mut source.globals {
            self.analyze_global(global)?;
        }
        for function in &mut source.functions {
            self.analyze_function(function)?;
        }

        let main = self.scope.lookup_function("main", 0)?;
        require_assignable(Type::Integer, main.return_type)
    }

    pub fn analyze_global(&mut self, global: &mut Global) -> AnalyzeResult {
        let declared = global.type_name.as_deref().map(resolve_type).transpose()?;
        if let Some(value) = &mut global.value {
            match value {
                Expression::List(list) => self.analyze_list(list, declared)?,
                _ => self.analyze_expression(value)?,
            }
        }

        let ty = declaration_type(&global.name, declared, global.value.as_ref())?;
        let variable = if global.is_list() {
            Variable::list(global.name.clone(), ty, global.mutable)
        } else {
            Variable::new(global.name.clone(), ty, global.mutable)
        };
        self.scope.define_variable(&global.name, variable.clone())?;
        global.variable = Some(variable);
        Ok(())
    }

    pub fn analyze_function(&mut self, function: &mut Function) -> AnalyzeResult {
        let parameter_types = function
            .parameter_type_names
            .iter()
            .map(|name| resolve_type(name))
            .collect::<AnalyzeResult<Vec<_>>>()?;
        let return_type = match &function.return_type_name {
            Some(name) => resolve_type(name)?,
            None => Type::Nil,
        };

        let signature =
            FunctionSignature::new(function.name.clone(), parameter_types.clone(), return_type);
        self.scope
            .define_function(&function.name, signature.arity(), signature.clone())?;
        function.function = Some(signature);

        let previous_return = self.return_type.replace(return_type);
        let result = self.with_scope(|analyzer| {
            for (parameter, ty) in function.parameters.iter().zip(&parameter_types) {
                analyzer
                    .scope
                    .define_variable(parameter, Variable::new(parameter.clone(), *ty, true))?;
            }
            analyzer.analyze_block(&mut function.body)
        });
        self.return_type = previous_return;
        result
    }

    pub fn analyze_statement(&mut self, statement: &mut Statement) -> AnalyzeResult {
        match statement {
            Statement::Expression(expression) => {
                if !matches!(expression, Expression::Call(_)) {
                    return Err(RuntimeError::invalid(
                        "Expression statements must be function calls.",
                    ));
                }
                self.analyze_expression(expression)
            }
            Statement::Declaration(declaration) => self.analyze_declaration(declaration),
            Statement::Assignment(assignment) => {
                if !matches!(assignment.receiver, Expression::Access(_)) {
                    return Err(RuntimeError::invalid(
                        "Assignment receivers must be variables or list elements.",
                    ));
                }
                self.analyze_expression(&mut assignment.receiver)?;
                self.analyze_expression(&mut assignment.value)?;
                require_value(type_of(&assignment.receiver)?, &assignment.value)
            }
            Statement::If(statement) => {
                self.analyze_condition(&mut statement.condition)?;
                if statement.then_body.is_empty() {
                    return Err(RuntimeError::invalid(
                        "IF statements require at least one statement before ELSE.",
                    ));
                }
                self.with_scope(|analyzer| analyzer.analyze_block(&mut statement.then_body))?;
                self.with_scope(|analyzer| analyzer.analyze_block(&mut statement.else_body))
            }
            Statement::Switch(statement) => self.analyze_switch(statement),
            Statement::While(statement) => {
                self.analyze_condition(&mut statement.condition)?;
                self.with_scope(|analyzer| analyzer.analyze_block(&mut statement.body))
            }
            Statement::Return(statement) => {
                let Some(return_type) = self.return_type else {
                    return Err(RuntimeError::invalid(
                        "RETURN is only allowed inside a function.",
                    ));
                };
                self.analyze_expression(&mut statement.value)?;
                require_value(return_type, &statement.value)
            }
        }
    }

    fn analyze_declaration(&mut self, declaration: &mut DeclarationStatement) -> AnalyzeResult {
        let declared = declaration
            .type_name
            .as_deref()
            .map(resolve_type)
            .transpose()?;
        if let Some(value) = &mut declaration.value {
            self.analyze_expression(value)?;
        }

        let ty = declaration_type(&declaration.name, declared, declaration.value.as_ref())?;
        let variable = Variable::new(declaration.name.clone(), ty, true);
        self.scope
            .define_variable(&declaration.name, variable.clone())?;
        declaration.variable = Some(variable);
        Ok(())
    }

    fn analyze_switch(&mut self, statement: &mut SwitchStatement) -> AnalyzeResult {
        self.analyze_expression(&mut statement.condition)?;
        let condition_type = type_of(&statement.condition)?;

        let last = statement.cases.len().saturating_sub(1);
        for (position, case) in statement.cases.iter_mut().enumerate() {
            match (&mut case.value, position == last) {
                (Some(value), false) => {
                    self.analyze_expression(value)?;
                    let value_type = type_of(value)?;
                    if value_type != condition_type {
                        return Err(RuntimeError::type_mismatch(condition_type, value_type));
                    }
                }
                (None, true) => {}
                (Some(_), true) => {
                    return Err(RuntimeError::invalid(
                        "SWITCH statements must end with a DEFAULT case.",
                    ))
                }
                (None, false) => {
                    return Err(RuntimeError::invalid(
                        "The DEFAULT case must be the last case of a SWITCH.",
                    ))
                }
            }
            self.with_scope(|analyzer| analyzer.analyze_block(&mut case.body))?;
        }

        if statement.cases.is_empty() {
            return Err(RuntimeError::invalid(
                "SWITCH statements must end with a DEFAULT case.",
            ));
        }
        Ok(())
    }

    pub fn analyze_expression(&mut self, expression: &mut Expression) -> AnalyzeResult {
        match expression {
            Expression::Literal(literal) => {
                literal.ty = Some(literal_type(&literal.value)?);
                Ok(())
            }
            Expression::Group(group) => {
                if !matches!(*group.inner, Expression::Binary(_)) {
                    return Err(RuntimeError::invalid(
                        "Grouped expressions must contain a binary expression.",
                    ));
                }
                self.analyze_expression(&mut group.inner)?;
                group.ty = Some(type_of(&group.inner)?);
                Ok(())
            }
            Expression::Binary(binary) => {
                self.analyze_expression(&mut binary.left)?;
                self.analyze_expression(&mut binary.right)?;
                let left = type_of(&binary.left)?;
                let right = type_of(&binary.right)?;
                binary.ty = Some(binary_type(binary.operator, left, right)?);
                Ok(())
            }
            Expression::Access(access) => {
                if let Some(offset) = &mut access.offset {
                    self.analyze_expression(offset)?;
                    require_assignable(Type::Integer, type_of(offset)?)?;
                }
                let variable = self.scope.lookup_variable(&access.name)?;
                access.variable = Some(Variable::clone(&variable));
                Ok(())
            }
            Expression::Call(call) => {
                for argument in &mut call.arguments {
                    self.analyze_expression(argument)?;
                }
                let function = self
                    .scope
                    .lookup_function(&call.name, call.arguments.len())?;
                for (parameter_type, argument) in
                    function.parameter_types.iter().zip(&call.arguments)
                {
                    require_value(*parameter_type, argument)?;
                }
                call.function = Some(FunctionSignature::clone(&function));
                Ok(())
            }
            Expression::List(list) => self.analyze_list(list, None),
        }
    }

    /// Analyzes a list literal against an element type. Without a declared
    /// element type the first element decides it.
    fn analyze_list(&mut self, list: &mut ListLiteral, element_type: Option<Type>) -> AnalyzeResult {
        for element in &mut list.elements {
            self.analyze_expression(element)?;
        }

        let element_type = match (element_type, list.elements.first()) {
            (Some(ty), _) => ty,
            (None, Some(first)) => type_of(first)?,
            (None, None) => Type::Any,
        };
        for element in &list.elements {
            require_assignable(element_type, type_of(element)?)?;
        }
        list.ty = Some(element_type);
        Ok(())
    }

    fn analyze_condition(&mut self, condition: &mut Expression) -> AnalyzeResult {
        self.analyze_expression(condition)?;
        require_assignable(Type::Boolean, type_of(condition)?)
    }

    fn analyze_block(&mut self, statements: &mut [Statement]) -> AnalyzeResult {
        for statement in statements {
            self.analyze_statement(statement)?;
        }
        Ok(())
    }

    /// Runs `body` inside a child scope, restoring the current scope afterwards
    /// whether or not `body` succeeds.
    fn with_scope<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> AnalyzeResult<T>,
    ) -> AnalyzeResult<T> {
        let child = AnalyzerScope::child(&self.scope);
        let previous = mem::replace(&mut self.scope, child);
        let result = body(self);
        self.scope = previous;
        result
    }
}

fn resolve_type(name: &str) -> AnalyzeResult<Type> {
    Type::from_name(name).ok_or_else(|| RuntimeError::invalid(format!("Unknown type {name}.")))
}

/// The type of `expression` where a single value is expected.
fn type_of(expression: &Expression) -> AnalyzeResult<Type> {
    if let Some(name) = unindexed_list(expression) {
        return Err(RuntimeError::invalid(format!(
            "The list {name} must be indexed."
        )));
    }
    expression
        .ty()
        .ok_or_else(|| RuntimeError::invalid("Expression was not analyzed."))
}

/// Checks `value` against `target`. Only `Any` accepts a whole list.
fn require_value(target: Type, value: &Expression) -> AnalyzeResult {
    if target == Type::Any && unindexed_list(value).is_some() {
        return Ok(());
    }
    require_assignable(target, type_of(value)?)
}

fn unindexed_list(expression: &Expression) -> Option<&str> {
    match expression {
        Expression::Access(access) if access.offset.is_none() => access
            .variable
            .as_ref()
            .filter(|variable| variable.list)
            .map(|variable| variable.name.as_str()),
        _ => None,
    }
}

/// Picks the type of a declared variable from its annotation and initializer.
fn declaration_type(
    name: &str,
    declared: Option<Type>,
    value: Option<&Expression>,
) -> AnalyzeResult<Type> {
    match (declared, value) {
        (Some(declared), Some(value)) => {
            require_value(declared, value)?;
            Ok(declared)
        }
        (Some(declared), None) => Ok(declared),
        (None, Some(value)) => type_of(value),
        (None, None) => Err(RuntimeError::invalid(format!(
            "Type not specified for {name}."
        ))),
    }
}

fn literal_type(literal: &Literal) -> AnalyzeResult<Type> {
    match literal {
        Literal::Nil => Ok(Type::Nil),
        Literal::Boolean(_) => Ok(Type::Boolean),
        Literal::Character(_) => Ok(Type::Character),
        Literal::String(_) => Ok(Type::String),
        Literal::Integer(value) => {
            if value.to_i32().is_none() {
                return Err(RuntimeError::invalid(format!(
                    "Integer literal {value} does not fit in 32 bits."
                )));
            }
            Ok(Type::Integer)
        }
        Literal::Decimal(value) => match value.to_f64() {
            Some(double) if double.is_finite() => Ok(Type::Decimal),
            _ => Err(RuntimeError::invalid(format!(
                "Decimal literal {value} is out of range."
            ))),
        },
    }
}

fn binary_type(operator: BinaryOperator, left: Type, right: Type) -> AnalyzeResult<Type> {
    match operator {
        BinaryOperator::And | BinaryOperator::Or => {
            require_assignable(Type::Boolean, left)?;
            require_assignable(Type::Boolean, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Less | BinaryOperator::Greater => {
            require_assignable(Type::Comparable, left)?;
            require_same(left, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Equal | BinaryOperator::NotEqual => {
            require_same(left, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Add if left == Type::String || right == Type::String => Ok(Type::String),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide => {
            if !matches!(left, Type::Integer | Type::Decimal) {
                return Err(RuntimeError::invalid(format!(
                    "Operator {} requires Integer or Decimal operands, received {left}.",
                    operator.as_str()
                )));
            }
            require_same(left, right)?;
            Ok(left)
        }
        BinaryOperator::Power => {
            require_assignable(Type::Integer, left)?;
            require_assignable(Type::Integer, right)?;
            Ok(Type::Integer)
        }
    }
}

fn require_same(expected: Type, received: Type) -> AnalyzeResult {
    if expected == received {
        Ok(())
    } else {
        Err(RuntimeError::type_mismatch(expected, received))
    }
}
