use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Any,
    Comparable,
    Nil,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
}

impl Type {
    pub const ALL: [Type; 8] = [
        Type::Any,
        Type::Comparable,
        Type::Nil,
        Type::Boolean,
        Type::Integer,
        Type::Decimal,
        Type::Character,
        Type::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Type::Any => "Any",
            Type::Comparable => "Comparable",
            Type::Nil => "Nil",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Character => "Character",
            Type::String => "String",
        }
    }

    /// Name of the type in generated Java source.
    pub fn jvm_name(self) -> &'static str {
        match self {
            Type::Any => "Object",
            Type::Comparable => "Comparable",
            Type::Nil => "Void",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
        }
    }

    pub fn from_name(name: &str) -> Option<Type> {
        Type::ALL.into_iter().find(|ty| ty.name() == name)
    }

    pub fn is_comparable(self) -> bool {
        matches!(
            self,
            Type::Integer | Type::Decimal | Type::Character | Type::String
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that a value of type `source` may be stored where `target` is expected.
pub fn require_assignable(target: Type, source: Type) -> Result<(), RuntimeError> {
    let assignable = target == source
        || match target {
            Type::Any => true,
            Type::Comparable => source.is_comparable(),
            _ => false,
        };
    if assignable {
        Ok(())
    } else {
        Err(RuntimeError::type_mismatch(target, source))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Expected type {expected}, received {received}.")]
    TypeMismatch { expected: String, received: String },
    #[error("The variable {0} is not defined in this scope.")]
    UndefinedVariable(String),
    #[error("The variable {0} is already defined in this scope.")]
    VariableAlreadyDefined(String),
    #[error("The function {name}/{arity} is not defined in this scope.")]
    UndefinedFunction { name: String, arity: usize },
    #[error("The function {name}/{arity} is already defined in this scope.")]
    FunctionAlreadyDefined { name: String, arity: usize },
    #[error("Immutable variable {0} cannot be reassigned.")]
    ImmutableAssignment(String),
    #[error("Index {index} is out of bounds for a list of length {length}.")]
    IndexOutOfBounds { index: String, length: usize },
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("{0}")]
    Invalid(String),
}

impl RuntimeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RuntimeError::Invalid(message.into())
    }

    pub fn type_mismatch(expected: impl fmt::Display, received: impl fmt::Display) -> Self {
        RuntimeError::TypeMismatch {
            expected: expected.to_string(),
            received: received.to_string(),
        }
    }
}

/// A variable binding as seen by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub jvm_name: String,
    /// Element type for lists.
    pub ty: Type,
    pub mutable: bool,
    pub list: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type, mutable: bool) -> Self {
        let name = name.into();
        Self {
            jvm_name: name.clone(),
            name,
            ty,
            mutable,
            list: false,
        }
    }

    pub fn list(name: impl Into<String>, ty: Type, mutable: bool) -> Self {
        Self {
            list: true,
            ..Self::new(name, ty, mutable)
        }
    }
}

/// A function binding as seen by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub jvm_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, parameter_types: Vec<Type>, return_type: Type) -> Self {
        let name = name.into();
        Self {
            jvm_name: name.clone(),
            name,
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// One frame of a lexical environment.
///
/// Frames are shared through `Rc`; a child keeps its parent alive for as long
/// as the child itself is reachable. Bindings are stored behind `Rc` so callers
/// can hold on to a binding after the lookup returns.
#[derive(Debug)]
pub struct Scope<V, F> {
    parent: Option<Rc<Scope<V, F>>>,
    variables: RefCell<HashMap<String, Rc<V>>>,
    functions: RefCell<HashMap<(String, usize), Rc<F>>>,
}

impl<V, F> Scope<V, F> {
    pub fn new_root() -> Rc<Self> {
        Self::with_functions([])
    }

    /// A root scope holding `builtins`, keyed by name and arity. A later entry
    /// replaces an earlier one with the same key.
    pub fn with_functions<'n>(
        builtins: impl IntoIterator<Item = ((&'n str, usize), F)>,
    ) -> Rc<Self> {
        let functions = builtins
            .into_iter()
            .map(|((name, arity), function)| ((name.to_string(), arity), Rc::new(function)))
            .collect();
        Rc::new(Self {
            parent: None,
            variables: RefCell::new(HashMap::new()),
            functions: RefCell::new(functions),
        })
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            variables: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    pub fn define_variable(&self, name: &str, variable: V) -> Result<Rc<V>, RuntimeError> {
        let mut variables = self.variables.borrow_mut();
        if variables.contains_key(name) {
            return Err(RuntimeError::VariableAlreadyDefined(name.to_string()));
        }
        let variable = Rc::new(variable);
        variables.insert(name.to_string(), Rc::clone(&variable));
        Ok(variable)
    }

    pub fn lookup_variable(&self, name: &str) -> Result<Rc<V>, RuntimeError> {
        if let Some(variable) = self.variables.borrow().get(name) {
            return Ok(Rc::clone(variable));
        }
        match &self.parent {
            Some(parent) => parent.lookup_variable(name),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    pub fn define_function(
        &self,
        name: &str,
        arity: usize,
        function: F,
    ) -> Result<Rc<F>, RuntimeError> {
        let mut functions = self.functions.borrow_mut();
        let key = (name.to_string(), arity);
        if functions.contains_key(&key) {
            return Err(RuntimeError::FunctionAlreadyDefined {
                name: name.to_string(),
                arity,
            });
        }
        let function = Rc::new(function);
        functions.insert(key, Rc::clone(&function));
        Ok(function)
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Result<Rc<F>, RuntimeError> {
        if let Some(function) = self.functions.borrow().get(&(name.to_string(), arity)) {
            return Ok(Rc::clone(function));
        }
        match &self.parent {
            Some(parent) => parent.lookup_function(name, arity),
            None => Err(RuntimeError::UndefinedFunction {
                name: name.to_string(),
                arity,
            }),
        }
    }
}
