use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{Expression, Statement};
use crate::builtins::Builtin;

use super::env::ScopeId;

/// Runtime value model. Arrays, objects and instances have reference
/// semantics: clones alias the same storage.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Class(Rc<ClassValue>),
    Instance(Rc<RefCell<InstanceData>>),
    /// Materialized on member access; pairs a method with its receiver.
    BoundMethod {
        receiver: Rc<RefCell<InstanceData>>,
        method: Rc<FunctionValue>,
    },
}

/// Insertion-ordered string-keyed record backing object literals.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    entries: Vec<(String, Value)>,
}

impl ObjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        for entry in &mut self.entries {
            if entry.0 == key {
                entry.1 = value;
                return;
            }
        }
        self.entries.push((key.to_string(), value));
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

/// A user function: parameters, body, and the scope captured at its
/// declaration. Calls chain a fresh scope to `captured`, never to the call
/// site.
#[derive(Debug)]
pub struct FunctionValue {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Statement>>,
    pub captured: ScopeId,
}

/// Class descriptor. Field initializers stay as expressions and are
/// evaluated per instantiation, in the scope the class was declared in.
#[derive(Debug)]
pub struct ClassValue {
    pub name: String,
    pub parent: Option<Rc<ClassValue>>,
    pub captured: ScopeId,
    pub fields: Vec<(String, Option<Expression>)>,
    pub methods: FxHashMap<String, Rc<FunctionValue>>,
}

/// A live instance: fields plus the method set snapshot taken at `new` time
/// (no prototype chain).
#[derive(Debug)]
pub struct InstanceData {
    pub class_name: String,
    pub fields: ObjectData,
    pub methods: FxHashMap<String, Rc<FunctionValue>>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Array(_) => "array",
            Self::Object(_) | Self::Instance(_) => "object",
            Self::Function(_) | Self::Builtin(_) | Self::BoundMethod { .. } | Self::Class(_) => {
                "function"
            }
        }
    }

    /// `null`/`undefined` are false, booleans as-is, numbers false iff
    /// exactly zero, strings false iff empty, everything else true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Undefined => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0,
            Self::Str(value) => !value.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The text `print` produces: strings bare, containers rendered
    /// JSON-style with quoted string elements.
    pub fn stringify(&self) -> String {
        match self {
            Self::Str(value) => value.clone(),
            other => other.render(),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Number(value) => format_number(*value),
            Self::Str(value) => format!("\"{value}\""),
            Self::Bool(value) => value.to_string(),
            Self::Null => "null".to_string(),
            Self::Undefined => "undefined".to_string(),
            Self::Array(elements) => {
                let rendered: Vec<String> = elements
                    .borrow()
                    .iter()
                    .map(|element| element.render())
                    .collect();
                format!("[{}]", rendered.join(","))
            }
            Self::Object(object) => render_entries(object.borrow().entries()),
            Self::Instance(instance) => render_entries(instance.borrow().fields.entries()),
            Self::Function(function) => format!("<function {}>", function.name),
            Self::BoundMethod { method, .. } => format!("<function {}>", method.name),
            Self::Builtin(builtin) => format!("<builtin {}>", builtin.name()),
            Self::Class(class) => format!("<class {}>", class.name),
        }
    }
}

fn render_entries(entries: &[(String, Value)]) -> String {
    let rendered: Vec<String> = entries
        .iter()
        .map(|(key, value)| format!("\"{key}\":{}", value.render()))
        .collect();
    format!("{{{}}}", rendered.join(","))
}

/// Integral values print without a fractional part; there is only one
/// numeric type, so `5.0` must read back as `5`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{value}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify())
    }
}

/// Strict equality: primitives by value, containers and callables by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::Undefined, Self::Undefined) => true,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (
                Self::BoundMethod {
                    receiver: ra,
                    method: ma,
                },
                Self::BoundMethod {
                    receiver: rb,
                    method: mb,
                },
            ) => Rc::ptr_eq(ra, rb) && Rc::ptr_eq(ma, mb),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn truthiness_follows_the_contract() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".to_string()).is_truthy());
        assert!(Value::Array(Rc::new(RefCell::new(Vec::new()))).is_truthy());
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Rc::new(RefCell::new(vec![Value::Number(1.0)]));
        let alias = Value::Array(a.clone());
        assert_eq!(Value::Array(a), alias);
        let other = Value::Array(Rc::new(RefCell::new(vec![Value::Number(1.0)])));
        assert_ne!(alias, other);
    }

    #[test]
    fn containers_render_json_style() {
        let array = Value::Array(Rc::new(RefCell::new(vec![
            Value::Number(1.0),
            Value::Str("a".to_string()),
        ])));
        assert_eq!(array.stringify(), "[1,\"a\"]");
        let mut data = ObjectData::new();
        data.set("k", Value::Number(2.0));
        assert_eq!(
            Value::Object(Rc::new(RefCell::new(data))).stringify(),
            "{\"k\":2}"
        );
    }
}
