use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{
    AssignOp, BinaryOp, CatchClause, Expression, Function, Literal, Program, Statement, UnaryOp,
};
use crate::builtins::{self, Builtin};

pub mod env;
pub mod error;
pub mod value;

use env::{ScopeArena, ScopeId};
use error::RuntimeError;
use value::{ClassValue, FunctionValue, InstanceData, ObjectData, Value};

/// Ceiling on nested user-function calls; crossing it is a runtime error
/// rather than a host stack overflow.
const MAX_CALL_DEPTH: usize = 200;

/// Non-local outcome of a statement. Normal completion is the `Ok` side of
/// [`Flow`], so `?` propagates a signal until the construct that absorbs its
/// variant: loops take Break/Continue, calls take Return, try/catch takes
/// Raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Return(Value),
    Break,
    Continue,
    Raised(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Raised(error)
    }
}

type Flow<T> = Result<T, Signal>;

/// Result of one top-level evaluation. `output` holds everything printed
/// before completion or failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    pub output: String,
    pub error: Option<RuntimeError>,
}

impl Evaluation {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Tree-walking evaluator. Keeps its scope arena between `evaluate` calls so
/// a REPL host observes variable persistence; the output buffer is cleared
/// per call.
pub struct Evaluator {
    scopes: ScopeArena,
    global: ScopeId,
    active: Vec<ScopeId>,
    registry: Vec<Builtin>,
    output: Vec<String>,
    depth: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_builtins(builtins::standard_registry())
    }

    /// Build an evaluator around an explicit builtin registry; the registry
    /// is seeded into the root scope once, here.
    pub fn with_builtins(registry: Vec<Builtin>) -> Self {
        let mut scopes = ScopeArena::new();
        let global = scopes.alloc(None);
        let mut evaluator = Self {
            scopes,
            global,
            active: vec![global],
            registry,
            output: Vec::new(),
            depth: 0,
        };
        evaluator.seed_globals();
        evaluator
    }

    fn seed_globals(&mut self) {
        for builtin in &self.registry {
            self.scopes
                .define(self.global, builtin.name(), Value::Builtin(*builtin));
        }
        self.scopes.define(self.global, "Math", builtins::math_object());
    }

    /// Discard all user state and rebuild the root scope.
    pub fn reset(&mut self) {
        self.scopes = ScopeArena::new();
        self.global = self.scopes.alloc(None);
        self.active = vec![self.global];
        self.output.clear();
        self.depth = 0;
        self.seed_globals();
    }

    /// Sorted snapshot of user-visible global bindings.
    pub fn variables(&self) -> Vec<(String, Value)> {
        self.scopes
            .snapshot(self.global)
            .into_iter()
            .filter(|(_, value)| !matches!(value, Value::Builtin(_)))
            .collect()
    }

    pub fn evaluate(&mut self, program: &Program) -> Evaluation {
        self.output.clear();
        // Restore the root frame in case a prior run aborted mid-frame.
        self.active.truncate(1);
        self.depth = 0;

        let mut last = Value::Undefined;
        for statement in &program.statements {
            match self.exec(statement) {
                Ok(value) => last = value,
                Err(signal) => {
                    let error = match signal {
                        Signal::Raised(error) => error,
                        Signal::Return(_) => RuntimeError::ReturnOutsideFunction,
                        Signal::Break => RuntimeError::BreakOutsideLoop,
                        Signal::Continue => RuntimeError::ContinueOutsideLoop,
                    };
                    return Evaluation {
                        value: Value::Undefined,
                        output: self.output.join("\n"),
                        error: Some(error),
                    };
                }
            }
            // Scope reclamation happens between top-level statements, where
            // the only value outside the arena is `last`.
            if self.scopes.should_sweep() {
                self.scopes.sweep(&self.active, Some(&last));
            }
        }
        Evaluation {
            value: last,
            output: self.output.join("\n"),
            error: None,
        }
    }

    fn scope(&self) -> ScopeId {
        self.active.last().copied().unwrap_or(self.global)
    }

    fn push_child_scope(&mut self) -> ScopeId {
        let scope = self.scopes.alloc(Some(self.scope()));
        self.active.push(scope);
        scope
    }

    fn pop_scope(&mut self) {
        self.active.pop();
    }

    /// Run statements in the current scope, yielding the last value.
    fn exec_statements(&mut self, statements: &[Statement]) -> Flow<Value> {
        let mut last = Value::Null;
        for statement in statements {
            last = self.exec(statement)?;
        }
        Ok(last)
    }

    /// Run statements in a fresh child scope.
    fn exec_block(&mut self, statements: &[Statement]) -> Flow<Value> {
        self.push_child_scope();
        let result = self.exec_statements(statements);
        self.pop_scope();
        result
    }

    fn exec(&mut self, statement: &Statement) -> Flow<Value> {
        match statement {
            Statement::VariableDeclaration { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                self.scopes.define(self.scope(), name, value.clone());
                Ok(value)
            }
            Statement::FunctionDeclaration(function) => {
                let value = Value::Function(self.make_function(function));
                self.scopes.define(self.scope(), &function.name, value.clone());
                Ok(value)
            }
            Statement::ClassDeclaration {
                name,
                parent,
                fields,
                methods,
            } => self.declare_class(name, parent.as_deref(), fields, methods),
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.exec_block(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Value::Null)
                }
            }
            Statement::While { test, body } => {
                while self.eval(test)?.is_truthy() {
                    match self.exec_block(body) {
                        Ok(_) | Err(Signal::Continue) => {}
                        Err(Signal::Break) => break,
                        Err(signal) => return Err(signal),
                    }
                }
                Ok(Value::Null)
            }
            Statement::For {
                iterator,
                start,
                end,
                body,
            } => {
                let start = self.eval_number(start)?;
                let end = self.eval_number(end)?;
                let mut current = start;
                // Inclusive upper bound.
                while current <= end {
                    let scope = self.push_child_scope();
                    self.scopes.define(scope, iterator, Value::Number(current));
                    let result = self.exec_statements(body);
                    self.pop_scope();
                    match result {
                        Ok(_) | Err(Signal::Continue) => {}
                        Err(Signal::Break) => break,
                        Err(signal) => return Err(signal),
                    }
                    current += 1.0;
                }
                Ok(Value::Null)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Err(Signal::Return(value))
            }
            Statement::Break => Err(Signal::Break),
            Statement::Continue => Err(Signal::Continue),
            Statement::Throw(expr) => {
                let value = self.eval(expr)?;
                Err(Signal::Raised(RuntimeError::Thrown { value }))
            }
            Statement::Try {
                body,
                handler,
                finalizer,
            } => self.exec_try(body, handler.as_ref(), finalizer.as_deref()),
            Statement::Import { .. } => Ok(Value::Undefined),
            Statement::Export(inner) => self.exec(inner),
            Statement::Expression(expr) => self.eval(expr),
            Statement::Block(statements) => self.exec_block(statements),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Statement],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Statement]>,
    ) -> Flow<Value> {
        let result = match (self.exec_block(body), handler) {
            // Only raised errors are catchable; return/break/continue pass
            // through a try untouched.
            (Err(Signal::Raised(error)), Some(handler)) => {
                let bound = match error {
                    RuntimeError::Thrown { value } => value,
                    other => Value::Str(other.to_string()),
                };
                let scope = self.push_child_scope();
                self.scopes.define(scope, &handler.param, bound);
                let handled = self.exec_statements(&handler.body);
                self.pop_scope();
                handled
            }
            (other, _) => other,
        };

        if let Some(finalizer) = finalizer {
            // A signal out of `finally` (its own raise or return) wins over
            // the pending result.
            self.exec_block(finalizer)?;
        }
        result
    }

    fn declare_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        fields: &[(String, Option<Expression>)],
        methods: &[Function],
    ) -> Flow<Value> {
        let parent_class = match parent {
            Some(parent_name) => match self.scopes.lookup(self.scope(), parent_name) {
                Some(Value::Class(class)) => Some(class),
                _ => {
                    return Err(RuntimeError::UnresolvedClass {
                        name: parent_name.to_string(),
                    }
                    .into());
                }
            },
            None => None,
        };
        let mut method_map = FxHashMap::default();
        for method in methods {
            method_map.insert(method.name.clone(), self.make_function(method));
        }
        let class = Rc::new(ClassValue {
            name: name.to_string(),
            parent: parent_class,
            captured: self.scope(),
            fields: fields.to_vec(),
            methods: method_map,
        });
        self.scopes
            .define(self.scope(), name, Value::Class(class.clone()));
        Ok(Value::Class(class))
    }

    fn make_function(&self, function: &Function) -> Rc<FunctionValue> {
        Rc::new(FunctionValue {
            name: function.name.clone(),
            params: function.params.clone(),
            body: Rc::new(function.body.clone()),
            captured: self.scope(),
        })
    }

    fn eval(&mut self, expr: &Expression) -> Flow<Value> {
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Number(value) => Value::Number(*value),
                Literal::Str(value) => Value::Str(value.clone()),
                Literal::Boolean(value) => Value::Bool(*value),
                Literal::Null => Value::Null,
            }),
            Expression::Identifier(name) => {
                self.scopes.lookup(self.scope(), name).ok_or_else(|| {
                    Signal::from(RuntimeError::UndefinedVariable { name: name.clone() })
                })
            }
            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
            Expression::Object(properties) => {
                let mut data = ObjectData::new();
                for (key, value_expr) in properties {
                    let value = self.eval(value_expr)?;
                    data.set(key, value);
                }
                Ok(Value::Object(Rc::new(RefCell::new(data))))
            }
            Expression::This => self.scopes.lookup(self.scope(), "this").ok_or_else(|| {
                Signal::from(RuntimeError::UndefinedVariable {
                    name: "this".to_string(),
                })
            }),
            Expression::Assignment { target, op, value } => {
                self.eval_assignment(target, *op, value)
            }
            Expression::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary_op(*op, left, right).map_err(Signal::from)
            }
            Expression::Unary {
                op,
                operand,
                prefix,
            } => self.eval_unary(*op, operand, *prefix),
            Expression::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(callee, values)
            }
            Expression::Member { object, property } => {
                let object = self.eval(object)?;
                Ok(member_value(&object, property))
            }
            Expression::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(index_value(&object, &index))
            }
            Expression::New { class_name, args } => self.instantiate(class_name, args),
        }
    }

    fn eval_number(&mut self, expr: &Expression) -> Flow<f64> {
        let value = self.eval(expr)?;
        value.as_number().ok_or_else(|| {
            Signal::from(RuntimeError::TypeMismatch {
                expected: "number",
                got: value.type_name(),
            })
        })
    }

    fn eval_assignment(
        &mut self,
        target: &Expression,
        op: AssignOp,
        value_expr: &Expression,
    ) -> Flow<Value> {
        match target {
            Expression::Identifier(name) => {
                let value = self.eval(value_expr)?;
                let value = match op {
                    AssignOp::Assign => value,
                    compound => {
                        let current =
                            self.scopes.lookup(self.scope(), name).ok_or_else(|| {
                                Signal::from(RuntimeError::UndefinedVariable {
                                    name: name.clone(),
                                })
                            })?;
                        apply_compound(compound, current, value)?
                    }
                };
                if !self.scopes.assign(self.scope(), name, value.clone()) {
                    return Err(RuntimeError::UndefinedVariable { name: name.clone() }.into());
                }
                Ok(value)
            }
            Expression::Member { object, property } => {
                let object = self.eval(object)?;
                let value = self.eval(value_expr)?;
                let value = match op {
                    AssignOp::Assign => value,
                    compound => {
                        let current = member_value(&object, property);
                        apply_compound(compound, current, value)?
                    }
                };
                match &object {
                    Value::Instance(instance) => {
                        instance.borrow_mut().fields.set(property, value.clone());
                        Ok(value)
                    }
                    Value::Object(data) => {
                        data.borrow_mut().set(property, value.clone());
                        Ok(value)
                    }
                    _ => Err(RuntimeError::InvalidAssignmentTarget.into()),
                }
            }
            Expression::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let value = self.eval(value_expr)?;
                let value = match op {
                    AssignOp::Assign => value,
                    compound => {
                        let current = index_value(&object, &index);
                        apply_compound(compound, current, value)?
                    }
                };
                match (&object, &index) {
                    (Value::Array(elements), Value::Number(position)) => {
                        let raw = *position as i64;
                        if raw < 0 {
                            return Err(RuntimeError::NegativeIndex { index: raw }.into());
                        }
                        let position = raw as usize;
                        let mut elements = elements.borrow_mut();
                        if position >= elements.len() {
                            elements.resize(position + 1, Value::Undefined);
                        }
                        elements[position] = value.clone();
                        Ok(value)
                    }
                    (Value::Object(data), Value::Str(key)) => {
                        data.borrow_mut().set(key, value.clone());
                        Ok(value)
                    }
                    (Value::Instance(instance), Value::Str(key)) => {
                        instance.borrow_mut().fields.set(key, value.clone());
                        Ok(value)
                    }
                    _ => Err(RuntimeError::InvalidAssignmentTarget.into()),
                }
            }
            _ => Err(RuntimeError::InvalidAssignmentTarget.into()),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expression, prefix: bool) -> Flow<Value> {
        match op {
            UnaryOp::Neg => {
                let value = self.eval(operand)?;
                match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(RuntimeError::UnsupportedUnary {
                        operator: "-",
                        type_name: other.type_name(),
                    }
                    .into()),
                }
            }
            UnaryOp::Not => {
                let value = self.eval(operand)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let Expression::Identifier(name) = operand else {
                    return Err(RuntimeError::InvalidUpdateTarget.into());
                };
                let current = self.scopes.lookup(self.scope(), name).ok_or_else(|| {
                    Signal::from(RuntimeError::UndefinedVariable { name: name.clone() })
                })?;
                let n = match current {
                    Value::Number(n) => n,
                    other => {
                        return Err(RuntimeError::UnsupportedUnary {
                            operator: op.as_str(),
                            type_name: other.type_name(),
                        }
                        .into());
                    }
                };
                let delta = if op == UnaryOp::Increment { 1.0 } else { -1.0 };
                let updated = n + delta;
                self.scopes.assign(self.scope(), name, Value::Number(updated));
                Ok(Value::Number(if prefix { updated } else { n }))
            }
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Flow<Value> {
        match callee {
            Value::Builtin(builtin) => builtin.call(args, &mut self.output).map_err(Signal::from),
            Value::Function(function) => self.call_function(&function, args, None),
            Value::BoundMethod { receiver, method } => {
                self.call_function(&method, args, Some(Value::Instance(receiver)))
            }
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name().to_string(),
            }
            .into()),
        }
    }

    /// Every call chains a fresh scope to the function's captured scope —
    /// lexical, never dynamic. Missing trailing arguments bind `undefined`;
    /// extra arguments are ignored.
    fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> Flow<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackExhausted.into());
        }
        self.depth += 1;
        let scope = self.scopes.alloc(Some(function.captured));
        self.active.push(scope);
        let mut args = args.into_iter();
        for param in &function.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.scopes.define(scope, param, value);
        }
        if let Some(this_value) = this {
            self.scopes.define(scope, "this", this_value);
        }
        let result = self.exec_statements(&function.body);
        self.active.pop();
        self.depth -= 1;
        match result {
            Ok(_) => Ok(Value::Undefined),
            Err(Signal::Return(value)) => Ok(value),
            Err(signal) => Err(signal),
        }
    }

    /// `new C(args)`: merge the inheritance chain parent-first, evaluate
    /// field defaults, snapshot the method set, then run `constructor` if
    /// one exists.
    fn instantiate(&mut self, class_name: &str, args: &[Expression]) -> Flow<Value> {
        let class = match self.scopes.lookup(self.scope(), class_name) {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(RuntimeError::UnresolvedClass {
                    name: class_name.to_string(),
                }
                .into());
            }
        };
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval(arg)?);
        }

        let mut chain = vec![class.clone()];
        let mut current = class.parent.clone();
        while let Some(level) = current {
            current = level.parent.clone();
            chain.push(level);
        }

        let mut fields = ObjectData::new();
        let mut methods = FxHashMap::default();
        for level in chain.iter().rev() {
            for (field_name, init) in &level.fields {
                let value = match init {
                    Some(expr) => self.eval_in_scope(level.captured, expr)?,
                    None => Value::Undefined,
                };
                fields.set(field_name, value);
            }
            for (method_name, method) in &level.methods {
                methods.insert(method_name.clone(), method.clone());
            }
        }

        let instance = Rc::new(RefCell::new(InstanceData {
            class_name: class.name.clone(),
            fields,
            methods,
        }));
        let constructor = instance.borrow().methods.get("constructor").cloned();
        if let Some(constructor) = constructor {
            self.call_function(&constructor, arg_values, Some(Value::Instance(instance.clone())))?;
        }
        Ok(Value::Instance(instance))
    }

    /// Field defaults evaluate where the class was declared, not at the
    /// instantiation site.
    fn eval_in_scope(&mut self, scope: ScopeId, expr: &Expression) -> Flow<Value> {
        self.active.push(scope);
        let result = self.eval(expr);
        self.active.pop();
        result
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Member reads are permissive: unknown properties and non-record receivers
/// yield `undefined`.
fn member_value(object: &Value, property: &str) -> Value {
    match object {
        Value::Instance(instance) => {
            let data = instance.borrow();
            if let Some(value) = data.fields.get(property) {
                return value;
            }
            if let Some(method) = data.methods.get(property) {
                return Value::BoundMethod {
                    receiver: instance.clone(),
                    method: method.clone(),
                };
            }
            Value::Undefined
        }
        Value::Object(data) => data.borrow().get(property).unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

/// Index reads are permissive too: out-of-range and mismatched receivers
/// yield `undefined`. Writes are strict (see `eval_assignment`).
fn index_value(object: &Value, index: &Value) -> Value {
    match (object, index) {
        (Value::Array(elements), Value::Number(position)) => {
            if *position < 0.0 || position.fract() != 0.0 {
                return Value::Undefined;
            }
            elements
                .borrow()
                .get(*position as usize)
                .cloned()
                .unwrap_or(Value::Undefined)
        }
        (Value::Str(text), Value::Number(position)) => {
            if *position < 0.0 || position.fract() != 0.0 {
                return Value::Undefined;
            }
            text.chars()
                .nth(*position as usize)
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Undefined)
        }
        (Value::Object(data), Value::Str(key)) => {
            data.borrow().get(key).unwrap_or(Value::Undefined)
        }
        (Value::Instance(instance), Value::Str(key)) => instance
            .borrow()
            .fields
            .get(key)
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn apply_compound(op: AssignOp, current: Value, value: Value) -> Flow<Value> {
    let binary = match op {
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Sub => BinaryOp::Sub,
        AssignOp::Mul => BinaryOp::Mul,
        AssignOp::Div => BinaryOp::Div,
        AssignOp::Assign => return Ok(value),
    };
    binary_op(binary, current, value).map_err(Signal::from)
}

fn binary_op(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            // String concatenation when either side is a string.
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!(
                "{}{}",
                left.stringify(),
                right.stringify()
            ))),
            _ => Err(unsupported(op, &left, &right)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Number(match op {
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    // Floating semantics: division by zero is infinite, not
                    // an error.
                    BinaryOp::Div => a / b,
                    _ => a % b,
                })),
                _ => Err(unsupported(op, &left, &right)),
            }
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(ordered(op, a.partial_cmp(b)))),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(ordered(op, Some(a.cmp(b))))),
            _ => Err(unsupported(op, &left, &right)),
        },
        // Logical operators keep operand values; both sides are already
        // evaluated (no short-circuit).
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
    }
}

fn ordered(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering;
    // NaN comparisons are all false.
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnsupportedBinary {
        operator: op.as_str(),
        left: left.type_name(),
        right: right.type_name(),
    }
}
