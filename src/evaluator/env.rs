use rustc_hash::{FxHashMap, FxHashSet};

use super::value::Value;

/// Stable handle into the scope arena. Closures store one of these instead
/// of a live reference, so scope lifetime is decoupled from Rust borrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    bindings: FxHashMap<String, Value>,
}

/// Arena of chained scopes. Slots freed by the sweep are reused by later
/// allocations.
#[derive(Debug)]
pub struct ScopeArena {
    slots: Vec<Option<Scope>>,
    free: Vec<usize>,
    high_water: usize,
}

const MIN_HIGH_WATER: usize = 64;

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            high_water: MIN_HIGH_WATER,
        }
    }

    pub fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let scope = Scope {
            parent,
            bindings: FxHashMap::default(),
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(scope);
                ScopeId(index)
            }
            None => {
                self.slots.push(Some(scope));
                ScopeId(self.slots.len() - 1)
            }
        }
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        self.slots[id.0]
            .as_ref()
            .unwrap_or_else(|| unreachable!("scope {} used after sweep", id.0))
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.slots[id.0]
            .as_mut()
            .unwrap_or_else(|| unreachable!("scope {} used after sweep", id.0))
    }

    /// Declare (or shadow) a name in exactly this scope.
    pub fn define(&mut self, id: ScopeId, name: &str, value: Value) {
        self.scope_mut(id).bindings.insert(name.to_string(), value);
    }

    /// Walk the chain outward until the name is found.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if let Some(value) = scope.bindings.get(name) {
                return Some(value.clone());
            }
            current = scope.parent;
        }
        None
    }

    /// Assign to an existing binding, walking outward. Returns false when no
    /// scope in the chain declares the name.
    pub fn assign(&mut self, id: ScopeId, name: &str, value: Value) -> bool {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if scope.bindings.contains_key(name) {
                self.scope_mut(scope_id)
                    .bindings
                    .insert(name.to_string(), value);
                return true;
            }
            current = scope.parent;
        }
        false
    }

    /// Sorted snapshot of one scope's own bindings.
    pub fn snapshot(&self, id: ScopeId) -> Vec<(String, Value)> {
        let mut entries: Vec<(String, Value)> = self
            .scope(id)
            .bindings
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn should_sweep(&self) -> bool {
        self.live_count() >= self.high_water
    }

    /// Mark-and-sweep over the arena: every scope reachable from the active
    /// frame stack or from a closure held by a reachable value survives,
    /// everything else is freed for reuse.
    pub fn sweep(&mut self, roots: &[ScopeId], extra: Option<&Value>) {
        let mut marks = vec![false; self.slots.len()];
        let mut pending: Vec<ScopeId> = roots.to_vec();
        let mut seen = FxHashSet::default();

        if let Some(value) = extra {
            mark_value(value, &mut pending, &mut seen);
        }

        while let Some(id) = pending.pop() {
            if marks[id.0] {
                continue;
            }
            marks[id.0] = true;
            let scope = self.scope(id);
            if let Some(parent) = scope.parent {
                pending.push(parent);
            }
            for value in scope.bindings.values() {
                mark_value(value, &mut pending, &mut seen);
            }
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marks[index] {
                *slot = None;
                self.free.push(index);
            }
        }
        self.high_water = MIN_HIGH_WATER.max(self.live_count() * 2);
    }
}

/// Collect the scope ids a value keeps alive. `seen` guards against cyclic
/// containers.
fn mark_value(value: &Value, pending: &mut Vec<ScopeId>, seen: &mut FxHashSet<usize>) {
    match value {
        Value::Number(_)
        | Value::Str(_)
        | Value::Bool(_)
        | Value::Null
        | Value::Undefined
        | Value::Builtin(_) => {}
        Value::Array(elements) => {
            if seen.insert(std::rc::Rc::as_ptr(elements) as usize) {
                for element in elements.borrow().iter() {
                    mark_value(element, pending, seen);
                }
            }
        }
        Value::Object(object) => {
            if seen.insert(std::rc::Rc::as_ptr(object) as usize) {
                for (_, entry) in object.borrow().entries() {
                    mark_value(entry, pending, seen);
                }
            }
        }
        Value::Function(function) => {
            pending.push(function.captured);
        }
        Value::Class(class) => {
            let mut current = Some(class);
            while let Some(class) = current {
                pending.push(class.captured);
                for method in class.methods.values() {
                    pending.push(method.captured);
                }
                current = class.parent.as_ref();
            }
        }
        Value::Instance(instance) => {
            if seen.insert(std::rc::Rc::as_ptr(instance) as usize) {
                let instance = instance.borrow();
                for (_, field) in instance.fields.entries() {
                    mark_value(field, pending, seen);
                }
                for method in instance.methods.values() {
                    pending.push(method.captured);
                }
            }
        }
        Value::BoundMethod { receiver, method } => {
            pending.push(method.captured);
            mark_value(&Value::Instance(receiver.clone()), pending, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain_and_shadowing_stays_local() {
        let mut arena = ScopeArena::new();
        let outer = arena.alloc(None);
        let inner = arena.alloc(Some(outer));
        arena.define(outer, "x", Value::Number(1.0));
        arena.define(inner, "x", Value::Number(2.0));
        assert_eq!(arena.lookup(inner, "x"), Some(Value::Number(2.0)));
        assert_eq!(arena.lookup(outer, "x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_mutates_the_declaring_scope() {
        let mut arena = ScopeArena::new();
        let outer = arena.alloc(None);
        let inner = arena.alloc(Some(outer));
        arena.define(outer, "x", Value::Number(1.0));
        assert!(arena.assign(inner, "x", Value::Number(5.0)));
        assert_eq!(arena.lookup(outer, "x"), Some(Value::Number(5.0)));
        assert!(!arena.assign(inner, "missing", Value::Null));
    }

    #[test]
    fn sweep_frees_unreachable_scopes_and_reuses_slots() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(None);
        for _ in 0..10 {
            arena.alloc(Some(global));
        }
        assert_eq!(arena.live_count(), 11);
        arena.sweep(&[global], None);
        assert_eq!(arena.live_count(), 1);
        let reused = arena.alloc(Some(global));
        assert_eq!(arena.lookup(reused, "nothing"), None);
    }

    #[test]
    fn closures_keep_captured_scopes_alive() {
        use std::rc::Rc;

        let mut arena = ScopeArena::new();
        let global = arena.alloc(None);
        let captured = arena.alloc(Some(global));
        arena.define(captured, "n", Value::Number(7.0));
        let closure = Value::Function(Rc::new(super::super::value::FunctionValue {
            name: "f".to_string(),
            params: Vec::new(),
            body: Rc::new(Vec::new()),
            captured,
        }));
        arena.define(global, "f", closure);
        arena.alloc(Some(global));
        arena.sweep(&[global], None);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.lookup(captured, "n"), Some(Value::Number(7.0)));
    }
}
