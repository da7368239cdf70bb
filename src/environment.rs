use crate::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A chained mapping from names to values implementing lexical scoping.
///
/// One frame is created per block execution, per function invocation, and per
/// class body; closures keep frames alive past their creating statement, so
/// frames are shared through `Rc<RefCell<_>>` handles rather than owned by a
/// stack.
///
/// A declared name lives in exactly one of `values` (assigned) or
/// `unassigned` (declared with no initializer); the two states produce
/// different errors when read.
#[derive(Debug, Clone)]
pub struct Environment {
    values: HashMap<String, Value>,
    unassigned: HashSet<String>,
    pub enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// The global frame, which ends the chain.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            unassigned: HashSet::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            unassigned: HashSet::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Declare `name` in this frame.  With no value the name is only marked
    /// declared; reading it before an assignment is an "unassigned" error,
    /// distinct from "undefined" (never declared at all).
    pub fn define(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                self.unassigned.remove(name);
                self.values.insert(name.to_string(), v);
            }

            None => {
                self.values.remove(name);
                self.unassigned.insert(name.to_string());
            }
        }
    }

    /// Look `name` up, walking outward through `enclosing` only after this
    /// frame is exhausted.
    pub fn get(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if self.unassigned.contains(name) {
            Err(format!("Unassigned variable '{}'.", name))
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Write to an existing binding.  Assignment to a declared-but-unassigned
    /// name promotes it into the assigned map; assignment never creates a new
    /// binding anywhere in the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), String> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if self.unassigned.remove(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Walk exactly `distance` `enclosing` links from `env`.
    ///
    /// The resolver computed the distance from the same scope structure the
    /// evaluator rebuilds at run time, so the chain is always long enough.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut environment: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let enclosing = environment
                .borrow()
                .enclosing
                .as_ref()
                .expect("resolved distance exceeds environment chain")
                .clone();

            environment = enclosing;
        }

        environment
    }

    /// Local-only lookup at a resolved distance.  A name missing at the
    /// target frame reads as `nil` (reachable only through `this` inside a
    /// static method, where no instance was ever bound).
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Environment::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Local-only write at a resolved distance.
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
        let target: Rc<RefCell<Environment>> = Environment::ancestor(env, distance);
        let mut target = target.borrow_mut();

        target.unassigned.remove(name);
        target.values.insert(name.to_string(), value);
    }
}
