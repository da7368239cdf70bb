use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::function::LoxFunction;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Runtime representation of a class: its name, an optional single
/// superclass link, and the method table.
///
/// A class that declares static members additionally wraps a synthetic
/// "metaclass" instance; the class value then answers ordinary property
/// get/set against that instance's field map, so static access reuses the
/// normal property machinery.
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
    metaclass: Option<RefCell<LoxInstance>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            metaclass: None,
        }
    }

    pub fn with_statics(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
        statics: HashMap<String, Value>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            metaclass: Some(RefCell::new(LoxInstance::metaclass(statics))),
        }
    }

    /// Resolve a method name: own table first, then up the superclass chain.
    /// First hit wins, so the most-derived override shadows inherited ones.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class called as a function constructs an instance: the arity is
    /// whatever `init` declares, or zero when the chain has no `init`.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    /// Calling the class: allocate the instance, then run `init` bound to it
    /// (discarding init's value — construction always yields the instance).
    pub fn instantiate(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> IResult<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }

    /// Property read on the class value itself (static access).
    pub fn static_get(&self, name: &Token) -> IResult<Value> {
        let Some(metaclass) = &self.metaclass else {
            return Err(InterpretError::runtime(
                name.line,
                "Only instances have properties.",
            ));
        };

        metaclass.borrow().field(&name.lexeme).ok_or_else(|| {
            InterpretError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )
        })
    }

    /// Property write on the class value itself.
    pub fn static_set(&self, name: &Token, value: Value) -> IResult<()> {
        let Some(metaclass) = &self.metaclass else {
            return Err(InterpretError::runtime(
                name.line,
                "Only instances have fields.",
            ));
        };

        metaclass.borrow_mut().set(name, value);

        Ok(())
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoxClass({})", self.name)
    }
}

/// Runtime representation of an instance: a reference to its class and an
/// open field map (any field may be created by assignment).
///
/// The class reference is absent only for the synthetic metaclass instance
/// hosting a class's static members.
pub struct LoxInstance {
    class: Option<Rc<LoxClass>>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class: Some(class),
            fields: HashMap::new(),
        }
    }

    fn metaclass(statics: HashMap<String, Value>) -> Self {
        Self {
            class: None,
            fields: statics,
        }
    }

    pub fn class_name(&self) -> &str {
        self.class
            .as_ref()
            .map_or("metaclass", |class| class.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Property lookup: the instance's own fields shadow class methods of
    /// the same name; methods are bound to the receiver on access.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> IResult<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method: Option<Rc<LoxFunction>> = instance
            .borrow()
            .class
            .as_ref()
            .and_then(|class| class.find_method(&name.lexeme));

        if let Some(method) = method {
            return Ok(Value::Function(Rc::new(method.bind(instance.clone()))));
        }

        Err(InterpretError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Unconditional upsert; instances are open.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoxInstance({})", self.class_name())
    }
}
