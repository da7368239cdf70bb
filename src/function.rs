use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A host-provided function installed into the globals (e.g. `clock`).
///
/// Plain fn pointers keep natives trivially clonable and comparable by
/// identity through their `Rc` handle.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

/// A user-defined function: the shared declaration node plus the environment
/// that was live at its point of declaration (the closure).
///
/// `is_initializer` marks `init` methods, whose calls always yield the
/// instance under construction no matter what the body returns.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose closure is wrapped in one more
    /// frame binding `this` to `instance`.  The declaration is shared.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Some(Value::Instance(instance)));

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function.  Arity was already checked at the call site.
    ///
    /// Each invocation gets a fresh frame chained onto the closure; the body
    /// runs through the interpreter's block primitive so the current-frame
    /// pointer is restored on every exit path.  A return signal raised
    /// anywhere in the body is caught here and nowhere else.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> IResult<Value> {
        debug!("Calling function '{}'", self.name());

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            environment
                .borrow_mut()
                .define(&param.lexeme, Some(argument.clone()));
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(InterpretError::ReturnSignal(value)) => {
                debug!("Function '{}' returned: {}", self.name(), value);

                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }

            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoxFunction({})", self.name())
    }
}
