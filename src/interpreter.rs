//! Tree-walking evaluator.
//!
//! The interpreter owns the global environment and a pointer to the frame
//! currently executing, plus the resolver's side table.  Variable access
//! consults the side table: a recorded hop count jumps straight to the
//! owning frame; an absent entry means the name is resolved against the
//! globals by name at the moment of use.
//!
//! `return` is modelled as a distinguished error variant threaded through
//! every statement-execution call; it unwinds through blocks and loops and
//! is caught exactly once, at the nearest function-call boundary
//! ([`crate::function::LoxFunction::call`]).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::function::{LoxFunction, NativeFunction};
use crate::resolver::Locals;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Non-local control transfer for `return`; never surfaces to a caller
    /// of [`Interpreter::interpret`].
    #[error("Return signal with value: {0}")]
    ReturnSignal(Value),
}

impl InterpretError {
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating runtime error: line={}, msg={}", line, message);

        InterpretError::Runtime { message, line }
    }
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: Locals,
    prompt_mode: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Self {
            globals: globals.clone(),
            environment: globals,
            locals: HashMap::new(),
            prompt_mode: false,
        };

        debug!("Defining native function 'clock'");

        interpreter.define_native("clock", 0, |_args: &[Value]| {
            Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
        });

        interpreter
    }

    /// The global environment; a host may seed it before interpretation.
    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        self.globals.clone()
    }

    /// Install a host-provided function into the globals.
    pub fn define_native(
        &mut self,
        name: &str,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    ) {
        self.globals.borrow_mut().define(
            name,
            Some(Value::NativeFunction(Rc::new(NativeFunction {
                name: name.to_string(),
                arity,
                func,
            }))),
        );
    }

    /// When enabled, bare expression statements print their value (REPL).
    pub fn set_prompt_mode(&mut self, on: bool) {
        self.prompt_mode = on;
    }

    /// Interprets a list of statements (a "program").
    ///
    /// `locals` is merged, not replaced: a REPL session hands over one side
    /// table per round, and closures resolved in earlier rounds must keep
    /// their hop counts.  A runtime error aborts the current call only;
    /// effects of already-executed statements persist.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals.extend(locals);

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                let value = self.evaluate(expr)?;

                if self.prompt_mode {
                    println!("{}", value);
                }

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value: Option<Value> = match initializer {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.evaluate(condition)?;

                if is_truthy(&cond_value) {
                    self.execute(then_branch)?;
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the environment at *declaration* time, not
                // call time; this is what makes recursion and closures work.
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Some(Value::Function(Rc::new(function))),
                );

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Err(InterpretError::ReturnSignal(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => self.execute_class(name, superclass.as_ref(), methods, static_methods),
        }
    }

    /// Execute `statements` under `environment`, restoring the previous
    /// current-frame pointer on every exit path (normal completion, runtime
    /// error, or return signal).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let result: IResult<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    /// Class declaration protocol: the name is declared (unassigned) before
    /// the body is evaluated so methods can refer to the class by name, and
    /// assigned once the class value exists.
    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        static_methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;

                match value {
                    Value::Class(class) => Some(class),

                    _ => {
                        let line: usize = match expr {
                            Expr::Variable { name, .. } => name.line,
                            _ => name.line,
                        };

                        return Err(InterpretError::runtime(line, "Superclass must be a class."));
                    }
                }
            }

            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, None);

        // When inheriting, methods close over one extra frame binding
        // `super`, opened here and closed after the method tables are built.
        let enclosing: Option<Rc<RefCell<Environment>>> = match &superclass_value {
            Some(sc) => {
                let previous = self.environment.clone();

                self.environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    previous.clone(),
                )));
                self.environment
                    .borrow_mut()
                    .define("super", Some(Value::Class(sc.clone())));

                Some(previous)
            }

            None => None,
        };

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";

            let function =
                LoxFunction::new(method.clone(), self.environment.clone(), is_initializer);

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let mut statics: HashMap<String, Value> = HashMap::new();

        for method in static_methods {
            let function = LoxFunction::new(method.clone(), self.environment.clone(), false);

            statics.insert(
                method.name.lexeme.clone(),
                Value::Function(Rc::new(function)),
            );
        }

        let class: LoxClass = if statics.is_empty() {
            LoxClass::new(name.lexeme.clone(), superclass_value, method_table)
        } else {
            LoxClass::with_statics(name.lexeme.clone(), superclass_value, method_table, statics)
        };

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)))
            .map_err(|msg| InterpretError::runtime(name.line, msg))?;

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression evaluation
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(evaluate_literal(lit)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone())
                            .map_err(|msg| InterpretError::runtime(name.line, msg))?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(&callee_value, paren, &args)
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => LoxInstance::get(&instance, name),

                    // A class value answers property reads for its statics.
                    Value::Class(class) => class.static_get(name),

                    _ => Err(InterpretError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;
                        instance.borrow_mut().set(name, value.clone());
                        Ok(value)
                    }

                    Value::Class(class) => {
                        let value: Value = self.evaluate(value)?;
                        class.static_set(name, value.clone())?;
                        Ok(value)
                    }

                    _ => Err(InterpretError::runtime(
                        name.line,
                        "Only instances have fields.",
                    )),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(InterpretError::runtime(
                operator.line,
                "Invalid unary operator.",
            )),
        }
    }

    /// Both operands are always evaluated, left to right; only the logical
    /// operators short-circuit, and those live in [`Self::evaluate_logical`].
    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                // Mixed orders stringify the number operand.
                (Value::String(a), Value::Number(b)) => {
                    Ok(Value::String(format!("{}{}", a, Value::Number(b))))
                }

                (Value::Number(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", Value::Number(a), b)))
                }

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::SLASH => match (left_value, right_value) {
                // IEEE semantics: division by zero yields an infinity.
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_value, &right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_value, &right_value))),

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            _ => Err(InterpretError::runtime(
                operator.line,
                "Invalid binary operator.",
            )),
        }
    }

    /// `and`/`or` return whichever operand value decided the result — never
    /// a coerced boolean.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value: Value = self.evaluate(left)?;

        if operator.token_type == TokenType::OR {
            if is_truthy(&left_value) {
                return Ok(left_value);
            }
        } else if !is_truthy(&left_value) {
            return Ok(left_value);
        }

        self.evaluate(right)
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        // Class-body resolution nests `this` exactly one scope inside
        // `super`, so the instance sits one hop closer than the superclass.
        let Some(&distance) = self.locals.get(&id) else {
            return Err(InterpretError::runtime(
                keyword.line,
                "Can't use 'super' outside of a class.",
            ));
        };

        let superclass: Rc<LoxClass> =
            match Environment::get_at(&self.environment, distance, "super") {
                Value::Class(class) => class,

                _ => {
                    return Err(InterpretError::runtime(
                        keyword.line,
                        "Superclass must be a class.",
                    ));
                }
            };

        let object: Value = Environment::get_at(&self.environment, distance - 1, "this");

        let Some(found) = superclass.find_method(&method.lexeme) else {
            return Err(InterpretError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            ));
        };

        match object {
            Value::Instance(instance) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            _ => Err(InterpretError::runtime(
                keyword.line,
                "Can only use 'super' in an instance method.",
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),

            None => self
                .globals
                .borrow()
                .get(&name.lexeme)
                .map_err(|msg| InterpretError::runtime(name.line, msg)),
        }
    }

    /// Invokes a callable (native function, user function, or class).
    fn invoke_callable(
        &mut self,
        callee_value: &Value,
        paren_token: &Token,
        arg_values: &[Value],
    ) -> IResult<Value> {
        match callee_value {
            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);

                check_arity(native.arity, arg_values.len(), paren_token)?;

                (native.func)(arg_values)
                    .map_err(|msg| InterpretError::runtime(paren_token.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arg_values.len(), paren_token)?;

                function.call(self, arg_values)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arg_values.len(), paren_token)?;

                LoxClass::instantiate(class, self, arg_values)
            }

            _ => Err(InterpretError::runtime(
                paren_token.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

fn check_arity(expected: usize, got: usize, paren_token: &Token) -> IResult<()> {
    if got != expected {
        return Err(InterpretError::runtime(
            paren_token.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

fn evaluate_literal(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),

        LiteralValue::Str(s) => Value::String(s.clone()),

        LiteralValue::True => Value::Bool(true),

        LiteralValue::False => Value::Bool(false),

        LiteralValue::Nil => Value::Nil,
    }
}

/// `nil` and `false` are falsy; every other value, including `0` and `""`,
/// is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}
