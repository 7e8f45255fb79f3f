use std::{cell::RefCell, collections::HashMap, io, io::Write, mem, rc::Rc};

use tracing::{debug, trace, warn};

use crate::{
    builtin::Builtin,
    config::InterpreterConfig,
    environment::Environment,
    error::RuntimeError,
    object::{Callable, FunctionBody, HashKey, List, Map, Object, UserFunction},
};

use soma_parser::{
    ast::{Block, Expression, IdentifierLiteral, MatchExpression, Pattern, Program, Statement},
    token::Token,
};

pub type EvalResult = Result<Rc<Object>, RuntimeError>;

/// Where `print` writes to
pub type Output = Rc<RefCell<dyn Write>>;

pub struct Evaluator {
    env: Rc<RefCell<Environment>>,
    /// Functions declared with `fn`, kept apart from variables
    functions: HashMap<String, Rc<UserFunction>>,
    output: Output,
    config: InterpreterConfig,
    /// Number of user function calls currently active
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::new_with_env(Rc::new(RefCell::new(Environment::new())))
    }

    pub fn new_with_env(env: Rc<RefCell<Environment>>) -> Self {
        Evaluator {
            env,
            functions: HashMap::new(),
            output: Rc::new(RefCell::new(io::stdout())),
            config: InterpreterConfig::default(),
            depth: 0,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// The global scope
    pub fn env(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.env)
    }

    /// Evaluate every statement in order, producing the value of the last one.
    /// Bindings made before a failing statement are kept.
    pub fn eval(&mut self, prog: &Program) -> EvalResult {
        let mut result = Rc::new(Object::Nil);

        for stmt in &prog.statements {
            result = self.eval_statement(stmt)?;
        }

        Ok(result)
    }

    pub fn eval_statement(&mut self, stmt: &Statement) -> EvalResult {
        match stmt {
            Statement::Expression { expression } => self.eval_expression(expression),
            Statement::Let { name, value } => {
                let obj = self.eval_expression(value)?;
                self.env.borrow_mut().set(name.to_owned(), obj);

                Ok(Rc::new(Object::Nil))
            }
            Statement::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition)?;

                if condition.is_truthy() {
                    self.eval_scoped_block(consequence)
                } else if let Some(alternative) = alternative {
                    self.eval_scoped_block(alternative)
                } else {
                    Ok(Rc::new(Object::Nil))
                }
            }
            // The body shares the scope the loop runs in
            Statement::While { condition, body } => {
                let mut result = Rc::new(Object::Nil);

                while self.eval_expression(condition)?.is_truthy() {
                    result = self.eval_block(body)?;
                }

                Ok(result)
            }
            Statement::Function {
                name,
                parameters,
                body,
            } => {
                debug!(function = %name, arity = parameters.len(), "declaring function");

                let func = UserFunction {
                    name: Some(name.clone()),
                    parameters: parameters.clone(),
                    body: FunctionBody::Block(Rc::clone(body)),
                    env: Rc::clone(&self.env),
                };
                self.functions.insert(name.clone(), Rc::new(func));

                Ok(Rc::new(Object::Nil))
            }
        }
    }

    fn eval_block(&mut self, block: &Block) -> EvalResult {
        let mut result = Rc::new(Object::Nil);

        for stmt in &block.statements {
            result = self.eval_statement(stmt)?;
        }

        Ok(result)
    }

    fn eval_scoped_block(&mut self, block: &Block) -> EvalResult {
        let scope = Environment::new_enclosed(Rc::clone(&self.env));
        self.in_scope(scope, |this| this.eval_block(block))
    }

    /// Run `f` with `scope` as the current environment, restoring the previous one
    /// afterwards whether or not `f` failed.
    fn in_scope<T>(&mut self, scope: Environment, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = mem::replace(&mut self.env, Rc::new(RefCell::new(scope)));
        let result = f(self);
        self.env = previous;
        result
    }

    fn eval_expression(&mut self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Integer(value) => Ok(Rc::new(Object::Integer(*value))),
            Expression::Float(value) => Ok(Rc::new(Object::Float(*value))),
            Expression::Boolean(value) => Ok(Rc::new(Object::Boolean(*value))),
            Expression::String(value) => Ok(Rc::new(Object::String(value.clone()))),
            Expression::Nil => Ok(Rc::new(Object::Nil)),
            Expression::Identifier(identifier) => self.eval_identifier_expression(identifier),

            Expression::Prefix(prefix) => {
                let right = self.eval_expression(&prefix.right)?;
                self.eval_prefix_expression(&prefix.operator, right)
            }
            Expression::Infix(infix) => {
                let left = self.eval_expression(&infix.left)?;
                let right = self.eval_expression(&infix.right)?;
                self.eval_infix_expression(&infix.operator, left, right)
            }

            Expression::If(if_expr) => {
                let condition = self.eval_expression(&if_expr.condition)?;

                if condition.is_truthy() {
                    self.eval_expression(&if_expr.consequence)
                } else {
                    self.eval_expression(&if_expr.alternative)
                }
            }

            Expression::Lambda(lambda) => Ok(Rc::new(Object::Callable(Callable::User(Rc::new(
                UserFunction {
                    name: None,
                    parameters: vec![lambda.parameter.clone()],
                    body: FunctionBody::Expression(Rc::clone(&lambda.body)),
                    env: Rc::clone(&self.env),
                },
            ))))),
            Expression::Call(call) => {
                let func = self.eval_callee(&call.function)?;
                let args = self.eval_expressions(&call.arguments)?;

                self.apply_callable(func, args)
            }

            Expression::List(list) => {
                let elements = self.eval_expressions(&list.elements)?;
                Ok(Rc::new(Object::List(List { elements })))
            }
            Expression::Map(map) => {
                let mut result = Map::default();

                for (key_expr, value_expr) in &map.pairs {
                    let key = self.eval_expression(key_expr)?;
                    let hash_key = HashKey::from_object(&key)
                        .ok_or_else(|| RuntimeError::NonHashableKey(Rc::clone(&key)))?;
                    let value = self.eval_expression(value_expr)?;

                    result.entries.insert(hash_key, value);
                }

                Ok(Rc::new(Object::Map(result)))
            }
            Expression::Index(expr) => {
                let left = self.eval_expression(&expr.left)?;
                let index = self.eval_expression(&expr.index)?;
                self.eval_index_expression(left, index)
            }

            Expression::Match(match_expr) => self.eval_match_expression(match_expr),
            Expression::Try(try_expr) => match self.eval_expression(&try_expr.body) {
                Ok(value) => Ok(value),
                Err(err) => {
                    debug!(error = %err, binding = %try_expr.binding, "recovering from error");

                    let mut scope = Environment::new_enclosed(Rc::clone(&self.env));
                    scope.define(
                        try_expr.binding.name.clone(),
                        Rc::new(Object::String(err.to_string())),
                    );
                    self.in_scope(scope, |this| this.eval_expression(&try_expr.recovery))
                }
            },
        }
    }

    /// Evaluate expressions left to right, stopping at the first error
    fn eval_expressions(&mut self, exprs: &[Expression]) -> Result<Vec<Rc<Object>>, RuntimeError> {
        exprs.iter().map(|expr| self.eval_expression(expr)).collect()
    }

    fn eval_identifier_expression(&self, identifier: &IdentifierLiteral) -> EvalResult {
        let result = self.env.borrow().get(&identifier.name);

        match result {
            Some(obj) => Ok(obj),
            None => match Builtin::lookup(&identifier.name) {
                Some(builtin) => Ok(Rc::new(Object::Callable(Callable::Builtin(builtin)))),
                None => Err(RuntimeError::UndefinedVariable(identifier.name.clone())),
            },
        }
    }

    /// A bare name in call position may also refer to a declared function.
    fn eval_callee(&mut self, expr: &Expression) -> EvalResult {
        let identifier = match expr {
            Expression::Identifier(identifier) => identifier,
            _ => return self.eval_expression(expr),
        };

        if let Some(obj) = self.env.borrow().get(&identifier.name) {
            return Ok(obj);
        }

        if let Some(func) = self.functions.get(&identifier.name) {
            return Ok(Rc::new(Object::Callable(Callable::User(Rc::clone(func)))));
        }

        match Builtin::lookup(&identifier.name) {
            Some(builtin) => Ok(Rc::new(Object::Callable(Callable::Builtin(builtin)))),
            None => Err(RuntimeError::UndefinedFunction(identifier.name.clone())),
        }
    }

    fn eval_prefix_expression(&self, operator: &Token, right: Rc<Object>) -> EvalResult {
        match (operator, right.as_ref()) {
            (Token::Bang, obj) => Ok(Rc::new(Object::Boolean(!obj.is_truthy()))),
            (Token::Minus, Object::Integer(value)) => value
                .checked_neg()
                .map(|value| Rc::new(Object::Integer(value)))
                .ok_or_else(|| RuntimeError::IntegerOverflow(Token::Minus)),
            (Token::Minus, Object::Float(value)) => Ok(Rc::new(Object::Float(-value))),
            _ => Err(RuntimeError::InvalidPrefixOperandType(
                operator.clone(),
                Rc::clone(&right),
            )),
        }
    }

    fn eval_infix_expression(
        &self,
        operator: &Token,
        left: Rc<Object>,
        right: Rc<Object>,
    ) -> EvalResult {
        // Equality is defined between any two values
        match operator {
            Token::EqualEqual => return Ok(Rc::new(Object::Boolean(left == right))),
            Token::BangEqual => return Ok(Rc::new(Object::Boolean(left != right))),
            _ => {}
        }

        match (left.as_ref(), right.as_ref()) {
            (Object::Integer(left_value), Object::Integer(right_value)) => {
                self.eval_integer_infix_expression(operator, *left_value, *right_value)
            }

            (Object::Float(left_value), Object::Float(right_value)) => {
                self.eval_float_infix_expression(operator, *left_value, *right_value)
            }
            (Object::Float(left_value), Object::Integer(right_value)) => {
                self.eval_float_infix_expression(operator, *left_value, *right_value as f64)
            }
            (Object::Integer(left_value), Object::Float(right_value)) => {
                self.eval_float_infix_expression(operator, *left_value as f64, *right_value)
            }

            (Object::String(left_value), Object::String(right_value)) => {
                self.eval_string_infix_expression(operator, left_value, right_value)
            }

            (Object::List(left_list), Object::List(right_list)) if *operator == Token::Plus => {
                let elements = left_list
                    .elements
                    .iter()
                    .chain(right_list.elements.iter())
                    .map(Rc::clone)
                    .collect();
                Ok(Rc::new(Object::List(List { elements })))
            }

            _ => Err(RuntimeError::InvalidInfixOperandType(
                operator.clone(),
                Rc::clone(&left),
                Rc::clone(&right),
            )),
        }
    }

    fn eval_integer_infix_expression(
        &self,
        operator: &Token,
        left_value: i64,
        right_value: i64,
    ) -> EvalResult {
        let value = match operator {
            Token::Plus => left_value.checked_add(right_value),
            Token::Minus => left_value.checked_sub(right_value),
            Token::Star => left_value.checked_mul(right_value),
            Token::Slash if right_value == 0 => return Err(RuntimeError::DivisionByZero),
            Token::Slash => floor_div(left_value, right_value),
            Token::Percent if right_value == 0 => return Err(RuntimeError::DivisionByZero),
            Token::Percent => floor_mod(left_value, right_value),

            Token::LessThan => return Ok(Rc::new(Object::Boolean(left_value < right_value))),
            Token::LessEqual => return Ok(Rc::new(Object::Boolean(left_value <= right_value))),
            Token::GreaterThan => return Ok(Rc::new(Object::Boolean(left_value > right_value))),
            Token::GreaterEqual => {
                return Ok(Rc::new(Object::Boolean(left_value >= right_value)))
            }

            operator => {
                return Err(RuntimeError::InvalidInfixOperandType(
                    operator.clone(),
                    Rc::new(Object::Integer(left_value)),
                    Rc::new(Object::Integer(right_value)),
                ))
            }
        };

        value
            .map(|value| Rc::new(Object::Integer(value)))
            .ok_or_else(|| RuntimeError::IntegerOverflow(operator.clone()))
    }

    fn eval_float_infix_expression(
        &self,
        operator: &Token,
        left_value: f64,
        right_value: f64,
    ) -> EvalResult {
        let value = match operator {
            Token::Plus => left_value + right_value,
            Token::Minus => left_value - right_value,
            Token::Star => left_value * right_value,
            Token::Slash | Token::Percent if right_value == 0.0 => {
                return Err(RuntimeError::DivisionByZero)
            }
            Token::Slash => left_value / right_value,
            Token::Percent => {
                let rem = left_value % right_value;
                if rem != 0.0 && (rem < 0.0) != (right_value < 0.0) {
                    rem + right_value
                } else {
                    rem
                }
            }

            Token::LessThan => return Ok(Rc::new(Object::Boolean(left_value < right_value))),
            Token::LessEqual => return Ok(Rc::new(Object::Boolean(left_value <= right_value))),
            Token::GreaterThan => return Ok(Rc::new(Object::Boolean(left_value > right_value))),
            Token::GreaterEqual => {
                return Ok(Rc::new(Object::Boolean(left_value >= right_value)))
            }

            operator => {
                return Err(RuntimeError::InvalidInfixOperandType(
                    operator.clone(),
                    Rc::new(Object::Float(left_value)),
                    Rc::new(Object::Float(right_value)),
                ))
            }
        };

        Ok(Rc::new(Object::Float(value)))
    }

    fn eval_string_infix_expression(
        &self,
        operator: &Token,
        left_value: &str,
        right_value: &str,
    ) -> EvalResult {
        match operator {
            Token::Plus => Ok(Rc::new(Object::String(format!(
                "{}{}",
                left_value, right_value
            )))),

            Token::LessThan => Ok(Rc::new(Object::Boolean(left_value < right_value))),
            Token::LessEqual => Ok(Rc::new(Object::Boolean(left_value <= right_value))),
            Token::GreaterThan => Ok(Rc::new(Object::Boolean(left_value > right_value))),
            Token::GreaterEqual => Ok(Rc::new(Object::Boolean(left_value >= right_value))),

            operator => Err(RuntimeError::InvalidInfixOperandType(
                operator.clone(),
                Rc::new(Object::String(left_value.to_owned())),
                Rc::new(Object::String(right_value.to_owned())),
            )),
        }
    }

    fn eval_index_expression(&self, left: Rc<Object>, index: Rc<Object>) -> EvalResult {
        match (left.as_ref(), index.as_ref()) {
            (Object::List(list), Object::Integer(i)) => {
                let length = list.elements.len() as i64;
                // Negative indices count back from the end
                let position = if *i < 0 { length + *i } else { *i };

                if position < 0 || position >= length {
                    return Err(RuntimeError::IndexOutOfBounds {
                        list: Rc::clone(&left),
                        index: *i,
                    });
                }

                Ok(Rc::clone(&list.elements[position as usize]))
            }
            (Object::List(_), _) => Err(RuntimeError::InvalidIndexOperandType(Rc::clone(&index))),
            (Object::Map(map), _) => {
                let key = HashKey::from_object(&index)
                    .ok_or_else(|| RuntimeError::NonHashableKey(Rc::clone(&index)))?;

                map.entries
                    .get(&key)
                    .map(Rc::clone)
                    .ok_or_else(|| RuntimeError::KeyNotFound(Rc::clone(&index)))
            }
            _ => Err(RuntimeError::IndexNotSupported(Rc::clone(&left))),
        }
    }

    /// Try each arm in order; the first whose pattern accepts the subject is evaluated
    /// in a new scope holding the pattern's bindings.
    fn eval_match_expression(&mut self, match_expr: &MatchExpression) -> EvalResult {
        let subject = self.eval_expression(&match_expr.subject)?;

        for arm in &match_expr.arms {
            if let Some(bindings) = self.match_pattern(&arm.pattern, &subject)? {
                let mut scope = Environment::new_enclosed(Rc::clone(&self.env));
                for (name, value) in bindings {
                    scope.define(name, value);
                }

                return self.in_scope(scope, |this| this.eval_expression(&arm.body));
            }
        }

        Err(RuntimeError::NoMatch(subject))
    }

    fn match_pattern(
        &mut self,
        pattern: &Pattern,
        subject: &Rc<Object>,
    ) -> Result<Option<Vec<(String, Rc<Object>)>>, RuntimeError> {
        let bindings: Option<Vec<(String, Rc<Object>)>> = match (pattern, subject.as_ref()) {
            (Pattern::Wildcard, _) => Some(vec![]),
            (Pattern::Literal(expr), _) => {
                let expected = self.eval_expression(expr)?;
                (expected == *subject).then(Vec::new)
            }
            (Pattern::Binding(name), _) => Some(vec![(name.name.clone(), Rc::clone(subject))]),
            (Pattern::EmptyList, Object::List(list)) => list.elements.is_empty().then(Vec::new),
            (Pattern::HeadTail { head, tail }, Object::List(list)) => {
                list.elements.split_first().map(|(first, rest)| {
                    let rest = Rc::new(Object::List(List {
                        elements: rest.to_vec(),
                    }));

                    [(head, Rc::clone(first)), (tail, rest)]
                        .into_iter()
                        .filter(|(name, _)| !name.is_wildcard())
                        .map(|(name, value)| (name.name.clone(), value))
                        .collect()
                })
            }
            _ => None,
        };

        Ok(bindings)
    }

    fn apply_callable(&mut self, func: Rc<Object>, args: Vec<Rc<Object>>) -> EvalResult {
        match func.as_ref() {
            Object::Callable(Callable::User(user)) => self.apply_user_function(user, args),
            Object::Callable(Callable::Builtin(builtin)) => {
                trace!(builtin = %builtin.name(), args = args.len(), "calling builtin");
                builtin.apply(args, &mut *self.output.borrow_mut())
            }
            _ => Err(RuntimeError::NotCallable(Rc::clone(&func))),
        }
    }

    fn apply_user_function(&mut self, func: &UserFunction, args: Vec<Rc<Object>>) -> EvalResult {
        if func.parameters.len() != args.len() {
            return Err(RuntimeError::BadArity {
                expected: func.parameters.len(),
                got: args.len(),
            });
        }

        if self.depth >= self.config.max_call_depth {
            warn!(
                function = func.display_name(),
                limit = self.config.max_call_depth,
                "call depth exceeded"
            );
            return Err(RuntimeError::CallDepthExceeded(self.config.max_call_depth));
        }

        // Parameters always shadow, even when the captured scope has the same name
        let mut scope = Environment::new_enclosed(Rc::clone(&func.env));
        for (param, arg) in func.parameters.iter().zip(args) {
            scope.define(param.name.clone(), arg);
        }

        self.depth += 1;
        trace!(function = func.display_name(), depth = self.depth, "calling function");

        let result = self.in_scope(scope, |this| match &func.body {
            FunctionBody::Expression(body) => this.eval_expression(body),
            FunctionBody::Block(body) => this.eval_block(body),
        });

        self.depth -= 1;
        result
    }
}

/// Integer division rounding towards negative infinity. `None` on overflow.
fn floor_div(left: i64, right: i64) -> Option<i64> {
    let quotient = left.checked_div(right)?;

    if left % right != 0 && (left < 0) != (right < 0) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

/// Remainder taking the sign of the divisor, so that `floor_div(a, b) * b + floor_mod(a, b) == a`.
fn floor_mod(left: i64, right: i64) -> Option<i64> {
    // i64::MIN % -1 overflows in hardware but is exactly 0
    if right == -1 {
        return Some(0);
    }

    let rem = left.checked_rem(right)?;

    if rem != 0 && (rem < 0) != (right < 0) {
        Some(rem + right)
    } else {
        Some(rem)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::{
        config::InterpreterConfig,
        error::RuntimeError,
        evaluator::{Evaluator, Output},
        object::{HashKey, List, Map, Object},
    };
    use soma_parser::{parse, token::Token};

    #[test]
    fn eval_integer_expression() {
        let tests = vec![
            ("5", 5),
            ("-10", -10),
            ("5 + 5 + 5 + 5 - 10", 10),
            ("2 * 2 * 2 * 2 * 2", 32),
            ("-50 + 100 + -50", 0),
            ("20 + 2 * -10", 0),
            ("3 * (3 * 3) + 10", 37),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
            ("10 - 4 * 2", 2),
            ("7 / 2", 3),
            ("-7 / 2", -4),
            ("7 / -2", -4),
            ("7 % 3", 1),
            ("-7 % 3", 2),
            ("7 % -3", -2),
            ("(-9223372036854775807 - 1) % -1", 0),
            ("-9223372036854775807 % -1", 0),
        ];

        for (input, expected) in tests {
            test_integer_object(evaluate(input), expected);
        }
    }

    #[test]
    fn eval_float_expression() {
        let tests = vec![
            ("5.5", 5.5),
            ("-1.5", -1.5),
            ("1.5 + 1", 2.5),
            ("1 + 1.5", 2.5),
            ("7.0 / 2", 3.5),
            ("2.5 * 2.0", 5.0),
            ("-7.5 % 2", 0.5),
        ];

        for (input, expected) in tests {
            test_float_object(evaluate(input), expected);
        }
    }

    #[test]
    fn eval_comparison_and_equality() {
        let tests = vec![
            ("1 < 2", true),
            ("1 > 2", false),
            ("2 <= 2", true),
            ("3 >= 4", false),
            ("1.5 < 2", true),
            ("\"abc\" < \"abd\"", true),
            ("1 == 1", true),
            ("1 == 1.0", true),
            ("1 != 2", true),
            ("\"a\" == \"a\"", true),
            ("1 == \"1\"", false),
            ("nil == nil", true),
            ("true == false", false),
            ("[1, [2]] == [1, [2]]", true),
            ("{\"a\": 1} == {\"a\": 2}", false),
            ("(1 < 2) == true", true),
            ("!true", false),
            ("!0", true),
            ("!\"\"", true),
            ("![1]", false),
        ];

        for (input, expected) in tests {
            test_boolean_object(evaluate(input), expected);
        }
    }

    #[test]
    fn eval_string_expression() {
        test_string_object(evaluate("\"Hello\" + \" \" + \"World!\""), "Hello World!");
    }

    #[test]
    fn eval_if_expression() {
        let tests = vec![
            ("if true then 10 else 20", Object::Integer(10)),
            ("if 0 then 10 else 20", Object::Integer(20)),
            ("if [] then 1 else 2", Object::Integer(2)),
            ("if 1 < 2 { 10 }", Object::Integer(10)),
            ("if 1 > 2 { 10 }", Object::Nil),
            ("if nil { 10 } else { 20 }", Object::Integer(20)),
            ("if false { 1 } else if true { 2 } else { 3 }", Object::Integer(2)),
        ];

        for (input, expected) in tests {
            assert_eq!(evaluate(input), Ok(Rc::new(expected)), "input: {}", input);
        }
    }

    #[test]
    fn eval_let_statements() {
        let tests = vec![
            ("let a = 5\na", 5),
            ("a = 5 * 5\na", 25),
            ("a = 5\nb = a\nb", 5),
            ("a = 5\nb = a\nc = a + b + 5\nc", 15),
            ("a = 1\na = a + 1\na", 2),
        ];

        for (input, expected) in tests {
            test_integer_object(evaluate(input), expected);
        }
    }

    #[test]
    fn eval_assignment_scoping() {
        // Assignment inside a branch updates the existing outer binding
        test_integer_object(evaluate("x = 1\nif 1 { x = 2 }\nx"), 2);
        // ...but a fresh name stays local to the branch
        test_error(
            evaluate("if 1 { y = 5 }\ny"),
            RuntimeError::UndefinedVariable("y".into()),
        );
        // Loop bodies share the surrounding scope
        test_integer_object(evaluate("i = 0\nwhile i < 1 { fresh = 42\ni = i + 1 }\nfresh"), 42);
    }

    #[test]
    fn eval_while_statement() {
        test_integer_object(
            evaluate("i = 0\ntotal = 0\nwhile i < 5 {\n  total = total + i\n  i = i + 1\n}\ntotal"),
            10,
        );
        test_null_object(evaluate("while false { 1 }"));
        test_integer_object(evaluate("i = 0\nwhile i < 3 { i = i + 1 }"), 3);
    }

    #[test]
    fn eval_function_declarations() {
        test_integer_object(evaluate("fn add(a, b) { a + b }\nadd(2, 3)"), 5);
        test_integer_object(
            evaluate("fn fact(n) {\n  if n <= 1 { 1 } else { n * fact(n - 1) }\n}\nfact(10)"),
            3628800,
        );
        // Redeclaring replaces the old definition
        test_integer_object(evaluate("fn f() { 1 }\nfn f() { 2 }\nf()"), 2);
        // Functions and variables live in separate tables
        test_integer_object(evaluate("fn g() { 1 }\ng_value = g()\ng_value + 1"), 2);
        test_error(
            evaluate("fn h() { 1 }\nh"),
            RuntimeError::UndefinedVariable("h".into()),
        );
        // Parameters shadow outer names
        test_integer_object(evaluate("a = 100\nfn id(a) { a }\nid(1) + a"), 101);
    }

    #[test]
    fn eval_lambdas_and_closures() {
        let tests = vec![
            ("square = \\x -> x * x\nsquare(5)", 25),
            ("(\\n -> n + 100)(1)", 101),
            (
                "make_adder = \\a -> \\b -> a + b\nadd10 = make_adder(10)\nadd10(5)",
                15,
            ),
            // Closures see later updates to the variables they captured
            ("n = 1\nget = \\x -> n\nn = 2\nget(0)", 2),
            ("twice = \\f -> \\x -> f(f(x))\ntwice(\\y -> y * 3)(2)", 18),
        ];

        for (input, expected) in tests {
            test_integer_object(evaluate(input), expected);
        }
    }

    #[test]
    fn eval_collections() {
        let tests = vec![
            ("[1, 2, 3][0]", Object::Integer(1)),
            ("[1, 2, 3][2]", Object::Integer(3)),
            ("[1, 2, 3][-1]", Object::Integer(3)),
            ("[1, 2, 3][-3]", Object::Integer(1)),
            ("i = 1\n[1, 2, 3][i + 1]", Object::Integer(3)),
            ("{\"a\": 1, 2: \"b\"}[\"a\"]", Object::Integer(1)),
            ("{\"a\": 1, 2: \"b\"}[2]", Object::String("b".into())),
            ("len([1, 2] + [3])", Object::Integer(3)),
            ("len({1: 1, 1: 2})", Object::Integer(1)),
            ("typeof({})", Object::String("map".into())),
        ];

        for (input, expected) in tests {
            assert_eq!(evaluate(input), Ok(Rc::new(expected)), "input: {}", input);
        }

        let mut map = Map::default();
        map.entries
            .insert(HashKey::String("k".into()), Rc::new(Object::Integer(2)));
        assert_eq!(
            evaluate("{\"k\": 1 + 1}"),
            Ok(Rc::new(Object::Map(map)))
        );
    }

    #[test]
    fn eval_match_expression() {
        let tests = vec![
            ("match 0 { 0 -> \"zero\", _ -> \"other\" }", Object::String("zero".into())),
            ("match 5 { 0 -> \"zero\", _ -> \"other\" }", Object::String("other".into())),
            ("match -1 { -1 -> true, _ -> false }", Object::Boolean(true)),
            ("match 7 { n -> n * 2 }", Object::Integer(14)),
            ("match [] { [] -> 0, _ -> 1 }", Object::Integer(0)),
            ("match [1, 2, 3] { [] -> 0, [h | t] -> h }", Object::Integer(1)),
            ("match [1, 2, 3] { [_ | t] -> len(t) }", Object::Integer(2)),
            // The first matching arm wins
            ("match 1 { x -> \"first\", 1 -> \"second\" }", Object::String("first".into())),
        ];

        for (input, expected) in tests {
            assert_eq!(evaluate(input), Ok(Rc::new(expected)), "input: {}", input);
        }

        test_integer_object(
            evaluate(
                "fn sum(xs) {\n  match xs {\n    [] -> 0\n    [h | t] -> h + sum(t)\n  }\n}\nsum([1, 2, 3, 4])",
            ),
            10,
        );
        test_error(
            evaluate("match 3 { 1 -> 1, 2 -> 2 }"),
            RuntimeError::NoMatch(Rc::new(Object::Integer(3))),
        );
        test_error(
            evaluate("match 3 { n -> n }\nn"),
            RuntimeError::UndefinedVariable("n".into()),
        );
    }

    #[test]
    fn eval_try_expression() {
        test_integer_object(evaluate("try 1 / 0 as e { -1 }"), -1);
        test_integer_object(evaluate("try 1 + 1 as e { -1 }"), 2);
        test_string_object(evaluate("try 1 / 0 as e { e }"), "Division by zero");
        test_string_object(evaluate("try nope as e { e }"), "Undefined variable: 'nope'");
        test_error(
            evaluate("try 1 / 0 as e { 0 }\ne"),
            RuntimeError::UndefinedVariable("e".into()),
        );
        // Errors raised deep inside calls leave the caller's scope intact
        test_integer_object(
            evaluate("fn bad(x) { local = x\n1 / 0 }\nr = try bad(1) as e { 0 }\nw = 3\nw + r"),
            3,
        );
        test_error(
            evaluate("fn bad(x) { local = x\n1 / 0 }\nr = try bad(1) as e { 0 }\nlocal"),
            RuntimeError::UndefinedVariable("local".into()),
        );
    }

    #[test]
    fn eval_builtin_functions() {
        let tests = vec![
            ("len(\"\")", Ok(Object::Integer(0))),
            ("len(\"four\")", Ok(Object::Integer(4))),
            ("len([1, 2, 3])", Ok(Object::Integer(3))),
            ("typeof(1)", Ok(Object::String("integer".into()))),
            ("typeof(\"a\")", Ok(Object::String("string".into()))),
            ("typeof(\\x -> x)", Ok(Object::String("function".into()))),
            ("typeof(print)", Ok(Object::String("builtin".into()))),
            (
                "len(1)",
                Err("unsupported argument type for len function: `integer` (1)"),
            ),
            ("len(\"one\", \"two\")", Err("expected 1 argument(s) but got 2")),
        ];

        for (input, expected) in tests {
            let result = evaluate(input);
            match expected {
                Ok(obj) => assert_eq!(result, Ok(Rc::new(obj)), "input: {}", input),
                Err(msg) => match result {
                    Err(err) => assert_eq!(err.to_string(), msg, "input: {}", input),
                    Ok(obj) => panic!("expected error for {} but got {}", input, obj),
                },
            }
        }
    }

    #[test]
    fn eval_print() {
        let (result, out) = evaluate_with_output("if 1 then print(\"yes\") else print(\"no\")");
        assert_eq!(result, Ok(Rc::new(Object::String("yes".into()))));
        assert_eq!(out, "yes\n");

        let (_, out) = evaluate_with_output("print(1, 2.5, [\"a\"], nil)");
        assert_eq!(out, "1 2.5 [\"a\"] nil\n");
    }

    #[test]
    fn evaluation_order() {
        let (result, out) = evaluate_with_output(
            "fn note(x) { print(x)\nx }\n[note(1), note(2)]\n{note(3): note(4)}\nnote(5) + note(6)",
        );
        test_integer_object(result, 11);
        assert_eq!(out, "1\n2\n3\n4\n5\n6\n");
    }

    #[test]
    fn error_handling() {
        let tests = vec![
            (
                "5 + true",
                RuntimeError::InvalidInfixOperandType(
                    Token::Plus,
                    Rc::new(Object::Integer(5)),
                    Rc::new(Object::Boolean(true)),
                ),
            ),
            (
                "-\"a\"",
                RuntimeError::InvalidPrefixOperandType(
                    Token::Minus,
                    Rc::new(Object::String("a".into())),
                ),
            ),
            (
                "\"a\" - \"b\"",
                RuntimeError::InvalidInfixOperandType(
                    Token::Minus,
                    Rc::new(Object::String("a".into())),
                    Rc::new(Object::String("b".into())),
                ),
            ),
            ("foobar", RuntimeError::UndefinedVariable("foobar".into())),
            ("foobar(1)", RuntimeError::UndefinedFunction("foobar".into())),
            ("5 / 0", RuntimeError::DivisionByZero),
            ("5 % 0", RuntimeError::DivisionByZero),
            ("5.0 / 0", RuntimeError::DivisionByZero),
            (
                "9223372036854775807 + 1",
                RuntimeError::IntegerOverflow(Token::Plus),
            ),
            (
                "(0 - 9223372036854775807 - 1) / -1",
                RuntimeError::IntegerOverflow(Token::Slash),
            ),
            (
                "(\\x -> x)(1, 2)",
                RuntimeError::BadArity {
                    expected: 1,
                    got: 2,
                },
            ),
            (
                "fn f(a) { a }\nf()",
                RuntimeError::BadArity {
                    expected: 1,
                    got: 0,
                },
            ),
            ("5(1)", RuntimeError::NotCallable(Rc::new(Object::Integer(5)))),
            ("1[0]", RuntimeError::IndexNotSupported(Rc::new(Object::Integer(1)))),
            (
                "[1][true]",
                RuntimeError::InvalidIndexOperandType(Rc::new(Object::Boolean(true))),
            ),
            (
                "{1.5: 2}",
                RuntimeError::NonHashableKey(Rc::new(Object::Float(1.5))),
            ),
            (
                "{\"a\": 1}[\"b\"]",
                RuntimeError::KeyNotFound(Rc::new(Object::String("b".into()))),
            ),
        ];

        for (input, expected) in tests {
            test_error(evaluate(input), expected);
        }

        let list = || {
            Rc::new(Object::List(List {
                elements: vec![Rc::new(Object::Integer(1)), Rc::new(Object::Integer(2))],
            }))
        };
        test_error(
            evaluate("[1, 2][2]"),
            RuntimeError::IndexOutOfBounds {
                list: list(),
                index: 2,
            },
        );
        test_error(
            evaluate("[1, 2][-3]"),
            RuntimeError::IndexOutOfBounds {
                list: list(),
                index: -3,
            },
        );
    }

    #[test]
    fn call_depth_is_limited() {
        let program = parse("fn spin(n) { spin(n + 1) }\nspin(0)").unwrap();
        let mut evaluator =
            Evaluator::new().with_config(InterpreterConfig::default().with_max_call_depth(20));

        assert_eq!(
            evaluator.eval(&program),
            Err(RuntimeError::CallDepthExceeded(20))
        );

        // The counter is unwound, so shallow calls still work afterwards
        let program = parse("fn one() { 1 }\none()").unwrap();
        assert_eq!(evaluator.eval(&program), Ok(Rc::new(Object::Integer(1))));
    }

    #[test]
    fn failed_statement_keeps_earlier_bindings() {
        let mut evaluator = Evaluator::new();

        evaluator.eval(&parse("x = 1").unwrap()).unwrap();
        assert_eq!(
            evaluator.eval(&parse("y = 2\nx = 1 / 0").unwrap()),
            Err(RuntimeError::DivisionByZero)
        );

        let env = evaluator.env();
        assert_eq!(env.borrow().get("x"), Some(Rc::new(Object::Integer(1))));
        assert_eq!(env.borrow().get("y"), Some(Rc::new(Object::Integer(2))));
    }

    fn evaluate(input: &str) -> Result<Rc<Object>, RuntimeError> {
        evaluate_with_output(input).0
    }

    fn evaluate_with_output(input: &str) -> (Result<Rc<Object>, RuntimeError>, String) {
        let prog = match parse(input) {
            Ok(prog) => prog,
            Err(err) => panic!("parser error for {:?}: {}", input, err),
        };

        let out = Rc::new(RefCell::new(Vec::<u8>::new()));
        let output: Output = out.clone();
        let result = Evaluator::new().with_output(output).eval(&prog);

        let printed = String::from_utf8(out.borrow().clone()).unwrap();
        (result, printed)
    }

    fn test_integer_object(result: Result<Rc<Object>, RuntimeError>, expected_value: i64) {
        match result.as_deref() {
            Ok(Object::Integer(value)) if *value == expected_value => {}
            _ => panic!(
                "expected integer object with value {} but got {:?}",
                expected_value, result
            ),
        }
    }

    fn test_float_object(result: Result<Rc<Object>, RuntimeError>, expected_value: f64) {
        match result.as_deref() {
            Ok(Object::Float(value)) if *value == expected_value => {}
            _ => panic!(
                "expected float object with value {} but got {:?}",
                expected_value, result
            ),
        }
    }

    fn test_boolean_object(result: Result<Rc<Object>, RuntimeError>, expected_value: bool) {
        match result.as_deref() {
            Ok(Object::Boolean(value)) if *value == expected_value => {}
            _ => panic!(
                "expected boolean object with value {} but got {:?}",
                expected_value, result
            ),
        }
    }

    fn test_string_object(result: Result<Rc<Object>, RuntimeError>, expected_value: &str) {
        match result.as_deref() {
            Ok(Object::String(value)) if value == expected_value => {}
            _ => panic!(
                "expected string object with value {:?} but got {:?}",
                expected_value, result
            ),
        }
    }

    fn test_null_object(result: Result<Rc<Object>, RuntimeError>) {
        match result.as_deref() {
            Ok(Object::Nil) => {}
            _ => panic!("expected nil object but got {:?}", result),
        }
    }

    fn test_error(result: Result<Rc<Object>, RuntimeError>, expected_error: RuntimeError) {
        match result {
            Err(err) if err == expected_error => {}
            _ => panic!(
                "expected error to be \"{:?}\" but got \"{:?}\"",
                expected_error, result
            ),
        }
    }
}
