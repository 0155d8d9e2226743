//! A small stack-based expression evaluator for bind predicates (§4.10)
//! and control-var target expressions (§4.11).
//!
//! Types: `{bool, int, float, tstamp, real}`. Operators:
//! `{+, -, *, /, <, >, =, !=, and, or, not}`. Evaluation is pure except for
//! the `rand()` call, which draws from the caller-supplied [`Rng`]. An
//! [`Expr`] is parsed once (`Expr::parse`) and can be evaluated many times
//! against different environments — the "parse-once-evaluate-many cache"
//! §9 allows.

use std::fmt;

use kunquat_core::Tstamp;

use crate::rng::Rng;
use crate::value::Value;

/// A failure while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Bool(bool),
    Ident(String),
    Dollar,
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '$' => {
                tokens.push(Token::Dollar);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(match c {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    _ => "/",
                }));
                i += 1;
            }
            '<' | '>' => {
                tokens.push(Token::Op(if c == '<' { "<" } else { ">" }));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '!' if i + 1 < chars.len() && chars[i + 1] == '=' => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text
                    .parse()
                    .map_err(|_| ExprError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Number(n));
            }
            _ if c.is_alphabetic() || c == '_' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    "and" => tokens.push(Token::Op("and")),
                    "or" => tokens.push(Token::Op("or")),
                    "not" => tokens.push(Token::Op("not")),
                    _ => tokens.push(Token::Ident(text)),
                }
            }
            _ => return Err(ExprError::UnexpectedToken(c.to_string())),
        }
    }
    Ok(tokens)
}

/// A parsed expression tree, ready to be evaluated repeatedly.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    /// The `$` placeholder: the input value passed to `eval`.
    Input,
    /// A named variable, resolved against the environment closure at
    /// evaluation time (an event-cache lookup for bind predicates).
    Var(String),
    /// `rand()`: draws a uniform `[0, 1)` value from the evaluator's RNG.
    Rand,
    Not(Box<Expr>),
    Bin(Box<Expr>, &'static str, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), ExprError> {
        match self.next() {
            Some(t) if &t == tok => Ok(()),
            Some(t) => Err(ExprError::UnexpectedToken(format!("{t:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    // or_expr := and_expr ( "or" and_expr )*
    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Op("or"))) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Bin(Box::new(lhs), "or", Box::new(rhs));
        }
        Ok(lhs)
    }

    // and_expr := not_expr ( "and" not_expr )*
    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek(), Some(Token::Op("and"))) {
            self.next();
            let rhs = self.parse_not()?;
            lhs = Expr::Bin(Box::new(lhs), "and", Box::new(rhs));
        }
        Ok(lhs)
    }

    // not_expr := "not" not_expr | cmp_expr
    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Op("not"))) {
            self.next();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_cmp()
    }

    // cmp_expr := add_expr ( ("<" | ">" | "=" | "!=") add_expr )?
    fn parse_cmp(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.parse_add()?;
        if let Some(Token::Op(op @ ("<" | ">" | "=" | "!="))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_add()?;
            return Ok(Expr::Bin(Box::new(lhs), op, Box::new(rhs)));
        }
        Ok(lhs)
    }

    // add_expr := mul_expr ( ("+" | "-") mul_expr )*
    fn parse_add(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_mul()?;
        while let Some(Token::Op(op @ ("+" | "-"))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_mul()?;
            lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    // mul_expr := unary ( ("*" | "/") unary )*
    fn parse_mul(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(Token::Op(op @ ("*" | "/"))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    // unary := "-" unary | atom
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Op("-"))) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Bin(Box::new(Expr::Number(0.0)), "-", Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        match self.next().ok_or(ExprError::UnexpectedEnd)? {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Bool(b) => Ok(Expr::Bool(b)),
            Token::Dollar => Ok(Expr::Input),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if name == "rand" => {
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Rand)
            }
            Token::Ident(name) => Ok(Expr::Var(name)),
            other => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}

impl Expr {
    /// Parses a textual expression into an evaluable tree.
    pub fn parse(src: &str) -> Result<Expr, ExprError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(ExprError::UnexpectedToken(format!(
                "{:?}",
                parser.tokens[parser.pos]
            )));
        }
        Ok(expr)
    }

    /// Evaluates the expression. `input` supplies `$`'s value; `lookup`
    /// resolves named variables (event-cache reads); `rng` serves
    /// `rand()`.
    pub fn eval(
        &self,
        input: &Value,
        lookup: &dyn Fn(&str) -> Option<Value>,
        rng: &mut Rng,
    ) -> Result<Value, ExprError> {
        match self {
            Expr::Number(n) => Ok(Value::Real(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Input => Ok(input.clone()),
            Expr::Rand => Ok(Value::Real(rng.next_f64())),
            Expr::Var(name) => lookup(name)
                .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
            Expr::Not(inner) => {
                let v = inner.eval(input, lookup, rng)?;
                let b = v
                    .as_bool()
                    .ok_or_else(|| ExprError::TypeError("not expects bool".into()))?;
                Ok(Value::Bool(!b))
            }
            Expr::Bin(lhs, op, rhs) => {
                let l = lhs.eval(input, lookup, rng)?;
                let r = rhs.eval(input, lookup, rng)?;
                eval_bin(op, &l, &r)
            }
        }
    }
}

fn eval_bin(op: &str, l: &Value, r: &Value) -> Result<Value, ExprError> {
    match op {
        "and" => {
            let (a, b) = bools(l, r)?;
            Ok(Value::Bool(a && b))
        }
        "or" => {
            let (a, b) = bools(l, r)?;
            Ok(Value::Bool(a || b))
        }
        "=" => Ok(Value::Bool(values_equal(l, r))),
        "!=" => Ok(Value::Bool(!values_equal(l, r))),
        "<" | ">" => {
            let (a, b) = numbers(l, r)?;
            Ok(Value::Bool(if op == "<" { a < b } else { a > b }))
        }
        "+" | "-" | "*" | "/" => arith(op, l, r),
        _ => unreachable!("parser only emits known operators"),
    }
}

fn bools(l: &Value, r: &Value) -> Result<(bool, bool), ExprError> {
    Ok((
        l.as_bool()
            .ok_or_else(|| ExprError::TypeError("expected bool operand".into()))?,
        r.as_bool()
            .ok_or_else(|| ExprError::TypeError("expected bool operand".into()))?,
    ))
}

fn numbers(l: &Value, r: &Value) -> Result<(f64, f64), ExprError> {
    Ok((
        l.as_f64()
            .ok_or_else(|| ExprError::TypeError("expected numeric operand".into()))?,
        r.as_f64()
            .ok_or_else(|| ExprError::TypeError("expected numeric operand".into()))?,
    ))
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::String(a), Value::String(b)) => a == b,
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Tstamp arithmetic is honoured (§4.11): if either operand is a
/// [`Value::Tstamp`], the result stays a `Tstamp` for `+`/`-`.
fn arith(op: &str, l: &Value, r: &Value) -> Result<Value, ExprError> {
    if let (Value::Tstamp(a), Value::Tstamp(b)) = (l, r) {
        return Ok(Value::Tstamp(match op {
            "+" => *a + *b,
            "-" => *a - *b,
            _ => {
                return Err(ExprError::TypeError(
                    "tstamp only supports + and -".into(),
                ))
            }
        }));
    }
    let (a, b) = numbers(l, r)?;
    match op {
        "+" => Ok(Value::Real(a + b)),
        "-" => Ok(Value::Real(a - b)),
        "*" => Ok(Value::Real(a * b)),
        "/" => {
            if b == 0.0 {
                Err(ExprError::DivisionByZero)
            } else {
                Ok(Value::Real(a / b))
            }
        }
        _ => unreachable!(),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_vars(_: &str) -> Option<Value> {
        None
    }

    #[test]
    fn arithmetic_precedence_is_conventional() {
        let expr = Expr::parse("1 + 2 * 3").unwrap();
        let mut rng = Rng::new(1);
        let v = expr
            .eval(&Value::Bool(false), &no_vars, &mut rng)
            .unwrap();
        assert_eq!(v, Value::Real(7.0));
    }

    #[test]
    fn input_placeholder_resolves_to_dollar() {
        let expr = Expr::parse("$ > 5").unwrap();
        let mut rng = Rng::new(1);
        let v = expr
            .eval(&Value::Real(10.0), &no_vars, &mut rng)
            .unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn variable_lookup_resolves_via_closure() {
        let expr = Expr::parse("x = 3").unwrap();
        let lookup = |name: &str| -> Option<Value> {
            if name == "x" {
                Some(Value::Real(3.0))
            } else {
                None
            }
        };
        let mut rng = Rng::new(1);
        let v = expr.eval(&Value::Bool(false), &lookup, &mut rng).unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let expr = Expr::parse("y = 1").unwrap();
        let mut rng = Rng::new(1);
        assert!(expr.eval(&Value::Bool(false), &no_vars, &mut rng).is_err());
    }

    #[test]
    fn division_by_zero_is_rejected() {
        let expr = Expr::parse("1 / 0").unwrap();
        let mut rng = Rng::new(1);
        assert!(matches!(
            expr.eval(&Value::Bool(false), &no_vars, &mut rng),
            Err(ExprError::DivisionByZero)
        ));
    }

    #[test]
    fn not_and_or_combine() {
        let expr = Expr::parse("not (true and false) or false").unwrap();
        let mut rng = Rng::new(1);
        let v = expr
            .eval(&Value::Bool(false), &no_vars, &mut rng)
            .unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn rand_stays_in_unit_interval() {
        let expr = Expr::parse("rand()").unwrap();
        let mut rng = Rng::new(5);
        let v = expr.eval(&Value::Bool(false), &no_vars, &mut rng).unwrap();
        if let Value::Real(f) = v {
            assert!((0.0..1.0).contains(&f));
        } else {
            panic!("expected Real");
        }
    }

    #[test]
    fn tstamp_addition_stays_tstamp() {
        let expr = Expr::parse("$ + x").unwrap();
        let lookup = |name: &str| -> Option<Value> {
            if name == "x" {
                Some(Value::Tstamp(Tstamp::new(1, 0)))
            } else {
                None
            }
        };
        let mut rng = Rng::new(1);
        let input = Value::Tstamp(Tstamp::new(2, 0));
        let v = expr.eval(&input, &lookup, &mut rng).unwrap();
        assert_eq!(v, Value::Tstamp(Tstamp::new(3, 0)));
    }
}
