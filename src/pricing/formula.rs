//! Arithmetic formulas attached to `FORMULA` price rules.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | ident | ident '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Everything is evaluated over [`Decimal`], so there is no floating point
//! drift and overflow is reported instead of wrapping.

use rust_decimal::prelude::*;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_FORMULA_LENGTH: usize = 1000;
const MAX_NESTING: usize = 64;

/// Variables a pricing formula may reference
pub const VARIABLES: &[&str] = &[
    "basePrice",
    "price",
    "quantity",
    "weight",
    "length",
    "width",
    "height",
    "surface",
    "volume",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("formula exceeds {MAX_FORMULA_LENGTH} characters")]
    TooLong,
    #[error("formula nests deeper than {MAX_NESTING} levels")]
    TooDeep,
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => format!("'{}'", name),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
    Abs,
    Round,
    Ceil,
    Floor,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "abs" => Some(Function::Abs),
            "round" => Some(Function::Round),
            "ceil" => Some(Function::Ceil),
            "floor" => Some(Function::Floor),
            _ => None,
        }
    }

    fn check_arity(self, name: &str, got: usize) -> Result<(), FormulaError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (got >= 1, "at least 1"),
            Function::Abs | Function::Ceil | Function::Floor => (got == 1, "1"),
            Function::Round => (got == 1 || got == 2, "1 or 2"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                name: name.to_string(),
                expected,
                got,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(Decimal),
    Variable(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

/// A parsed formula, ready to be evaluated many times
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    root: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        if source.len() > MAX_FORMULA_LENGTH {
            return Err(FormulaError::TooLong);
        }
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expr()?;
        if let Some(extra) = parser.peek() {
            return Err(FormulaError::UnexpectedToken(extra.describe()));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the variables referenced, in first-use order
    pub fn variables(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Number(_) => {}
                Expr::Variable(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Expr::Neg(inner) => walk(inner, out),
                Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                    walk(a, out);
                    walk(b, out);
                }
                Expr::Call(_, args) => args.iter().for_each(|arg| walk(arg, out)),
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    /// Rejects formulas referencing anything outside [`VARIABLES`]
    pub fn check_variables(&self) -> Result<(), FormulaError> {
        match self
            .variables()
            .into_iter()
            .find(|name| !VARIABLES.contains(name))
        {
            Some(unknown) => Err(FormulaError::UnknownVariable(unknown.to_string())),
            None => Ok(()),
        }
    }

    pub fn evaluate(&self, vars: &HashMap<&str, Decimal>) -> Result<Decimal, FormulaError> {
        eval(&self.root, vars)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let number = Decimal::from_str(&raw)
                    .map_err(|_| FormulaError::InvalidNumber(raw.clone()))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
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
            other => return Err(FormulaError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(token.describe())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn descend(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(FormulaError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left = Expr::Add(Box::new(left), Box::new(self.term()?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left = Expr::Sub(Box::new(left), Box::new(self.term()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    left = Expr::Mul(Box::new(left), Box::new(self.unary()?));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    left = Expr::Div(Box::new(left), Box::new(self.unary()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Variable(name));
                }
                let function = Function::lookup(&name)
                    .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                self.pos += 1;
                self.descend()?;
                let mut args = vec![self.expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.expect(Token::RParen)?;
                self.depth -= 1;
                function.check_arity(&name, args.len())?;
                Ok(Expr::Call(function, args))
            }
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(token) => Err(FormulaError::UnexpectedToken(token.describe())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

fn eval(expr: &Expr, vars: &HashMap<&str, Decimal>) -> Result<Decimal, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Variable(name) => vars
            .get(name.as_str())
            .copied()
            .ok_or_else(|| FormulaError::UnknownVariable(name.clone())),
        Expr::Neg(inner) => Ok(-eval(inner, vars)?),
        Expr::Add(a, b) => eval(a, vars)?
            .checked_add(eval(b, vars)?)
            .ok_or(FormulaError::Overflow),
        Expr::Sub(a, b) => eval(a, vars)?
            .checked_sub(eval(b, vars)?)
            .ok_or(FormulaError::Overflow),
        Expr::Mul(a, b) => eval(a, vars)?
            .checked_mul(eval(b, vars)?)
            .ok_or(FormulaError::Overflow),
        Expr::Div(a, b) => {
            let divisor = eval(b, vars)?;
            if divisor.is_zero() {
                return Err(FormulaError::DivisionByZero);
            }
            eval(a, vars)?
                .checked_div(divisor)
                .ok_or(FormulaError::Overflow)
        }
        Expr::Call(function, args) => {
            let values = args
                .iter()
                .map(|arg| eval(arg, vars))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match function {
                Function::Min => values.into_iter().min().ok_or(FormulaError::UnexpectedEnd)?,
                Function::Max => values.into_iter().max().ok_or(FormulaError::UnexpectedEnd)?,
                Function::Abs => values[0].abs(),
                Function::Ceil => values[0].ceil(),
                Function::Floor => values[0].floor(),
                Function::Round => {
                    let dp = match values.get(1) {
                        Some(places) => places
                            .trunc()
                            .to_u32()
                            .filter(|places| *places <= 28)
                            .ok_or_else(|| FormulaError::InvalidNumber(places.to_string()))?,
                        None => 0,
                    };
                    values[0].round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn vars() -> HashMap<&'static str, Decimal> {
        HashMap::from([
            ("basePrice", dec!(100)),
            ("price", dec!(90)),
            ("quantity", dec!(12)),
            ("weight", dec!(2.5)),
        ])
    }

    fn eval_str(source: &str) -> Result<Decimal, FormulaError> {
        Formula::parse(source)?.evaluate(&vars())
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval_str("2 + 3 * 4").unwrap(), dec!(14));
        assert_eq!(eval_str("(2 + 3) * 4").unwrap(), dec!(20));
        assert_eq!(eval_str("10 - 4 - 3").unwrap(), dec!(3));
        assert_eq!(eval_str("-2 * -3").unwrap(), dec!(6));
        assert_eq!(eval_str("1 / 4").unwrap(), dec!(0.25));
    }

    #[test]
    fn variables_and_functions() {
        assert_eq!(eval_str("price * 0.9 + weight * 2").unwrap(), dec!(86));
        assert_eq!(eval_str("max(basePrice - 5 * quantity, 50)").unwrap(), dec!(50));
        assert_eq!(eval_str("min(price, basePrice, 95)").unwrap(), dec!(90));
        assert_eq!(eval_str("abs(price - basePrice)").unwrap(), dec!(10));
        assert_eq!(eval_str("round(price / 7, 2)").unwrap(), dec!(12.86));
        assert_eq!(eval_str("round(2.5)").unwrap(), dec!(3));
        assert_eq!(eval_str("ceil(weight)").unwrap(), dec!(3));
        assert_eq!(eval_str("floor(weight)").unwrap(), dec!(2));
    }

    #[test]
    fn errors_are_reported() {
        assert_matches!(eval_str("price / (quantity - 12)"), Err(FormulaError::DivisionByZero));
        assert_matches!(eval_str("price +"), Err(FormulaError::UnexpectedEnd));
        assert_matches!(eval_str("price $ 2"), Err(FormulaError::UnexpectedChar('$', 6)));
        assert_matches!(eval_str("sqrt(4)"), Err(FormulaError::UnknownFunction(_)));
        assert_matches!(eval_str("abs(1, 2)"), Err(FormulaError::Arity { .. }));
        assert_matches!(eval_str("discount * 2"), Err(FormulaError::UnknownVariable(_)));
        assert_matches!(eval_str("1.2.3"), Err(FormulaError::InvalidNumber(_)));
        assert_matches!(eval_str("(1 + 2"), Err(FormulaError::UnexpectedEnd));
        assert_matches!(eval_str("1 2"), Err(FormulaError::UnexpectedToken(_)));
        assert_matches!(Formula::parse("   "), Err(FormulaError::Empty));
    }

    #[test]
    fn limits_are_enforced() {
        let long = "1+".repeat(MAX_FORMULA_LENGTH / 2) + "1";
        assert_matches!(Formula::parse(&long), Err(FormulaError::TooLong));

        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_matches!(Formula::parse(&deep), Err(FormulaError::TooDeep));
    }

    #[test]
    fn variable_whitelist() {
        let formula = Formula::parse("price * quantity + price").unwrap();
        assert_eq!(formula.variables(), vec!["price", "quantity"]);
        assert!(formula.check_variables().is_ok());

        let formula = Formula::parse("margin * 2").unwrap();
        assert_matches!(formula.check_variables(), Err(FormulaError::UnknownVariable(v)) if v == "margin");
    }
}
