//! Restricted expression language for Condition tasks and `items_from` paths.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr       := and_expr (("or" | "||") and_expr)*
//! and_expr   := not_expr (("and" | "&&") not_expr)*
//! not_expr   := ("not" | "!") not_expr | comparison
//! comparison := unary (("==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not in") unary)?
//! unary      := "-" unary | primary
//! primary    := number | string | true | false | null | path | "(" expr ")"
//! path       := ident ("." ident | "[" (string | integer) "]")*
//! ```
//!
//! Expressions are evaluated against a JSON scope object. There are no
//! function calls, assignments, or attribute access beyond plain field lookup,
//! so evaluating an untrusted expression can only read the scope.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("invalid expression at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("cannot evaluate expression: {0}")]
    Evaluation(String),
}

impl ExpressionError {
    fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Ident(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Minus,
    Cmp(CmpOp),
    And,
    Or,
    Not,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        };
        f.write_str(s)
    }
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = bytes.get(i + 1).copied();
        let token = match c {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'.' => Token::Dot,
            b'-' => Token::Minus,
            b'=' if two == Some(b'=') => {
                i += 1;
                Token::Cmp(CmpOp::Eq)
            }
            b'!' if two == Some(b'=') => {
                i += 1;
                Token::Cmp(CmpOp::Ne)
            }
            b'!' => Token::Not,
            b'<' if two == Some(b'=') => {
                i += 1;
                Token::Cmp(CmpOp::Le)
            }
            b'<' => Token::Cmp(CmpOp::Lt),
            b'>' if two == Some(b'=') => {
                i += 1;
                Token::Cmp(CmpOp::Ge)
            }
            b'>' => Token::Cmp(CmpOp::Gt),
            b'&' if two == Some(b'&') => {
                i += 1;
                Token::And
            }
            b'|' if two == Some(b'|') => {
                i += 1;
                Token::Or
            }
            b'\'' | b'"' => {
                let (value, end) = lex_string(src, i)?;
                tokens.push((start, Token::Literal(Value::String(value))));
                i = end;
                continue;
            }
            b'0'..=b'9' => {
                let (value, end) = lex_number(src, i)?;
                tokens.push((start, Token::Literal(value)));
                i = end;
                continue;
            }
            c if c == b'_' || c.is_ascii_alphabetic() => {
                let mut end = i;
                while end < bytes.len() && (bytes[end] == b'_' || bytes[end].is_ascii_alphanumeric()) {
                    end += 1;
                }
                let word = &src[i..end];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" | "True" => Token::Literal(Value::Bool(true)),
                    "false" | "False" => Token::Literal(Value::Bool(false)),
                    "null" | "None" => Token::Literal(Value::Null),
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((start, token));
                i = end;
                continue;
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(ExpressionError::parse(i, format!("unexpected character '{ch}'")));
            }
        };
        tokens.push((start, token));
        i += 1;
    }

    Ok(tokens)
}

/// Lex a quoted string starting at `start`; returns the value and the offset past the closing quote.
fn lex_string(src: &str, start: usize) -> Result<(String, usize), ExpressionError> {
    let mut chars = src[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(ExpressionError::parse(start, "expected string")),
    };
    let mut out = String::new();
    let mut escaped = false;
    for (offset, ch) in chars {
        if escaped {
            out.push(match ch {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Ok((out, start + offset + ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }
    Err(ExpressionError::parse(start, "unterminated string literal"))
}

fn lex_number(src: &str, start: usize) -> Result<(Value, usize), ExpressionError> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut is_float = false;
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        is_float = true;
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let text = &src[start..end];
    let value = if is_float {
        text.parse::<f64>().ok().map(Value::from)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };
    value
        .map(|v| (v, end))
        .ok_or_else(|| ExpressionError::parse(start, format!("invalid number '{text}'")))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(Vec<Segment>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

/// Deepest nesting of parentheses, `not` and unary `-` a parser accepts.
const MAX_DEPTH: usize = 64;

/// A single term stays as-is; two or more become one n-ary node, so long
/// `and`/`or` chains never deepen the tree.
fn flatten(mut terms: Vec<Expr>, node: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        node(terms)
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.len)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExpressionError> {
        let offset = self.offset();
        match self.next() {
            Some(t) if t == expected => Ok(()),
            _ => Err(ExpressionError::parse(offset, format!("expected {what}"))),
        }
    }

    /// Enter one level of nesting (`(`, `not`, unary `-`).
    fn descend(&mut self) -> Result<(), ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::parse(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut terms = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        Ok(flatten(terms, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut terms = vec![self.parse_not()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.parse_not()?);
        }
        Ok(flatten(terms, Expr::And))
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let lhs = self.parse_unary()?;
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Cmp(op)), _) => {
                let op = *op;
                self.pos += 1;
                op
            }
            (Some(Token::In), _) => {
                self.pos += 1;
                CmpOp::In
            }
            (Some(Token::Not), Some(Token::In)) => {
                self.pos += 2;
                CmpOp::NotIn
            }
            _ => return Ok(lhs),
        };
        let rhs = self.parse_unary()?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Literal(v)) => Ok(Expr::Literal(v)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(root)) => self.parse_path(root),
            Some(other) => Err(ExpressionError::parse(
                offset,
                format!("unexpected token {other:?}"),
            )),
            None => Err(ExpressionError::parse(offset, "unexpected end of expression")),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Expr, ExpressionError> {
        let mut segments = vec![Segment::Key(root)];
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let offset = self.offset();
                    match self.next() {
                        Some(Token::Ident(name)) => segments.push(Segment::Key(name)),
                        _ => return Err(ExpressionError::parse(offset, "expected field name after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let offset = self.offset();
                    let segment = match self.next() {
                        Some(Token::Literal(Value::String(key))) => Segment::Key(key),
                        Some(Token::Literal(Value::Number(n))) => match n.as_u64() {
                            Some(idx) => Segment::Index(idx as usize),
                            None => {
                                return Err(ExpressionError::parse(
                                    offset,
                                    "index must be a non-negative integer",
                                ));
                            }
                        },
                        _ => return Err(ExpressionError::parse(offset, "expected string key or index")),
                    };
                    self.expect(Token::RBracket, "']'")?;
                    segments.push(segment);
                }
                _ => break,
            }
        }
        Ok(Expr::Path(segments))
    }
}

// ---------------------------------------------------------------------------
// Expression
// ---------------------------------------------------------------------------

/// A parsed expression, ready to be evaluated against any number of scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parse `source`. Fails on any syntax error or trailing input.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExpressionError::parse(0, "empty expression"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            len: source.len(),
            depth: 0,
        };
        let ast = parser.parse_or()?;
        if parser.peek().is_some() {
            return Err(ExpressionError::parse(parser.offset(), "unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate to a raw JSON value.
    ///
    /// Path roots resolve against `scope.input` first, then against `scope`
    /// itself, so both `score > 5` and `input.score > 5` read the same field.
    /// Missing fields evaluate to `null`.
    pub fn evaluate(&self, scope: &Value) -> Result<Value, ExpressionError> {
        eval(&self.ast, scope)
    }

    /// Evaluate and coerce the result with [`truthy`].
    pub fn evaluate_bool(&self, scope: &Value) -> Result<bool, ExpressionError> {
        self.evaluate(scope).map(|v| truthy(&v))
    }
}

/// Truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn eval(expr: &Expr, scope: &Value) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(segments) => Ok(resolve(scope, segments).cloned().unwrap_or(Value::Null)),
        Expr::Neg(inner) => {
            let v = eval(inner, scope)?;
            negate(&v)
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, scope)?))),
        Expr::And(terms) => {
            for term in terms {
                if !truthy(&eval(term, scope)?) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(terms) => {
            for term in terms {
                if truthy(&eval(term, scope)?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Compare(op, lhs, rhs) => {
            let l = eval(lhs, scope)?;
            let r = eval(rhs, scope)?;
            compare(*op, &l, &r).map(Value::Bool)
        }
    }
}

fn resolve<'a>(scope: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let Segment::Key(root) = first else {
        return None;
    };
    let mut current = scope
        .get("input")
        .and_then(|input| input.get(root))
        .or_else(|| scope.get(root))?;
    for segment in rest {
        current = match segment {
            Segment::Key(key) => current.get(key.as_str())?,
            Segment::Index(idx) => current.get(*idx)?,
        };
    }
    Some(current)
}

fn negate(value: &Value) -> Result<Value, ExpressionError> {
    if let Some(i) = value.as_i64().and_then(i64::checked_neg) {
        return Ok(Value::from(i));
    }
    match value.as_f64() {
        Some(f) if value.is_number() => Ok(Value::from(-f)),
        _ => Err(ExpressionError::Evaluation(format!(
            "cannot negate {}",
            type_name(value)
        ))),
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool, ExpressionError> {
    match op {
        CmpOp::Eq => Ok(loose_eq(l, r)),
        CmpOp::Ne => Ok(!loose_eq(l, r)),
        CmpOp::In => contains(r, l),
        CmpOp::NotIn => contains(r, l).map(|found| !found),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ord = ordering(l, r).ok_or_else(|| {
                ExpressionError::Evaluation(format!(
                    "cannot compare {} {op} {}",
                    type_name(l),
                    type_name(r)
                ))
            })?;
            Ok(match op {
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Le => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
    }
}

/// Equality where `1 == 1.0`.
fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => l == r,
    }
}

fn ordering(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, ExpressionError> {
    match (haystack, needle) {
        (Value::Array(items), _) => Ok(items.iter().any(|item| loose_eq(item, needle))),
        (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(ExpressionError::Evaluation(format!(
            "cannot test membership of {} in {}",
            type_name(needle),
            type_name(haystack)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_bool(expr: &str, scope: &Value) -> bool {
        Expression::parse(expr).unwrap().evaluate_bool(scope).unwrap()
    }

    fn scope() -> Value {
        json!({
            "input": {
                "score": 7,
                "name": "Alice",
                "tags": ["rust", "wasm"],
                "nested": { "ok": true, "weird key": 3 }
            },
            "results": {
                "fetch": { "status": 200, "body": "all good" }
            }
        })
    }

    #[test]
    fn literals() {
        assert!(eval_bool("true", &json!({})));
        assert!(!eval_bool("false", &json!({})));
        assert!(!eval_bool("null", &json!({})));
        assert!(eval_bool("True", &json!({})));
        assert!(!eval_bool("None", &json!({})));
        assert!(eval_bool("1.5 > 1", &json!({})));
        assert!(eval_bool("-3 < 0", &json!({})));
    }

    #[test]
    fn bare_identifiers_resolve_against_input() {
        let s = scope();
        assert!(eval_bool("score > 5", &s));
        assert!(eval_bool("input.score > 5", &s));
        assert!(eval_bool("name == 'Alice'", &s));
        assert!(eval_bool("name == \"Alice\"", &s));
    }

    #[test]
    fn paths_over_results_and_brackets() {
        let s = scope();
        assert!(eval_bool("results.fetch.status == 200", &s));
        assert!(eval_bool("input['nested']['weird key'] == 3", &s));
        assert!(eval_bool("tags[0] == 'rust'", &s));
        assert!(eval_bool("input.nested.ok", &s));
    }

    #[test]
    fn missing_fields_are_null() {
        let s = scope();
        assert!(eval_bool("input.nope == null", &s));
        assert!(!eval_bool("tags[9]", &s));
        assert!(!eval_bool("results.other.status", &s));
    }

    #[test]
    fn boolean_operators_and_precedence() {
        let s = scope();
        assert!(eval_bool("score > 5 and name == 'Alice'", &s));
        assert!(eval_bool("score > 50 || name == 'Alice'", &s));
        assert!(!eval_bool("score > 50 && name == 'Alice'", &s));
        assert!(eval_bool("not score > 50", &s));
        assert!(eval_bool("!(score > 50)", &s));
        // and binds tighter than or
        assert!(eval_bool("true or false and false", &s));
        assert!(!eval_bool("(true or false) and false", &s));
    }

    #[test]
    fn membership() {
        let s = scope();
        assert!(eval_bool("'rust' in tags", &s));
        assert!(eval_bool("'go' not in tags", &s));
        assert!(eval_bool("'good' in results.fetch.body", &s));
        assert!(eval_bool("'ok' in input.nested", &s));
    }

    #[test]
    fn numeric_equality_is_loose() {
        assert!(eval_bool("1 == 1.0", &json!({})));
        assert!(eval_bool("score == 7.0", &scope()));
    }

    #[test]
    fn comparison_type_errors() {
        let expr = Expression::parse("name > 3").unwrap();
        let err = expr.evaluate(&scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation(_)));
        assert!(err.to_string().contains("string"));

        let expr = Expression::parse("3 in 4").unwrap();
        assert!(expr.evaluate(&scope()).is_err());
    }

    #[test]
    fn parse_errors() {
        for bad in ["", "score >", "(score > 1", "score > 1 )", "a..b", "a[-1]", "'open", "a = 1", "x @ y"] {
            let err = Expression::parse(bad).unwrap_err();
            assert!(
                matches!(err, ExpressionError::Parse { .. }),
                "expected parse error for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn no_general_eval() {
        // Call syntax is not part of the grammar.
        assert!(Expression::parse("__import__('os')").is_err());
        assert!(Expression::parse("len(tags)").is_err());
    }

    #[test]
    fn evaluate_returns_raw_values() {
        let expr = Expression::parse("input.tags").unwrap();
        assert_eq!(expr.evaluate(&scope()).unwrap(), json!(["rust", "wasm"]));
        assert_eq!(expr.source(), "input.tags");
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(!truthy(&json!({})));
        assert!(truthy(&json!([0])));
        assert!(truthy(&json!(-1)));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let deep = format!("{}true{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = Expression::parse(&deep).unwrap_err();
        assert!(matches!(err, ExpressionError::Parse { ref message, .. } if message == "expression nested too deeply"));

        let nots = format!("{}true", "! ".repeat(10_000));
        assert!(Expression::parse(&nots).is_err());
        let negs = format!("{}1 < 0", "-".repeat(10_000));
        assert!(Expression::parse(&negs).is_err());
    }

    #[test]
    fn nesting_within_limit_is_accepted() {
        let nested = format!("{}score > 5{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(eval_bool(&nested, &scope()));
        assert!(eval_bool("not not (score > 5)", &scope()));
    }

    #[test]
    fn long_chains_stay_flat() {
        let chain = vec!["false"; 50_000].join(" or ") + " or score > 5";
        assert!(eval_bool(&chain, &scope()));
        let chain = vec!["true"; 50_000].join(" && ");
        assert!(eval_bool(&chain, &scope()));
    }
}
