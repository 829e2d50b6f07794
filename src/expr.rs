//! Expression language.
//!
//! ```text
//! expr    := primary ( '+' primary )*
//! primary := 'literal' | [ 'a', 'b' ] | name '(' expr, ... ')' | path | '(' expr ')'
//! ```

use crate::error::{CompileError, EvalError};
use crate::functions::{concat, ArgInfo, Builtin, Runtime};
use crate::path::{Path, Resolver, Scope};
use crate::value::{Shape, Value};
use tracing::trace;

/// Type-checked expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Literal(Value),
    Path(Path),
    Call {
        func: Builtin,
        args: Vec<Expr>,
        shape: Shape,
    },
    Concat(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse and type-check an expression
    pub(crate) fn compile(text: &str, scope: &dyn Scope) -> Result<Self, CompileError> {
        let tokens = lex(text)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            scope,
        };
        let expr = parser.expr()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(CompileError::Expression(format!(
                "unexpected {} in {text:?}",
                token.describe()
            )));
        }
        Ok(expr)
    }

    pub(crate) fn shape(&self) -> Shape {
        match self {
            Self::Literal(value) => value.shape(),
            Self::Path(path) => path.shape(),
            Self::Call { shape, .. } => *shape,
            Self::Concat(left, right) => {
                if left.shape() == Shape::Scalar && right.shape() == Shape::Scalar {
                    Shape::Scalar
                } else {
                    Shape::List
                }
            }
        }
    }

    pub(crate) fn eval(
        &self,
        resolver: &Resolver<'_>,
        runtime: &Runtime<'_>,
    ) -> Result<Value, EvalError> {
        let value = match self {
            Self::Literal(value) => return Ok(value.clone()),
            Self::Path(path) => {
                let value = path.resolve(resolver)?;
                trace!("Resolved {} to {} item(s)", path.as_str(), value.len());
                value
            }
            Self::Call { func, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(resolver, runtime))
                    .collect::<Result<Vec<_>, _>>()?;
                func.call(args, runtime)
            }
            Self::Concat(left, right) => concat(
                left.eval(resolver, runtime)?,
                right.eval(resolver, runtime)?,
            ),
        };

        if let Value::List(items) = &value
            && items.len() > runtime.max_list_items
        {
            return Err(EvalError::LimitExceeded {
                len: items.len(),
                limit: runtime.max_list_items,
            });
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'x> {
    Path(&'x str),
    Call(&'x str),
    Str(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Plus,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Path(path) => format!("path {path}"),
            Token::Call(name) => format!("call to {name}"),
            Token::Str(s) => format!("literal '{s}'"),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Plus => "'+'".to_string(),
        }
    }
}

fn lex(text: &str) -> Result<Vec<Token<'_>>, CompileError> {
    let invalid = |details: String| CompileError::Expression(format!("{details} in {text:?}"));
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            ch if ch.is_whitespace() => {}
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            '+' => tokens.push(Token::Plus),
            '\'' | '"' => {
                let quote = ch;
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        ch if ch == quote => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(invalid("unterminated literal".to_string()));
                }
                tokens.push(Token::Str(value));
            }
            ch if ch.is_ascii_alphabetic() || ch == '_' => {
                let mut end = start + ch.len_utf8();
                while let Some(&(pos, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':') {
                        end = pos + ch.len_utf8();
                        chars.next();
                    } else if ch == '[' {
                        // Selector attached to the path: [*] or [n]
                        let close = text[pos..]
                            .find(']')
                            .ok_or_else(|| invalid("unclosed '['".to_string()))?;
                        end = pos + close + 1;
                        while chars.peek().is_some_and(|&(pos, _)| pos < end) {
                            chars.next();
                        }
                    } else {
                        break;
                    }
                }

                let word = &text[start..end];
                let is_call = word.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
                    && text[end..].trim_start().starts_with('(');
                tokens.push(if is_call {
                    Token::Call(word)
                } else {
                    Token::Path(word)
                });
            }
            ch => return Err(invalid(format!("unexpected character {ch:?}"))),
        }
    }

    Ok(tokens)
}

struct Parser<'t, 'x> {
    tokens: &'t [Token<'x>],
    pos: usize,
    scope: &'t dyn Scope,
}

impl<'t, 'x> Parser<'t, 'x> {
    fn next(&mut self) -> Option<&'t Token<'x>> {
        let token = self.tokens.get(self.pos);
        self.pos += usize::from(token.is_some());
        token
    }

    fn peek(&self) -> Option<&'t Token<'x>> {
        self.tokens.get(self.pos)
    }

    fn expect(&mut self, expected: &Token<'_>) -> Result<(), CompileError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(CompileError::Expression(format!(
                "expected {} but found {}",
                expected.describe(),
                token.describe()
            ))),
            None => Err(CompileError::Expression(format!(
                "expected {} but found end of expression",
                expected.describe()
            ))),
        }
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            let right = self.primary()?;
            expr = Expr::Concat(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let Some(token) = self.next().cloned() else {
            return Err(CompileError::Expression(
                "expected a value but found end of expression".to_string(),
            ));
        };

        match token {
            Token::Str(value) => Ok(Expr::Literal(Value::Scalar(value))),
            Token::Path(text) => Ok(Expr::Path(Path::compile(text, self.scope)?)),
            Token::LParen => {
                let expr = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.pos += 1;
                    return Ok(Expr::Literal(Value::List(items)));
                }
                loop {
                    match self.next().cloned() {
                        Some(Token::Str(item)) => items.push(item),
                        other => {
                            return Err(CompileError::Expression(format!(
                                "list items must be literals, found {}",
                                other
                                    .as_ref()
                                    .map_or_else(|| "end of expression".to_string(), Token::describe)
                            )));
                        }
                    }
                    match self.next() {
                        Some(Token::Comma) => {}
                        Some(Token::RBracket) => break,
                        _ => {
                            return Err(CompileError::Expression(
                                "expected ',' or ']' in list".to_string(),
                            ));
                        }
                    }
                }
                Ok(Expr::Literal(Value::List(items)))
            }
            Token::Call(name) => self.call(name),
            token => Err(CompileError::Expression(format!(
                "expected a value but found {}",
                token.describe()
            ))),
        }
    }

    fn call(&mut self, name: &'x str) -> Result<Expr, CompileError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expr()?);
                match self.next() {
                    Some(Token::Comma) => {}
                    Some(Token::RParen) => break,
                    _ => {
                        return Err(CompileError::Expression(format!(
                            "expected ',' or ')' in call to {name}"
                        )));
                    }
                }
            }
        }

        let info: Vec<ArgInfo<'_>> = args
            .iter()
            .map(|arg| ArgInfo {
                shape: arg.shape(),
                literal: match arg {
                    Expr::Literal(Value::Scalar(s)) => Some(s.as_str()),
                    _ => None,
                },
            })
            .collect();
        let (func, runtime_args) = Builtin::compile(name, &info)?;
        let shape = func.output(args[0].shape());
        args.truncate(runtime_args);

        Ok(Expr::Call { func, args, shape })
    }
}
