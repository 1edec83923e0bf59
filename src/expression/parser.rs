//! Recursive-descent parser for expression bodies.
//!
//! Grammar (both dialects):
//!
//! ```text
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/') unary)*
//! unary    := '-' unary | postfix
//! postfix  := primary ('.' name | '[' expr ']' | '(' args ')')*
//! primary  := number | string | ident | '(' expr ')'
//! args     := (expr ((',' | ';') expr)*)?
//! ```

use super::ast::{BinaryOp, Expr};
use super::lexer::{Token, tokenize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{found}' at {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: usize },
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ParseError::UnexpectedToken(describe(tok))),
    }
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
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken(describe(&tok))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    expr = match self.next() {
                        Some(Token::Ident(name)) => Expr::Member {
                            object: Box::new(expr),
                            property: name,
                            quoted: false,
                        },
                        Some(Token::Number(raw)) => Expr::Member {
                            object: Box::new(expr),
                            property: raw,
                            quoted: false,
                        },
                        Some(Token::Backtick(name)) => Expr::Member {
                            object: Box::new(expr),
                            property: name,
                            quoted: true,
                        },
                        Some(tok) => return Err(ParseError::UnexpectedToken(describe(&tok))),
                        None => return Err(ParseError::UnexpectedEnd),
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.expr()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::index(expr, index);
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.args()?;
                    expr = Expr::call(expr, args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) | Some(Token::Semicolon) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(tok) => return Err(ParseError::UnexpectedToken(describe(&tok))),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Number(raw)) => Ok(Expr::Number(raw)),
            Some(Token::Str { value, quote }) => Ok(Expr::Str { value, quote }),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                _ => Expr::Ident(name),
            }),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            Some(tok) => Err(ParseError::UnexpectedToken(describe(&tok))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Number(raw) => format!("number '{}'", raw),
        Token::Str { value, .. } => format!("string \"{}\"", value),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Backtick(name) => format!("key `{}`", name),
        Token::Dot => "'.'".into(),
        Token::LBracket => "'['".into(),
        Token::RBracket => "']'".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Semicolon => "';'".into(),
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
    }
}
