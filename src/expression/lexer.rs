//! Tokenizer for expression bodies (the text between `{{` and `}}`).
//!
//! One token set covers both dialects: n8n writes `$json["a b"]` and separates
//! call arguments with `,`; Make writes ``1.`a b` `` and separates with `;`.

use super::ast::Quote;
use super::parser::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Raw literal text, kept verbatim so printing reproduces it.
    Number(String),
    Str { value: String, quote: Quote },
    Ident(String),
    /// Make's back-tick quoted property name.
    Backtick(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Star,
    Slash,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
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
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
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
            '"' | '\'' => {
                let quote = if c == '"' { Quote::Double } else { Quote::Single };
                let (value, next) = read_quoted(&chars, i + 1, c)?;
                tokens.push(Token::Str { value, quote });
                i = next;
            }
            '`' => {
                let (value, next) = read_quoted(&chars, i + 1, '`')?;
                tokens.push(Token::Backtick(value));
                i = next;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                // `1.5` is a decimal, `1.name` is a module path.
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ParseError::UnexpectedChar {
                    found: other,
                    position: i,
                });
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &[char], mut i: usize, close: char) -> Result<(String, usize), ParseError> {
    let start = i;
    let mut value = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && close != '`' {
            let Some(&escaped) = chars.get(i + 1) else {
                break;
            };
            value.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            i += 2;
            continue;
        }
        if c == close {
            return Ok((value, i + 1));
        }
        value.push(c);
        i += 1;
    }
    Err(ParseError::UnterminatedString { position: start - 1 })
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// True when `name` can be written as a bare `.name` property access.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}
