//! Expression syntax tree and its printer.
//!
//! The tree is shared by both dialects. Only quoted property names and call
//! argument separators print differently.

use super::lexer::is_plain_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    fn as_char(&self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    N8n,
    Make,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(String),
    Str { value: String, quote: Quote },
    Bool(bool),
    Null,
    Ident(String),
    /// `object.property`. `quoted` marks a name that needs quoting
    /// (back-ticks in Make, `["..."]` in n8n).
    Member {
        object: Box<Expr>,
        property: String,
        quoted: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Group(Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Str {
            value: value.into(),
            quote: Quote::Double,
        }
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        let property = property.into();
        let quoted = !is_plain_identifier(&property) && !is_index_like(&property);
        Expr::Member {
            object: Box::new(object),
            property,
            quoted,
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Integer literal value, if this is one.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Expr::Number(raw) => raw.parse().ok(),
            _ => None,
        }
    }
}

fn is_index_like(property: &str) -> bool {
    !property.is_empty() && property.chars().all(|c| c.is_ascii_digit())
}

pub fn print(expr: &Expr, syntax: Syntax) -> String {
    let mut out = String::new();
    write_expr(expr, syntax, &mut out);
    out
}

fn write_expr(expr: &Expr, syntax: Syntax, out: &mut String) {
    match expr {
        Expr::Number(raw) => out.push_str(raw),
        Expr::Str { value, quote } => {
            let q = quote.as_char();
            out.push(q);
            out.push_str(&escape(value, q));
            out.push(q);
        }
        Expr::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Expr::Null => out.push_str("null"),
        Expr::Ident(name) => out.push_str(name),
        Expr::Member {
            object,
            property,
            quoted,
        } => {
            write_expr(object, syntax, out);
            match (quoted, syntax) {
                (false, _) => {
                    out.push('.');
                    out.push_str(property);
                }
                (true, Syntax::Make) => {
                    out.push_str(".`");
                    out.push_str(property);
                    out.push('`');
                }
                (true, Syntax::N8n) => {
                    out.push_str("[\"");
                    out.push_str(&escape(property, '"'));
                    out.push_str("\"]");
                }
            }
        }
        Expr::Index { object, index } => {
            write_expr(object, syntax, out);
            out.push('[');
            write_expr(index, syntax, out);
            out.push(']');
        }
        Expr::Call { callee, args } => {
            write_expr(callee, syntax, out);
            out.push('(');
            let separator = match syntax {
                Syntax::N8n => ", ",
                Syntax::Make => "; ",
            };
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                write_expr(arg, syntax, out);
            }
            out.push(')');
        }
        Expr::Neg(operand) => {
            out.push('-');
            write_expr(operand, syntax, out);
        }
        Expr::Binary { op, lhs, rhs } => {
            write_expr(lhs, syntax, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_expr(rhs, syntax, out);
        }
        Expr::Group(inner) => {
            out.push('(');
            write_expr(inner, syntax, out);
            out.push(')');
        }
    }
}

fn escape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_member_prints_per_dialect() {
        let expr = Expr::member(Expr::Number("1".into()), "first name");
        assert_eq!(print(&expr, Syntax::Make), "1.`first name`");
        assert_eq!(print(&expr, Syntax::N8n), "1[\"first name\"]");
    }

    #[test]
    fn call_separator_per_dialect() {
        let expr = Expr::call(
            Expr::ident("replace"),
            vec![Expr::ident("a"), Expr::string("x")],
        );
        assert_eq!(print(&expr, Syntax::Make), "replace(a; \"x\")");
        assert_eq!(print(&expr, Syntax::N8n), "replace(a, \"x\")");
    }

    #[test]
    fn strings_are_escaped() {
        let expr = Expr::Str {
            value: "it's".into(),
            quote: Quote::Single,
        };
        assert_eq!(print(&expr, Syntax::N8n), "'it\\'s'");
    }
}
