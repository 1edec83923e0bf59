//! Catalog of functions both platforms understand.

use serde_json::Value;

use super::ast::Expr;
use super::eval::to_display_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownFunction {
    Upper,
    Lower,
    Trim,
    Replace,
    First,
}

const ALL: [KnownFunction; 5] = [
    KnownFunction::Upper,
    KnownFunction::Lower,
    KnownFunction::Trim,
    KnownFunction::Replace,
    KnownFunction::First,
];

impl KnownFunction {
    /// Make spelling: `upper(1.name)`.
    pub fn make_name(&self) -> &'static str {
        match self {
            KnownFunction::Upper => "upper",
            KnownFunction::Lower => "lower",
            KnownFunction::Trim => "trim",
            KnownFunction::Replace => "replace",
            KnownFunction::First => "first",
        }
    }

    /// n8n helper namespace: `$str.upper(...)`, `$arr.first(...)`.
    pub fn n8n_namespace(&self) -> &'static str {
        match self {
            KnownFunction::First => "$arr",
            _ => "$str",
        }
    }

    /// JavaScript method spelling accepted on the n8n side.
    fn js_method(&self) -> &'static str {
        match self {
            KnownFunction::Upper => "toUpperCase",
            KnownFunction::Lower => "toLowerCase",
            KnownFunction::Trim => "trim",
            KnownFunction::Replace => "replace",
            KnownFunction::First => "first",
        }
    }

    pub fn from_make_name(name: &str) -> Option<Self> {
        ALL.into_iter().find(|f| f.make_name() == name)
    }

    fn from_namespaced(namespace: &str, name: &str) -> Option<Self> {
        ALL.into_iter()
            .find(|f| f.n8n_namespace() == namespace && f.make_name() == name)
    }

    fn from_js_method(name: &str) -> Option<Self> {
        ALL.into_iter().find(|f| f.js_method() == name)
    }

    /// Number of arguments, receiver included.
    pub fn arity(&self) -> usize {
        match self {
            KnownFunction::Replace => 3,
            _ => 1,
        }
    }

    pub fn apply(&self, args: &[Value]) -> Value {
        let Some(subject) = args.first() else {
            return Value::Null;
        };
        match self {
            KnownFunction::First => match subject {
                Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            },
            _ if subject.is_null() => Value::Null,
            KnownFunction::Upper => Value::String(to_display_string(subject).to_uppercase()),
            KnownFunction::Lower => Value::String(to_display_string(subject).to_lowercase()),
            KnownFunction::Trim => Value::String(to_display_string(subject).trim().to_string()),
            KnownFunction::Replace => {
                let text = to_display_string(subject);
                let (Some(from), Some(to)) = (args.get(1), args.get(2)) else {
                    return Value::String(text);
                };
                let from = to_display_string(from);
                if from.is_empty() {
                    return Value::String(text);
                }
                Value::String(text.replace(&from, &to_display_string(to)))
            }
        }
    }
}

/// Recognizes a Make call `upper(x)` and returns the function with its
/// arguments.
pub fn match_make_call<'a>(callee: &Expr, args: &'a [Expr]) -> Option<(KnownFunction, Vec<&'a Expr>)> {
    let Expr::Ident(name) = callee else {
        return None;
    };
    let func = KnownFunction::from_make_name(name)?;
    Some((func, args.iter().collect()))
}

/// Recognizes an n8n call, either `$str.upper(x)` or the method form
/// `x.toUpperCase()`, and returns the function with the receiver moved into
/// the first argument.
pub fn match_n8n_call<'a>(
    callee: &'a Expr,
    args: &'a [Expr],
) -> Option<(KnownFunction, Vec<&'a Expr>)> {
    let Expr::Member {
        object, property, ..
    } = callee
    else {
        return None;
    };
    if let Expr::Ident(namespace) = object.as_ref() {
        if namespace.starts_with('$') {
            let func = KnownFunction::from_namespaced(namespace, property)?;
            return Some((func, args.iter().collect()));
        }
    }
    let func = KnownFunction::from_js_method(property)?;
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(object.as_ref());
    all.extend(args.iter());
    Some((func, all))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;
    use serde_json::json;

    fn n8n(src: &str) -> Option<(KnownFunction, usize)> {
        match parse(src).ok()? {
            Expr::Call { callee, args } => {
                let (func, all) = match_n8n_call(&callee, &args)?;
                Some((func, all.len()))
            }
            _ => None,
        }
    }

    #[test]
    fn recognizes_namespaced_and_method_forms() {
        assert_eq!(n8n("$str.upper($json.a)"), Some((KnownFunction::Upper, 1)));
        assert_eq!(n8n("$json.a.toLowerCase()"), Some((KnownFunction::Lower, 1)));
        assert_eq!(n8n("$json.a.replace('x', 'y')"), Some((KnownFunction::Replace, 3)));
        assert_eq!(n8n("$arr.first($json.items)"), Some((KnownFunction::First, 1)));
        assert_eq!(n8n("$str.first($json.items)"), None);
        assert_eq!(n8n("$json.a.padStart(3)"), None);
    }

    #[test]
    fn applies_string_functions() {
        assert_eq!(KnownFunction::Upper.apply(&[json!("abc")]), json!("ABC"));
        assert_eq!(KnownFunction::Trim.apply(&[json!("  a ")]), json!("a"));
        assert_eq!(
            KnownFunction::Replace.apply(&[json!("banana"), json!("a"), json!("o")]),
            json!("bonono")
        );
        assert_eq!(KnownFunction::Upper.apply(&[Value::Null]), Value::Null);
    }

    #[test]
    fn first_reads_arrays_only() {
        assert_eq!(KnownFunction::First.apply(&[json!([3, 4])]), json!(3));
        assert_eq!(KnownFunction::First.apply(&[json!([])]), Value::Null);
        assert_eq!(KnownFunction::First.apply(&[json!("abc")]), Value::Null);
    }
}
