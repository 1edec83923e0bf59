//! Cross-platform expression rewriting.
//!
//! n8n writes `={{ $json.user.email }}`, Make writes `{{1.user.email}}`. The
//! rewrite parses the body once, maps references and known functions onto the
//! other dialect's tree, and prints it back. Anything without a counterpart is
//! left exactly as written and reported for review.

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Syntax, print};
use super::functions::{KnownFunction, match_make_call, match_n8n_call};
use super::parser::parse;
use super::template::{TemplatePart, expression_body, split_template};
use crate::platform::Direction;

/// What the rewrite needs to know about the surrounding workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    /// Module that `$json` refers to (the node's first upstream module).
    pub module_ref: u32,
    /// n8n node name -> Make module id.
    pub module_ids: HashMap<String, u32>,
    /// Make module id -> n8n node name.
    pub node_names: HashMap<u32, String>,
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self {
            module_ref: 1,
            module_ids: HashMap::new(),
            node_names: HashMap::new(),
        }
    }
}

impl RewriteContext {
    pub fn with_module_ref(mut self, module_ref: u32) -> Self {
        self.module_ref = module_ref;
        self
    }

    /// Registers one node under both its n8n name and its Make id.
    pub fn with_node(mut self, name: impl Into<String>, id: u32) -> Self {
        let name = name.into();
        self.module_ids.insert(name.clone(), id);
        self.node_names.insert(id, name);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub output: String,
    /// Set when the input was passed through because part of it has no
    /// counterpart on the other platform.
    pub review: Option<String>,
}

impl Translation {
    fn unchanged(input: &str) -> Self {
        Translation {
            output: input.to_string(),
            review: None,
        }
    }

    fn flagged(input: &str, reason: String) -> Self {
        Translation {
            output: input.to_string(),
            review: Some(reason),
        }
    }
}

/// One path step after the root of a reference chain.
enum Segment<'a> {
    Key(String),
    Position(u64),
    Computed(&'a Expr),
}

/// Splits `root.a["b"][0]` into its root and steps.
fn split_path(expr: &Expr) -> (&Expr, Vec<Segment<'_>>) {
    let mut segments = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Member {
                object, property, ..
            } => {
                segments.push(Segment::Key(property.clone()));
                current = object;
            }
            Expr::Index { object, index } => {
                let segment = match index.as_ref() {
                    Expr::Str { value, .. } => Segment::Key(value.clone()),
                    other => match other.as_integer() {
                        Some(n) => Segment::Position(n),
                        None => Segment::Computed(other),
                    },
                };
                segments.push(segment);
                current = object;
            }
            _ => break,
        }
    }
    segments.reverse();
    (current, segments)
}

pub struct Translator {
    direction: Direction,
    ctx: RewriteContext,
}

impl Translator {
    pub fn new(direction: Direction, ctx: RewriteContext) -> Self {
        Self { direction, ctx }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn context(&self) -> &RewriteContext {
        &self.ctx
    }

    /// Rewrites a parameter string. Strings without `{{ }}` come back as-is.
    pub fn translate(&self, input: &str) -> Translation {
        if let Some(body) = expression_body(input) {
            if self.direction == Direction::MakeToN8n && input.trim_start().starts_with('=') {
                return Translation::unchanged(input);
            }
            return match self.rewrite_body(body) {
                Ok(Rewritten::Expr(text)) => Translation {
                    output: self.delimit(&text),
                    review: None,
                },
                Ok(Rewritten::Template(parts)) => Translation {
                    output: self.join_template(&parts),
                    review: None,
                },
                Err(reason) => Translation::flagged(input, reason),
            };
        }

        let trimmed = input.trim_start();
        let text = match self.direction {
            Direction::N8nToMake => trimmed.strip_prefix('=').unwrap_or(input),
            Direction::MakeToN8n if trimmed.starts_with('=') => return Translation::unchanged(input),
            Direction::MakeToN8n => input,
        };
        let parts = split_template(text);
        if !parts.iter().any(|p| matches!(p, TemplatePart::Expr(_))) {
            return Translation::unchanged(input);
        }

        let mut rewritten = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Lit(lit) => rewritten.push(TemplatePart::Lit(lit)),
                TemplatePart::Expr(body) => match self.rewrite_body(&body) {
                    Ok(Rewritten::Expr(text)) => rewritten.push(TemplatePart::Expr(text)),
                    Ok(Rewritten::Template(inner)) => rewritten.extend(inner),
                    Err(reason) => return Translation::flagged(input, reason),
                },
            }
        }
        Translation {
            output: self.join_template(&rewritten),
            review: None,
        }
    }

    fn delimit(&self, body: &str) -> String {
        match self.direction {
            Direction::N8nToMake => format!("{{{{{}}}}}", body),
            Direction::MakeToN8n => format!("={{{{ {} }}}}", body),
        }
    }

    fn join_template(&self, parts: &[TemplatePart]) -> String {
        let mut out = String::new();
        if self.direction == Direction::MakeToN8n {
            out.push('=');
        }
        for part in parts {
            match (part, self.direction) {
                (TemplatePart::Lit(lit), _) => out.push_str(lit),
                (TemplatePart::Expr(body), Direction::N8nToMake) => {
                    out.push_str("{{");
                    out.push_str(body);
                    out.push_str("}}");
                }
                (TemplatePart::Expr(body), Direction::MakeToN8n) => {
                    out.push_str("{{ ");
                    out.push_str(body);
                    out.push_str(" }}");
                }
            }
        }
        out
    }

    fn rewrite_body(&self, body: &str) -> Result<Rewritten, String> {
        let expr = parse(body).map_err(|e| format!("could not parse expression: {}", e))?;
        match self.direction {
            Direction::N8nToMake => {
                if let Some(operands) = string_concat(&expr) {
                    let mut parts = Vec::with_capacity(operands.len());
                    for operand in operands {
                        match operand {
                            Expr::Str { value, .. } => parts.push(TemplatePart::Lit(value.clone())),
                            other => {
                                let make = self.to_make(other)?;
                                parts.push(TemplatePart::Expr(print(&make, Syntax::Make)));
                            }
                        }
                    }
                    return Ok(Rewritten::Template(parts));
                }
                let make = self.to_make(&expr)?;
                Ok(Rewritten::Expr(print(&make, Syntax::Make)))
            }
            Direction::MakeToN8n => {
                let n8n = self.to_n8n(&expr)?;
                Ok(Rewritten::Expr(print(&n8n, Syntax::N8n)))
            }
        }
    }

    fn to_make(&self, expr: &Expr) -> Result<Expr, String> {
        if let Some(reference) = self.n8n_reference(expr)? {
            return Ok(reference);
        }
        match expr {
            Expr::Number(_) | Expr::Str { .. } | Expr::Bool(_) | Expr::Null => Ok(expr.clone()),
            Expr::Ident(name) if name == "$now" => Ok(Expr::ident("now")),
            Expr::Ident(name) => Err(format!("'{}' has no Make equivalent", name)),
            Expr::Member { .. } | Expr::Index { .. } => {
                Err(format!("'{}' has no Make equivalent", print(expr, Syntax::N8n)))
            }
            Expr::Call { callee, args } => {
                let Some((func, operands)) = match_n8n_call(callee, args) else {
                    return Err(format!(
                        "function '{}' has no Make equivalent",
                        print(callee, Syntax::N8n)
                    ));
                };
                self.call(func, &operands, |e| self.to_make(e), Syntax::Make)
            }
            Expr::Neg(inner) => Ok(Expr::Neg(Box::new(self.to_make(inner)?))),
            Expr::Group(inner) => Ok(Expr::Group(Box::new(self.to_make(inner)?))),
            Expr::Binary { op, lhs, rhs } => Ok(Expr::Binary {
                op: *op,
                lhs: Box::new(self.to_make(lhs)?),
                rhs: Box::new(self.to_make(rhs)?),
            }),
        }
    }

    /// `$json.x`, `$input.item.json.x`, `$node["A"].json.x`, `$('A').item.json.x`
    /// and `$('A').first().json.x` become `<id>.x`. `Ok(None)` when the
    /// expression is not a reference chain.
    fn n8n_reference(&self, expr: &Expr) -> Result<Option<Expr>, String> {
        let (root, segments) = split_path(expr);
        let (module, skip) = match root {
            Expr::Ident(name) if name == "$json" => (self.ctx.module_ref, 0),
            Expr::Ident(name) if name == "$input" => {
                if !starts_with_keys(&segments, &["item", "json"]) {
                    return Ok(None);
                }
                (self.ctx.module_ref, 2)
            }
            Expr::Ident(name) if name == "$node" => {
                let Some(Segment::Key(node)) = segments.first() else {
                    return Ok(None);
                };
                if !starts_with_keys(&segments[1..], &["json"]) {
                    return Err(format!("'$node[\"{}\"]' without '.json' has no Make equivalent", node));
                }
                (self.module_id(node)?, 2)
            }
            Expr::Call { callee, args } => match named_node_call(callee, args) {
                Some((node, NodeAccess::Item)) => {
                    if !starts_with_keys(&segments, &["item", "json"]) {
                        return Ok(None);
                    }
                    (self.module_id(node)?, 2)
                }
                Some((node, NodeAccess::First)) => {
                    if !starts_with_keys(&segments, &["json"]) {
                        return Ok(None);
                    }
                    (self.module_id(node)?, 1)
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        if segments.len() == skip {
            return Err(format!(
                "'{}' without a field has no Make equivalent",
                print(expr, Syntax::N8n)
            ));
        }
        let mut out = Expr::Number(module.to_string());
        for segment in &segments[skip..] {
            out = match segment {
                Segment::Key(key) => Expr::member(out, key.as_str()),
                Segment::Position(n) => Expr::index(out, Expr::Number((n + 1).to_string())),
                Segment::Computed(e) => {
                    return Err(format!(
                        "computed index '[{}]' has no Make equivalent",
                        print(e, Syntax::N8n)
                    ));
                }
            };
        }
        Ok(Some(out))
    }

    fn module_id(&self, node: &str) -> Result<u32, String> {
        self.ctx
            .module_ids
            .get(node)
            .copied()
            .ok_or_else(|| format!("node '{}' is not part of this workflow", node))
    }

    fn to_n8n(&self, expr: &Expr) -> Result<Expr, String> {
        let (root, segments) = split_path(expr);
        if let (Some(id), false) = (root.as_integer(), segments.is_empty()) {
            return self.make_reference(id, &segments);
        }
        match expr {
            Expr::Number(_) | Expr::Str { .. } | Expr::Bool(_) | Expr::Null => Ok(expr.clone()),
            Expr::Ident(name) if name == "now" => Ok(Expr::ident("$now")),
            Expr::Ident(name) => Err(format!("'{}' has no n8n equivalent", name)),
            Expr::Member { .. } | Expr::Index { .. } => {
                Err(format!("'{}' has no n8n equivalent", print(expr, Syntax::Make)))
            }
            Expr::Call { callee, args } => {
                let Some((func, operands)) = match_make_call(callee, args) else {
                    return Err(format!(
                        "function '{}' has no n8n equivalent",
                        print(callee, Syntax::Make)
                    ));
                };
                self.call(func, &operands, |e| self.to_n8n(e), Syntax::N8n)
            }
            Expr::Neg(inner) => Ok(Expr::Neg(Box::new(self.to_n8n(inner)?))),
            Expr::Group(inner) => Ok(Expr::Group(Box::new(self.to_n8n(inner)?))),
            Expr::Binary { op, lhs, rhs } => Ok(Expr::Binary {
                op: *op,
                lhs: Box::new(self.to_n8n(lhs)?),
                rhs: Box::new(self.to_n8n(rhs)?),
            }),
        }
    }

    /// `<id>.x` becomes `$json.x` for the upstream module and
    /// `$node["Name"].json.x` for any other known module.
    fn make_reference(&self, id: u64, segments: &[Segment<'_>]) -> Result<Expr, String> {
        let name = u32::try_from(id)
            .ok()
            .filter(|id| *id != self.ctx.module_ref)
            .and_then(|id| self.ctx.node_names.get(&id));
        let mut out = match name {
            Some(name) => Expr::member(
                Expr::index(Expr::ident("$node"), Expr::string(name.as_str())),
                "json",
            ),
            None => Expr::ident("$json"),
        };
        for segment in segments {
            out = match segment {
                Segment::Key(key) => Expr::member(out, key.as_str()),
                Segment::Position(n) => {
                    Expr::index(out, Expr::Number(n.saturating_sub(1).to_string()))
                }
                Segment::Computed(e) => {
                    return Err(format!(
                        "computed index '[{}]' has no n8n equivalent",
                        print(e, Syntax::Make)
                    ));
                }
            };
        }
        Ok(out)
    }

    fn call(
        &self,
        func: KnownFunction,
        operands: &[&Expr],
        convert: impl Fn(&Expr) -> Result<Expr, String>,
        target: Syntax,
    ) -> Result<Expr, String> {
        if operands.len() != func.arity() {
            return Err(format!(
                "'{}' expects {} argument(s), got {}",
                func.make_name(),
                func.arity(),
                operands.len()
            ));
        }
        let args = operands
            .iter()
            .map(|e| convert(e))
            .collect::<Result<Vec<_>, _>>()?;
        let callee = match target {
            Syntax::Make => Expr::ident(func.make_name()),
            Syntax::N8n => Expr::member(Expr::ident(func.n8n_namespace()), func.make_name()),
        };
        Ok(Expr::call(callee, args))
    }
}

enum Rewritten {
    Expr(String),
    Template(Vec<TemplatePart>),
}

enum NodeAccess {
    Item,
    First,
}

/// `$('A')` or `$('A').first()`.
fn named_node_call<'a>(callee: &'a Expr, args: &'a [Expr]) -> Option<(&'a str, NodeAccess)> {
    match (callee, args) {
        (Expr::Ident(name), [Expr::Str { value, .. }]) if name == "$" => {
            Some((value.as_str(), NodeAccess::Item))
        }
        (
            Expr::Member {
                object, property, ..
            },
            [],
        ) if property == "first" => match object.as_ref() {
            Expr::Call { callee, args } => match named_node_call(callee, args) {
                Some((name, NodeAccess::Item)) => Some((name, NodeAccess::First)),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

fn starts_with_keys(segments: &[Segment<'_>], keys: &[&str]) -> bool {
    segments.len() >= keys.len()
        && segments
            .iter()
            .zip(keys)
            .all(|(segment, key)| matches!(segment, Segment::Key(k) if k == key))
}

/// Operands of a top-level `+` chain that contains a string literal.
fn string_concat(expr: &Expr) -> Option<Vec<&Expr>> {
    fn flatten<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } => {
                flatten(lhs, out);
                flatten(rhs, out);
            }
            other => out.push(other),
        }
    }
    if !matches!(expr, Expr::Binary { op: BinaryOp::Add, .. }) {
        return None;
    }
    let mut operands = Vec::new();
    flatten(expr, &mut operands);
    // Evaluation is left-to-right, so two operands ahead of the first literal
    // would still add numerically.
    match operands.iter().position(|e| matches!(e, Expr::Str { .. })) {
        Some(first_literal) if first_literal <= 1 => Some(operands),
        _ => None,
    }
}

/// Rewrites one parameter string in the given direction.
pub fn translate_expression(input: &str, direction: Direction, ctx: &RewriteContext) -> Translation {
    Translator::new(direction, ctx.clone()).translate(input)
}

pub fn convert_n8n_to_make_expression(input: &str, ctx: &RewriteContext) -> String {
    translate_expression(input, Direction::N8nToMake, ctx).output
}

pub fn convert_make_to_n8n_expression(input: &str, ctx: &RewriteContext) -> String {
    translate_expression(input, Direction::MakeToN8n, ctx).output
}
