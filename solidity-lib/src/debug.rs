use core::fmt::Display;

use analysis::domains::*;
use itertools::Itertools;
use log::warn;
use num_bigint::BigInt;

use crate::ast::{ExprKind, Expression};
use crate::error::{Error, Result};
use crate::eval::{Interpreter, MappingKey, index_bounds};
use crate::heap::{Handle, Init, VarKind};
use crate::session::Environment;
use crate::types::SolType;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveScope {
    Global,
    State,
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveAction {
    Add,
    Modify,
    /// Takes back an earlier `Add` or `Modify` of the same variable.
    Delete,
}

/// The right hand side of a directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveValue {
    /// `[lo,hi]`, or a bare number for `[n,n]`.
    Range(BigInt, BigInt),
    /// `any`, only meaningful for booleans.
    Any,
    /// `symbolicAddress 101`
    SymbolicAddress(u64),
    /// `array[v1,v2]`, elements may be nested arrays.
    Array(Vec<DirectiveValue>),
    /// `arrayAddress[101,102]`
    AddressArray(Vec<u64>),
}

/// A value override written in a comment, like
/// `// @StateVar balances[msg.sender] = [10,20];`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub scope: DirectiveScope,
    pub action: DirectiveAction,
    pub target: Expression,
    pub value: Option<DirectiveValue>,
    pub line: u32,
}

fn invalid(text: &str, reason: impl Display) -> Error {
    Error::InvalidDirective(format!("`{text}`: {reason}"))
}

/// Splits at `separator` outside of brackets.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// The part between the outermost brackets of `[...]`.
fn bracketed(text: &str) -> Option<&str> {
    text.trim().strip_prefix('[')?.strip_suffix(']')
}

impl DirectiveValue {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text == "any" {
            return Ok(DirectiveValue::Any);
        }
        if let Some(id) = text.strip_prefix("symbolicAddress") {
            let id = id.trim().parse::<u64>().map_err(|e| invalid(text, e))?;
            return Ok(DirectiveValue::SymbolicAddress(id));
        }
        if let Some(list) = text.strip_prefix("arrayAddress") {
            let items = bracketed(list).ok_or_else(|| invalid(text, "expected `[...]`"))?;
            let ids = split_top_level(items, ',')
                .into_iter()
                .filter(|item| !item.trim().is_empty())
                .map(|item| item.trim().parse::<u64>().map_err(|e| invalid(text, e)))
                .collect::<Result<_>>()?;
            return Ok(DirectiveValue::AddressArray(ids));
        }
        if let Some(list) = text.strip_prefix("array") {
            let items = bracketed(list).ok_or_else(|| invalid(text, "expected `[...]`"))?;
            return Self::parse_list(items).map(DirectiveValue::Array);
        }
        if let Some(items) = bracketed(text) {
            let parts = split_top_level(items, ',');
            let numbers = parts
                .iter()
                .map(|part| part.trim().parse::<BigInt>().ok())
                .collect::<Option<Vec<_>>>();
            return match numbers.as_deref() {
                Some([n]) => Ok(DirectiveValue::Range(n.clone(), n.clone())),
                Some([lo, hi]) => Ok(DirectiveValue::Range(lo.clone(), hi.clone())),
                _ => Self::parse_list(items).map(DirectiveValue::Array),
            };
        }
        let n = text.parse::<BigInt>().map_err(|e| invalid(text, e))?;
        Ok(DirectiveValue::Range(n.clone(), n))
    }

    fn parse_list(items: &str) -> Result<Vec<Self>> {
        split_top_level(items, ',')
            .into_iter()
            .filter(|item| !item.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl Display for DirectiveValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DirectiveValue::Range(lo, hi) => write!(f, "[{lo},{hi}]"),
            DirectiveValue::Any => write!(f, "any"),
            DirectiveValue::SymbolicAddress(id) => write!(f, "symbolicAddress {id}"),
            DirectiveValue::Array(items) => write!(f, "array[{}]", items.iter().join(",")),
            DirectiveValue::AddressArray(ids) => write!(f, "arrayAddress[{}]", ids.iter().join(",")),
        }
    }
}

/// Parses an access path such as `s.items[0]` or `balances[msg.sender]`.
pub fn parse_path(text: &str) -> Result<Expression> {
    let text = text.trim();
    let identifier_end = |from: usize| {
        text[from..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .map_or(text.len(), |end| from + end)
    };
    let end = identifier_end(0);
    if end == 0 {
        return Err(invalid(text, "expected a variable name"));
    }
    let mut expr = Expression::ident(&text[..end]);
    let mut pos = end;
    while pos < text.len() {
        let rest = &text[pos..];
        if rest.starts_with('.') {
            let end = identifier_end(pos + 1);
            if end == pos + 1 {
                return Err(invalid(text, format!("expected a member name after `{}`", &text[..pos])));
            }
            expr = expr.member(&text[pos + 1..end]);
            pos = end;
        } else if rest.starts_with('[') {
            let mut depth = 0usize;
            let close = rest
                .char_indices()
                .find(|(_, c)| {
                    match c {
                        '[' => depth += 1,
                        ']' => depth -= 1,
                        _ => {}
                    }
                    depth == 0
                })
                .map(|(i, _)| i)
                .ok_or_else(|| invalid(text, "unbalanced `[`"))?;
            expr = expr.index(parse_index(&rest[1..close])?);
            pos += close + 1;
        } else {
            return Err(invalid(text, format!("unexpected `{rest}`")));
        }
    }
    Ok(expr)
}

fn parse_index(text: &str) -> Result<Expression> {
    let text = text.trim();
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(Expression::number(text));
    }
    if let Some(string) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Ok(Expression::string(string));
    }
    parse_path(text)
}

impl Directive {
    /// Parses the annotation text. The comment marker and a trailing `;` are
    /// optional. `Delete` directives do not need a value.
    pub fn parse(text: &str, action: DirectiveAction, line: u32) -> Result<Self> {
        let body = text.trim().trim_start_matches("//").trim().trim_end_matches(';').trim();
        let (tag, rest) = body
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid(body, "expected `@<Scope>Var <path> = <value>`"))?;
        let scope = match tag {
            "@GlobalVar" => DirectiveScope::Global,
            "@StateVar" => DirectiveScope::State,
            "@LocalVar" => DirectiveScope::Local,
            tag => return Err(invalid(body, format!("unknown tag `{tag}`"))),
        };
        let parts = split_top_level(rest, '=');
        let (path, value) = match parts.as_slice() {
            [path] => (*path, None),
            [path, value] => (*path, Some(DirectiveValue::parse(value)?)),
            _ => return Err(invalid(body, "more than one `=`")),
        };
        if value.is_none() && action != DirectiveAction::Delete {
            return Err(invalid(body, "missing value"));
        }
        Ok(Self {
            scope,
            action,
            target: parse_path(path)?,
            value,
            line,
        })
    }
}

/// `X` for a directive on `X.length`.
fn length_base(target: &Expression) -> Option<&Expression> {
    match &target.kind {
        ExprKind::MemberAccess { base, member } if member == "length" => Some(base),
        _ => None,
    }
}

impl Interpreter<'_> {
    fn directive_warning(&mut self, line: u32, message: &str) {
        warn!("Skipping debug directive on line {line}: {message}");
        self.session.diag.warning(line, message);
    }

    /// Applies a directive on top of the current state. Problems are
    /// reported as warnings and the directive is skipped. Returns whether it
    /// took effect.
    pub fn apply_directive(&mut self, directive: &Directive, env: &Environment) -> bool {
        let line = directive.line;
        let contract = self.contract;
        let target = &directive.target;
        let root = target.root_identifier().unwrap_or_default();
        let (scope, in_scope) = match directive.scope {
            DirectiveScope::Global => (&contract.globals, contract.globals.contains(&target.to_string()) || length_base(target).is_some_and(|b| contract.globals.contains(&b.to_string()))),
            DirectiveScope::State => (&contract.state, contract.state.contains(root)),
            DirectiveScope::Local => (env, env.contains(root) && env.get(root) != contract.state.get(root)),
        };
        if !in_scope {
            let kind = match directive.scope {
                DirectiveScope::Global => "global",
                DirectiveScope::State => "state",
                DirectiveScope::Local => "local",
            };
            self.directive_warning(line, &format!("`{target}` is not a {kind} variable"));
            return false;
        }

        if let Some(base) = length_base(target) {
            if let Some(array) = self.resolve_lenient(base, scope, env, line) {
                if self.session.heap.array_type(array).is_some() {
                    return self.apply_length(directive, array, line);
                }
            }
        }

        let Some(handle) = self.resolve_lenient(target, scope, env, line) else {
            return false;
        };
        match (&directive.action, &directive.value) {
            (DirectiveAction::Delete, _) => {
                let session = &mut *self.session;
                if session.snapshots.restore(&mut session.heap, handle) {
                    true
                } else {
                    self.directive_warning(line, &format!("nothing to restore for `{target}`"));
                    false
                }
            }
            (_, None) => {
                self.directive_warning(line, &format!("no value for `{target}`"));
                false
            }
            (_, Some(value)) => {
                let session = &mut *self.session;
                let before = session.heap.save_subtree(handle);
                let fresh = session.snapshots.register(&session.heap, handle);
                match self.write_directive(handle, value, line) {
                    Ok(()) => true,
                    Err(message) => {
                        // Undo what was written before the failure.
                        let session = &mut *self.session;
                        session.heap.restore_subtree(before);
                        if fresh {
                            session.snapshots.forget(handle);
                        }
                        self.directive_warning(line, &message);
                        false
                    }
                }
            }
        }
    }

    /// `X.length = [N,N]` resizes the dynamic array `X` to exactly `N`
    /// elements. New elements are Bottom.
    fn apply_length(&mut self, directive: &Directive, array: Handle, line: u32) -> bool {
        let session = &mut *self.session;
        if directive.action == DirectiveAction::Delete {
            if session.snapshots.restore(&mut session.heap, array) {
                return true;
            }
            self.directive_warning(line, &format!("nothing to restore for `{}`", directive.target));
            return false;
        }
        let Some((base, declared)) = session.heap.array_type(array).map(|(base, length)| (base.clone(), length)) else {
            return false;
        };
        let length = match &directive.value {
            Some(DirectiveValue::Range(lo, hi)) if lo == hi => u64::try_from(lo).ok(),
            _ => None,
        };
        let message = match (declared, length) {
            (Some(_), _) => format!("`{}` is a static array, its length is fixed", directive.target),
            (None, None) => format!("the length of `{}` must be a single non negative number", directive.target),
            (None, Some(length)) => {
                let fresh = session.snapshots.register(&session.heap, array);
                match session.heap.resize(array, length, &base, Init::Bottom) {
                    Ok(()) => return true,
                    Err(e) => {
                        if fresh {
                            session.snapshots.restore(&mut session.heap, array);
                        }
                        e.to_string()
                    }
                }
            }
        };
        self.directive_warning(line, &message);
        false
    }

    /// Finds the variable a directive patches. Unlike assignments, a path
    /// that cannot be resolved is only a warning. Missing mapping entries are
    /// created. `scope` holds the variables the path may start from, `env`
    /// is used to evaluate indices.
    pub fn resolve_lenient(&mut self, target: &Expression, scope: &Environment, env: &Environment, line: u32) -> Option<Handle> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let handle = scope.get(name);
                if handle.is_none() {
                    self.directive_warning(line, &format!("unknown variable `{name}`"));
                }
                handle
            }
            ExprKind::MemberAccess { base, member } => {
                if let Some(global) = scope.get(&target.to_string()) {
                    return Some(global);
                }
                let base = self.resolve_lenient(base, scope, env, line)?;
                match self.session.heap.member(base, member) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        self.directive_warning(line, &e.to_string());
                        None
                    }
                }
            }
            ExprKind::IndexAccess { base, index } => {
                let container = self.resolve_lenient(base, scope, env, line)?;
                match self.lenient_index(container, index, env) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        self.directive_warning(line, &e.to_string());
                        None
                    }
                }
            }
            _ => {
                self.directive_warning(line, &format!("`{target}` cannot be patched"));
                None
            }
        }
    }

    fn lenient_index(&mut self, container: Handle, index: &Expression, env: &Environment) -> Result<Handle> {
        if self.session.heap.entries(container).is_some() {
            return match self.mapping_key(index, env)? {
                MappingKey::Exact(key) => self.session.heap.get_or_create(container, &key),
                MappingKey::Range => Err(Error::MalformedAccess(format!("key `{index}` is not a single value"))),
            };
        }
        let value = self.evaluate(index, env)?;
        let position = index_bounds(&value)
            .filter(|(lo, hi)| lo == hi)
            .and_then(|(lo, _)| u64::try_from(&lo).ok())
            .ok_or_else(|| Error::MalformedAccess(format!("index `{index}` is not a single value")))?;
        self.session.heap.get_or_create_element(container, position)
    }

    fn write_directive(&mut self, handle: Handle, value: &DirectiveValue, line: u32) -> core::result::Result<(), String> {
        match value {
            DirectiveValue::Array(items) => {
                let elements = self.directive_elements(handle, items.len())?;
                for (element, item) in elements.into_iter().zip(items) {
                    self.write_directive(element, item, line)?;
                }
                return Ok(());
            }
            DirectiveValue::AddressArray(ids) => {
                let elements = self.directive_elements(handle, ids.len())?;
                for (element, id) in elements.into_iter().zip(ids) {
                    self.write_directive(element, &DirectiveValue::SymbolicAddress(*id), line)?;
                }
                return Ok(());
            }
            _ => {}
        }

        let session = &mut *self.session;
        let slot = session.heap.get(handle);
        let name = slot.identifier.clone();
        let mismatch = || format!("`{value}` cannot be assigned to `{name}` of type {}", slot.ty);
        let domain_error = |e: DomainError| format!("`{value}` does not fit `{name}`: {e}");
        let new = match (value, &slot.ty) {
            (DirectiveValue::Range(lo, hi), SolType::UInt(bits)) => {
                Value::UInt(UIntInterval::try_new(lo.clone(), hi.clone(), *bits).map_err(domain_error)?)
            }
            (DirectiveValue::Range(lo, hi), SolType::Int(bits)) => {
                Value::Int(IntInterval::try_new(lo.clone(), hi.clone(), *bits).map_err(domain_error)?)
            }
            (DirectiveValue::Range(lo, hi), SolType::Named(enum_name)) if session.heap.defs.is_enum(enum_name) => {
                Value::UInt(UIntInterval::try_new(lo.clone(), hi.clone(), 8).map_err(domain_error)?)
            }
            (DirectiveValue::Range(lo, hi), SolType::Bool) => {
                match (u8::try_from(lo), u8::try_from(hi)) {
                    (Ok(lo @ 0..=1), Ok(hi @ 0..=1)) if lo <= hi => Value::Bool(BoolInterval::new(lo, hi)),
                    _ => return Err(mismatch()),
                }
            }
            (DirectiveValue::Range(lo, hi), ty @ (SolType::Address | SolType::FixedBytes(_))) => {
                Value::UInt(UIntInterval::try_new(lo.clone(), hi.clone(), 256).map_err(domain_error)?).convert(ty)
            }
            (DirectiveValue::Any, SolType::Bool) => Value::Bool(BoolInterval::TOP),
            (DirectiveValue::SymbolicAddress(id), SolType::Address | SolType::Named(_)) if !slot.is_composite() => {
                session.addresses.bind_var(&name, *id);
                session.addresses.value_of(*id)
            }
            _ => return Err(mismatch()),
        };
        match &mut session.heap.get_mut(handle).kind {
            VarKind::Global {
                debug_override,
                usage_sites,
                ..
            } => {
                *debug_override = Some(new);
                usage_sites.push(line);
                Ok(())
            }
            _ => session.heap.set_value(handle, new).map_err(|e| e.to_string()),
        }
    }

    /// The first `count` elements of an array. Dynamic arrays are resized to
    /// exactly `count` elements first.
    fn directive_elements(&mut self, array: Handle, count: usize) -> core::result::Result<Vec<Handle>, String> {
        let heap = &mut self.session.heap;
        let name = heap.get(array).identifier.clone();
        let Some((base, declared)) = heap.array_type(array).map(|(base, length)| (base.clone(), length)) else {
            return Err(format!("`{name}` is not an array"));
        };
        match declared {
            Some(length) if count as u64 > length => {
                return Err(format!("{count} values for `{name}` of length {length}"));
            }
            Some(_) => {}
            None => heap.resize(array, count as u64, &base, Init::Bottom).map_err(|e| e.to_string())?,
        }
        Ok(heap
            .elements(array)
            .map(|elements| elements[..count].to_vec())
            .unwrap_or_default())
    }
}
