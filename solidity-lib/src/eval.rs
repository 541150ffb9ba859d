use analysis::domains::*;
use log::{debug, warn};
use num_bigint::BigInt;

use crate::ast::{Argument, BinaryOp, ExprKind, Expression, Literal, UnaryOp};
use crate::cfg::FunctionCfg;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::factory::ContractCfg;
use crate::heap::{Handle, Init, Scope, VarKind};
use crate::session::{Environment, Session};
use crate::types::SolType;
use crate::value::Value;

/// Where an expression is evaluated. Inside an access chain an identifier
/// stands for the variable itself, or for a namespace like `msg`, so the
/// enclosing access can continue from it. At the top level it is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallerContext {
    None,
    IndexAccess,
    MemberAccess,
}

/// The context together with the composite variable being accessed, if the
/// base of the access turned out to be one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub context: CallerContext,
    pub object: Option<Handle>,
}

impl Caller {
    pub fn top() -> Self {
        Self {
            context: CallerContext::None,
            object: None,
        }
    }

    pub fn new(context: CallerContext, object: Option<Handle>) -> Self {
        Self { context, object }
    }
}

/// Key of a mapping access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MappingKey {
    Exact(String),
    /// The key is not known precisely, any entry could be meant.
    Range,
}

/// Parses a number literal, scaled by `multiplier`. Accepts hex, decimals
/// with a fractional part and scientific notation. Fractions that remain
/// after scaling are truncated.
pub fn parse_number(text: &str, multiplier: u64) -> Option<BigInt> {
    let text = text.replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return BigInt::parse_bytes(hex.as_bytes(), 16).map(|n| n * multiplier);
    }
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().ok()?),
        None => (text.as_str(), 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits: BigInt = format!("{int}{frac}").parse().ok()?;
    let scale = exponent - i64::try_from(frac.len()).ok()?;
    let ten = BigInt::from(10u8);
    let value = digits * multiplier;
    Some(if scale >= 0 {
        value * ten.pow(u32::try_from(scale).ok()?)
    } else {
        value / ten.pow(u32::try_from(-scale).ok()?)
    })
}

fn literal_value(literal: &Literal) -> Result<Value> {
    Ok(match literal {
        Literal::Number(text) => {
            let number = parse_number(text, 1).ok_or_else(|| Error::Unsupported(format!("number literal `{text}`")))?;
            Value::UInt(UIntInterval::singleton(number, 256))
        }
        Literal::Bool(true) => Value::Bool(BoolInterval::TRUE),
        Literal::Bool(false) => Value::Bool(BoolInterval::FALSE),
        Literal::Str(_) => Value::Symbolic(literal.to_string()),
        Literal::Hex(digits) => {
            let width = digits.len() / 2;
            match (u8::try_from(width), BigInt::parse_bytes(digits.as_bytes(), 16)) {
                (Ok(width @ 1..=32), Some(number)) => match number.to_biguint() {
                    Some(number) => Value::Bytes(BytesSet::of(width, number)),
                    None => Value::Symbolic(literal.to_string()),
                },
                _ => Value::Symbolic(literal.to_string()),
            }
        }
    })
}

/// The key a literal index stands for. Number literals are normalized so
/// `0x01` and `1` address the same entry.
fn literal_key(literal: &Literal) -> String {
    match literal {
        Literal::Number(text) => parse_number(text, 1).map_or_else(|| text.clone(), |n| n.to_string()),
        literal => literal.to_string(),
    }
}

/// Bounds of an index value, `None` if it is not a number or empty.
pub(crate) fn index_bounds(index: &Value) -> Option<(BigInt, BigInt)> {
    let bounds = match index {
        Value::UInt(i) => i.bounds(),
        Value::Int(i) => i.bounds(),
        _ => None,
    };
    bounds.map(|(lo, hi)| (lo.clone(), hi.clone()))
}

/// Evaluates expressions of one function activation. Calls to user
/// functions go through the engine, which creates a new interpreter for the
/// callee on the same session.
pub struct Interpreter<'a> {
    pub(crate) contract: &'a ContractCfg,
    pub(crate) session: &'a mut Session,
    pub(crate) engine: &'a mut dyn Engine,
    /// Source line of the statement being interpreted, used for records
    /// and diagnostics.
    pub line: u32,
    /// Set once `require`, `assert` or `revert` definitely fails.
    pub(crate) reverted: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(contract: &'a ContractCfg, session: &'a mut Session, engine: &'a mut dyn Engine) -> Self {
        Self {
            contract,
            session,
            engine,
            line: 0,
            reverted: false,
        }
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Reads the value of `expr`. Composite results are returned as
    /// references to the heap.
    pub fn evaluate(&mut self, expr: &Expression, env: &Environment) -> Result<Value> {
        self.eval(expr, env, Caller::top())
    }

    pub(crate) fn eval(&mut self, expr: &Expression, env: &Environment, caller: Caller) -> Result<Value> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.identifier(name, env, caller),
            ExprKind::Literal(literal) => literal_value(literal),
            ExprKind::MemberAccess { base, member } => {
                let base = self.eval(base, env, Caller::new(CallerContext::MemberAccess, None))?;
                let caller = Caller::new(CallerContext::MemberAccess, base.as_object());
                self.member(&base, member, env, caller)
            }
            ExprKind::IndexAccess { base, index } => {
                let base = self.eval(base, env, Caller::new(CallerContext::IndexAccess, None))?;
                let caller = Caller::new(CallerContext::IndexAccess, base.as_object());
                self.index(&base, index, env, caller)
            }
            ExprKind::TypeConversion { ty, operand } => {
                let value = self.evaluate(operand, env)?;
                Ok(self.convert(&value, ty))
            }
            ExprKind::Conditional { cond, then, els } => match self.evaluate(cond, env)?.as_bool() {
                Some(true) => self.evaluate(then, env),
                Some(false) => self.evaluate(els, env),
                None => {
                    // Both branches start from the same state.
                    let base = self.session.heap.len();
                    let before = self.session.heap.clone();
                    let then = self.evaluate(then, env)?;
                    let after_then = core::mem::replace(&mut self.session.heap, before);
                    let els = self.evaluate(els, env)?;
                    let graft = self.session.heap.join_path(&after_then, base)?;
                    self.join_values(&graft.value(&then), &els)
                }
            },
            ExprKind::InlineArray(items) => self.inline_array(items, env),
            ExprKind::FunctionCall { callee, args } => self.call(callee, args, env),
            ExprKind::FunctionCallOptions { callee, .. } => self.evaluate(callee, env),
            ExprKind::Tuple(items) => match items.as_slice() {
                [Some(inner)] => self.eval(inner, env, caller),
                items => Ok(Value::Tuple(
                    items
                        .iter()
                        .map(|item| match item {
                            Some(item) => self.evaluate(item, env),
                            None => Ok(Value::Unit),
                        })
                        .collect::<Result<_>>()?,
                )),
            },
            ExprKind::Assignment { op, lhs, rhs } => {
                let value = self.evaluate(rhs, env)?;
                self.update_left_var(lhs, *op, value, env)
            }
            ExprKind::SubDenomination { value, unit } => {
                let number = parse_number(value, unit.multiplier())
                    .ok_or_else(|| Error::Unsupported(format!("number literal `{value}`")))?;
                Ok(Value::UInt(UIntInterval::singleton(number, 256)))
            }
            ExprKind::New(ty) => Err(Error::Unsupported(format!("`new {ty}` without arguments"))),
            ExprKind::MetaType(ty) => Ok(Value::Type(ty.clone())),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                    self.increment(operand, *op, env)
                }
                UnaryOp::Delete => self.delete(operand, env),
                op => self.evaluate(operand, env)?.unary(*op),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs, env)?;
                match (op, lhs.as_bool()) {
                    (BinaryOp::And, Some(false)) => return Ok(Value::Bool(BoolInterval::FALSE)),
                    (BinaryOp::Or, Some(true)) => return Ok(Value::Bool(BoolInterval::TRUE)),
                    _ => {}
                }
                let rhs = self.evaluate(rhs, env)?;
                lhs.binary(*op, &rhs)
            }
        }
    }

    fn identifier(&mut self, name: &str, env: &Environment, caller: Caller) -> Result<Value> {
        if let Some(handle) = env.get(name) {
            return Ok(self.session.heap.value(handle));
        }
        let defs = &self.session.heap.defs;
        match name {
            "block" | "msg" | "tx" | "abi" if caller.context != CallerContext::None => Ok(Value::Namespace(name.to_owned())),
            "block" | "msg" | "tx" | "abi" => Err(Error::MalformedAccess(name.to_owned())),
            "this" => Ok(Value::Address(AddressSet::top_())),
            "now" => self.global("block.timestamp", env),
            _ if defs.is_struct(name) || defs.is_enum(name) || name == self.contract.name => {
                Ok(Value::Type(SolType::Named(name.to_owned())))
            }
            _ => Err(Error::UndeclaredVariable(name.to_owned())),
        }
    }

    fn global(&self, key: &str, env: &Environment) -> Result<Value> {
        env.get(key)
            .or_else(|| self.contract.globals.get(key))
            .map(|handle| self.session.heap.value(handle))
            .ok_or_else(|| Error::UndeclaredVariable(key.to_owned()))
    }

    fn member(&mut self, base: &Value, member: &str, env: &Environment, caller: Caller) -> Result<Value> {
        let unknown = |container: &dyn ToString| Error::UnknownMember {
            container: container.to_string(),
            member: member.to_owned(),
        };
        if let Some(object) = caller.object {
            let heap = &self.session.heap;
            let slot = heap.get(object);
            return match &slot.kind {
                VarKind::Struct { .. } => Ok(heap.value(heap.member(object, member)?)),
                VarKind::Array { elements } if member == "length" => Ok(Value::uint(elements.len(), 256)),
                _ => Err(unknown(&slot.identifier)),
            };
        }
        match base {
            Value::Namespace(ns) if ns == "abi" => Ok(Value::Namespace(format!("abi.{member}"))),
            Value::Namespace(ns) => self
                .global(&format!("{ns}.{member}"), env)
                .map_err(|_| unknown(ns)),
            Value::Type(SolType::Named(name)) if self.session.heap.defs.is_enum(name) => self
                .session
                .heap
                .defs
                .enum_def(name)
                .and_then(|def| def.index_of(member))
                .map(|index| Value::uint(index, 8))
                .ok_or_else(|| unknown(name)),
            Value::Type(ty) => match (member, ty) {
                ("max", SolType::UInt(bits)) => Ok(Value::UInt(UIntInterval::singleton(Unsigned::type_max(*bits), *bits))),
                ("min", SolType::UInt(bits)) => Ok(Value::uint(0, *bits)),
                ("max", SolType::Int(bits)) => Ok(Value::Int(IntInterval::singleton(Signed::type_max(*bits), *bits))),
                ("min", SolType::Int(bits)) => Ok(Value::Int(IntInterval::singleton(Signed::type_min(*bits), *bits))),
                ("interfaceId", _) => Ok(Value::Bytes(BytesSet::top_of(4))),
                ("name" | "creationCode" | "runtimeCode", _) => Ok(Value::Symbolic(format!("type({ty}).{member}"))),
                _ => Err(unknown(ty)),
            },
            Value::Address(_) => match member {
                "balance" => Ok(Value::UInt(UIntInterval::top(&BitWidth(256)))),
                "codehash" => Ok(Value::Bytes(BytesSet::top_of(32))),
                "code" => Ok(Value::Symbolic(format!("code_{member}"))),
                _ => Err(unknown(&"address")),
            },
            Value::Bytes(bytes) if member == "length" => Ok(Value::uint(bytes.width(), 256)),
            Value::Symbolic(_) if member == "length" => Ok(Value::UInt(UIntInterval::top(&BitWidth(256)))),
            value => Err(unknown(value)),
        }
    }

    fn index(&mut self, base: &Value, index: &Expression, env: &Environment, caller: Caller) -> Result<Value> {
        let Some(object) = caller.object else {
            return match base {
                Value::Bytes(bytes) if bytes.is_bottom() => Ok(Value::Bytes(BytesSet::bottom_of(1))),
                Value::Bytes(_) | Value::Symbolic(_) => {
                    self.evaluate(index, env)?;
                    Ok(Value::Bytes(BytesSet::top_of(1)))
                }
                value => Err(Error::MalformedAccess(format!("{value}[{index}]"))),
            };
        };
        let heap = &self.session.heap;
        let (is_mapping, is_array) = (heap.entries(object).is_some(), heap.elements(object).is_some());
        match (is_mapping, is_array) {
            (true, _) => match self.mapping_key(index, env)? {
                MappingKey::Exact(key) => {
                    let entry = self.session.heap.get_or_create(object, &key)?;
                    Ok(self.session.heap.value(entry))
                }
                MappingKey::Range => {
                    let entries: Vec<Handle> = self.session.heap.children(object);
                    if entries.is_empty() {
                        let value_ty = match &self.session.heap.get(object).ty {
                            SolType::Mapping { value, .. } => (**value).clone(),
                            ty => return Err(Error::UnsupportedType(ty.to_string())),
                        };
                        return self.fresh_value(&value_ty, Init::Bottom);
                    }
                    self.join_handles(&entries)
                }
            },
            (_, true) => {
                let value = self.evaluate(index, env)?;
                self.read_elements(object, &value)
            }
            _ => Err(Error::MalformedAccess(format!("{base}[{index}]"))),
        }
    }

    /// The key an index expression selects. Address variables are keyed by
    /// their name so entries written through an alias are found again.
    pub(crate) fn mapping_key(&mut self, index: &Expression, env: &Environment) -> Result<MappingKey> {
        match &index.kind {
            ExprKind::Literal(literal) => return Ok(MappingKey::Exact(literal_key(literal))),
            ExprKind::Identifier(_) | ExprKind::MemberAccess { .. } => {
                let path = index.to_string();
                let handle = env.get(&path).or_else(|| self.contract.globals.get(&path));
                if let Some(handle) = handle {
                    if self.session.heap.get(handle).ty == SolType::Address {
                        return Ok(MappingKey::Exact(path));
                    }
                }
            }
            _ => {}
        }
        let value = self.evaluate(index, env)?;
        if let Some(key) = value.as_key() {
            return Ok(MappingKey::Exact(key));
        }
        if value.is_bottom() || matches!(value, Value::Symbolic(_)) {
            return Ok(MappingKey::Exact(index.to_string()));
        }
        debug!("Key `{index}` of value {value} selects an unknown entry");
        Ok(MappingKey::Range)
    }

    /// Reads `array[index]`. A range index reads the join of every element
    /// in range, unless the range is too wide or reaches past the end of a
    /// dynamic array, in which case the result is Top.
    fn read_elements(&mut self, array: Handle, index: &Value) -> Result<Value> {
        let heap = &self.session.heap;
        let name = heap.get(array).identifier.clone();
        let (base, declared) = heap
            .array_type(array)
            .map(|(base, length)| (base.clone(), length))
            .ok_or_else(|| Error::MalformedAccess(name.clone()))?;
        let length = heap.length(array).unwrap_or(0);

        if index.is_bottom() {
            return self.fresh_value(&base, Init::Bottom);
        }
        let Some((lo, hi)) = index_bounds(index) else {
            return self.fresh_value(&base, Init::Top);
        };
        let zero = BigInt::from(0u8);
        if hi < zero {
            return Err(Error::NegativeIndex {
                array: name,
                index: index.to_string(),
            });
        }
        let lo = lo.max(zero);
        if lo == hi {
            let position = u64::try_from(&lo).map_err(|_| Error::IndexOutOfBounds {
                array: name,
                index: lo.to_string(),
                length,
            })?;
            let element = self.session.heap.get_or_create_element(array, position)?;
            return Ok(self.session.heap.value(element));
        }

        let too_wide = &hi - &lo > BigInt::from(self.session.config.max_index_span);
        if declared.is_none() && (length == 0 || too_wide || hi >= BigInt::from(length)) {
            warn!("Range index {index} into `{name}` of length {length}, result is unknown");
            return self.fresh_value(&base, Init::Top);
        }
        if too_wide {
            warn!("Range index {index} into `{name}` is too wide, result is unknown");
            return self.fresh_value(&base, Init::Top);
        }
        let last = hi.min(BigInt::from(length) - 1);
        let out_of_bounds = || Error::IndexOutOfBounds {
            array: name.clone(),
            index: index.to_string(),
            length,
        };
        if lo > last {
            return Err(out_of_bounds());
        }
        let first = usize::try_from(&lo).map_err(|_| out_of_bounds())?;
        let last = usize::try_from(&last).map_err(|_| out_of_bounds())?;
        let elements = self
            .session
            .heap
            .elements(array)
            .map(|elements| elements[first..=last].to_vec())
            .unwrap_or_default();
        self.join_handles(&elements)
    }

    /// A fresh value of type `ty`. Composite types are allocated as
    /// temporaries.
    pub(crate) fn fresh_value(&mut self, ty: &SolType, init: Init) -> Result<Value> {
        let heap = &mut self.session.heap;
        let elementary = match ty {
            SolType::Named(name) => !heap.defs.is_struct(name),
            ty => ty.is_elementary(),
        };
        if elementary {
            return heap.initial_value(ty, "unknown", init);
        }
        let handle = heap.materialize(&format!("<{ty}>"), Scope::Temporary, ty, init)?;
        Ok(Value::Object(handle))
    }

    /// Join of several variables. Composite variables are joined into a
    /// temporary copy, the originals stay untouched.
    fn join_handles(&mut self, handles: &[Handle]) -> Result<Value> {
        let heap = &mut self.session.heap;
        let Some((first, rest)) = handles.split_first() else {
            return Err(Error::MalformedAccess("join of no values".to_owned()));
        };
        if heap.get(*first).is_composite() {
            let name = heap.get(*first).identifier.clone();
            let copy = heap.deep_copy(*first, &name, Scope::Temporary);
            for handle in rest {
                heap.join_into(copy, *handle)?;
            }
            return Ok(Value::Object(copy));
        }
        Ok(rest
            .iter()
            .fold(heap.value(*first), |acc, handle| acc.join(&heap.value(*handle))))
    }

    fn join_values(&mut self, lhs: &Value, rhs: &Value) -> Result<Value> {
        match (lhs, rhs) {
            (Value::Object(a), Value::Object(b)) => self.join_handles(&[*a, *b]),
            (lhs, rhs) => Ok(lhs.join(rhs)),
        }
    }

    /// Explicit conversion. Contract types are addresses, enums are their
    /// `uint8` index.
    pub(crate) fn convert(&self, value: &Value, ty: &SolType) -> Value {
        let defs = &self.session.heap.defs;
        match ty {
            SolType::Named(name) if defs.is_enum(name) => value.convert(&SolType::UInt(8)),
            SolType::Named(name) if defs.is_struct(name) => value.clone(),
            SolType::Named(_) => value.convert(&SolType::Address),
            ty => value.convert(ty),
        }
    }

    /// Writes `value` into the variable `target`, copying composites.
    pub(crate) fn store(&mut self, target: Handle, value: Value) -> Result<()> {
        match value {
            Value::Object(src) => self.session.heap.assign_object(target, src),
            value => {
                let ty = self.session.heap.get(target).ty.clone();
                let value = self.convert(&value, &ty);
                self.session.heap.set_value(target, value)
            }
        }
    }

    fn inline_array(&mut self, items: &[Expression], env: &Environment) -> Result<Value> {
        let values = items
            .iter()
            .map(|item| self.evaluate(item, env))
            .collect::<Result<Vec<_>>>()?;
        let heap = &mut self.session.heap;
        let base = match values.first() {
            Some(Value::Object(h)) => heap.get(*h).ty.clone(),
            Some(first) => values
                .iter()
                .skip(1)
                .fold(first.clone(), |acc, v| acc.join(v))
                .type_of()
                .unwrap_or_else(SolType::uint256),
            None => SolType::uint256(),
        };
        let name = format!("[{}]", items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "));
        let elements = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::Object(h) => heap.deep_copy(h, &format!("{name}[{i}]"), Scope::Element),
                value => {
                    let value = value.convert(&base);
                    heap.scalar(&format!("{name}[{i}]"), Scope::Element, base.clone(), value)
                }
            })
            .collect::<Vec<_>>();
        let ty = SolType::array(base, Some(elements.len() as u64));
        Ok(Value::Object(heap.composite(&name, Scope::Temporary, ty, VarKind::Array { elements })))
    }

    fn arguments(&mut self, args: &[Argument], env: &Environment) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(&arg.value, env)).collect()
    }

    fn call(&mut self, callee: &Expression, args: &[Argument], env: &Environment) -> Result<Value> {
        match &callee.kind {
            ExprKind::FunctionCallOptions { callee, options } => {
                for (_, option) in options {
                    self.evaluate(option, env)?;
                }
                self.call(callee, args, env)
            }
            ExprKind::Identifier(name) => self.call_named(name, args, env),
            ExprKind::MemberAccess { base, member } => self.call_member(base, member, args, env),
            ExprKind::New(ty) => self.new_object(ty, args, env),
            _ => match self.evaluate(callee, env)? {
                Value::Type(ty) => self.cast(&ty, args, env),
                value => Err(Error::Unsupported(format!("call of {}", value.kind_name()))),
            },
        }
    }

    fn cast(&mut self, ty: &SolType, args: &[Argument], env: &Environment) -> Result<Value> {
        let [arg] = args else {
            return Err(Error::ArgumentCountMismatch {
                function: ty.to_string(),
                expected: 1,
                given: args.len(),
            });
        };
        let value = self.evaluate(&arg.value, env)?;
        Ok(self.convert(&value, ty))
    }

    fn call_named(&mut self, name: &str, args: &[Argument], env: &Environment) -> Result<Value> {
        match name {
            "require" | "assert" => {
                let values = self.arguments(args, env)?;
                if values.first().and_then(Value::as_bool) == Some(false) {
                    debug!("`{name}` fails on line {}", self.line);
                    self.reverted = true;
                }
                return Ok(Value::Unit);
            }
            "revert" => {
                self.arguments(args, env)?;
                self.reverted = true;
                return Ok(Value::Unit);
            }
            "keccak256" | "sha256" | "blockhash" => {
                self.arguments(args, env)?;
                return Ok(Value::Bytes(BytesSet::top_of(32)));
            }
            "ripemd160" => {
                self.arguments(args, env)?;
                return Ok(Value::Bytes(BytesSet::top_of(20)));
            }
            "ecrecover" => {
                self.arguments(args, env)?;
                return Ok(Value::Address(AddressSet::top_()));
            }
            "gasleft" => return Ok(Value::UInt(UIntInterval::top(&BitWidth(256)))),
            "addmod" | "mulmod" => {
                let values = self.arguments(args, env)?;
                return modular(name, &values);
            }
            "selfdestruct" => {
                self.arguments(args, env)?;
                return Ok(Value::Unit);
            }
            _ => {}
        }
        if self.contract.function(name).is_some() {
            return self.call_function(name, args, env);
        }
        if self.session.heap.defs.is_struct(name) {
            return self.construct_struct(name, args, env);
        }
        match name.parse::<SolType>() {
            Ok(SolType::Named(contract)) if !contract.starts_with(|c: char| c.is_ascii_uppercase()) => {
                Err(Error::UnknownFunction(name.to_owned()))
            }
            Ok(ty) => self.cast(&ty, args, env),
            Err(_) => Err(Error::UnknownFunction(name.to_owned())),
        }
    }

    fn call_member(&mut self, base: &Expression, member: &str, args: &[Argument], env: &Environment) -> Result<Value> {
        if let ExprKind::Identifier(name) = &base.kind {
            let local_call = matches!(name.as_str(), "this" | "super") || *name == self.contract.name;
            if local_call && !env.contains(name) && self.contract.function(member).is_some() {
                return self.call_function(member, args, env);
            }
        }
        let object = self.eval(base, env, Caller::new(CallerContext::MemberAccess, None))?;
        match (&object, member) {
            (Value::Namespace(ns), _) if ns == "abi" => {
                self.arguments(args, env)?;
                Ok(Value::Symbolic(format!("abi.{member}")))
            }
            (Value::Object(array), "push" | "pop") => {
                let array = *array;
                let result = if member == "push" {
                    let value = match args.first() {
                        Some(arg) => Some(self.evaluate(&arg.value, env)?),
                        None => None,
                    };
                    let pushed_default = value.is_none();
                    let element = self.session.heap.push(array, value)?;
                    if pushed_default {
                        self.session.heap.value(element)
                    } else {
                        Value::Unit
                    }
                } else {
                    self.session.heap.pop(array)?;
                    Value::Unit
                };
                self.record_write(base, array, env);
                Ok(result)
            }
            (Value::Address(_), "call" | "delegatecall" | "staticcall") => {
                self.arguments(args, env)?;
                Ok(Value::Tuple(vec![
                    Value::Bool(BoolInterval::TOP),
                    Value::Symbolic(format!("{member}_result")),
                ]))
            }
            (Value::Address(_), "send") => {
                self.arguments(args, env)?;
                Ok(Value::Bool(BoolInterval::TOP))
            }
            (Value::Address(_), "transfer") if args.len() == 1 => {
                self.arguments(args, env)?;
                Ok(Value::Unit)
            }
            // Calls into other contracts are not followed.
            (Value::Address(_), _) => {
                self.arguments(args, env)?;
                Ok(Value::Symbolic(format!("{base}.{member}")))
            }
            (Value::Type(SolType::Named(_)), _) if self.contract.function(member).is_some() => {
                self.call_function(member, args, env)
            }
            _ => match self.member(&object, member, env, Caller::new(CallerContext::MemberAccess, object.as_object()))? {
                Value::Type(ty) => self.cast(&ty, args, env),
                _ => Err(Error::UnknownFunction(format!("{base}.{member}"))),
            },
        }
    }

    fn new_object(&mut self, ty: &SolType, args: &[Argument], env: &Environment) -> Result<Value> {
        let values = self.arguments(args, env)?;
        match ty {
            SolType::Array { base, length } => {
                let heap = &mut self.session.heap;
                let array = heap.materialize(&format!("new {ty}"), Scope::Temporary, ty, Init::Zero)?;
                let size = values.first().and_then(|v| index_bounds(v)).filter(|(lo, hi)| lo == hi);
                if let (None, Some((size, _))) = (length, size) {
                    let size = u64::try_from(&size).map_err(|_| Error::Unsupported(format!("array of size {size}")))?;
                    heap.resize(array, size, base, Init::Zero)?;
                }
                Ok(Value::Object(array))
            }
            SolType::Bytes | SolType::String => Ok(Value::Symbolic(format!("new {ty}"))),
            SolType::Named(name) if self.session.heap.defs.is_struct(name) => {
                let handle = self.session.heap.initialize_struct(name, Scope::Temporary, name, Init::Zero)?;
                Ok(Value::Object(handle))
            }
            SolType::Named(_) => Ok(Value::Address(AddressSet::top_())),
            ty => Err(Error::UnsupportedType(format!("new {ty}"))),
        }
    }

    fn construct_struct(&mut self, name: &str, args: &[Argument], env: &Environment) -> Result<Value> {
        let members: Vec<String> = self
            .session
            .heap
            .defs
            .struct_def(name)
            .map(|def| def.members().iter().map(|(member, _)| member.clone()).collect())
            .ok_or_else(|| Error::UndefinedStruct(name.to_owned()))?;
        if args.len() != members.len() {
            return Err(Error::ArgumentCountMismatch {
                function: name.to_owned(),
                expected: members.len(),
                given: args.len(),
            });
        }
        let handle = self
            .session
            .heap
            .initialize_struct(&format!("{name}(..)"), Scope::Temporary, name, Init::Zero)?;
        for (arg, positional) in args.iter().zip(&members) {
            let member = arg.name.as_deref().unwrap_or(positional);
            let target = self.session.heap.member(handle, member)?;
            let value = self.evaluate(&arg.value, env)?;
            self.store(target, value)?;
        }
        Ok(Value::Object(handle))
    }

    /// Calls a function of the contract: builds the callee's entry
    /// environment, binds the arguments and lets the engine run the body.
    pub fn call_function(&mut self, name: &str, args: &[Argument], env: &Environment) -> Result<Value> {
        let contract = self.contract;
        let cfg = contract
            .function(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_owned()))?;
        let mut callee_env = contract.make_function_env(self.session, cfg)?;
        self.bind_arguments(cfg, args, env, &callee_env)?;
        // Visible names of the caller the callee does not shadow.
        callee_env.merge_missing(env);
        debug!("Calling `{name}` from line {}", self.line);
        let line = self.line;
        let result = self.engine.interpret_function_cfg(contract, self.session, cfg, callee_env);
        self.line = line;
        result
    }

    fn bind_arguments(&mut self, cfg: &FunctionCfg, args: &[Argument], env: &Environment, callee_env: &Environment) -> Result<()> {
        if args.len() != cfg.params.len() {
            return Err(Error::ArgumentCountMismatch {
                function: cfg.name.clone(),
                expected: cfg.params.len(),
                given: args.len(),
            });
        }
        for (position, arg) in args.iter().enumerate() {
            let param = match &arg.name {
                None => &cfg.params[position].0,
                Some(name) => cfg
                    .params
                    .iter()
                    .map(|(param, _)| param)
                    .find(|param| *param == name)
                    .ok_or_else(|| Error::UnknownMember {
                        container: cfg.name.clone(),
                        member: name.clone(),
                    })?,
            };
            let value = self.evaluate(&arg.value, env)?;
            if let Some(target) = callee_env.get(param) {
                self.store(target, value)?;
            }
        }
        Ok(())
    }

    /// Reports a write of `target` through the access path `expr`.
    pub(crate) fn record_write(&mut self, expr: &Expression, target: Handle, env: &Environment) {
        let base = expr.root_identifier().and_then(|root| env.get(root));
        let session = &mut *self.session;
        session
            .recorder
            .record_assignment(self.line, expr, &session.heap, target, base);
    }
}

/// `addmod` and `mulmod` compute with unbounded precision, so only definite
/// arguments give a definite result.
fn modular(name: &str, values: &[Value]) -> Result<Value> {
    let [a, b, m] = values else {
        return Err(Error::ArgumentCountMismatch {
            function: name.to_owned(),
            expected: 3,
            given: values.len(),
        });
    };
    if values.iter().any(Value::is_bottom) {
        return Ok(Value::UInt(UIntInterval::bottom(&BitWidth(256))));
    }
    let singleton = |value: &Value| match value {
        Value::UInt(i) => i.as_singleton().cloned(),
        _ => None,
    };
    let zero = BigInt::from(0u8);
    Ok(match (singleton(a), singleton(b), singleton(m)) {
        (_, _, Some(m)) if m == zero => Value::UInt(UIntInterval::bottom(&BitWidth(256))),
        (Some(a), Some(b), Some(m)) => {
            let combined = if name == "addmod" { a + b } else { a * b };
            Value::UInt(UIntInterval::singleton(combined % m, 256))
        }
        _ => Value::UInt(UIntInterval::top(&BitWidth(256))),
    })
}
