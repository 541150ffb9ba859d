use log::debug;
use num_bigint::BigInt;

use crate::ast::{AssignOp, ExprKind, Expression, UnaryOp};
use crate::error::{Error, Result};
use crate::eval::{Interpreter, MappingKey, index_bounds};
use crate::heap::{Handle, Init, VarKind};
use crate::session::Environment;
use crate::value::Value;

/// What an assignment writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Exactly this variable, the old value is overwritten.
    Strong(Handle),
    /// One of `slots`, so each of them keeps its old value as a possibility.
    Weak { container: Handle, slots: Vec<Handle> },
    /// Some element of a dynamic array the analysis cannot pin down: the
    /// whole array becomes unknown.
    Havoc(Handle),
}

impl Target {
    /// The variable reported to the recorder for this write.
    pub fn recorded(&self) -> Handle {
        match self {
            Target::Strong(handle) => *handle,
            Target::Weak { container, .. } | Target::Havoc(container) => *container,
        }
    }
}

/// `old op= new`. Plain assignment yields `new`. Every other operator yields
/// Bottom as soon as one side is Bottom.
pub fn compound_assignment(op: AssignOp, old: &Value, new: &Value) -> Result<Value> {
    let Some(binary) = op.binary() else {
        return Ok(new.clone());
    };
    if old.is_bottom() {
        return Ok(old.clone());
    }
    if new.is_bottom() {
        return Ok(old
            .type_of()
            .and_then(|ty| Value::bottom_of(&ty, ""))
            .unwrap_or_else(|| new.clone()));
    }
    old.binary(binary, new)
}

impl Interpreter<'_> {
    /// Finds the variable an assignment to `lhs` writes. Missing array
    /// elements and mapping entries on the way are created. Anything that
    /// cannot be a target is an error.
    pub fn resolve_strict(&mut self, lhs: &Expression, env: &Environment) -> Result<Target> {
        match &lhs.kind {
            ExprKind::Identifier(name) => env
                .get(name)
                .map(Target::Strong)
                .ok_or_else(|| Error::UndeclaredVariable(name.clone())),
            ExprKind::Tuple(items) if items.len() == 1 => match &items[0] {
                Some(inner) => self.resolve_strict(inner, env),
                None => Err(Error::NotAssignable(lhs.to_string())),
            },
            ExprKind::MemberAccess { base, member } => match self.resolve_strict(base, env)? {
                Target::Strong(handle) => Ok(Target::Strong(self.assignable_member(handle, member, lhs)?)),
                Target::Weak { container, slots } => Ok(Target::Weak {
                    container,
                    slots: slots
                        .into_iter()
                        .map(|slot| self.assignable_member(slot, member, lhs))
                        .collect::<Result<_>>()?,
                }),
                havoc => Ok(havoc),
            },
            ExprKind::IndexAccess { base, index } => match self.resolve_strict(base, env)? {
                Target::Strong(handle) => self.resolve_index(handle, index, env),
                Target::Weak { container, slots } => {
                    let mut resolved = Vec::new();
                    for slot in slots {
                        match self.resolve_index(slot, index, env)? {
                            Target::Strong(handle) => resolved.push(handle),
                            Target::Weak { slots, .. } => resolved.extend(slots),
                            Target::Havoc(_) => return Ok(Target::Havoc(container)),
                        }
                    }
                    Ok(Target::Weak {
                        container,
                        slots: resolved,
                    })
                }
                havoc => Ok(havoc),
            },
            _ => Err(Error::NotAssignable(lhs.to_string())),
        }
    }

    fn assignable_member(&self, handle: Handle, member: &str, lhs: &Expression) -> Result<Handle> {
        let heap = &self.session.heap;
        match &heap.get(handle).kind {
            VarKind::Struct { .. } => heap.member(handle, member),
            VarKind::Array { .. } if member == "length" => Err(Error::NotAssignable(lhs.to_string())),
            _ => Err(Error::MalformedAccess(lhs.to_string())),
        }
    }

    fn resolve_index(&mut self, container: Handle, index: &Expression, env: &Environment) -> Result<Target> {
        if self.session.heap.entries(container).is_some() {
            return match self.mapping_key(index, env)? {
                MappingKey::Exact(key) => Ok(Target::Strong(self.session.heap.get_or_create(container, &key)?)),
                MappingKey::Range => {
                    debug!("Weak update of the entries of `{}`", self.session.heap.get(container).identifier);
                    Ok(Target::Weak {
                        container,
                        slots: self.session.heap.children(container),
                    })
                }
            };
        }
        let Some((_, declared)) = self.session.heap.array_type(container) else {
            return Err(Error::MalformedAccess(format!(
                "{}[{index}]",
                self.session.heap.get(container).identifier
            )));
        };
        let value = self.evaluate(index, env)?;
        let heap = &mut self.session.heap;
        let name = heap.get(container).identifier.clone();
        let length = heap.length(container).unwrap_or(0);
        let out_of_bounds = || Error::IndexOutOfBounds {
            array: name.clone(),
            index: value.to_string(),
            length,
        };

        let Some((lo, hi)) = index_bounds(&value) else {
            return Ok(match declared {
                None => Target::Havoc(container),
                Some(_) => Target::Weak {
                    container,
                    slots: heap.children(container),
                },
            });
        };
        let zero = BigInt::from(0u8);
        if hi < zero {
            return Err(Error::NegativeIndex {
                array: name.clone(),
                index: value.to_string(),
            });
        }
        if lo == hi {
            let position = u64::try_from(&lo).map_err(|_| out_of_bounds())?;
            return Ok(Target::Strong(heap.get_or_create_element(container, position)?));
        }
        if declared.is_none() {
            debug!("Index {value} into dynamic array `{name}` is not exact, forgetting its content");
            return Ok(Target::Havoc(container));
        }

        let lo = lo.max(zero);
        let last = hi.min(BigInt::from(length) - 1);
        if lo > last {
            return Err(out_of_bounds());
        }
        if &last - &lo > BigInt::from(self.session.config.max_index_span) {
            return Ok(Target::Havoc(container));
        }
        let first = usize::try_from(&lo).map_err(|_| out_of_bounds())?;
        let last = usize::try_from(&last).map_err(|_| out_of_bounds())?;
        let slots = self
            .session
            .heap
            .elements(container)
            .map(|elements| elements[first..=last].to_vec())
            .unwrap_or_default();
        Ok(Target::Weak { container, slots })
    }

    /// Performs `lhs op= rvalue` and reports the write once. Returns the
    /// value the assignment expression evaluates to.
    pub fn update_left_var(&mut self, lhs: &Expression, op: AssignOp, rvalue: Value, env: &Environment) -> Result<Value> {
        if let (ExprKind::Tuple(items), Value::Tuple(values)) = (&lhs.kind, &rvalue) {
            if items.len() > 1 {
                if items.len() != values.len() {
                    return Err(Error::MalformedAccess(format!("{lhs} = {rvalue}")));
                }
                for (item, value) in items.iter().zip(values) {
                    if let Some(item) = item {
                        self.update_left_var(item, op, value.clone(), env)?;
                    }
                }
                return Ok(rvalue);
            }
        }
        let target = self.resolve_strict(lhs, env)?;
        let result = self.write(&target, op, &rvalue)?;
        self.record_write(lhs, target.recorded(), env);
        Ok(result)
    }

    fn write(&mut self, target: &Target, op: AssignOp, rvalue: &Value) -> Result<Value> {
        match target {
            Target::Strong(handle) => self.write_strong(*handle, op, rvalue),
            Target::Weak { slots, .. } => {
                for slot in slots {
                    self.write_weak(*slot, op, rvalue)?;
                }
                Ok(rvalue.clone())
            }
            Target::Havoc(handle) => {
                self.session.heap.havoc(*handle)?;
                Ok(rvalue.clone())
            }
        }
    }

    fn write_strong(&mut self, handle: Handle, op: AssignOp, rvalue: &Value) -> Result<Value> {
        let slot = self.session.heap.get(handle);
        if slot.is_composite() {
            return match (op, rvalue) {
                (AssignOp::Assign, Value::Object(src)) => {
                    self.session.heap.assign_object(handle, *src)?;
                    Ok(Value::Object(handle))
                }
                _ => Err(Error::NotAssignable(slot.identifier.clone())),
            };
        }
        let ty = slot.ty.clone();
        let old = self.session.heap.value(handle);
        let new = compound_assignment(op, &old, rvalue)?;
        let new = self.convert(&new, &ty);
        self.session.heap.set_value(handle, new.clone())?;
        Ok(new)
    }

    fn write_weak(&mut self, handle: Handle, op: AssignOp, rvalue: &Value) -> Result<()> {
        let slot = self.session.heap.get(handle);
        if slot.is_composite() {
            return match (op, rvalue) {
                (AssignOp::Assign, Value::Object(src)) => self.session.heap.join_into(handle, *src),
                _ => Err(Error::NotAssignable(slot.identifier.clone())),
            };
        }
        let ty = slot.ty.clone();
        let old = self.session.heap.value(handle);
        let new = compound_assignment(op, &old, rvalue)?;
        let new = self.convert(&new, &ty);
        self.session.heap.set_value(handle, old.join(&new))
    }

    /// `++x`, `x++`, `--x` and `x--`.
    pub(crate) fn increment(&mut self, operand: &Expression, op: UnaryOp, env: &Environment) -> Result<Value> {
        let old = self.evaluate(operand, env)?;
        let assign = match op {
            UnaryOp::PreInc | UnaryOp::PostInc => AssignOp::Add,
            _ => AssignOp::Sub,
        };
        let new = self.update_left_var(operand, assign, Value::uint(1, 256), env)?;
        Ok(match op {
            UnaryOp::PreInc | UnaryOp::PreDec => new,
            _ => old,
        })
    }

    /// `delete x`. A weak target may or may not be reset, so its elements
    /// keep their old values as a possibility.
    pub(crate) fn delete(&mut self, operand: &Expression, env: &Environment) -> Result<Value> {
        let target = self.resolve_strict(operand, env)?;
        let heap = &mut self.session.heap;
        match &target {
            Target::Strong(handle) => heap.reset(*handle)?,
            Target::Weak { slots, .. } => {
                for slot in slots {
                    let current = heap.get(*slot);
                    if current.is_composite() {
                        heap.havoc(*slot)?;
                        continue;
                    }
                    let zero = heap.initial_value(&current.ty, &current.identifier, Init::Zero)?;
                    let joined = heap.value(*slot).join(&zero);
                    heap.set_value(*slot, joined)?;
                }
            }
            Target::Havoc(handle) => heap.havoc(*handle)?,
        }
        self.record_write(operand, target.recorded(), env);
        Ok(Value::Unit)
    }
}
