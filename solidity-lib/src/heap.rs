use core::fmt::Display;
use std::collections::{BTreeMap, HashMap};

use analysis::domains::*;
use log::debug;

use crate::error::{Error, Result};
use crate::types::SolType;
use crate::value::Value;

/// Index of a variable in the [`Heap`]. Environments of different functions
/// hold the same handle for a shared state variable, so a write through one
/// of them is visible through all others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    State,
    Global,
    Local,
    Param,
    Return,
    /// Owned by a composite variable: array element, member or entry.
    Element,
    /// Values that only live for the evaluation of one expression: struct
    /// constructors, inline arrays, joined views of several elements.
    Temporary,
}

/// Which value freshly created scalars receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Init {
    /// Storage before its first write.
    Zero,
    /// Inputs of a function: anything is possible.
    Top,
    /// Not known yet: unseen mapping entries, locals without initializer.
    Bottom,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VarKind {
    Scalar {
        value: Value,
        initial: Value,
    },
    Array {
        elements: Vec<Handle>,
    },
    Struct {
        members: Vec<(String, Handle)>,
    },
    /// Keys are the textual form of the key expression or value.
    Mapping {
        entries: BTreeMap<String, Handle>,
    },
    /// `value` is the index of the member as a `uint8` interval.
    Enum {
        value: Value,
    },
    /// `block.*`, `msg.*` and `tx.*`. A debug override shadows the value
    /// until it is removed.
    Global {
        value: Value,
        default: Value,
        debug_override: Option<Value>,
        usage_sites: Vec<u32>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub identifier: String,
    pub scope: Scope,
    pub ty: SolType,
    pub kind: VarKind,
}

impl Slot {
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            VarKind::Array { .. } | VarKind::Struct { .. } | VarKind::Mapping { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    members: Vec<(String, SolType)>,
}

impl StructDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, name: &str, ty: SolType) -> Result<()> {
        if self.members.iter().any(|(member, _)| member == name) {
            return Err(Error::DuplicateMember {
                container: self.name.clone(),
                member: name.to_owned(),
            });
        }
        self.members.push((name.to_owned(), ty));
        Ok(())
    }

    pub fn with_member(mut self, name: &str, ty: SolType) -> Result<Self> {
        self.add_member(name, ty)?;
        Ok(self)
    }

    pub fn members(&self) -> &[(String, SolType)] {
        &self.members
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    members: Vec<String>,
}

impl EnumDef {
    pub fn new(name: &str, members: &[&str]) -> Result<Self> {
        let mut def = Self {
            name: name.to_owned(),
            members: Vec::new(),
        };
        for member in members {
            def.add_member(member)?;
        }
        Ok(def)
    }

    pub fn add_member(&mut self, name: &str) -> Result<()> {
        if self.members.iter().any(|member| member == name) {
            return Err(Error::DuplicateMember {
                container: self.name.clone(),
                member: name.to_owned(),
            });
        }
        self.members.push(name.to_owned());
        Ok(())
    }

    pub fn index_of(&self, member: &str) -> Option<usize> {
        self.members.iter().position(|m| m == member)
    }

    pub fn member(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// User defined types of a contract.
#[derive(Clone, Debug, Default)]
pub struct Definitions {
    structs: HashMap<String, StructDef>,
    enums: HashMap<String, EnumDef>,
}

impl Definitions {
    pub fn define_struct(&mut self, def: StructDef) {
        self.structs.insert(def.name.clone(), def);
    }

    pub fn define_enum(&mut self, def: EnumDef) {
        self.enums.insert(def.name.clone(), def);
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }
}

/// Where the slots of another heap live after [`Heap::join_path`] copied
/// them over. Handles older than the fork are the same in both heaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Graft {
    base: usize,
    start: usize,
}

impl Graft {
    pub fn handle(&self, handle: Handle) -> Handle {
        if handle.0 < self.base {
            handle
        } else {
            Handle(handle.0 - self.base + self.start)
        }
    }

    pub fn value(&self, value: &Value) -> Value {
        match value {
            Value::Object(handle) => Value::Object(self.handle(*handle)),
            Value::Tuple(items) => Value::Tuple(items.iter().map(|item| self.value(item)).collect()),
            value => value.clone(),
        }
    }

    fn slot(&self, slot: &Slot) -> Slot {
        let kind = match &slot.kind {
            VarKind::Array { elements } => VarKind::Array {
                elements: elements.iter().map(|h| self.handle(*h)).collect(),
            },
            VarKind::Struct { members } => VarKind::Struct {
                members: members.iter().map(|(m, h)| (m.clone(), self.handle(*h))).collect(),
            },
            VarKind::Mapping { entries } => VarKind::Mapping {
                entries: entries.iter().map(|(k, h)| (k.clone(), self.handle(*h))).collect(),
            },
            kind => kind.clone(),
        };
        Slot {
            identifier: slot.identifier.clone(),
            scope: slot.scope,
            ty: slot.ty.clone(),
            kind,
        }
    }
}

/// Longest array the heap materializes unless configured otherwise.
pub const DEFAULT_MAX_ARRAY_LENGTH: u64 = 1 << 16;

/// Arena of every variable of an analysis session. Variables are never
/// freed, a variable nobody refers to any more is simply unreachable.
#[derive(Clone, Debug)]
pub struct Heap {
    slots: Vec<Slot>,
    pub defs: Definitions,
    /// Arrays never hold more elements than this. Longer static arrays are
    /// unsupported, dynamic arrays refuse to grow past it.
    pub max_array_length: u64,
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            defs: Definitions::default(),
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
        }
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_array_length(mut self, max_array_length: u64) -> Self {
        self.max_array_length = max_array_length;
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn alloc(&mut self, slot: Slot) -> Handle {
        self.slots.push(slot);
        Handle(self.slots.len() - 1)
    }

    pub fn get(&self, handle: Handle) -> &Slot {
        &self.slots[handle.0]
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut Slot {
        &mut self.slots[handle.0]
    }

    pub(crate) fn replace(&mut self, handle: Handle, slot: Slot) {
        self.slots[handle.0] = slot;
    }

    fn enum_value(&self, name: &str, init: Init) -> Result<Value> {
        let def = self
            .defs
            .enum_def(name)
            .ok_or_else(|| Error::UndefinedEnum(name.to_owned()))?;
        Ok(match init {
            Init::Zero => Value::uint(0, 8),
            Init::Top => Value::uint_range(0, def.len().saturating_sub(1), 8),
            Init::Bottom => Value::UInt(UIntInterval::bottom(&BitWidth(8))),
        })
    }

    /// Value a fresh scalar of type `ty` gets. Contract types are addresses.
    pub fn initial_value(&self, ty: &SolType, name: &str, init: Init) -> Result<Value> {
        let ty = match ty {
            SolType::Named(n) if self.defs.is_enum(n) => return self.enum_value(n, init),
            SolType::Named(n) if self.defs.is_struct(n) => {
                return Err(Error::UnsupportedType(ty.to_string()));
            }
            SolType::Named(_) => &SolType::Address,
            ty => ty,
        };
        let value = match init {
            Init::Zero => Value::zero_of(ty, name),
            Init::Top => Value::top_of(ty, name),
            Init::Bottom => Value::bottom_of(ty, name),
        };
        value.ok_or_else(|| Error::UnsupportedType(ty.to_string()))
    }

    /// Creates a variable of type `ty` with every part that has a fixed shape
    /// already present: static array elements and struct members, all the
    /// way down. Dynamic arrays start empty, mappings without entries.
    pub fn materialize(&mut self, name: &str, scope: Scope, ty: &SolType, init: Init) -> Result<Handle> {
        let kind = match ty {
            SolType::Array { base, length } => {
                if length.is_some_and(|length| length > self.max_array_length) {
                    return Err(Error::UnsupportedType(ty.to_string()));
                }
                let mut elements = Vec::new();
                for i in 0..length.unwrap_or(0) {
                    elements.push(self.materialize(&format!("{name}[{i}]"), Scope::Element, base, init)?);
                }
                VarKind::Array { elements }
            }
            SolType::Mapping { .. } => VarKind::Mapping {
                entries: BTreeMap::new(),
            },
            SolType::Named(n) if self.defs.is_struct(n) => return self.initialize_struct(name, scope, n, init),
            SolType::Named(n) if self.defs.is_enum(n) => VarKind::Enum {
                value: self.enum_value(n, init)?,
            },
            ty => {
                let value = self.initial_value(ty, name, init)?;
                VarKind::Scalar {
                    initial: value.clone(),
                    value,
                }
            }
        };
        Ok(self.alloc(Slot {
            identifier: name.to_owned(),
            scope,
            ty: ty.clone(),
            kind,
        }))
    }

    /// Builds a struct variable with all declared members.
    pub fn initialize_struct(&mut self, name: &str, scope: Scope, struct_name: &str, init: Init) -> Result<Handle> {
        let def = self
            .defs
            .struct_def(struct_name)
            .cloned()
            .ok_or_else(|| Error::UndefinedStruct(struct_name.to_owned()))?;
        let mut members = Vec::with_capacity(def.members().len());
        for (member, ty) in def.members() {
            let handle = self.materialize(&format!("{name}.{member}"), Scope::Element, ty, init)?;
            members.push((member.clone(), handle));
        }
        Ok(self.alloc(Slot {
            identifier: name.to_owned(),
            scope,
            ty: SolType::Named(struct_name.to_owned()),
            kind: VarKind::Struct { members },
        }))
    }

    pub fn global(&mut self, name: &str, ty: SolType, value: Value) -> Handle {
        self.alloc(Slot {
            identifier: name.to_owned(),
            scope: Scope::Global,
            ty,
            kind: VarKind::Global {
                default: value.clone(),
                value,
                debug_override: None,
                usage_sites: Vec::new(),
            },
        })
    }

    /// Allocates a scalar holding `value`.
    pub fn scalar(&mut self, name: &str, scope: Scope, ty: SolType, value: Value) -> Handle {
        self.alloc(Slot {
            identifier: name.to_owned(),
            scope,
            ty,
            kind: VarKind::Scalar {
                initial: value.clone(),
                value,
            },
        })
    }

    /// Allocates a composite variable owning `kind`'s children.
    pub(crate) fn composite(&mut self, name: &str, scope: Scope, ty: SolType, kind: VarKind) -> Handle {
        self.alloc(Slot {
            identifier: name.to_owned(),
            scope,
            ty,
            kind,
        })
    }

    /// The value a read of the variable produces. Composite variables read
    /// as a reference to themselves.
    pub fn value(&self, handle: Handle) -> Value {
        match &self.get(handle).kind {
            VarKind::Scalar { value, .. } | VarKind::Enum { value } => value.clone(),
            VarKind::Global {
                value, debug_override, ..
            } => debug_override.clone().unwrap_or_else(|| value.clone()),
            VarKind::Array { .. } | VarKind::Struct { .. } | VarKind::Mapping { .. } => Value::Object(handle),
        }
    }

    pub fn set_value(&mut self, handle: Handle, new_value: Value) -> Result<()> {
        let slot = self.get_mut(handle);
        match &mut slot.kind {
            VarKind::Scalar { value, .. } | VarKind::Enum { value } | VarKind::Global { value, .. } => {
                *value = new_value;
                Ok(())
            }
            _ => Err(Error::NotAssignable(slot.identifier.clone())),
        }
    }

    pub fn elements(&self, array: Handle) -> Option<&[Handle]> {
        match &self.get(array).kind {
            VarKind::Array { elements } => Some(elements),
            _ => None,
        }
    }

    pub fn length(&self, array: Handle) -> Option<u64> {
        self.elements(array).map(|e| e.len() as u64)
    }

    /// Base type and declared length of an array variable.
    pub fn array_type(&self, array: Handle) -> Option<(&SolType, Option<u64>)> {
        match &self.get(array).ty {
            SolType::Array { base, length } => Some((base, *length)),
            _ => None,
        }
    }

    fn not_an_array(&self, handle: Handle) -> Error {
        Error::MalformedAccess(format!("`{}` is not an array", self.get(handle).identifier))
    }

    /// Element `index` of an array. Dynamic arrays grow up to `index`, the
    /// new elements hold the Top of the base type. Static arrays reject
    /// indices past their length, dynamic arrays indices that would grow
    /// them past `max_array_length`.
    pub fn get_or_create_element(&mut self, array: Handle, index: u64) -> Result<Handle> {
        let (base, length) = self
            .array_type(array)
            .map(|(b, l)| (b.clone(), l))
            .ok_or_else(|| self.not_an_array(array))?;
        let current = self.length(array).unwrap_or(0);
        if index < current {
            return self
                .elements(array)
                .map(|e| e[index as usize])
                .ok_or_else(|| self.not_an_array(array));
        }
        let grown = index.checked_add(1).filter(|grown| *grown <= self.max_array_length);
        let (Some(grown), None) = (grown, length) else {
            return Err(Error::IndexOutOfBounds {
                array: self.get(array).identifier.clone(),
                index: index.to_string(),
                length: length.unwrap_or(current),
            });
        };
        debug!("Extending `{}` to length {grown}", self.get(array).identifier);
        self.resize(array, grown, &base, Init::Top)?;
        self.elements(array)
            .and_then(|e| e.last().copied())
            .ok_or_else(|| self.not_an_array(array))
    }

    /// Grows or truncates an array to exactly `length` elements.
    pub fn resize(&mut self, array: Handle, length: u64, base: &SolType, init: Init) -> Result<()> {
        let name = self.get(array).identifier.clone();
        let current = self.length(array).ok_or_else(|| self.not_an_array(array))?;
        if length > self.max_array_length {
            return Err(Error::Unsupported(format!("`{name}` of length {length}")));
        }
        let mut added = Vec::new();
        for i in current..length {
            added.push(self.materialize(&format!("{name}[{i}]"), Scope::Element, base, init)?);
        }
        if let VarKind::Array { elements } = &mut self.get_mut(array).kind {
            elements.truncate(length as usize);
            elements.extend(added);
        }
        Ok(())
    }

    /// `array.push(value)`, or `array.push()` which appends a zero value.
    pub fn push(&mut self, array: Handle, value: Option<Value>) -> Result<Handle> {
        let (base, length) = self
            .array_type(array)
            .map(|(b, l)| (b.clone(), l))
            .ok_or_else(|| self.not_an_array(array))?;
        if length.is_some() {
            return Err(Error::MalformedAccess(format!(
                "push on static array `{}`",
                self.get(array).identifier
            )));
        }
        let current = self.length(array).unwrap_or(0);
        self.resize(array, current + 1, &base, Init::Zero)?;
        let element = self.get_or_create_element(array, current)?;
        match value {
            Some(Value::Object(src)) => self.assign_object(element, src)?,
            Some(value) => self.set_value(element, value.convert(&base))?,
            None => {}
        }
        Ok(element)
    }

    pub fn pop(&mut self, array: Handle) -> Result<()> {
        let (base, length) = self
            .array_type(array)
            .map(|(b, l)| (b.clone(), l))
            .ok_or_else(|| self.not_an_array(array))?;
        if length.is_some() {
            return Err(Error::MalformedAccess(format!(
                "pop on static array `{}`",
                self.get(array).identifier
            )));
        }
        let current = self.length(array).unwrap_or(0);
        // Popping an empty array reverts, nothing changes.
        if current > 0 {
            self.resize(array, current - 1, &base, Init::Zero)?;
        }
        Ok(())
    }

    pub fn entries(&self, mapping: Handle) -> Option<&BTreeMap<String, Handle>> {
        match &self.get(mapping).kind {
            VarKind::Mapping { entries } => Some(entries),
            _ => None,
        }
    }

    /// The entry for `key`, created with Bottom values the first time it is
    /// accessed. Later calls return the same variable.
    pub fn get_or_create(&mut self, mapping: Handle, key: &str) -> Result<Handle> {
        let slot = self.get(mapping);
        let (VarKind::Mapping { entries }, SolType::Mapping { value, .. }) = (&slot.kind, &slot.ty) else {
            return Err(Error::MalformedAccess(format!("`{}` is not a mapping", slot.identifier)));
        };
        if let Some(existing) = entries.get(key) {
            return Ok(*existing);
        }
        let name = format!("{}[{key}]", slot.identifier);
        let value_ty = (**value).clone();
        debug!("Creating mapping entry `{name}`");
        let entry = self.materialize(&name, Scope::Element, &value_ty, Init::Bottom)?;
        if let VarKind::Mapping { entries } = &mut self.get_mut(mapping).kind {
            entries.insert(key.to_owned(), entry);
        }
        Ok(entry)
    }

    pub fn member(&self, structure: Handle, name: &str) -> Result<Handle> {
        let slot = self.get(structure);
        let VarKind::Struct { members } = &slot.kind else {
            return Err(Error::MalformedAccess(format!("`{}` is not a struct", slot.identifier)));
        };
        members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, handle)| *handle)
            .ok_or_else(|| Error::UnknownMember {
                container: slot.identifier.clone(),
                member: name.to_owned(),
            })
    }

    pub fn children(&self, handle: Handle) -> Vec<Handle> {
        match &self.get(handle).kind {
            VarKind::Array { elements } => elements.clone(),
            VarKind::Struct { members } => members.iter().map(|(_, h)| *h).collect(),
            VarKind::Mapping { entries } => entries.values().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// The variable and everything it owns, parents before children.
    pub fn subtree(&self, handle: Handle) -> Vec<Handle> {
        let mut result = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        result
    }

    /// The slots of `handle` and everything it owns, for a later
    /// [`Heap::restore_subtree`].
    pub fn save_subtree(&self, handle: Handle) -> Vec<(Handle, Slot)> {
        self.subtree(handle)
            .into_iter()
            .map(|h| (h, self.get(h).clone()))
            .collect()
    }

    /// Puts saved slots back. Slots allocated since the save stay in the
    /// arena but are no longer reachable from the restored variable.
    pub fn restore_subtree(&mut self, saved: Vec<(Handle, Slot)>) {
        for (handle, slot) in saved {
            self.replace(handle, slot);
        }
    }

    /// Copies a whole variable into fresh slots.
    pub fn deep_copy(&mut self, handle: Handle, name: &str, scope: Scope) -> Handle {
        let slot = self.get(handle).clone();
        let kind = match slot.kind {
            VarKind::Array { elements } => VarKind::Array {
                elements: elements
                    .iter()
                    .enumerate()
                    .map(|(i, e)| self.deep_copy(*e, &format!("{name}[{i}]"), Scope::Element))
                    .collect(),
            },
            VarKind::Struct { members } => VarKind::Struct {
                members: members
                    .iter()
                    .map(|(m, h)| (m.clone(), self.deep_copy(*h, &format!("{name}.{m}"), Scope::Element)))
                    .collect(),
            },
            VarKind::Mapping { entries } => VarKind::Mapping {
                entries: entries
                    .iter()
                    .map(|(k, h)| (k.clone(), self.deep_copy(*h, &format!("{name}[{k}]"), Scope::Element)))
                    .collect(),
            },
            VarKind::Global { .. } => {
                let value = self.value(handle);
                VarKind::Scalar {
                    initial: value.clone(),
                    value,
                }
            }
            kind => kind,
        };
        self.alloc(Slot {
            identifier: name.to_owned(),
            scope,
            ty: slot.ty,
            kind,
        })
    }

    /// Value assignment of a whole variable: `dst = src` for structs and
    /// arrays copies every element.
    pub fn assign_object(&mut self, dst: Handle, src: Handle) -> Result<()> {
        if dst == src {
            return Ok(());
        }
        let name = self.get(dst).identifier.clone();
        let src_kind = self.get(src).kind.clone();
        match src_kind {
            VarKind::Scalar { .. } | VarKind::Enum { .. } | VarKind::Global { .. } => {
                let value = self.value(src);
                self.set_value(dst, value)
            }
            VarKind::Array { elements } => {
                let copies = elements
                    .iter()
                    .enumerate()
                    .map(|(i, e)| self.deep_copy(*e, &format!("{name}[{i}]"), Scope::Element))
                    .collect();
                match &mut self.get_mut(dst).kind {
                    VarKind::Array { elements } => {
                        *elements = copies;
                        Ok(())
                    }
                    _ => Err(Error::NotAssignable(name)),
                }
            }
            VarKind::Struct { members } => {
                for (member, handle) in members {
                    let target = self.member(dst, &member)?;
                    self.assign_object(target, handle)?;
                }
                Ok(())
            }
            VarKind::Mapping { entries } => {
                let copies = entries
                    .iter()
                    .map(|(k, h)| (k.clone(), self.deep_copy(*h, &format!("{name}[{k}]"), Scope::Element)))
                    .collect();
                match &mut self.get_mut(dst).kind {
                    VarKind::Mapping { entries } => {
                        *entries = copies;
                        Ok(())
                    }
                    _ => Err(Error::NotAssignable(name)),
                }
            }
        }
    }

    /// Weak update: afterwards `dst` over-approximates both its old content
    /// and `src`.
    pub fn join_into(&mut self, dst: Handle, src: Handle) -> Result<()> {
        if dst == src {
            return Ok(());
        }
        let name = self.get(dst).identifier.clone();
        let src_kind = self.get(src).kind.clone();
        match src_kind {
            VarKind::Scalar { .. } | VarKind::Enum { .. } | VarKind::Global { .. } => {
                let joined = self.value(dst).join(&self.value(src));
                self.set_value(dst, joined)
            }
            VarKind::Array { elements } => {
                let existing = self.elements(dst).map(<[Handle]>::to_vec).ok_or(Error::NotAssignable(name.clone()))?;
                for (i, element) in elements.iter().enumerate() {
                    match existing.get(i) {
                        Some(target) => self.join_into(*target, *element)?,
                        None => {
                            let copy = self.deep_copy(*element, &format!("{name}[{i}]"), Scope::Element);
                            if let VarKind::Array { elements } = &mut self.get_mut(dst).kind {
                                elements.push(copy);
                            }
                        }
                    }
                }
                Ok(())
            }
            VarKind::Struct { members } => {
                for (member, handle) in members {
                    let target = self.member(dst, &member)?;
                    self.join_into(target, handle)?;
                }
                Ok(())
            }
            VarKind::Mapping { entries } => {
                for (key, handle) in entries {
                    let existing = self
                        .entries(dst)
                        .ok_or(Error::NotAssignable(name.clone()))?
                        .get(&key)
                        .copied();
                    match existing {
                        Some(target) => self.join_into(target, handle)?,
                        None => {
                            let copy = self.deep_copy(handle, &format!("{name}[{key}]"), Scope::Element);
                            if let VarKind::Mapping { entries } = &mut self.get_mut(dst).kind {
                                entries.insert(key, copy);
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Merges `other`, a clone of this heap taken while it had `base` slots
    /// that then went down another path. Slots `other` allocated since are
    /// copied over, every older variable ends up holding the join of both
    /// paths.
    pub fn join_path(&mut self, other: &Heap, base: usize) -> Result<Graft> {
        let graft = Graft {
            base,
            start: self.slots.len(),
        };
        for slot in other.slots.iter().skip(base) {
            self.alloc(graft.slot(slot));
        }
        for index in 0..base.min(other.slots.len()) {
            let theirs = graft.slot(&other.slots[index]);
            if theirs == self.slots[index] {
                continue;
            }
            let copy = self.alloc(theirs);
            self.join_into(Handle(index), copy)?;
        }
        Ok(graft)
    }

    /// Forgets everything about a variable: every scalar it owns becomes the
    /// Top of its type.
    pub fn havoc(&mut self, handle: Handle) -> Result<()> {
        debug!("Havoc `{}`", self.get(handle).identifier);
        for current in self.subtree(handle) {
            let slot = self.get(current);
            if slot.is_composite() {
                continue;
            }
            let top = self.initial_value(&slot.ty, &slot.identifier, Init::Top)?;
            self.set_value(current, top)?;
        }
        Ok(())
    }

    /// `delete x`: scalars go back to zero, dynamic arrays become empty.
    /// Mappings are left alone, like in Solidity.
    pub fn reset(&mut self, handle: Handle) -> Result<()> {
        let slot = self.get(handle);
        match &slot.kind {
            VarKind::Mapping { .. } => Ok(()),
            VarKind::Array { .. } if slot.ty.is_dynamic_array() => {
                if let VarKind::Array { elements } = &mut self.get_mut(handle).kind {
                    elements.clear();
                }
                Ok(())
            }
            VarKind::Array { .. } | VarKind::Struct { .. } => {
                for child in self.children(handle) {
                    self.reset(child)?;
                }
                Ok(())
            }
            _ => {
                let zero = self.initial_value(&slot.ty, &slot.identifier, Init::Zero)?;
                self.set_value(handle, zero)
            }
        }
    }

    /// Human readable form of a scalar, enums show their member name.
    pub fn describe(&self, handle: Handle) -> String {
        let slot = self.get(handle);
        let value = self.value(handle);
        if let (VarKind::Enum { .. }, SolType::Named(name), Value::UInt(index)) = (&slot.kind, &slot.ty, &value) {
            let member = index
                .as_singleton()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| self.defs.enum_def(name)?.member(i));
            if let Some(member) = member {
                return format!("{name}.{member}");
            }
        }
        value.to_string()
    }

    /// Every scalar reachable from `handle` with its access path, e.g.
    /// `("s.items[0]", "[0, 5]")`.
    pub fn flatten(&self, handle: Handle, prefix: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into(handle, prefix, &mut out);
        out
    }

    fn flatten_into(&self, handle: Handle, prefix: &str, out: &mut Vec<(String, String)>) {
        match &self.get(handle).kind {
            VarKind::Array { elements } if elements.is_empty() => out.push((prefix.to_owned(), "[]".to_owned())),
            VarKind::Array { elements } => {
                for (i, element) in elements.iter().enumerate() {
                    self.flatten_into(*element, &format!("{prefix}[{i}]"), out);
                }
            }
            VarKind::Struct { members } => {
                for (member, h) in members {
                    self.flatten_into(*h, &format!("{prefix}.{member}"), out);
                }
            }
            VarKind::Mapping { entries } if entries.is_empty() => out.push((prefix.to_owned(), "{}".to_owned())),
            VarKind::Mapping { entries } => {
                for (key, h) in entries {
                    self.flatten_into(*h, &format!("{prefix}[{key}]"), out);
                }
            }
            _ => out.push((prefix.to_owned(), self.describe(handle))),
        }
    }
}
