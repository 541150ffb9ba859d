use core::fmt::Display;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Solidity types as far as the value model cares about them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SolType {
    UInt(u16),
    Int(u16),
    Bool,
    Address,
    /// `bytes1` to `bytes32`.
    FixedBytes(u8),
    Bytes,
    String,
    /// `length` is `None` for dynamic arrays.
    Array {
        base: Box<SolType>,
        length: Option<u64>,
    },
    Mapping {
        key: Box<SolType>,
        value: Box<SolType>,
    },
    /// A struct, enum or contract name. Which one it is depends on the
    /// definitions of the contract.
    Named(String),
}

impl SolType {
    pub fn array(base: SolType, length: Option<u64>) -> Self {
        SolType::Array {
            base: Box::new(base),
            length,
        }
    }

    pub fn mapping(key: SolType, value: SolType) -> Self {
        SolType::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn uint256() -> Self {
        SolType::UInt(256)
    }

    /// Types whose values are a single abstract value.
    pub fn is_elementary(&self) -> bool {
        matches!(
            self,
            SolType::UInt(_)
                | SolType::Int(_)
                | SolType::Bool
                | SolType::Address
                | SolType::FixedBytes(_)
                | SolType::Bytes
                | SolType::String
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, SolType::UInt(_) | SolType::Int(_))
    }

    pub fn is_dynamic_array(&self) -> bool {
        matches!(self, SolType::Array { length: None, .. })
    }

    /// `bytes` and `string` are not abstracted, they only carry symbolic
    /// placeholders.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, SolType::Bytes | SolType::String)
    }

    fn parse_elementary(text: &str) -> Option<Self> {
        let sized = |prefix: &str, default: u16, max: u16, step: u16| -> Option<u16> {
            let rest = text.strip_prefix(prefix)?;
            if rest.is_empty() {
                return Some(default);
            }
            let bits = rest.parse::<u16>().ok()?;
            (bits > 0 && bits <= max && bits % step == 0).then_some(bits)
        };
        match text {
            "bool" => return Some(SolType::Bool),
            "address" | "address payable" => return Some(SolType::Address),
            "bytes" => return Some(SolType::Bytes),
            "string" => return Some(SolType::String),
            "byte" => return Some(SolType::FixedBytes(1)),
            _ => {}
        }
        if let Some(bits) = sized("uint", 256, 256, 8) {
            return Some(SolType::UInt(bits));
        }
        if let Some(bits) = sized("int", 256, 256, 8) {
            return Some(SolType::Int(bits));
        }
        if text.len() > "bytes".len() {
            if let Some(width) = sized("bytes", 32, 32, 1) {
                return u8::try_from(width).ok().map(SolType::FixedBytes);
            }
        }
        None
    }

    fn is_identifier(text: &str) -> bool {
        let mut chars = text.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
    }
}

impl Display for SolType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SolType::UInt(bits) => write!(f, "uint{bits}"),
            SolType::Int(bits) => write!(f, "int{bits}"),
            SolType::Bool => write!(f, "bool"),
            SolType::Address => write!(f, "address"),
            SolType::FixedBytes(width) => write!(f, "bytes{width}"),
            SolType::Bytes => write!(f, "bytes"),
            SolType::String => write!(f, "string"),
            SolType::Array {
                base,
                length: Some(length),
            } => write!(f, "{base}[{length}]"),
            SolType::Array { base, length: None } => write!(f, "{base}[]"),
            SolType::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
            SolType::Named(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for SolType {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let unsupported = || Error::UnsupportedType(text.to_owned());

        // Array suffixes bind tightest at the end: `uint[2][]` is a dynamic
        // array of `uint[2]`.
        if let Some(inner) = text.strip_suffix(']') {
            let open = inner.rfind('[').ok_or_else(unsupported)?;
            let base = inner[..open].parse::<SolType>()?;
            let size = inner[open + 1..].trim();
            let length = if size.is_empty() {
                None
            } else {
                Some(size.parse::<u64>().map_err(|_| unsupported())?)
            };
            return Ok(SolType::array(base, length));
        }

        if let Some(body) = text
            .strip_prefix("mapping")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let arrow = body.find("=>").ok_or_else(unsupported)?;
            let key = body[..arrow].trim().parse::<SolType>()?;
            let value = body[arrow + 2..].trim().parse::<SolType>()?;
            return Ok(SolType::mapping(key, value));
        }

        if let Some(ty) = Self::parse_elementary(text) {
            return Ok(ty);
        }
        if Self::is_identifier(text) {
            return Ok(SolType::Named(text.to_owned()));
        }
        Err(unsupported())
    }
}
