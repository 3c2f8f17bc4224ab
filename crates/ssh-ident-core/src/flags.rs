//! Closed, read-only sets of named integer flags.
//!
//! A [`FlagSet`] is declared once from an ordered list of positional names
//! plus optional explicit `(name, value)` overrides, and never changes
//! afterwards. Positional names are allocated either as powers of two
//! (index 0 is the zero "no flags" entry, index `i` gets `2^(i-1)`) or as
//! sequential integers starting at 1.
//!
//! Lookups go both ways: [`FlagSet::resolve`] accepts a name (compared
//! upper-cased) or a declared value, [`FlagSet::name_of`] maps a single
//! declared value back to its name. OR-combinations of flags are valid
//! runtime masks but have no name of their own.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

/// Errors raised by flag set construction and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("duplicate value {value} for {name}")]
    DuplicateValue { name: String, value: u32 },

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("too many flags for power-of-two allocation ({0})")]
    TooManyFlags(usize),

    #[error("unsupported mutation: flag sets are read-only")]
    UnsupportedMutation,
}

/// How positional names are turned into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Allocation {
    /// `0, 1, 2, 4, 8, ...` in declaration order.
    #[default]
    PowerOfTwo,
    /// `1, 2, 3, ...` in declaration order.
    Sequential,
}

impl Allocation {
    fn value_at(self, index: usize) -> Option<u32> {
        match self {
            Allocation::Sequential => u32::try_from(index + 1).ok(),
            Allocation::PowerOfTwo if index == 0 => Some(0),
            Allocation::PowerOfTwo => u32::try_from(index - 1)
                .ok()
                .and_then(|shift| 1u32.checked_shl(shift)),
        }
    }
}

/// A lookup key: either a flag name or a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKey<'a> {
    Name(&'a str),
    Value(u32),
}

impl<'a> From<&'a str> for FlagKey<'a> {
    fn from(name: &'a str) -> Self {
        FlagKey::Name(name)
    }
}

impl From<u32> for FlagKey<'_> {
    fn from(value: u32) -> Self {
        FlagKey::Value(value)
    }
}

impl fmt::Display for FlagKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagKey::Name(name) => f.write_str(name),
            FlagKey::Value(value) => write!(f, "{value}"),
        }
    }
}

/// An immutable registry of named flags.
#[derive(Debug, Clone)]
pub struct FlagSet {
    /// Names in declaration order (positional first, then explicit).
    order: Vec<String>,
    values: HashMap<String, u32>,
    names: BTreeMap<u32, String>,
    allocation: Allocation,
}

impl FlagSet {
    /// Build a flag set.
    ///
    /// Names are stored upper-cased. A `named` entry that repeats a
    /// positional name replaces its allocated value; the positional slot
    /// is still consumed. Fails if a name repeats within one list, if two
    /// entries end up with the same value, or if power-of-two allocation
    /// runs past `u32`.
    pub fn new(
        positional: &[&str],
        named: &[(&str, u32)],
        allocation: Allocation,
    ) -> Result<Self, FlagError> {
        let mut set = Self {
            order: Vec::with_capacity(positional.len() + named.len()),
            values: HashMap::new(),
            names: BTreeMap::new(),
            allocation,
        };

        let overridden: HashSet<String> =
            named.iter().map(|(name, _)| name.to_uppercase()).collect();

        for (index, name) in positional.iter().enumerate() {
            let value = allocation
                .value_at(index)
                .ok_or(FlagError::TooManyFlags(positional.len()))?;
            if overridden.contains(&name.to_uppercase()) {
                continue;
            }
            set.declare(name, value)?;
        }
        for &(name, value) in named {
            set.declare(name, value)?;
        }

        Ok(set)
    }

    fn declare(&mut self, name: &str, value: u32) -> Result<(), FlagError> {
        let name = name.to_uppercase();
        if self.values.contains_key(&name) {
            return Err(FlagError::DuplicateName(name));
        }
        if self.names.contains_key(&value) {
            return Err(FlagError::DuplicateValue { name, value });
        }
        self.values.insert(name.clone(), value);
        self.names.insert(value, name.clone());
        self.order.push(name);
        Ok(())
    }

    /// Canonical value for a name (case-insensitive) or a declared value.
    pub fn resolve<'a>(&self, key: impl Into<FlagKey<'a>>) -> Result<u32, FlagError> {
        match key.into() {
            FlagKey::Name(name) => self
                .values
                .get(&name.to_uppercase())
                .copied()
                .ok_or_else(|| FlagError::UnknownKey(name.to_string())),
            FlagKey::Value(value) if self.names.contains_key(&value) => Ok(value),
            FlagKey::Value(value) => Err(FlagError::UnknownKey(value.to_string())),
        }
    }

    /// Name of the flag declared with exactly `value`.
    ///
    /// Composite masks return `None`.
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    /// Whether `key` is exactly a declared name or equals a declared value.
    ///
    /// Unlike [`FlagSet::resolve`], names are compared case-sensitively.
    pub fn contains<'a>(&self, key: impl Into<FlagKey<'a>>) -> bool {
        match key.into() {
            FlagKey::Name(name) => self.values.contains_key(name),
            FlagKey::Value(value) => self.names.contains_key(&value),
        }
    }

    /// `(value, name)` pairs in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(&value, name)| (value, name.as_str()))
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Always fails: members cannot be added or reassigned.
    pub fn set<'a>(&self, _key: impl Into<FlagKey<'a>>, _value: u32) -> Result<(), FlagError> {
        Err(FlagError::UnsupportedMutation)
    }

    /// Always fails: members cannot be removed.
    pub fn remove<'a>(&self, _key: impl Into<FlagKey<'a>>) -> Result<(), FlagError> {
        Err(FlagError::UnsupportedMutation)
    }

    /// Render a mask as `NAME|NAME`, lowest bit first.
    ///
    /// Only single-bit members take part. Bits with no name are appended
    /// as one hex literal. An empty mask renders as the zero-valued name,
    /// or `0` if there is none.
    pub fn render(&self, mask: u32) -> String {
        if mask == 0 {
            return self.name_of(0).unwrap_or("0").to_string();
        }

        let mut parts = Vec::new();
        let mut rest = mask;
        for (value, name) in self.iter() {
            if value.is_power_of_two() && mask & value != 0 {
                parts.push(name.to_string());
                rest &= !value;
            }
        }
        if rest != 0 {
            parts.push(format!("{rest:#x}"));
        }
        parts.join("|")
    }
}
