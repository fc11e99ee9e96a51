use num_enum::{IntoPrimitive, TryFromPrimitive};
use ordered_float::OrderedFloat;
use std::fmt;

pub mod object;

#[cfg(test)]
pub mod test;

pub use object::{Header, ALIGNMENT, HEADER_SIZE, MAX_PAYLOAD};

// The encoded form of a null reference field
pub const NULL_REF: u32 = u32::MAX;

// The tag values start at 1 so that a zeroed
// half never decodes as a valid record
#[derive(IntoPrimitive, TryFromPrimitive)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ValueType {
    None = 1,
    Bool,
    Int,
    Float,
    String,
    ListNode,
    DictNode,
}

impl ValueType {
    /// The payload size for fixed-shape types. Strings are the only
    /// type whose payload size comes from the caller.
    pub fn fixed_payload(&self) -> Option<usize> {
        use ValueType::*;
        match self {
            None => Some(0),
            Bool => Some(1),
            Int | Float => Some(8),
            String => Option::None,
            ListNode => Some(8),
            DictNode => Some(12),
        }
    }

    /// The reference fields of this type, in tracing order.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            ValueType::ListNode => &[Field::Value, Field::Next],
            ValueType::DictNode => &[Field::Key, Field::Value, Field::Next],
            _ => &[],
        }
    }

    pub fn is_compound(&self) -> bool {
        !self.fields().is_empty()
    }

    // Byte offset of a reference field within the payload
    pub(crate) fn field_offset(&self, field: Field) -> Option<usize> {
        use Field::*;
        match (self, field) {
            (ValueType::ListNode, Value) => Some(0),
            (ValueType::ListNode, Next) => Some(4),
            (ValueType::DictNode, Key) => Some(0),
            (ValueType::DictNode, Value) => Some(4),
            (ValueType::DictNode, Next) => Some(8),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use ValueType::*;
        match self {
            None => "none",
            Bool => "bool",
            Int => "int",
            Float => "float",
            String => "string",
            ListNode => "list-node",
            DictNode => "dict-node",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Field {
    Key,
    Value,
    Next,
}

/// A stable name for an object in a heap. Handles never change
/// across collections, while the address they resolve to may.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Handle(u32);

impl Handle {
    // Raw handles come from outside the heap and are checked
    // on every resolve, so building one is not unsafe
    pub fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn encode(h: Option<Handle>) -> u32 {
        h.map(|h| h.0).unwrap_or(NULL_REF)
    }

    pub(crate) fn decode(raw: u32) -> Option<Handle> {
        if raw == NULL_REF { None } else { Some(Handle(raw)) }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "&{}", self.0)
    }
}

/// An owned copy of an object's contents, decoded out of the pool.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
    ListNode { value: Option<Handle>, next: Option<Handle> },
    DictNode { key: Option<Handle>, value: Option<Handle>, next: Option<Handle> },
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::ListNode { .. } => ValueType::ListNode,
            Value::DictNode { .. } => ValueType::DictNode,
        }
    }

    pub fn payload_size(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            v => v.value_type().fixed_payload().unwrap_or(0),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self { Value::Int(i) => Some(*i), _ => None }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self { Value::Float(f) => Some(f.into_inner()), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::String(s) => Some(s), _ => None }
    }

    pub fn field(&self, field: Field) -> Option<Handle> {
        match (self, field) {
            (Value::ListNode { value, .. }, Field::Value) => *value,
            (Value::ListNode { next, .. }, Field::Next) => *next,
            (Value::DictNode { key, .. }, Field::Key) => *key,
            (Value::DictNode { value, .. }, Field::Value) => *value,
            (Value::DictNode { next, .. }, Field::Next) => *next,
            _ => None,
        }
    }
}

struct Ref(Option<Handle>);

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(h) => write!(f, "{}", h),
            None => f.write_str("null"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x.into_inner()),
            Value::String(s) => write!(f, "{:?}", s),
            Value::ListNode { value, next } =>
                write!(f, "value = {}; next = {}", Ref(*value), Ref(*next)),
            Value::DictNode { key, value, next } =>
                write!(f, "key = {}; value = {}; next = {}", Ref(*key), Ref(*value), Ref(*next)),
        }
    }
}
