
/*
 * The object record format is as follows. All integers are little endian.
 *
 * Every record starts with an 8 byte header:
 * | BYTE_LENGTH | VALUE
 * |          1  | The type tag
 * |          1  | Reserved, always zero
 * |          2  | The payload length in bytes (without padding)
 * |          4  | The handle owning this record
 *
 * The record is then padded so that the next one starts on an
 * ALIGNMENT boundary relative to the base of the half.
 *
 * None: Just the header
 *
 * Bool:
 * | BYTE_LENGTH | VALUE
 * |          1  | 0 or 1
 *
 * Int, Float:
 * | BYTE_LENGTH | VALUE
 * |          8  | The i64, f64 value
 *
 * String:
 * | BYTE_LENGTH | VALUE
 * |         len | The UTF-8 bytes, len is taken from the header
 *
 * ListNode:
 * | BYTE_LENGTH | VALUE
 * |          4  | Handle of the element value
 * |          4  | Handle of the next node
 *
 * DictNode:
 * | BYTE_LENGTH | VALUE
 * |          4  | Handle of the key
 * |          4  | Handle of the value
 * |          4  | Handle of the next node
 *
 * Reference fields holding NULL_REF are empty.
 */

use bytes::{Buf, BufMut};
use ordered_float::OrderedFloat;

use super::{Field, Handle, Value, ValueType};
use crate::{Error, ErrorKind, Result};

pub const HEADER_SIZE: usize = 8;
pub const ALIGNMENT: usize = 8;
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

pub fn align_up(n: usize) -> usize {
    (n + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT
}

/// Size of a whole record (header, payload and padding).
pub fn record_size(payload: usize) -> usize {
    align_up(HEADER_SIZE + payload)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header {
    pub tag: ValueType,
    pub payload: u16,
    pub handle: Handle,
}

impl Header {
    pub fn new(tag: ValueType, payload: usize, handle: Handle) -> Result<Self> {
        let payload = u16::try_from(payload).map_err(|_| Error::new(ErrorKind::BadFormat,
            format!("{} payload of {} bytes does not fit a record", tag, payload)))?;
        Ok(Self { tag, payload, handle })
    }

    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::new_const(ErrorKind::BadFormat, "truncated record header"));
        }
        let mut buf = &bytes[..HEADER_SIZE];
        let raw_tag = buf.get_u8();
        let tag = ValueType::try_from(raw_tag).map_err(|_| Error::new(ErrorKind::BadFormat,
            format!("unknown type tag {:#04x}", raw_tag)))?;
        let _reserved = buf.get_u8();
        let payload = buf.get_u16_le();
        let handle = Handle::from_raw(buf.get_u32_le());
        Ok(Self { tag, payload, handle })
    }

    pub fn write(&self, bytes: &mut [u8]) {
        let mut buf = &mut bytes[..HEADER_SIZE];
        buf.put_u8(self.tag.into());
        buf.put_u8(0);
        buf.put_u16_le(self.payload);
        buf.put_u32_le(self.handle.raw());
    }

    pub fn payload_len(&self) -> usize {
        self.payload as usize
    }

    pub fn record_size(&self) -> usize {
        record_size(self.payload_len())
    }
}

pub fn encode_payload(value: &Value, out: &mut [u8]) {
    let mut buf = out;
    match value {
        Value::None => (),
        Value::Bool(b) => buf.put_u8(*b as u8),
        Value::Int(i) => buf.put_i64_le(*i),
        Value::Float(f) => buf.put_f64_le(f.into_inner()),
        Value::String(s) => buf.put_slice(s.as_bytes()),
        Value::ListNode { value, next } => {
            buf.put_u32_le(Handle::encode(*value));
            buf.put_u32_le(Handle::encode(*next));
        }
        Value::DictNode { key, value, next } => {
            buf.put_u32_le(Handle::encode(*key));
            buf.put_u32_le(Handle::encode(*value));
            buf.put_u32_le(Handle::encode(*next));
        }
    }
}

pub fn decode_payload(tag: ValueType, payload: &[u8]) -> Result<Value> {
    if let Some(expected) = tag.fixed_payload() {
        if payload.len() != expected {
            return Err(Error::new(ErrorKind::BadFormat,
                format!("{} payload is {} bytes, expected {}", tag, payload.len(), expected)));
        }
    }
    let mut buf = payload;
    Ok(match tag {
        ValueType::None => Value::None,
        ValueType::Bool => Value::Bool(buf.get_u8() != 0),
        ValueType::Int => Value::Int(buf.get_i64_le()),
        ValueType::Float => Value::Float(OrderedFloat(buf.get_f64_le())),
        ValueType::String => {
            let s = std::str::from_utf8(payload).map_err(|e| Error::new(ErrorKind::BadFormat, e))?;
            Value::String(s.to_owned())
        }
        ValueType::ListNode => Value::ListNode {
            value: Handle::decode(buf.get_u32_le()),
            next: Handle::decode(buf.get_u32_le()),
        },
        ValueType::DictNode => Value::DictNode {
            key: Handle::decode(buf.get_u32_le()),
            value: Handle::decode(buf.get_u32_le()),
            next: Handle::decode(buf.get_u32_le()),
        },
    })
}

fn ref_offset(tag: ValueType, len: usize, field: Field) -> Result<usize> {
    let off = tag.field_offset(field).ok_or_else(|| Error::new(ErrorKind::IncorrectType,
        format!("{} has no {:?} field", tag, field)))?;
    if off + 4 > len {
        return Err(Error::new(ErrorKind::BadFormat,
            format!("{} payload of {} bytes is too short for its {:?} field", tag, len, field)));
    }
    Ok(off)
}

pub fn read_ref(tag: ValueType, payload: &[u8], field: Field) -> Result<Option<Handle>> {
    let off = ref_offset(tag, payload.len(), field)?;
    let mut buf = &payload[off..off + 4];
    Ok(Handle::decode(buf.get_u32_le()))
}

pub fn write_ref(tag: ValueType, payload: &mut [u8], field: Field, target: Option<Handle>) -> Result<()> {
    let off = ref_offset(tag, payload.len(), field)?;
    let mut buf = &mut payload[off..off + 4];
    buf.put_u32_le(Handle::encode(target));
    Ok(())
}
