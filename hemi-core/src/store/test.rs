use super::object::{self, Header, HEADER_SIZE};
use super::{Field, Handle, Value, ValueType, NULL_REF};
use crate::ErrorKind;

use test_log::test;

#[test]
fn test_header_layout() {
    let header = Header::new(ValueType::DictNode, 12, Handle::from_raw(7)).unwrap();
    let mut bytes = [0xCCu8; HEADER_SIZE];
    header.write(&mut bytes);
    // tag, reserved, payload length, handle
    assert_eq!(bytes, [7, 0, 12, 0, 7, 0, 0, 0]);
    assert_eq!(Header::read(&bytes).unwrap(), header);
    assert_eq!(header.record_size(), 24);
}

#[test]
fn test_zeroed_header_is_rejected() {
    let err = Header::read(&[0u8; HEADER_SIZE]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);
    let err = Header::read(&[1u8, 0, 0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);
}

#[test]
fn test_oversized_payload() {
    let err = Header::new(ValueType::String, 70_000, Handle::from_raw(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);
}

#[test]
fn test_record_sizes_are_aligned() {
    assert_eq!(object::record_size(0), 8);
    assert_eq!(object::record_size(1), 16);
    assert_eq!(object::record_size(8), 16);
    assert_eq!(object::record_size(9), 24);
}

#[test]
fn test_list_node_payload() {
    let node = Value::ListNode { value: Some(Handle::from_raw(3)), next: None };
    let mut payload = [0u8; 8];
    object::encode_payload(&node, &mut payload);
    assert_eq!(&payload[4..], &NULL_REF.to_le_bytes());
    assert_eq!(object::decode_payload(ValueType::ListNode, &payload).unwrap(), node);

    object::write_ref(ValueType::ListNode, &mut payload, Field::Next, Some(Handle::from_raw(3))).unwrap();
    let next = object::read_ref(ValueType::ListNode, &payload, Field::Next).unwrap();
    assert_eq!(next, Some(Handle::from_raw(3)));

    let err = object::read_ref(ValueType::ListNode, &payload, Field::Key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectType);
}

#[test]
fn test_scalar_payloads() {
    let mut payload = [0u8; 8];
    object::encode_payload(&Value::Int(-42), &mut payload);
    assert_eq!(object::decode_payload(ValueType::Int, &payload).unwrap(), Value::Int(-42));

    let err = object::decode_payload(ValueType::Int, &payload[..4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);

    let err = object::decode_payload(ValueType::String, &[0xff, 0xfe]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);
}

#[test]
fn test_value_display() {
    assert_eq!(Value::Int(5).to_string(), "5");
    assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
    assert_eq!(Value::Bool(true).to_string(), "True");
    let node = Value::DictNode { key: Some(Handle::from_raw(1)), value: None, next: Some(Handle::from_raw(0)) };
    assert_eq!(node.to_string(), "key = &1; value = null; next = &0");
}

#[test]
fn test_short_node_payload() {
    let err = object::read_ref(ValueType::ListNode, &[0u8; 4], Field::Next).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadFormat);
    assert_eq!(object::read_ref(ValueType::ListNode, &[0xFFu8; 8], Field::Next).unwrap(), None);
}
