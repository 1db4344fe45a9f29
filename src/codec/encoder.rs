//! Arena-backed encoder from typed values into the generic value model.
//!
//! Containers under construction live in an arena and are addressed by
//! [`ContainerId`]. A nested object started while encoding its parent stays
//! writable until [`Encoder::finish`] assembles the tree, so fields can be
//! added to it after it has been attached.

use std::collections::BTreeMap;

use serde::ser::{self, Serialize};

use super::datetime;
use crate::error::{EncodeError, EncodeResult};
use embedql_core::Value;

/// Handle to a container in the encoder arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

impl ContainerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Either a finished value or a container still in the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Container(ContainerId),
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

impl From<ContainerId> for Slot {
    fn from(id: ContainerId) -> Self {
        Slot::Container(id)
    }
}

#[derive(Debug)]
enum Node {
    Object(BTreeMap<String, Slot>),
    Array(Vec<Slot>),
}

/// Builds one generic value tree.
#[derive(Debug, Default)]
pub struct Encoder {
    nodes: Vec<Option<Node>>,
    /// Field path of the value being serialized, for error messages
    path: Vec<String>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_object(&mut self) -> ContainerId {
        self.alloc(Node::Object(BTreeMap::new()))
    }

    pub fn begin_array(&mut self) -> ContainerId {
        self.alloc(Node::Array(Vec::new()))
    }

    /// Start an object stored under `key` of `parent`.
    pub fn nest_object(&mut self, parent: ContainerId, key: &str) -> EncodeResult<ContainerId> {
        let child = self.begin_object();
        self.insert(parent, key, child)?;
        Ok(child)
    }

    /// Start an array stored under `key` of `parent`.
    pub fn nest_array(&mut self, parent: ContainerId, key: &str) -> EncodeResult<ContainerId> {
        let child = self.begin_array();
        self.insert(parent, key, child)?;
        Ok(child)
    }

    /// Set `key` of an object container; a later insert of the same key wins.
    pub fn insert(
        &mut self,
        object: ContainerId,
        key: impl Into<String>,
        slot: impl Into<Slot>,
    ) -> EncodeResult<()> {
        match self.node_mut(object)? {
            Node::Object(map) => {
                map.insert(key.into(), slot.into());
                Ok(())
            }
            Node::Array(_) => Err(EncodeError::ContainerMismatch(object.0, "object")),
        }
    }

    /// Append to an array container.
    pub fn push(&mut self, array: ContainerId, slot: impl Into<Slot>) -> EncodeResult<()> {
        match self.node_mut(array)? {
            Node::Array(items) => {
                items.push(slot.into());
                Ok(())
            }
            Node::Object(_) => Err(EncodeError::ContainerMismatch(array.0, "array")),
        }
    }

    /// Serialize `value` into the arena.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<Slot> {
        self.path.clear();
        value.serialize(SlotSerializer { encoder: self })
    }

    /// Assemble the tree rooted at `root`. Every container may be attached
    /// at most once.
    pub fn finish(mut self, root: impl Into<Slot>) -> EncodeResult<Value> {
        self.resolve(root.into())
    }

    fn alloc(&mut self, node: Node) -> ContainerId {
        self.nodes.push(Some(node));
        ContainerId(self.nodes.len() - 1)
    }

    fn node_mut(&mut self, id: ContainerId) -> EncodeResult<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(EncodeError::ContainerReused(id.0))
    }

    fn resolve(&mut self, slot: Slot) -> EncodeResult<Value> {
        let id = match slot {
            Slot::Value(value) => return Ok(value),
            Slot::Container(id) => id,
        };

        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(EncodeError::ContainerReused(id.0))?;

        match node {
            Node::Object(map) => {
                let mut object = BTreeMap::new();
                for (key, slot) in map {
                    object.insert(key, self.resolve(slot)?);
                }
                Ok(Value::Object(object))
            }
            Node::Array(items) => items
                .into_iter()
                .map(|slot| self.resolve(slot))
                .collect::<EncodeResult<Vec<_>>>()
                .map(Value::Array),
        }
    }

    fn unsupported(&self, kind: &str) -> EncodeError {
        EncodeError::UnsupportedType {
            kind: kind.to_string(),
            path: self.path.concat(),
        }
    }

    /// Serialize a child value with `segment` appended to the error path.
    fn encode_child<T: Serialize + ?Sized>(&mut self, segment: String, value: &T) -> EncodeResult<Slot> {
        self.path.push(segment);
        let slot = value.serialize(SlotSerializer { encoder: &mut *self })?;
        self.path.pop();
        Ok(slot)
    }

    fn variant_wrapper(&mut self, variant: &str, inner: Slot) -> EncodeResult<Slot> {
        let outer = self.begin_object();
        self.insert(outer, variant, inner)?;
        Ok(Slot::Container(outer))
    }
}

/// serde `Serializer` writing into an [`Encoder`].
struct SlotSerializer<'e> {
    encoder: &'e mut Encoder,
}

impl<'e> ser::Serializer for SlotSerializer<'e> {
    type Ok = Slot;
    type Error = EncodeError;

    type SerializeSeq = SeqEncoder<'e>;
    type SerializeTuple = SeqEncoder<'e>;
    type SerializeTupleStruct = SeqEncoder<'e>;
    type SerializeTupleVariant = SeqEncoder<'e>;
    type SerializeMap = MapEncoder<'e>;
    type SerializeStruct = MapEncoder<'e>;
    type SerializeStructVariant = MapEncoder<'e>;

    fn serialize_bool(self, v: bool) -> EncodeResult<Slot> {
        Ok(Value::Boolean(v).into())
    }

    fn serialize_i8(self, v: i8) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> EncodeResult<Slot> {
        Ok(Value::Integer(v).into())
    }

    fn serialize_i128(self, _v: i128) -> EncodeResult<Slot> {
        Err(self.encoder.unsupported("i128"))
    }

    fn serialize_u8(self, v: u8) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u16(self, v: u16) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u32(self, v: u32) -> EncodeResult<Slot> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u64(self, v: u64) -> EncodeResult<Slot> {
        match i64::try_from(v) {
            Ok(i) => self.serialize_i64(i),
            Err(_) => Err(self.encoder.unsupported("u64 above i64::MAX")),
        }
    }

    fn serialize_u128(self, _v: u128) -> EncodeResult<Slot> {
        Err(self.encoder.unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> EncodeResult<Slot> {
        Ok(Value::Float(v as f64).into())
    }

    fn serialize_f64(self, v: f64) -> EncodeResult<Slot> {
        Ok(Value::Float(v).into())
    }

    fn serialize_char(self, v: char) -> EncodeResult<Slot> {
        Ok(Value::Text(v.to_string()).into())
    }

    fn serialize_str(self, v: &str) -> EncodeResult<Slot> {
        Ok(Value::Text(v.to_string()).into())
    }

    fn serialize_bytes(self, v: &[u8]) -> EncodeResult<Slot> {
        Ok(Value::Blob(v.to_vec()).into())
    }

    fn serialize_none(self) -> EncodeResult<Slot> {
        Ok(Value::Null.into())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> EncodeResult<Slot> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> EncodeResult<Slot> {
        Ok(Value::Null.into())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> EncodeResult<Slot> {
        Ok(Value::Null.into())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> EncodeResult<Slot> {
        Ok(Value::Text(variant.to_string()).into())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> EncodeResult<Slot> {
        if name != datetime::TOKEN {
            return value.serialize(self);
        }

        match value.serialize(SlotSerializer { encoder: &mut *self.encoder })? {
            Slot::Value(Value::Text(text)) => datetime::parse(&text)
                .map(|dt| Value::DateTime(dt).into())
                .ok_or_else(|| EncodeError::Custom(format!("invalid date/time '{}'", text))),
            _ => Err(self.encoder.unsupported("non-text date/time")),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> EncodeResult<Slot> {
        let inner = self.encoder.encode_child(format!(".{}", variant), value)?;
        self.encoder.variant_wrapper(variant, inner)
    }

    fn serialize_seq(self, _len: Option<usize>) -> EncodeResult<SeqEncoder<'e>> {
        let id = self.encoder.begin_array();
        Ok(SeqEncoder {
            encoder: self.encoder,
            id,
            wrapper: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> EncodeResult<SeqEncoder<'e>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> EncodeResult<SeqEncoder<'e>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> EncodeResult<SeqEncoder<'e>> {
        let outer = self.encoder.begin_object();
        let id = self.encoder.nest_array(outer, variant)?;
        self.encoder.path.push(format!(".{}", variant));
        Ok(SeqEncoder {
            encoder: self.encoder,
            id,
            wrapper: Some(outer),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> EncodeResult<MapEncoder<'e>> {
        let id = self.encoder.begin_object();
        Ok(MapEncoder {
            encoder: self.encoder,
            id,
            wrapper: None,
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> EncodeResult<MapEncoder<'e>> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> EncodeResult<MapEncoder<'e>> {
        let outer = self.encoder.begin_object();
        let id = self.encoder.nest_object(outer, variant)?;
        self.encoder.path.push(format!(".{}", variant));
        Ok(MapEncoder {
            encoder: self.encoder,
            id,
            wrapper: Some(outer),
            pending_key: None,
        })
    }
}

struct SeqEncoder<'e> {
    encoder: &'e mut Encoder,
    id: ContainerId,
    /// Outer `{variant: [...]}` object for tuple variants
    wrapper: Option<ContainerId>,
}

impl SeqEncoder<'_> {
    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        let index = match self.encoder.node_mut(self.id)? {
            Node::Array(items) => items.len(),
            Node::Object(_) => return Err(EncodeError::ContainerMismatch(self.id.0, "array")),
        };
        let slot = self.encoder.encode_child(format!("[{}]", index), value)?;
        self.encoder.push(self.id, slot)
    }

    fn done(self) -> EncodeResult<Slot> {
        match self.wrapper {
            Some(outer) => {
                self.encoder.path.pop();
                Ok(Slot::Container(outer))
            }
            None => Ok(Slot::Container(self.id)),
        }
    }
}

impl ser::SerializeSeq for SeqEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        self.element(value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

impl ser::SerializeTuple for SeqEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        self.element(value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

impl ser::SerializeTupleStruct for SeqEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        self.element(value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

impl ser::SerializeTupleVariant for SeqEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        self.element(value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

struct MapEncoder<'e> {
    encoder: &'e mut Encoder,
    id: ContainerId,
    /// Outer `{variant: {...}}` object for struct variants
    wrapper: Option<ContainerId>,
    pending_key: Option<String>,
}

impl MapEncoder<'_> {
    fn field<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> EncodeResult<()> {
        let slot = self.encoder.encode_child(format!(".{}", key), value)?;
        self.encoder.insert(self.id, key, slot)
    }

    fn done(self) -> EncodeResult<Slot> {
        match self.wrapper {
            Some(outer) => {
                self.encoder.path.pop();
                Ok(Slot::Container(outer))
            }
            None => Ok(Slot::Container(self.id)),
        }
    }
}

impl ser::SerializeMap for MapEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> EncodeResult<()> {
        match key.serialize(SlotSerializer { encoder: &mut *self.encoder })? {
            Slot::Value(Value::Text(key)) => {
                self.pending_key = Some(key);
                Ok(())
            }
            _ => Err(self.encoder.unsupported("non-string map key")),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| EncodeError::Custom("map value without a key".to_string()))?;
        self.field(key, value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

impl ser::SerializeStruct for MapEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> EncodeResult<()> {
        self.field(key.to_string(), value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

impl ser::SerializeStructVariant for MapEncoder<'_> {
    type Ok = Slot;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> EncodeResult<()> {
        self.field(key.to_string(), value)
    }

    fn end(self) -> EncodeResult<Slot> {
        self.done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_container_stays_writable() {
        let mut encoder = Encoder::new();
        let root = encoder.begin_object();
        let address = encoder.nest_object(root, "address").unwrap();
        encoder.insert(root, "name", Value::from("Alice")).unwrap();

        // Written after the parent already holds it
        encoder.insert(address, "city", Value::from("Lyon")).unwrap();

        let tags = encoder.nest_array(root, "tags").unwrap();
        encoder.push(tags, Value::from("a")).unwrap();
        let item = encoder.begin_object();
        encoder.push(tags, item).unwrap();
        encoder.insert(item, "n", Value::Integer(1)).unwrap();

        let value = encoder.finish(root).unwrap();
        let expected = Value::from(serde_json::json!({
            "name": "Alice",
            "address": {"city": "Lyon"},
            "tags": ["a", {"n": 1}],
        }));
        assert_eq!(value, expected);
    }

    #[test]
    fn test_container_kind_is_checked() {
        let mut encoder = Encoder::new();
        let list = encoder.begin_array();
        assert_eq!(
            encoder.insert(list, "x", Value::Null),
            Err(EncodeError::ContainerMismatch(list.index(), "object"))
        );
    }

    #[test]
    fn test_container_attached_twice() {
        let mut encoder = Encoder::new();
        let root = encoder.begin_array();
        let child = encoder.begin_object();
        encoder.push(root, child).unwrap();
        encoder.push(root, child).unwrap();
        assert_eq!(
            encoder.finish(root),
            Err(EncodeError::ContainerReused(child.index()))
        );
    }

    #[test]
    fn test_self_reference_does_not_loop() {
        let mut encoder = Encoder::new();
        let root = encoder.begin_object();
        encoder.insert(root, "me", root).unwrap();
        assert!(encoder.finish(root).is_err());
    }

    #[test]
    fn test_mixing_serde_and_manual_writes() {
        let mut encoder = Encoder::new();
        let root = encoder.begin_object();
        let numbers = encoder.encode(&vec![1, 2, 3]).unwrap();
        encoder.insert(root, "numbers", numbers.clone()).unwrap();
        if let Slot::Container(id) = numbers {
            encoder.push(id, Value::Integer(4)).unwrap();
        }
        let value = encoder.finish(root).unwrap();
        assert_eq!(value, Value::from(serde_json::json!({"numbers": [1, 2, 3, 4]})));
    }
}
