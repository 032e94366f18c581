use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::object::Object;

/// A mapping from Name-bytes to [`Object`], preserving insertion order so
/// that re-saving a dict round-trips its key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::DictKeyNotFound(key.to_vec()))
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0.get_mut(key).ok_or_else(|| Error::DictKeyNotFound(key.to_vec()))
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        matches!(self.get_type(), Ok(t) if t == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"<<\n");
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend(crate::object::serialize_name(key));
            out.push(b' ');
            out.extend(crate::object::serialize(value));
        }
        out.extend_from_slice(b"\n>>");
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Dictionary
where
    K: Into<Vec<u8>>,
    V: Into<Object>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_on_serialize() {
        let mut dict = Dictionary::new();
        dict.set(b"B".to_vec(), Object::Integer(2));
        dict.set(b"A".to_vec(), Object::Integer(1));
        let bytes = dict.to_bytes();
        let b_pos = bytes.windows(1).position(|w| w == b"B").unwrap();
        let a_pos = bytes.windows(1).position(|w| w == b"A").unwrap();
        assert!(b_pos < a_pos);
    }

    #[test]
    fn get_type_and_has_type() {
        let mut dict = Dictionary::new();
        dict.set(b"Type".to_vec(), Object::Name(b"ObjStm".to_vec()));
        assert!(dict.has_type(b"ObjStm"));
        assert!(!dict.has_type(b"Catalog"));
    }
}
