//! In-memory form of the serialized tag tree an avatar is loaded from.
//!
//! Accessors never fail: a missing key or a value of the wrong shape reads as `None`
//! and the loader substitutes a neutral default.

use std::collections::HashMap;

use cgmath::{Vector2, Vector3};

#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    Byte(i8),
    Int(i32),
    Float(f32),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
    ByteArray(Vec<u8>),
}

impl Tag {
    pub fn compound<K: Into<String>>(entries: impl IntoIterator<Item = (K, Tag)>) -> Self {
        Tag::Compound(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn floats(values: &[f32]) -> Self {
        Tag::List(values.iter().copied().map(Tag::Float).collect())
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Tag::Float(v) => Some(v),
            Tag::Int(v) => Some(v as f32),
            Tag::Byte(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Tag::Int(v) => Some(v),
            Tag::Byte(v) => Some(v as i32),
            _ => None,
        }
    }

    /// Bytes and ints read as booleans, non-zero being `true`.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i32().map(|v| v != 0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// A list made only of floats. Anything else in the list makes the whole value
    /// unreadable.
    pub fn as_floats(&self) -> Option<Vec<f32>> {
        self.as_list()?
            .iter()
            .map(|item| match item {
                Tag::Float(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn vec2(&self) -> Option<Vector2<f32>> {
        match self.as_floats()?.as_slice() {
            [x, y, ..] => Some(Vector2::new(*x, *y)),
            _ => None,
        }
    }

    pub fn vec3(&self) -> Option<Vector3<f32>> {
        match self.as_floats()?.as_slice() {
            [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key)?.as_f32()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_list(&self, key: &str) -> Option<&[Tag]> {
        self.get(key)?.as_list()
    }

    pub fn get_vec2(&self, key: &str) -> Option<Vector2<f32>> {
        self.get(key)?.vec2()
    }

    pub fn get_vec3(&self, key: &str) -> Option<Vector3<f32>> {
        self.get(key)?.vec3()
    }
}

impl From<f32> for Tag {
    fn from(value: f32) -> Self {
        Tag::Float(value)
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value)
    }
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Tag::Byte(value as i8)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<Vec<Tag>> for Tag {
    fn from(value: Vec<Tag>) -> Self {
        Tag::List(value)
    }
}

impl From<Vec<u8>> for Tag {
    fn from(value: Vec<u8>) -> Self {
        Tag::ByteArray(value)
    }
}
