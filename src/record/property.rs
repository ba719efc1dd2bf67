/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::codec;
use crate::error::{Result, StoreError, StoreKind};
use crate::record::{LabelId, PropertyId, TextId};

/// The on-disk size of a property record.
pub const PROPERTY_RECORD_SIZE: usize = 17;

/// Type tags for the 8-byte payload of a property record.
///
/// The gaps are reserved for types that are not implemented: fraction (0x03),
/// complex (0x04), unichar (0x05), date (0x21), time (0x22), array (0x40),
/// and map (0x41).
pub(crate) const TAG_NOTHING: u8 = 0x00;
pub(crate) const TAG_INTEGER: u8 = 0x01;
pub(crate) const TAG_REAL: u8 = 0x02;
pub(crate) const TAG_EMPTY_TEXT: u8 = 0x10;
pub(crate) const TAG_TEXT_BASE: u8 = 0x10;
pub(crate) const TAG_LONG_TEXT: u8 = 0x19;
pub(crate) const TAG_DATETIME: u8 = 0x20;
pub(crate) const TAG_FALSE: u8 = 0x30;
pub(crate) const TAG_TRUE: u8 = 0x31;

/// A decoded property value.
///
/// Text up to 8 bytes is stored inline in the record's payload; longer text
/// is spilled to the text store and shows up as [`PropertyValue::LongText`]
/// when read back at the record level. The property store resolves the
/// indirection in both directions.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    /// Text longer than 8 bytes, stored in the text store under this id.
    LongText(TextId),
    /// A 64-bit unix timestamp.
    DateTime(i64),
}

/// A key-value datum attached to a vertex or an edge.
///
/// An owner's properties form a linked list threaded through
/// `next_property_id`. Null properties are not stored; they are marked as
/// null by their absence.
///
/// On disk a property occupies 17 bytes:
///
/// ```text
/// +----+----+----+----+----+----+----+----+------+
/// | label_id          | next_property_id  | type |
/// +----+----+----+----+----+----+----+----+------+
/// | value                                 |
/// +----+----+----+----+----+----+----+----+
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub(crate) id: PropertyId,
    pub(crate) label_id: LabelId,
    pub(crate) next_property_id: PropertyId,
    pub(crate) type_tag: u8,
    pub(crate) payload: [u8; 8],
}

impl PropertyRecord {
    pub(crate) fn new(id: PropertyId, label_id: LabelId) -> Self {
        Self {
            id,
            label_id,
            next_property_id: 0,
            type_tag: TAG_NOTHING,
            payload: [0; 8],
        }
    }

    pub fn decode(id: PropertyId, data: &[u8]) -> Result<Self> {
        if id < 1 {
            return Err(StoreError::InvalidId(StoreKind::Property, id));
        }
        let mut payload = [0u8; 8];
        payload.copy_from_slice(&data[9..17]);
        Ok(Self {
            id,
            label_id: codec::read_u32(data, 0),
            next_property_id: codec::read_u32(data, 4),
            type_tag: data[8],
            payload,
        })
    }

    pub fn encode(&self, data: &mut [u8]) {
        codec::write_u32(data, 0, self.label_id);
        codec::write_u32(data, 4, self.next_property_id);
        data[8] = self.type_tag;
        data[9..17].copy_from_slice(&self.payload);
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn label_id(&self) -> LabelId {
        self.label_id
    }

    /// A property is marked as not in use by the `nothing` type tag.
    pub fn is_in_use(&self) -> bool {
        self.type_tag != TAG_NOTHING
    }

    pub fn next_property_id(&self) -> PropertyId {
        self.next_property_id
    }

    pub fn has_next_property(&self) -> bool {
        self.next_property_id != 0
    }

    pub(crate) fn set_next_property_id(&mut self, id: PropertyId) {
        self.next_property_id = id;
    }

    pub fn type_tag(&self) -> u8 {
        self.type_tag
    }

    /// Interprets the payload according to the type tag.
    pub fn value(&self) -> Result<PropertyValue> {
        match self.type_tag {
            TAG_INTEGER => Ok(PropertyValue::Integer(codec::read_i64(&self.payload, 0))),
            TAG_REAL => Ok(PropertyValue::Real(codec::read_f64(&self.payload, 0))),
            TAG_FALSE => Ok(PropertyValue::Boolean(false)),
            TAG_TRUE => Ok(PropertyValue::Boolean(true)),
            TAG_EMPTY_TEXT => Ok(PropertyValue::Text(String::new())),
            tag if tag > TAG_TEXT_BASE && tag < TAG_LONG_TEXT => {
                let len = (tag - TAG_TEXT_BASE) as usize;
                let text = core::str::from_utf8(&self.payload[..len])
                    .map_err(|_| StoreError::Store(StoreKind::Property))?;
                Ok(PropertyValue::Text(text.to_owned()))
            }
            TAG_LONG_TEXT => Ok(PropertyValue::LongText(codec::read_u32(&self.payload, 0))),
            TAG_DATETIME => Ok(PropertyValue::DateTime(codec::read_i64(&self.payload, 0))),
            _ => Err(StoreError::Store(StoreKind::Property)),
        }
    }

    /// Encodes a value into the tag and payload.
    ///
    /// Text must fit the inline payload (at most 8 bytes); the property store
    /// spills longer text to the text store and passes
    /// [`PropertyValue::LongText`] instead.
    pub(crate) fn set_value(&mut self, value: &PropertyValue) -> Result<()> {
        self.payload = [0; 8];
        match value {
            PropertyValue::Integer(v) => {
                self.type_tag = TAG_INTEGER;
                codec::write_i64(&mut self.payload, 0, *v);
            }
            PropertyValue::Real(v) => {
                self.type_tag = TAG_REAL;
                codec::write_f64(&mut self.payload, 0, *v);
            }
            PropertyValue::Boolean(v) => {
                self.type_tag = if *v { TAG_TRUE } else { TAG_FALSE };
            }
            PropertyValue::Text(text) => {
                let bytes = text.as_bytes();
                if bytes.len() > 8 {
                    return Err(StoreError::Store(StoreKind::Property));
                }
                self.type_tag = TAG_TEXT_BASE + bytes.len() as u8;
                self.payload[..bytes.len()].copy_from_slice(bytes);
            }
            PropertyValue::LongText(text_id) => {
                self.type_tag = TAG_LONG_TEXT;
                codec::write_u32(&mut self.payload, 0, *text_id);
            }
            PropertyValue::DateTime(v) => {
                self.type_tag = TAG_DATETIME;
                codec::write_i64(&mut self.payload, 0, *v);
            }
        }
        Ok(())
    }

    pub(crate) fn clear_value(&mut self) {
        self.type_tag = TAG_NOTHING;
        self.payload = [0; 8];
    }
}
