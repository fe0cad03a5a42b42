/**
 * Shared primitive types used across every record kind and cross-reference
 * structure: the 32-bit form-id key, the per-record endianness flag, and the
 * fixed 24-byte main record header described in spec §6.
 */
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-bit unsigned identifier, globally unique within one image (spec §3).
/// Zero means "absent" for optional reference fields — never a real entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(pub u32);

impl FormId {
    pub const NONE: FormId = FormId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn as_option(self) -> Option<FormId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    /// High-bit-set range reserved for synthetic entities (virtual cells, §4.6).
    pub fn is_synthetic(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// Four-byte ASCII tag. Tag bytes are never endian-swapped (spec §6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        Some(Tag([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) if s.chars().all(|c| c.is_ascii_graphic() || c == ' ') => {
                write!(f, "Tag({:?})", s)
            }
            _ => write!(f, "Tag({:02x?})", self.0),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

#[macro_export]
macro_rules! tag {
    ($lit:expr) => {
        $crate::common::Tag::new(*$lit)
    };
}

/// Per-record endianness, a runtime parameter rather than a type (design notes §9):
/// a single image can hold records of both endiannesses side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn is_big(self) -> bool {
        matches!(self, Endian::Big)
    }

    pub fn from_is_big(is_big_endian: bool) -> Self {
        if is_big_endian {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// The 24-byte main record header on the wire (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MainRecordHeader {
    pub kind: Tag,
    pub offset: u64,
    pub data_size: u32,
    pub flags: u32,
    pub form_id: FormId,
    pub is_compressed: bool,
    pub is_big_endian: bool,
}

impl MainRecordHeader {
    pub fn endian(&self) -> Endian {
        Endian::from_is_big(self.is_big_endian)
    }
}
