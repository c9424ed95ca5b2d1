//! Fixed-length opaque data.
//!
//! XDR fixed-length opaque data (like a domain UUID) has no length
//! prefix, just the raw bytes padded to 4-byte alignment. The serializer
//! and deserializer recognise [`FixedOpaque16`] by its newtype name.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Newtype name that marks a fixed-length opaque on the wire.
pub(crate) const FIXED_OPAQUE_NAME: &str = "FixedOpaque16";

pub(crate) const FIXED_OPAQUE_LEN: usize = 16;

/// 16 bytes of fixed-length opaque data, as used for UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FixedOpaque16(pub [u8; 16]);

impl FixedOpaque16 {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Canonical dashed lowercase UUID form.
impl fmt::Display for FixedOpaque16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<[u8; 16]> for FixedOpaque16 {
    fn from(data: [u8; 16]) -> Self {
        Self(data)
    }
}

impl Serialize for FixedOpaque16 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(FIXED_OPAQUE_NAME, &RawBytes(&self.0))
    }
}

/// Serializes as a byte string; the XDR serializer drops its prefix.
struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

impl<'de> Deserialize<'de> for FixedOpaque16 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FixedOpaque16Visitor;

        impl<'de> de::Visitor<'de> for FixedOpaque16Visitor {
            type Value = FixedOpaque16;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("16 bytes of opaque data")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                let arr: [u8; 16] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(FixedOpaque16(arr))
            }
        }

        deserializer.deserialize_newtype_struct(FIXED_OPAQUE_NAME, FixedOpaque16Visitor)
    }
}
