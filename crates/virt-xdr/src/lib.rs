//! XDR (External Data Representation) serialization for the libvirt
//! remote protocol.
//!
//! Protocol structures derive `Serialize`/`Deserialize` and go through
//! [`to_bytes`] and [`from_bytes`]. Fields are written in declaration
//! order; XDR carries no names or tags.

pub mod bounded;
mod de;
mod error;
pub mod opaque;
mod ser;

pub use de::XdrDeserializer;
pub use error::{Error, Result};
pub use opaque::FixedOpaque16;
pub use ser::XdrSerializer;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// Longest string or opaque accepted on decode (`REMOTE_STRING_MAX`).
pub const STRING_MAX: usize = 4 * 1024 * 1024;

/// Serialize a value to XDR bytes.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let mut serializer = XdrSerializer::new();
    value.serialize(&mut serializer)?;
    Ok(serializer.into_bytes())
}

/// Deserialize a value from XDR bytes.
///
/// Bytes left over after the value are ignored, so a structure that
/// declares only the leading fields of a message decodes just those.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = XdrDeserializer::new(bytes);
    T::deserialize(&mut deserializer)
}
