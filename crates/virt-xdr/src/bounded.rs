//! Variable-length arrays with a protocol maximum (`type name<MAX>`).
//!
//! Use through a `#[serde(deserialize_with = "...")]` wrapper that fixes
//! the bound:
//!
//! ```ignore
//! fn ids<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<i32>, D::Error> {
//!     virt_xdr::bounded::deserialize::<_, _, 16384>(de)
//! }
//! ```
//!
//! The length prefix is checked before any element is read.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};

/// Deserialize an array holding at most `MAX` elements.
pub fn deserialize<'de, D, T, const MAX: usize>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_seq(BoundedVisitor::<T, MAX>(PhantomData))
}

struct BoundedVisitor<T, const MAX: usize>(PhantomData<T>);

impl<'de, T, const MAX: usize> Visitor<'de> for BoundedVisitor<T, MAX>
where
    T: Deserialize<'de>,
{
    type Value = Vec<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an array of at most {} elements", MAX)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
        let declared = seq.size_hint().unwrap_or(0);
        if declared > MAX {
            return Err(de::Error::invalid_length(declared, &self));
        }

        // Each element is at least 4 bytes; don't trust the prefix blindly.
        let mut items = Vec::with_capacity(declared.min(1024));
        while let Some(item) = seq.next_element()? {
            if items.len() == MAX {
                return Err(de::Error::invalid_length(MAX + 1, &self));
            }
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::{from_bytes, to_bytes};
    use serde::{Deserialize, Deserializer, Serialize};

    fn two<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<i32>, D::Error> {
        super::deserialize::<_, _, 2>(de)
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Ids {
        #[serde(deserialize_with = "two")]
        ids: Vec<i32>,
    }

    #[test]
    fn test_within_limit() {
        let bytes = to_bytes(&Ids { ids: vec![4, 9] }).unwrap();
        assert_eq!(from_bytes::<Ids>(&bytes).unwrap().ids, vec![4, 9]);
    }

    #[test]
    fn test_limit_checked_before_elements() {
        // Declares three elements but carries none.
        let err = from_bytes::<Ids>(&[0, 0, 0, 3]).unwrap_err();
        assert!(err.to_string().contains("at most 2 elements"), "{err}");
    }
}
