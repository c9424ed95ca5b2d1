//! The inventory document handed to Ansible.
//!
//! Each running domain with a leased IPv4 address becomes a group named
//! after the domain:
//!
//! ```json
//! {
//!   "web1": {
//!     "hosts": ["10.0.0.5"],
//!     "vars": { "ansible_host": "10.0.0.5", "ansible_user": "evgnomon" }
//!   }
//! }
//! ```

use std::io;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::{Formatter, PrettyFormatter};

use crate::error::Result;

/// `ansible_user` written into every group unless overridden.
pub const DEFAULT_ANSIBLE_USER: &str = "evgnomon";

/// Connection variables of a group.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GroupVars {
    pub ansible_host: String,
    pub ansible_user: String,
}

/// One domain's group: its addresses and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InventoryGroup {
    pub hosts: Vec<String>,
    pub vars: GroupVars,
}

impl InventoryGroup {
    /// Build a group from addresses in enumeration order.
    ///
    /// Returns `None` when there are no addresses: a group never has an
    /// empty host list.
    pub fn new(hosts: Vec<String>, user: &str) -> Option<Self> {
        let ansible_host = hosts.first()?.clone();
        Some(Self {
            hosts,
            vars: GroupVars {
                ansible_host,
                ansible_user: user.to_string(),
            },
        })
    }
}

/// Groups keyed by domain name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    groups: Vec<(String, InventoryGroup)>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. A name that is already present keeps its position
    /// and gets the new group.
    pub fn insert(&mut self, name: String, group: InventoryGroup) {
        match self.groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = group,
            None => self.groups.push((name, group)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InventoryGroup> {
        self.groups
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, group)| group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InventoryGroup)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    /// Render as JSON indented by two spaces, with everything outside
    /// printable ASCII written as `\uXXXX` escapes.
    pub fn to_json(&self) -> Result<String> {
        let mut out = Vec::new();
        let formatter = AsciiFormatter(PrettyFormatter::new());
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        // Only ASCII is ever written.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl Serialize for Inventory {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (name, group) in &self.groups {
            map.serialize_entry(name, group)?;
        }
        map.end()
    }
}

/// Escapes string content outside `' '..='~'` as UTF-16 `\uXXXX` units
/// and leaves layout to the wrapped formatter.
struct AsciiFormatter<F>(F);

impl<F: Formatter> Formatter for AsciiFormatter<F> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if matches!(c, ' '..='~') {
                writer.write_all(&[c as u8])?;
                continue;
            }
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}
