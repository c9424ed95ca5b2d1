//! Ansible dynamic inventory of running libvirt domains.
//!
//! Every running domain that holds at least one DHCP-leased IPv4 address
//! becomes a group named after the domain, with its addresses as hosts
//! and `ansible_host`/`ansible_user` as group vars.
//!
//! # Example
//!
//! ```ignore
//! use virt_inventory::{snapshot, RemoteConnector, DEFAULT_ANSIBLE_USER};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let connector = RemoteConnector::new("qemu:///system");
//!     let inventory = snapshot::generate(&connector, DEFAULT_ANSIBLE_USER).await?;
//!     println!("{}", inventory.to_json()?);
//!     Ok(())
//! }
//! ```

mod error;
pub mod hypervisor;
pub mod inventory;
pub mod snapshot;

pub use error::{Error, Result};
pub use hypervisor::{Connector, Hypervisor, RemoteConnector, DEFAULT_URI};
pub use inventory::{GroupVars, Inventory, InventoryGroup, DEFAULT_ANSIBLE_USER};
