//! The calls the inventory makes against libvirt.
//!
//! [`Connector`] opens a session and [`Hypervisor`] is what the snapshot
//! needs from it. The real implementation is backed by
//! [`virt_remote::Client`].

use async_trait::async_trait;
use virt_remote::{Client, Domain, DomainInterface, InterfaceAddressSource};

use crate::error::Result;

/// libvirt endpoint used when none is configured.
pub const DEFAULT_URI: &str = "qemu:///system";

/// An open session with the hypervisor.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Runtime ids of the running domains.
    async fn active_domain_ids(&self) -> Result<Vec<i32>>;

    /// Resolve a runtime id to a domain.
    async fn lookup_domain(&self, id: i32) -> Result<Domain>;

    /// Interfaces and addresses as known from the host's DHCP leases.
    async fn lease_interfaces(&self, dom: &Domain) -> Result<Vec<DomainInterface>>;

    /// Release the session.
    async fn close(&self) -> Result<()>;
}

/// Opens hypervisor sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Hypervisor;

    /// Where sessions are opened, for diagnostics.
    fn uri(&self) -> &str;

    async fn open(&self) -> Result<Self::Session>;
}

#[async_trait]
impl Hypervisor for Client {
    async fn active_domain_ids(&self) -> Result<Vec<i32>> {
        Ok(self.list_domain_ids().await?)
    }

    async fn lookup_domain(&self, id: i32) -> Result<Domain> {
        Ok(self.lookup_domain_by_id(id).await?)
    }

    async fn lease_interfaces(&self, dom: &Domain) -> Result<Vec<DomainInterface>> {
        Ok(self
            .interface_addresses(dom, InterfaceAddressSource::Lease)
            .await?)
    }

    async fn close(&self) -> Result<()> {
        Ok(Client::close(self).await?)
    }
}

/// Connects to a libvirt daemon over its Unix socket.
#[derive(Debug, Clone)]
pub struct RemoteConnector {
    uri: String,
}

impl RemoteConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl Default for RemoteConnector {
    fn default() -> Self {
        Self::new(DEFAULT_URI)
    }
}

#[async_trait]
impl Connector for RemoteConnector {
    type Session = Client;

    fn uri(&self) -> &str {
        &self.uri
    }

    async fn open(&self) -> Result<Client> {
        Ok(Client::connect(&self.uri).await?)
    }
}
