//! Minimal pure Rust client for the libvirt remote RPC protocol.
//!
//! Speaks the protocol `libvirtd`/`virtqemud` expose on their Unix
//! socket, limited to what is needed to enumerate running domains and
//! their interface addresses.
//!
//! # Example
//!
//! ```ignore
//! use virt_remote::{Client, InterfaceAddressSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("qemu:///system").await?;
//!
//!     for id in client.list_domain_ids().await? {
//!         let dom = client.lookup_domain_by_id(id).await?;
//!         let ifaces = client
//!             .interface_addresses(&dom, InterfaceAddressSource::Lease)
//!             .await?;
//!         println!("{}: {} interfaces", dom.name, ifaces.len());
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod connection;
mod error;
pub mod packet;
pub mod protocol;
pub mod transport;

use tracing::debug;

pub use connection::{Connection, SESSION_SOCKET_PATH, SYSTEM_SOCKET_PATH};
pub use error::{Error, Result};
pub use virt_xdr::FixedOpaque16;
pub use protocol::{
    AuthType, Domain, DomainInterface, DomainIpAddr, InterfaceAddressSource, IpAddrType,
};

use protocol::{
    AuthListRet, AuthPolkitRet, ConnectListDomainsArgs, ConnectListDomainsRet,
    ConnectNumOfDomainsRet, ConnectOpenArgs, DomainInterfaceAddressesArgs,
    DomainInterfaceAddressesRet, DomainLookupByIdArgs, DomainLookupByIdRet, Procedure,
    REMOTE_DOMAIN_LIST_MAX,
};

/// An open libvirt connection.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Connect to a libvirt daemon.
    ///
    /// # Supported URIs
    ///
    /// - `qemu:///system` - Connect to system QEMU/KVM daemon
    /// - `qemu:///session` - Connect to session QEMU/KVM daemon
    /// - `unix:///path/to/sock` or an absolute socket path
    pub async fn connect(uri: &str) -> Result<Self> {
        let conn = if uri.ends_with("///system") {
            Connection::connect_system().await?
        } else if uri.ends_with("///session") {
            Connection::connect_session().await?
        } else if uri.starts_with('/') || uri.starts_with("unix://") {
            let path = uri.strip_prefix("unix://").unwrap_or(uri);
            Connection::connect_unix(path).await?
        } else {
            return Err(Error::UnsupportedUri(uri.to_string()));
        };

        Self::open(conn, uri).await
    }

    /// Authenticate and open `uri` over an established connection.
    pub async fn open(conn: Connection, uri: &str) -> Result<Self> {
        let client = Self { conn };
        client.authenticate().await?;

        // Socket paths are not libvirt URIs; let the daemon pick its default.
        let name = if uri.starts_with('/') || uri.starts_with("unix://") {
            None
        } else {
            Some(uri.to_string())
        };
        let args = ConnectOpenArgs { name, flags: 0 };
        client
            .conn
            .call_xdr::<_, ()>(Procedure::ConnectOpen, &args)
            .await
            .map_err(|e| Error::Connection(format!("connect_open failed: {}", e)))?;

        debug!(uri, "libvirt connection opened");
        Ok(client)
    }

    async fn authenticate(&self) -> Result<()> {
        let ret: AuthListRet = self.conn.call_xdr(Procedure::AuthList, &()).await?;

        if ret.types.is_empty() || ret.types.contains(&AuthType::None) {
            return Ok(());
        }

        if ret.types.contains(&AuthType::Polkit) {
            let polkit: AuthPolkitRet = self.conn.call_xdr(Procedure::AuthPolkit, &()).await?;
            if polkit.complete == 0 {
                return Err(Error::AuthFailed("polkit authentication incomplete".to_string()));
            }
            return Ok(());
        }

        Err(Error::AuthFailed(format!(
            "no supported authentication scheme in {:?}",
            ret.types
        )))
    }

    /// Number of running domains.
    pub async fn num_of_domains(&self) -> Result<i32> {
        let ret: ConnectNumOfDomainsRet =
            self.conn.call_xdr(Procedure::ConnectNumOfDomains, &()).await?;
        Ok(ret.num)
    }

    /// Runtime ids of all running domains, in the daemon's order.
    pub async fn list_domain_ids(&self) -> Result<Vec<i32>> {
        let num = self.num_of_domains().await?;
        if num <= 0 {
            return Ok(Vec::new());
        }

        let args = ConnectListDomainsArgs {
            maxids: num.min(REMOTE_DOMAIN_LIST_MAX as i32),
        };
        let ret: ConnectListDomainsRet =
            self.conn.call_xdr(Procedure::ConnectListDomains, &args).await?;
        Ok(ret.ids)
    }

    /// Look up a running domain by its runtime id.
    pub async fn lookup_domain_by_id(&self, id: i32) -> Result<Domain> {
        let args = DomainLookupByIdArgs { id };
        let ret: DomainLookupByIdRet =
            self.conn.call_xdr(Procedure::DomainLookupById, &args).await?;
        Ok(ret.dom)
    }

    /// Interfaces of a domain together with their addresses.
    pub async fn interface_addresses(
        &self,
        dom: &Domain,
        source: InterfaceAddressSource,
    ) -> Result<Vec<DomainInterface>> {
        let args = DomainInterfaceAddressesArgs {
            dom: dom.clone(),
            source,
            flags: 0,
        };
        let ret: DomainInterfaceAddressesRet = self
            .conn
            .call_xdr(Procedure::DomainInterfaceAddresses, &args)
            .await?;
        Ok(ret.ifaces)
    }

    /// Close the connection.
    pub async fn close(&self) -> Result<()> {
        self.conn
            .call_xdr::<_, ()>(Procedure::ConnectClose, &())
            .await
            .map_err(|e| Error::Protocol(format!("connect_close failed: {}", e)))?;
        self.conn.shutdown().await
    }
}
