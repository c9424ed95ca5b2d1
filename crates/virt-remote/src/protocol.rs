//! Remote protocol messages.
//!
//! Constants, procedure numbers and argument/return structures from
//! libvirt's `remote_protocol.x`, limited to the procedures this client
//! issues. Field order matters: it is the wire order.

use serde::{Deserialize, Deserializer, Serialize};
use virt_xdr::{bounded, FixedOpaque16};

/// Program number of the remote protocol.
pub const REMOTE_PROGRAM: u32 = 0x2000_8086;

/// Protocol version spoken by this client.
pub const REMOTE_PROTOCOL_VERSION: u32 = 1;

pub const REMOTE_AUTH_TYPE_LIST_MAX: usize = 20;
pub const REMOTE_DOMAIN_LIST_MAX: usize = 16384;
pub const REMOTE_DOMAIN_INTERFACE_MAX: usize = 2048;
pub const REMOTE_DOMAIN_IP_ADDR_MAX: usize = 2048;

/// Procedure numbers (`remote_procedure`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Procedure {
    ConnectOpen = 1,
    ConnectClose = 2,
    DomainLookupById = 22,
    ConnectListDomains = 37,
    ConnectNumOfDomains = 51,
    AuthList = 66,
    AuthPolkit = 70,
    DomainInterfaceAddresses = 353,
}

/// Authentication schemes advertised by `AUTH_LIST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum AuthType {
    None,
    Sasl,
    Polkit,
    Unknown(i32),
}

impl From<i32> for AuthType {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::None,
            1 => Self::Sasl,
            2 => Self::Polkit,
            other => Self::Unknown(other),
        }
    }
}

impl From<AuthType> for i32 {
    fn from(t: AuthType) -> Self {
        match t {
            AuthType::None => 0,
            AuthType::Sasl => 1,
            AuthType::Polkit => 2,
            AuthType::Unknown(other) => other,
        }
    }
}

/// Where `DOMAIN_INTERFACE_ADDRESSES` takes its data from
/// (`virDomainInterfaceAddressesSource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub enum InterfaceAddressSource {
    /// DHCP leases handed out by libvirt's own network service.
    Lease,
    /// The QEMU guest agent.
    Agent,
    /// The host's ARP table.
    Arp,
}

impl From<InterfaceAddressSource> for u32 {
    fn from(source: InterfaceAddressSource) -> Self {
        match source {
            InterfaceAddressSource::Lease => 0,
            InterfaceAddressSource::Agent => 1,
            InterfaceAddressSource::Arp => 2,
        }
    }
}

/// Address family tag of an interface address (`virIPAddrType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum IpAddrType {
    Ipv4,
    Ipv6,
    Unknown(i32),
}

impl From<i32> for IpAddrType {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Ipv4,
            1 => Self::Ipv6,
            other => Self::Unknown(other),
        }
    }
}

impl From<IpAddrType> for i32 {
    fn from(t: IpAddrType) -> Self {
        match t {
            IpAddrType::Ipv4 => 0,
            IpAddrType::Ipv6 => 1,
            IpAddrType::Unknown(other) => other,
        }
    }
}

fn auth_type_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<AuthType>, D::Error> {
    bounded::deserialize::<_, _, REMOTE_AUTH_TYPE_LIST_MAX>(de)
}

fn domain_id_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<i32>, D::Error> {
    bounded::deserialize::<_, _, REMOTE_DOMAIN_LIST_MAX>(de)
}

fn interface_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<DomainInterface>, D::Error> {
    bounded::deserialize::<_, _, REMOTE_DOMAIN_INTERFACE_MAX>(de)
}

fn ip_addr_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<DomainIpAddr>, D::Error> {
    bounded::deserialize::<_, _, REMOTE_DOMAIN_IP_ADDR_MAX>(de)
}

/// `remote_nonnull_domain`: a reference to a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub uuid: FixedOpaque16,
    /// Runtime id; -1 for domains that are not running.
    pub id: i32,
}

/// `remote_domain_ip_addr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainIpAddr {
    pub addr_type: IpAddrType,
    pub addr: String,
    pub prefix: u32,
}

/// `remote_domain_interface`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInterface {
    pub name: String,
    pub hwaddr: Option<String>,
    #[serde(deserialize_with = "ip_addr_list")]
    pub addrs: Vec<DomainIpAddr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectOpenArgs {
    pub name: Option<String>,
    pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthListRet {
    #[serde(deserialize_with = "auth_type_list")]
    pub types: Vec<AuthType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPolkitRet {
    pub complete: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectNumOfDomainsRet {
    pub num: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectListDomainsArgs {
    pub maxids: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectListDomainsRet {
    #[serde(deserialize_with = "domain_id_list")]
    pub ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainLookupByIdArgs {
    pub id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainLookupByIdRet {
    pub dom: Domain,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainInterfaceAddressesArgs {
    pub dom: Domain,
    pub source: InterfaceAddressSource,
    pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainInterfaceAddressesRet {
    #[serde(deserialize_with = "interface_list")]
    pub ifaces: Vec<DomainInterface>,
}

/// Leading fields of `remote_error`, the payload of an error reply.
///
/// The trailing domain/network references and extra strings are not
/// decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i32,
    pub domain: i32,
    pub message: Option<String>,
    pub level: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use virt_xdr::{from_bytes, to_bytes};

    fn web1() -> Domain {
        Domain {
            name: "web1".to_string(),
            uuid: FixedOpaque16([0xab; 16]),
            id: 3,
        }
    }

    #[test]
    fn test_interface_addresses_args_layout() {
        let args = DomainInterfaceAddressesArgs {
            dom: web1(),
            source: InterfaceAddressSource::Arp,
            flags: 0,
        };

        let bytes = to_bytes(&args).unwrap();
        // name (4 + 4) + uuid (16) + id (4) + source (4) + flags (4)
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[8..24], &[0xab; 16]);
        assert_eq!(&bytes[24..28], &[0, 0, 0, 3]);
        assert_eq!(&bytes[28..32], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_decode_interfaces_keeps_order() {
        let ret = DomainInterfaceAddressesRet {
            ifaces: vec![DomainInterface {
                name: "vnet0".to_string(),
                hwaddr: Some("52:54:00:12:34:56".to_string()),
                addrs: vec![
                    DomainIpAddr {
                        addr_type: IpAddrType::Ipv6,
                        addr: "fe80::1".to_string(),
                        prefix: 64,
                    },
                    DomainIpAddr {
                        addr_type: IpAddrType::Ipv4,
                        addr: "10.0.0.5".to_string(),
                        prefix: 24,
                    },
                ],
            }],
        };

        let bytes = to_bytes(&ret).unwrap();
        let decoded: DomainInterfaceAddressesRet = from_bytes(&bytes).unwrap();

        assert_eq!(decoded.ifaces, ret.ifaces);
        assert_eq!(decoded.ifaces[0].addrs[1].addr_type, IpAddrType::Ipv4);
    }

    #[test]
    fn test_unknown_address_family_is_kept() {
        // type 7, addr "", prefix 0
        let addr: DomainIpAddr = from_bytes(&[0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(addr.addr_type, IpAddrType::Unknown(7));
    }

    #[test]
    fn test_auth_list_limit() {
        let mut bytes = vec![0, 0, 0, 21];
        bytes.extend(std::iter::repeat(0u8).take(21 * 4));
        assert!(from_bytes::<AuthListRet>(&bytes).is_err());

        let ret: AuthListRet = from_bytes(&[0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 9]).unwrap();
        assert_eq!(ret.types, vec![AuthType::Polkit, AuthType::Unknown(9)]);
    }
}
