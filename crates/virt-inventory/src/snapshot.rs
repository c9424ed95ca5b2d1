//! One pass over the running domains.

use tracing::{debug, warn};
use virt_remote::{DomainInterface, IpAddrType};

use crate::error::Result;
use crate::hypervisor::{Connector, Hypervisor};
use crate::inventory::{Inventory, InventoryGroup};

/// Build the inventory from whatever `connector` reaches.
///
/// If the connection cannot be opened a notice goes to stderr and the
/// inventory is empty. Once the session is open any error aborts the
/// whole run; the session is closed either way.
pub async fn generate<C: Connector>(connector: &C, user: &str) -> Result<Inventory> {
    let session = match connector.open().await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to open connection to {}", connector.uri());
            debug!(error = %e, "libvirt unavailable, emitting empty inventory");
            return Ok(Inventory::new());
        }
    };

    let result = collect(&session, user).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close libvirt connection");
    }

    result
}

/// Walk the running domains of an open session.
pub async fn collect<H: Hypervisor + ?Sized>(hv: &H, user: &str) -> Result<Inventory> {
    let mut inventory = Inventory::new();

    for id in hv.active_domain_ids().await? {
        let dom = hv.lookup_domain(id).await?;
        let hosts = ipv4_hosts(&hv.lease_interfaces(&dom).await?);

        match InventoryGroup::new(hosts, user) {
            Some(group) => {
                debug!(
                    domain = %dom.name,
                    uuid = %dom.uuid,
                    id,
                    hosts = ?group.hosts,
                    "adding group"
                );
                inventory.insert(dom.name, group);
            }
            None => debug!(domain = %dom.name, id, "no IPv4 lease, skipping"),
        }
    }

    Ok(inventory)
}

/// IPv4 addresses of all interfaces, interface by interface.
pub fn ipv4_hosts(ifaces: &[DomainInterface]) -> Vec<String> {
    ifaces
        .iter()
        .flat_map(|iface| &iface.addrs)
        .filter(|addr| addr.addr_type == IpAddrType::Ipv4)
        .map(|addr| addr.addr.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::inventory::DEFAULT_ANSIBLE_USER;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use virt_remote::{Domain, DomainIpAddr, FixedOpaque16};

    fn addr(addr_type: IpAddrType, addr: &str) -> DomainIpAddr {
        DomainIpAddr {
            addr_type,
            addr: addr.to_string(),
            prefix: 24,
        }
    }

    fn iface(name: &str, addrs: Vec<DomainIpAddr>) -> DomainInterface {
        DomainInterface {
            name: name.to_string(),
            hwaddr: Some("52:54:00:00:00:01".to_string()),
            addrs,
        }
    }

    struct FakeDomain {
        id: i32,
        name: &'static str,
        ifaces: Vec<DomainInterface>,
    }

    /// A hypervisor whose running domains are fixed up front.
    #[derive(Clone)]
    struct FakeHypervisor {
        running: Arc<Vec<FakeDomain>>,
        /// Ids listed as running but gone by lookup time.
        vanished: Vec<i32>,
        closed: Arc<AtomicBool>,
    }

    impl FakeHypervisor {
        fn new(running: Vec<FakeDomain>) -> Self {
            Self {
                running: Arc::new(running),
                vanished: Vec::new(),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn find(&self, id: i32) -> Option<&FakeDomain> {
            self.running.iter().find(|d| d.id == id)
        }
    }

    #[async_trait]
    impl Hypervisor for FakeHypervisor {
        async fn active_domain_ids(&self) -> Result<Vec<i32>> {
            let mut ids: Vec<i32> = self.running.iter().map(|d| d.id).collect();
            ids.extend(&self.vanished);
            Ok(ids)
        }

        async fn lookup_domain(&self, id: i32) -> Result<Domain> {
            let found = self.find(id).ok_or_else(|| {
                Error::Remote(virt_remote::Error::Rpc {
                    code: 42,
                    domain: 10,
                    message: format!("Domain not found: no domain with matching id {}", id),
                })
            })?;
            Ok(Domain {
                name: found.name.to_string(),
                uuid: FixedOpaque16([id as u8; 16]),
                id,
            })
        }

        async fn lease_interfaces(&self, dom: &Domain) -> Result<Vec<DomainInterface>> {
            Ok(self.find(dom.id).map(|d| d.ifaces.clone()).unwrap_or_default())
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Hands out `session`, or fails like a missing socket when `None`.
    struct FakeConnector {
        session: Option<FakeHypervisor>,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Session = FakeHypervisor;

        fn uri(&self) -> &str {
            "qemu:///system"
        }

        async fn open(&self) -> Result<FakeHypervisor> {
            self.session.clone().ok_or_else(|| {
                Error::Remote(virt_remote::Error::Connection(
                    "/var/run/libvirt/libvirt-sock: No such file or directory".to_string(),
                ))
            })
        }
    }

    fn lab() -> Vec<FakeDomain> {
        vec![
            FakeDomain {
                id: 3,
                name: "web1",
                ifaces: vec![iface(
                    "vnet0",
                    vec![
                        addr(IpAddrType::Ipv4, "10.0.0.5"),
                        addr(IpAddrType::Ipv6, "fd00::5"),
                        addr(IpAddrType::Ipv4, "10.0.0.6"),
                    ],
                )],
            },
            FakeDomain {
                id: 5,
                name: "db1",
                ifaces: vec![iface("vnet1", vec![addr(IpAddrType::Ipv6, "fd00::7")])],
            },
            FakeDomain {
                id: 8,
                name: "cache1",
                ifaces: vec![
                    iface("vnet2", vec![addr(IpAddrType::Ipv4, "192.168.122.40")]),
                    iface("vnet3", vec![addr(IpAddrType::Unknown(7), "garbage")]),
                    iface("vnet4", vec![addr(IpAddrType::Ipv4, "192.168.100.2")]),
                ],
            },
            FakeDomain {
                id: 9,
                name: "idle",
                ifaces: Vec::new(),
            },
        ]
    }

    #[tokio::test]
    async fn test_no_running_domains() {
        let connector = FakeConnector {
            session: Some(FakeHypervisor::new(Vec::new())),
        };
        let inventory = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap();
        assert!(inventory.is_empty());
        assert_eq!(inventory.to_json().unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_only_domains_with_ipv4_leases() {
        let hv = FakeHypervisor::new(lab());
        let connector = FakeConnector {
            session: Some(hv.clone()),
        };

        let inventory = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap();

        let names: Vec<&str> = inventory.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["web1", "cache1"]);
        assert!(inventory.get("db1").is_none());
        assert!(inventory.get("idle").is_none());

        let web1 = inventory.get("web1").unwrap();
        assert_eq!(web1.hosts, vec!["10.0.0.5", "10.0.0.6"]);
        assert_eq!(web1.vars.ansible_host, "10.0.0.5");

        let cache1 = inventory.get("cache1").unwrap();
        assert_eq!(cache1.hosts, vec!["192.168.122.40", "192.168.100.2"]);
        assert_eq!(cache1.vars.ansible_host, "192.168.122.40");

        for (_, group) in inventory.iter() {
            assert_eq!(group.vars.ansible_user, "evgnomon");
            assert!(group.hosts.iter().all(|h| !h.contains(':')));
        }

        assert!(hv.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_custom_user() {
        let connector = FakeConnector {
            session: Some(FakeHypervisor::new(lab())),
        };
        let inventory = generate(&connector, "ops").await.unwrap();
        assert!(inventory.iter().all(|(_, g)| g.vars.ansible_user == "ops"));
    }

    #[tokio::test]
    async fn test_connection_failure_yields_empty_inventory() {
        let connector = FakeConnector { session: None };
        let inventory = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap();
        assert_eq!(inventory.to_json().unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_vanished_domain_aborts_and_closes() {
        let mut hv = FakeHypervisor::new(lab());
        hv.vanished.push(12);
        let connector = FakeConnector {
            session: Some(hv.clone()),
        };

        let err = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Remote(virt_remote::Error::Rpc { code: 42, .. })
        ));
        assert!(hv.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let connector = FakeConnector {
            session: Some(FakeHypervisor::new(lab())),
        };
        let first = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap();
        let second = generate(&connector, DEFAULT_ANSIBLE_USER).await.unwrap();
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_ipv4_hosts_keeps_interface_order() {
        let ifaces = vec![
            iface("vnet0", vec![addr(IpAddrType::Ipv6, "fe80::1")]),
            iface(
                "vnet1",
                vec![
                    addr(IpAddrType::Ipv4, "10.1.0.2"),
                    addr(IpAddrType::Ipv4, "10.1.0.1"),
                ],
            ),
        ];
        assert_eq!(ipv4_hosts(&ifaces), vec!["10.1.0.2", "10.1.0.1"]);
    }
}
