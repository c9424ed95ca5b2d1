//! Connection management for libvirt RPC.
//!
//! Calls are strictly sequential: one request is written, then packets
//! are read until its reply arrives. The transport is owned exclusively
//! by the connection.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::packet::{MessageType, Packet, Status};
use crate::protocol::{Procedure, RemoteError};
use crate::transport::{Transport, UnixTransport};

/// Default Unix socket path for system connections.
pub const SYSTEM_SOCKET_PATH: &str = "/var/run/libvirt/libvirt-sock";

/// Default Unix socket path for session connections (relative to XDG_RUNTIME_DIR).
pub const SESSION_SOCKET_PATH: &str = "libvirt/libvirt-sock";

/// A connection to a libvirt daemon.
pub struct Connection {
    inner: Mutex<ConnectionInner>,
}

struct ConnectionInner {
    transport: Box<dyn Transport>,
    /// Serial of the next call.
    serial: u32,
}

impl Connection {
    /// Connect to a libvirt daemon via Unix socket.
    pub async fn connect_unix(path: &str) -> Result<Self> {
        let transport = UnixTransport::connect(path).await?;
        Ok(Self::from_transport(transport))
    }

    /// Connect to the system libvirt daemon.
    pub async fn connect_system() -> Result<Self> {
        Self::connect_unix(SYSTEM_SOCKET_PATH).await
    }

    /// Connect to the session libvirt daemon.
    pub async fn connect_session() -> Result<Self> {
        let runtime_dir =
            std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
        let path = format!("{}/{}", runtime_dir, SESSION_SOCKET_PATH);
        Self::connect_unix(&path).await
    }

    /// Create a connection from an existing transport.
    pub fn from_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Mutex::new(ConnectionInner {
                transport: Box::new(transport),
                serial: 1,
            }),
        }
    }

    /// Make an RPC call and return the raw reply payload.
    pub async fn call(&self, procedure: Procedure, payload: Bytes) -> Result<Bytes> {
        let mut inner = self.inner.lock().await;

        let serial = inner.serial;
        inner.serial = inner.serial.wrapping_add(1);

        let packet = Packet::new_call(procedure as u32, serial, payload);
        trace!(?procedure, serial, "rpc call");
        inner.transport.send(&packet.encode()?).await?;

        loop {
            let reply = Packet::decode(inner.transport.recv().await?)?;

            match reply.msg_type {
                MessageType::Reply => {}
                MessageType::Message => {
                    debug!(procedure = reply.procedure, "skipping event message");
                    continue;
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected {:?} packet while waiting for reply",
                        other
                    )));
                }
            }

            if reply.serial != serial || reply.procedure != procedure as u32 {
                return Err(Error::Protocol(format!(
                    "reply for procedure {} serial {}, expected procedure {} serial {}",
                    reply.procedure, reply.serial, procedure as u32, serial
                )));
            }

            return match reply.status {
                Status::Ok => Ok(reply.payload),
                Status::Error => Err(remote_error(reply.payload)),
                Status::Continue => Err(Error::Protocol(
                    "unexpected stream continuation".to_string(),
                )),
            };
        }
    }

    /// Make a typed RPC call with XDR serialization.
    pub async fn call_xdr<Req, Resp>(&self, procedure: Procedure, args: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.call(procedure, virt_xdr::to_bytes(args)?).await?;
        Ok(virt_xdr::from_bytes(&response)?)
    }

    /// Shut the transport down.
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.lock().await.transport.close().await
    }
}

/// Turn the payload of an error reply into an [`Error::Rpc`].
fn remote_error(payload: Bytes) -> Error {
    match virt_xdr::from_bytes::<RemoteError>(&payload) {
        Ok(err) => Error::Rpc {
            code: err.code,
            domain: err.domain,
            message: err.message.unwrap_or_else(|| "unknown error".to_string()),
        },
        Err(e) => Error::Protocol(format!("undecodable error reply: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    /// Replays canned packets and records what was sent.
    struct ScriptedTransport {
        replies: VecDeque<Packet>,
        sent: Arc<StdMutex<Vec<Packet>>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            let packet = Packet::decode(Bytes::copy_from_slice(&data[4..]))?;
            self.sent.lock().unwrap().push(packet);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Bytes> {
            let packet = self.replies.pop_front().ok_or(Error::ConnectionClosed)?;
            Ok(packet.encode()?.split_off(4).freeze())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn scripted(replies: Vec<Packet>) -> (Connection, Arc<StdMutex<Vec<Packet>>>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let transport = ScriptedTransport {
            replies: replies.into(),
            sent: sent.clone(),
        };
        (Connection::from_transport(transport), sent)
    }

    fn error_payload(message: &str) -> Bytes {
        let err = RemoteError {
            code: 42, // VIR_ERR_NO_DOMAIN
            domain: 10,
            message: Some(message.to_string()),
            level: 2,
        };
        virt_xdr::to_bytes(&err).unwrap()
    }

    #[tokio::test]
    async fn test_serials_increase() {
        let num = Bytes::from_static(&[0, 0, 0, 2]);
        let (conn, sent) = scripted(vec![
            Packet::new_reply(51, 1, Status::Ok, num.clone()),
            Packet::new_reply(51, 2, Status::Ok, num),
        ]);

        let a: i32 = conn.call_xdr(Procedure::ConnectNumOfDomains, &()).await.unwrap();
        let b: i32 = conn.call_xdr(Procedure::ConnectNumOfDomains, &()).await.unwrap();
        assert_eq!((a, b), (2, 2));

        let serials: Vec<u32> = sent.lock().unwrap().iter().map(|p| p.serial).collect();
        assert_eq!(serials, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_error_reply_becomes_rpc_error() {
        let (conn, _) = scripted(vec![Packet::new_reply(
            22,
            1,
            Status::Error,
            error_payload("Domain not found: no domain with matching id 7"),
        )]);

        let err = conn
            .call_xdr::<_, ()>(Procedure::DomainLookupById, &7i32)
            .await
            .unwrap_err();
        match err {
            Error::Rpc { code, message, .. } => {
                assert_eq!(code, 42);
                assert!(message.contains("no domain with matching id 7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_event_messages_are_skipped() {
        let mut event = Packet::new_reply(315, 0, Status::Ok, Bytes::new());
        event.msg_type = MessageType::Message;

        let (conn, _) = scripted(vec![
            event,
            Packet::new_reply(51, 1, Status::Ok, Bytes::from_static(&[0, 0, 0, 0])),
        ]);

        let num: i32 = conn.call_xdr(Procedure::ConnectNumOfDomains, &()).await.unwrap();
        assert_eq!(num, 0);
    }

    #[tokio::test]
    async fn test_mismatched_serial_is_protocol_error() {
        let (conn, _) = scripted(vec![Packet::new_reply(
            51,
            9,
            Status::Ok,
            Bytes::from_static(&[0, 0, 0, 0]),
        )]);

        let err = conn
            .call_xdr::<_, i32>(Procedure::ConnectNumOfDomains, &())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
