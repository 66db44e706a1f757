//! OSC endpoint
//!
//! Each OSC surface owns one endpoint: a bound UDP socket for outbound
//! feedback to the remote device, and a listener task that decodes incoming
//! packets and hands `(address, value)` pairs to the dispatch queue. Nothing
//! in the listener touches engine state directly.

use anyhow::{Context, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, UdpSocket};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Outbound side of an OSC surface.
pub struct OscEndpoint {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl OscEndpoint {
    /// `remote_ip:remote_port` is the hardware's listening address.
    pub fn new(remote_ip: &str, remote_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("failed to bind OSC send socket")?;
        let remote: SocketAddr = format!("{}:{}", remote_ip, remote_port)
            .parse()
            .with_context(|| format!("invalid OSC remote address {}:{}", remote_ip, remote_port))?;
        Ok(Self { socket, remote })
    }

    pub fn send_float(&self, address: &str, value: f32) {
        self.send(address, vec![OscType::Float(value)]);
    }

    pub fn send_string(&self, address: &str, value: &str) {
        self.send(address, vec![OscType::String(value.to_string())]);
    }

    fn send(&self, address: &str, args: Vec<OscType>) {
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args,
        });
        match rosc::encoder::encode(&packet) {
            Ok(buf) => {
                if let Err(e) = self.socket.send_to(&buf, self.remote) {
                    warn!("OSC send to {} failed: {}", self.remote, e);
                }
            }
            Err(e) => warn!("OSC encode for {} failed: {}", address, e),
        }
    }
}

/// Decoded incoming OSC control event.
#[derive(Debug, Clone, PartialEq)]
pub struct OscEvent {
    pub surface: String,
    pub address: String,
    pub value: f64,
}

/// Flatten a packet into control events; bundles recurse, non-numeric
/// arguments are ignored, an argument-less message is a 1.0 press.
pub fn flatten_packet(surface: &str, packet: OscPacket, events: &mut Vec<OscEvent>) {
    match packet {
        OscPacket::Message(msg) => {
            let value = match msg.args.first() {
                Some(OscType::Float(f)) => Some(f64::from(*f)),
                Some(OscType::Double(d)) => Some(*d),
                Some(OscType::Int(i)) => Some(f64::from(*i)),
                Some(OscType::Long(l)) => Some(*l as f64),
                None => Some(1.0),
                _ => None,
            };
            if let Some(value) = value {
                events.push(OscEvent {
                    surface: surface.to_string(),
                    address: msg.addr,
                    value,
                });
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten_packet(surface, inner, events);
            }
        }
    }
}

/// Listen on `port` and forward decoded events for `surface` into the
/// dispatch queue until the receiver side closes.
pub async fn run_listener(surface: String, port: u16, tx: UnboundedSender<OscEvent>) -> Result<()> {
    let socket = tokio::net::UdpSocket::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind OSC listen port {}", port))?;
    debug!("OSC surface '{}' listening on {}", surface, port);

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let (len, _from) = socket.recv_from(&mut buf).await?;
        match rosc::decoder::decode_udp(&buf[..len]) {
            Ok((_, packet)) => {
                let mut events = Vec::new();
                flatten_packet(&surface, packet, &mut events);
                for event in events {
                    if tx.send(event).is_err() {
                        return Ok(()); // dispatch side shut down
                    }
                }
            }
            Err(e) => debug!("undecodable OSC packet on port {}: {}", port, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_reads_first_numeric_argument() {
        let packet = OscPacket::Message(OscMessage {
            addr: "/fader1".to_string(),
            args: vec![OscType::Float(0.5)],
        });
        let mut events = Vec::new();
        flatten_packet("Tablet", packet, &mut events);
        assert_eq!(
            events,
            vec![OscEvent {
                surface: "Tablet".to_string(),
                address: "/fader1".to_string(),
                value: 0.5
            }]
        );
    }

    #[test]
    fn flatten_recurses_into_bundles() {
        let bundle = OscPacket::Bundle(rosc::OscBundle {
            timetag: rosc::OscTime {
                seconds: 0,
                fractional: 0,
            },
            content: vec![
                OscPacket::Message(OscMessage {
                    addr: "/a".to_string(),
                    args: vec![OscType::Int(1)],
                }),
                OscPacket::Message(OscMessage {
                    addr: "/b".to_string(),
                    args: vec![],
                }),
            ],
        });
        let mut events = Vec::new();
        flatten_packet("Tablet", bundle, &mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].value, 1.0);
    }

    #[test]
    fn non_numeric_arguments_are_ignored() {
        let packet = OscPacket::Message(OscMessage {
            addr: "/label".to_string(),
            args: vec![OscType::String("hi".to_string())],
        });
        let mut events = Vec::new();
        flatten_packet("Tablet", packet, &mut events);
        assert!(events.is_empty());
    }
}
