//! Port export specifications.
//!
//! Requests describe published ports as strings of the form
//! `[ip:][hostPort:]containerPort[/protocol]`, where either port may be an
//! inclusive range such as `8000-8002`. This module parses them into the
//! engine's exposed-port list and port-binding map before any engine call is
//! made, so a malformed specification never leaves state behind.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use bollard::models::PortBinding;

use crate::error::RequestError;

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    /// Transmission Control Protocol.
    #[default]
    Tcp,
    /// User Datagram Protocol.
    Udp,
    /// Stream Control Transmission Protocol.
    Sctp,
}

impl Protocol {
    /// Return the lowercase name the engine uses for this protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            other => Err(format!("unsupported protocol '{other}'")),
        }
    }
}

/// A container-side port and its protocol, written `80/tcp` by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExposedPort {
    port: u16,
    protocol: Protocol,
}

impl ExposedPort {
    /// Create an exposed port.
    #[must_use]
    pub const fn new(port: u16, protocol: Protocol) -> Self {
        Self { port, protocol }
    }

    /// Create a TCP exposed port.
    #[must_use]
    pub const fn tcp(port: u16) -> Self {
        Self::new(port, Protocol::Tcp)
    }

    /// Return the numeric port.
    #[must_use]
    pub const fn port(self) -> u16 {
        self.port
    }

    /// Return the protocol.
    #[must_use]
    pub const fn protocol(self) -> Protocol {
        self.protocol
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl FromStr for ExposedPort {
    type Err = String;

    /// Parse the engine's `port/protocol` key. A missing protocol means TCP.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (port_text, protocol) = match value.split_once('/') {
            Some((port_text, protocol_text)) => (port_text, protocol_text.parse()?),
            None => (value, Protocol::Tcp),
        };
        let port = parse_port_number(port_text)?;
        Ok(Self::new(port, protocol))
    }
}

/// Host side of a port binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostBinding {
    host_ip: Option<IpAddr>,
    host_port: Option<u16>,
}

impl HostBinding {
    /// Return the host interface address, if one was requested.
    #[must_use]
    pub const fn host_ip(&self) -> Option<IpAddr> {
        self.host_ip
    }

    /// Return the requested host port; `None` lets the engine pick one.
    #[must_use]
    pub const fn host_port(&self) -> Option<u16> {
        self.host_port
    }

    fn to_engine_binding(&self) -> PortBinding {
        PortBinding {
            host_ip: self.host_ip.map(|ip| ip.to_string()),
            host_port: self.host_port.map(|port| port.to_string()),
        }
    }
}

/// Parsed port export specifications.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortSpecs {
    exposed: BTreeSet<ExposedPort>,
    bindings: BTreeMap<ExposedPort, Vec<HostBinding>>,
}

impl PortSpecs {
    /// Parse a list of port export specifications.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidPortSpec` for the first specification
    /// that cannot be parsed.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self, RequestError> {
        let mut parsed = Self::default();
        for spec in specs {
            let raw = spec.as_ref();
            let entries = parse_port_spec(raw).map_err(|reason| RequestError::InvalidPortSpec {
                spec: String::from(raw),
                reason,
            })?;
            for (exposed, binding) in entries {
                parsed.exposed.insert(exposed);
                parsed.bindings.entry(exposed).or_default().push(binding);
            }
        }
        Ok(parsed)
    }

    /// Return the set of exposed container ports.
    #[must_use]
    pub const fn exposed(&self) -> &BTreeSet<ExposedPort> {
        &self.exposed
    }

    /// Return the host bindings requested for a container port.
    #[must_use]
    pub fn bindings_for(&self, port: ExposedPort) -> &[HostBinding] {
        self.bindings.get(&port).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` when no port was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exposed.is_empty()
    }

    /// Render exposed ports in the engine's `port/protocol` form.
    #[must_use]
    pub fn to_exposed_ports(&self) -> Vec<String> {
        self.exposed.iter().map(ToString::to_string).collect()
    }

    /// Render the engine port-binding map.
    #[must_use]
    pub fn to_port_map(&self) -> HashMap<String, Option<Vec<PortBinding>>> {
        self.bindings
            .iter()
            .map(|(exposed, bindings)| {
                let engine_bindings = bindings.iter().map(HostBinding::to_engine_binding).collect();
                (exposed.to_string(), Some(engine_bindings))
            })
            .collect()
    }
}

fn parse_port_spec(raw: &str) -> Result<Vec<(ExposedPort, HostBinding)>, String> {
    let spec = raw.trim();
    if spec.is_empty() {
        return Err(String::from("specification is empty"));
    }

    let (address, protocol) = match spec.rsplit_once('/') {
        Some((address, "")) => (address, Protocol::Tcp),
        Some((address, protocol_text)) => (address, protocol_text.parse::<Protocol>()?),
        None => (spec, Protocol::Tcp),
    };
    let (host_ip, host_text, container_text) = split_address(address)?;

    let container_range = parse_port_range(container_text, "container")?;
    let host_range = match host_text {
        Some(text) if !text.is_empty() => Some(parse_port_range(text, "host")?),
        _ => None,
    };

    if let Some(host) = host_range {
        if host.len() != container_range.len() {
            return Err(format!(
                "host range {host_text} and container range {container_text} differ in length",
                host_text = host_text.unwrap_or_default(),
            ));
        }
    }

    Ok(container_range
        .ports()
        .enumerate()
        .map(|(offset, container_port)| {
            let host_port = host_range.and_then(|host| host.nth(offset));
            (
                ExposedPort::new(container_port, protocol),
                HostBinding { host_ip, host_port },
            )
        })
        .collect())
}

/// Split `[ip:][host:]container` into its parts.
fn split_address(address: &str) -> Result<(Option<IpAddr>, Option<&str>, &str), String> {
    if let Some(bracketed) = address.strip_prefix('[') {
        let (ip_text, remainder) = bracketed
            .split_once("]:")
            .ok_or_else(|| String::from("unterminated IPv6 address"))?;
        let (host_text, container_text) = remainder
            .split_once(':')
            .ok_or_else(|| String::from("expected host and container ports after address"))?;
        return Ok((Some(parse_ip(ip_text)?), Some(host_text), container_text));
    }

    let parts: Vec<&str> = address.split(':').collect();
    match parts.as_slice() {
        [container_text] => Ok((None, None, container_text)),
        [host_text, container_text] => Ok((None, Some(host_text), container_text)),
        [ip_text, host_text, container_text] => {
            Ok((Some(parse_ip(ip_text)?), Some(host_text), container_text))
        }
        _ => Err(String::from("too many ':' separators")),
    }
}

fn parse_ip(text: &str) -> Result<IpAddr, String> {
    text.parse()
        .map_err(|_| format!("invalid host address '{text}'"))
}

#[derive(Debug, Clone, Copy)]
struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    const fn len(self) -> u16 {
        self.end - self.start
    }

    fn ports(self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }

    fn nth(self, offset: usize) -> Option<u16> {
        self.ports().nth(offset)
    }
}

fn parse_port_range(text: &str, side: &str) -> Result<PortRange, String> {
    let (start_text, end_text) = text.split_once('-').unwrap_or((text, text));
    let start = parse_port_number(start_text).map_err(|_| format!("invalid {side} port '{text}'"))?;
    let end = parse_port_number(end_text).map_err(|_| format!("invalid {side} port '{text}'"))?;
    if end < start {
        return Err(format!("invalid {side} port range '{text}'"));
    }
    Ok(PortRange { start, end })
}

fn parse_port_number(text: &str) -> Result<u16, String> {
    match text.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("invalid port '{text}'")),
        Ok(port) => Ok(port),
    }
}
