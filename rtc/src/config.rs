use dtls::DtlsConfig;
use ice::ServerConfig;
use media::source::DEFAULT_RING_SIZE;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default bind address: every interface, a port picked by the OS.
pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// A TransportConfig defines how one WebRtcTransport is set up.
///
/// Configurations are read only once built; clone one to set up several
/// transports the same way. Each transport still generates its own ICE
/// credentials, and its own DTLS certificate unless one is given.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// announced_ip is the address advertised in the SDP answer in place of
    /// the detected local address, e.g. the public IP of a host behind 1:1 NAT.
    pub(crate) announced_ip: Option<IpAddr>,

    /// bind_addr is where the UDP binding opens its socket.
    pub(crate) bind_addr: SocketAddr,

    /// ice configures the ICE-lite server.
    pub(crate) ice: ServerConfig,

    /// dtls configures the DTLS engine.
    pub(crate) dtls: DtlsConfig,

    /// ring_size is the ring capacity used for media sources created from
    /// this configuration.
    pub(crate) ring_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfigBuilder::new().build()
    }
}

impl TransportConfig {
    pub fn announced_ip(&self) -> Option<IpAddr> {
        self.announced_ip
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn ice(&self) -> &ServerConfig {
        &self.ice
    }

    pub fn dtls(&self) -> &DtlsConfig {
        &self.dtls
    }

    pub fn ring_size(&self) -> usize {
        self.ring_size
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    announced_ip: Option<IpAddr>,
    bind_addr: SocketAddr,
    ice: ServerConfig,
    dtls: DtlsConfig,
    ring_size: usize,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self {
            announced_ip: None,
            bind_addr: DEFAULT_BIND_ADDR,
            ice: ServerConfig::default(),
            dtls: DtlsConfig::default(),
            ring_size: DEFAULT_RING_SIZE,
        }
    }
}

impl TransportConfigBuilder {
    pub fn new() -> Self {
        TransportConfigBuilder::default()
    }

    pub fn with_announced_ip(mut self, announced_ip: IpAddr) -> Self {
        self.announced_ip = Some(announced_ip);
        self
    }

    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_ice_config(mut self, ice: ServerConfig) -> Self {
        self.ice = ice;
        self
    }

    pub fn with_dtls_config(mut self, dtls: DtlsConfig) -> Self {
        self.dtls = dtls;
        self
    }

    pub fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }

    pub fn build(self) -> TransportConfig {
        TransportConfig {
            announced_ip: self.announced_ip,
            bind_addr: self.bind_addr,
            ice: self.ice,
            dtls: self.dtls,
            ring_size: self.ring_size,
        }
    }
}
