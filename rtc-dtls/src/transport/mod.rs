
use bytes::BytesMut;
use log::{debug, error, info, trace, warn};
use openssl::ssl::{
    ErrorCode, SslContext, SslMethod, SslOptions, SslStream, SslVerifyMode, SslVersion, Ssl,
};
use sansio::Protocol;
use shared::error::{Error, Result};
use srtp::ProtectionProfile;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::certificate::Certificate;
use crate::config::{DtlsConfig, MIN_MTU};
use crate::crypto_suite::SrtpCryptoSuite;
use crate::fingerprint::{Fingerprint, FingerprintAlgorithm};
use crate::io::DatagramBuffer;
use crate::role::DtlsRole;
use crate::state::DtlsState;

/// RFC 5764 Section 4.2 exporter label.
const SRTP_EXPORTER_LABEL: &str = "EXTRACTOR-dtls_srtp";

const DTLS_CIPHERS: &str = "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-ECDSA-AES256-GCM-SHA384:\
                            ECDHE-ECDSA-AES128-SHA:ECDHE-ECDSA-AES256-SHA";

const RECEIVE_BUFFER_SIZE: usize = 16384;

/// Master key and salt for both SRTP directions, as exported after the
/// handshake. Each key is `master_key || master_salt` of the suite's lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtpKeyingMaterial {
    pub suite: SrtpCryptoSuite,
    /// Protects what this endpoint sends.
    pub local_key: Vec<u8>,
    /// Protects what the peer sends.
    pub remote_key: Vec<u8>,
    /// SHA-256 (or the configured algorithm) fingerprint of the peer certificate.
    pub remote_fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtlsEvent {
    /// Handshake done; emitted exactly once per transport.
    Connected(SrtpKeyingMaterial),
    StateChange(DtlsState),
}

/// DtlsTransport runs one DTLS association over datagrams it never sends
/// itself: records come in through `handle_read` and leave through
/// `poll_write`.
pub struct DtlsTransport {
    certificate: Certificate,
    context: SslContext,
    mtu: usize,
    retransmit_interval: Duration,
    remote_fingerprint: Fingerprint,

    role: DtlsRole,
    state: DtlsState,
    stream: Option<SslStream<DatagramBuffer>>,
    retransmit_deadline: Option<Instant>,

    reads: VecDeque<BytesMut>,
    transmits: VecDeque<BytesMut>,
    events: VecDeque<DtlsEvent>,
}

impl DtlsTransport {
    pub fn new(config: DtlsConfig) -> Result<Self> {
        crate::init();

        if config.mtu < MIN_MTU {
            return Err(Error::OtherDtlsErr(format!(
                "mtu {} is below the minimum of {MIN_MTU}",
                config.mtu
            )));
        }
        if config.srtp_protection_profiles.is_empty() {
            return Err(Error::ErrNoSrtpProtectionProfile);
        }

        let certificate = match config.certificate {
            Some(certificate) => certificate,
            None => Certificate::generate()?,
        };
        let context = build_context(&certificate, &config.srtp_protection_profiles)?;

        Ok(Self {
            certificate,
            context,
            mtu: config.mtu,
            retransmit_interval: config.retransmit_interval,
            remote_fingerprint: config.remote_fingerprint,

            role: DtlsRole::default(),
            state: DtlsState::Idle,
            stream: None,
            retransmit_deadline: None,

            reads: VecDeque::new(),
            transmits: VecDeque::new(),
            events: VecDeque::new(),
        })
    }

    /// Starts the handshake in `role`. A client sends its ClientHello right
    /// away; a server waits for one.
    pub fn run(&mut self, role: DtlsRole) -> Result<()> {
        if self.state != DtlsState::Idle {
            return Err(Error::ErrDtlsMultipleStart);
        }

        let mut ssl = Ssl::new(&self.context)?;
        ssl.set_mtu(self.mtu as u32)?;
        match role {
            DtlsRole::Client => ssl.set_connect_state(),
            DtlsRole::Server => ssl.set_accept_state(),
        }
        self.stream = Some(SslStream::new(ssl, DatagramBuffer::default())?);
        self.role = role;

        debug!("[dtls] running as {role}");
        self.state_change(DtlsState::Handshaking);
        self.retransmit_deadline = Some(Instant::now() + self.retransmit_interval);

        let result = match role {
            DtlsRole::Client => self.drive_handshake(),
            DtlsRole::Server => Ok(()),
        };
        self.flush_outgoing();
        result
    }

    pub fn state(&self) -> DtlsState {
        self.state
    }

    pub fn role(&self) -> DtlsRole {
        self.role
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Fingerprints of the local certificate for the SDP answer.
    pub fn get_local_fingerprints(&self) -> Vec<Fingerprint> {
        self.certificate.get_fingerprints()
    }

    pub fn remote_fingerprint(&self) -> &Fingerprint {
        &self.remote_fingerprint
    }

    /// Sets the fingerprint the peer certificate must match when the
    /// handshake completes. An empty fingerprint accepts any certificate.
    pub fn set_remote_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.remote_fingerprint = fingerprint;
    }

    fn state_change(&mut self, state: DtlsState) {
        if self.state == state {
            return;
        }
        info!("[dtls] state changed {} -> {}", self.state, state);
        self.state = state;
        self.events.push_back(DtlsEvent::StateChange(state));
    }

    fn flush_outgoing(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            self.transmits.extend(stream.get_mut().outgoing.drain(..));
        }
    }

    fn drive_handshake(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::ErrDtlsNotStarted)?;
        match stream.do_handshake() {
            Ok(()) => self.handshake_completed(),
            Err(err) if err.code() == ErrorCode::WANT_READ => Ok(()),
            Err(err) => {
                warn!("[dtls] handshake failed: {err}");
                self.retransmit_deadline = None;
                self.state_change(DtlsState::Failed);
                Err(err.into())
            }
        }
    }

    fn handshake_completed(&mut self) -> Result<()> {
        self.retransmit_deadline = None;
        match self.export_keying_material() {
            Ok(material) => {
                info!(
                    "[dtls] handshake completed as {}, srtp profile {}",
                    self.role, material.suite
                );
                self.state_change(DtlsState::Connected);
                self.events.push_back(DtlsEvent::Connected(material));
                Ok(())
            }
            Err(err) => {
                error!("[dtls] rejecting completed handshake: {err}");
                if let Some(stream) = self.stream.as_mut() {
                    if let Err(shutdown_err) = stream.shutdown() {
                        debug!("[dtls] shutdown after rejection: {shutdown_err}");
                    }
                }
                self.state_change(DtlsState::Failed);
                Err(err)
            }
        }
    }

    fn export_keying_material(&self) -> Result<SrtpKeyingMaterial> {
        let stream = self.stream.as_ref().ok_or(Error::ErrDtlsNotStarted)?;
        let ssl = stream.ssl();

        let suite = ssl
            .selected_srtp_profile()
            .and_then(|profile| SrtpCryptoSuite::from_profile_id(profile.id()))
            .ok_or(Error::ErrNoSrtpProtectionProfile)?;

        let peer_certificate = ssl
            .peer_certificate()
            .ok_or(Error::ErrNoRemoteCertificate)?;
        let remote_fingerprint = self.verify_remote_certificate(&peer_certificate.to_der()?)?;

        // client key | server key | client salt | server salt
        let profile = ProtectionProfile::from(suite);
        let (key_len, salt_len) = (profile.key_len(), profile.salt_len());
        let mut material = vec![0u8; 2 * profile.keying_material_len()];
        ssl.export_keying_material(&mut material, SRTP_EXPORTER_LABEL, None)?;

        let (client_key, rest) = material.split_at(key_len);
        let (server_key, rest) = rest.split_at(key_len);
        let (client_salt, server_salt) = rest.split_at(salt_len);
        let client = [client_key, client_salt].concat();
        let server = [server_key, server_salt].concat();

        let (local_key, remote_key) = match self.role {
            DtlsRole::Client => (client, server),
            DtlsRole::Server => (server, client),
        };

        Ok(SrtpKeyingMaterial {
            suite,
            local_key,
            remote_key,
            remote_fingerprint,
        })
    }

    fn verify_remote_certificate(&self, der: &[u8]) -> Result<Fingerprint> {
        if self.remote_fingerprint.is_empty() {
            warn!("[dtls] no remote fingerprint set, accepting peer certificate unverified");
            return Ok(Fingerprint::of_der(FingerprintAlgorithm::Sha256, der));
        }

        let actual = Fingerprint::of_der(self.remote_fingerprint.algorithm, der);
        if self.remote_fingerprint.matches(der) {
            Ok(actual)
        } else {
            Err(Error::ErrMismatchFingerprint(
                self.remote_fingerprint.value.clone(),
                actual.value,
            ))
        }
    }

    fn read_application_data(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };

        let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
        let mut close_notify = false;
        loop {
            match stream.ssl_read(&mut buf) {
                Ok(n) => self.reads.push_back(BytesMut::from(&buf[..n])),
                Err(err) if err.code() == ErrorCode::WANT_READ => break,
                Err(err) if err.code() == ErrorCode::ZERO_RETURN => {
                    close_notify = true;
                    break;
                }
                Err(err) => {
                    warn!("[dtls] dropping unreadable record: {err}");
                    break;
                }
            }
        }

        if close_notify {
            info!("[dtls] close_notify received");
            self.state_change(DtlsState::Closed);
        }
        Ok(())
    }
}

fn build_context(certificate: &Certificate, profiles: &[SrtpCryptoSuite]) -> Result<SslContext> {
    let mut builder = SslContext::builder(SslMethod::dtls())?;
    builder.set_min_proto_version(Some(SslVersion::DTLS1_2))?;
    builder.set_cipher_list(DTLS_CIPHERS)?;
    builder.set_tlsext_use_srtp(&SrtpCryptoSuite::openssl_list(profiles))?;
    builder.set_certificate(&certificate.x509)?;
    builder.set_private_key(&certificate.private_key)?;
    builder.check_private_key()?;
    // Peers present self-signed certificates; they are checked against the
    // signalled fingerprint once the handshake completes.
    builder.set_verify_callback(
        SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
        |_, _| true,
    );
    builder.set_options(SslOptions::NO_QUERY_MTU);
    Ok(builder.build())
}

impl Protocol<BytesMut, (), ()> for DtlsTransport {
    type Rout = BytesMut;
    type Wout = BytesMut;
    type Eout = DtlsEvent;
    type Error = Error;
    type Time = Instant;

    fn handle_read(&mut self, msg: BytesMut) -> Result<()> {
        match self.state {
            DtlsState::Idle => {
                warn!("[dtls] dropping {} bytes received before run", msg.len());
                return Ok(());
            }
            DtlsState::Failed | DtlsState::Closed => {
                trace!("[dtls] dropping {} bytes in state {}", msg.len(), self.state);
                return Ok(());
            }
            DtlsState::Handshaking | DtlsState::Connected => {}
        }

        if let Some(stream) = self.stream.as_mut() {
            stream.get_mut().incoming.push_back(msg);
        }

        let result = if self.state == DtlsState::Handshaking {
            self.drive_handshake()
        } else {
            self.read_application_data()
        };
        self.flush_outgoing();
        result
    }

    /// Application data received after the handshake.
    fn poll_read(&mut self) -> Option<BytesMut> {
        self.reads.pop_front()
    }

    /// Nothing but handshake and alert records is ever sent.
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    fn poll_write(&mut self) -> Option<BytesMut> {
        self.transmits.pop_front()
    }

    fn poll_event(&mut self) -> Option<DtlsEvent> {
        self.events.pop_front()
    }

    fn handle_timeout(&mut self, now: Instant) -> Result<()> {
        if self.state != DtlsState::Handshaking {
            return Ok(());
        }
        match self.retransmit_deadline {
            Some(deadline) if deadline <= now => {}
            _ => return Ok(()),
        }

        self.retransmit_deadline = Some(now + self.retransmit_interval);
        let result = self.drive_handshake();
        self.flush_outgoing();
        result
    }

    fn poll_timeout(&mut self) -> Option<Instant> {
        if self.state == DtlsState::Handshaking {
            self.retransmit_deadline
        } else {
            None
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.state == DtlsState::Connected {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(err) = stream.shutdown() {
                    debug!("[dtls] close_notify not sent: {err}");
                }
            }
            self.flush_outgoing();
        }

        self.retransmit_deadline = None;
        self.stream = None;
        self.state_change(DtlsState::Closed);
        Ok(())
    }
}
