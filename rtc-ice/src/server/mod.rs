
pub mod server_config;

use bytes::BytesMut;
use log::{debug, info, trace, warn};
use sansio::Protocol;
use server_config::*;
use shared::error::*;
use shared::{TaggedBytesMut, TransportContext, TransportMessage};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use stun::attributes::*;
use stun::error_code::*;
use stun::fingerprint::*;
use stun::ice_attrs::*;
use stun::integrity::*;
use stun::message::*;
use stun::textattrs::*;
use stun::xoraddr::*;

use crate::rand::generate_credentials;
use crate::state::IceState;

/// Lifecycle notifications of the ICE-lite server, drained via `poll_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IceEvent {
    /// The tuple that all egress must use from now on.
    SelectedTuple(TransportContext),
    Connected,
    Completed,
    Disconnected,
}

/// Outcome of validating one binding request.
enum RequestCheck {
    Valid,
    Reject(ErrorCode),
}

/// ICE-lite server: answers connectivity checks from the remote full agent,
/// which is always the controlling side, and tracks the tuple it selected.
pub struct IceServer {
    local_ufrag: String,
    local_pwd: String,
    consent_timeout: Duration,

    state: IceState,
    selected_tuple: Option<TransportContext>,
    tuples: Vec<TransportContext>,
    last_consent: Option<Instant>,

    transmits: VecDeque<TaggedBytesMut>,
    events: VecDeque<IceEvent>,
}

impl IceServer {
    pub fn new(config: ServerConfig) -> Self {
        let (generated_ufrag, generated_pwd) = generate_credentials(config.credential_rng);
        let local_ufrag = if config.local_ufrag.is_empty() {
            generated_ufrag
        } else {
            config.local_ufrag
        };
        let local_pwd = if config.local_pwd.is_empty() {
            generated_pwd
        } else {
            config.local_pwd
        };

        Self {
            local_ufrag,
            local_pwd,
            consent_timeout: config.consent_timeout,

            state: IceState::New,
            selected_tuple: None,
            tuples: vec![],
            last_consent: None,

            transmits: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    pub fn local_ufrag(&self) -> &str {
        &self.local_ufrag
    }

    pub fn local_pwd(&self) -> &str {
        &self.local_pwd
    }

    pub fn state(&self) -> IceState {
        self.state
    }

    /// The tuple most recently selected, kept across `Disconnected`.
    pub fn selected_tuple(&self) -> Option<&TransportContext> {
        self.selected_tuple.as_ref()
    }

    /// Every tuple a valid binding request arrived on.
    pub fn tuples(&self) -> &[TransportContext] {
        &self.tuples
    }

    fn name(&self) -> &'static str {
        "ice-lite"
    }

    fn handle_binding_request(
        &mut self,
        m: &Message,
        transport: TransportContext,
        now: Instant,
    ) -> Result<()> {
        if let RequestCheck::Reject(code) = self.check_request(m) {
            debug!(
                "[{}]: rejecting binding request from {} with {}",
                self.name(),
                transport.peer_addr,
                code.0
            );
            return self.send_binding_error(m, code, transport, now);
        }

        self.send_binding_success(m, transport, now)?;
        self.last_consent = Some(now);
        if !self.tuples.contains(&transport) {
            self.tuples.push(transport);
        }

        let use_candidate = UseCandidateAttr::is_set(m);
        match self.state {
            IceState::New | IceState::Disconnected => {
                self.select_tuple(transport);
                self.set_state(IceState::Connected);
                if use_candidate {
                    self.set_state(IceState::Completed);
                }
            }
            IceState::Connected => {
                if use_candidate {
                    if self.selected_tuple != Some(transport) {
                        self.select_tuple(transport);
                    }
                    self.set_state(IceState::Completed);
                }
            }
            IceState::Completed => {
                if use_candidate && self.selected_tuple != Some(transport) {
                    self.select_tuple(transport);
                }
            }
            IceState::Closed => {}
        }

        Ok(())
    }

    fn check_request(&self, m: &Message) -> RequestCheck {
        if !m.contains(ATTR_USERNAME)
            || !m.contains(ATTR_MESSAGE_INTEGRITY)
            || !m.contains(ATTR_PRIORITY)
        {
            return RequestCheck::Reject(CODE_BAD_REQUEST);
        }

        let username = match TextAttribute::get_from_as(m, ATTR_USERNAME) {
            Ok(username) => username,
            Err(_) => return RequestCheck::Reject(CODE_BAD_REQUEST),
        };
        // USERNAME is "<local ufrag>:<remote ufrag>"
        let local_ufrag = username.text.split(':').next().unwrap_or_default();
        if local_ufrag != self.local_ufrag {
            return RequestCheck::Reject(CODE_UNAUTHORIZED);
        }

        let integrity = MessageIntegrity::new_short_term_integrity(self.local_pwd.clone());
        if integrity.check(m).is_err() {
            return RequestCheck::Reject(CODE_UNAUTHORIZED);
        }

        // ICE-lite always plays controlled, so must the peer not.
        if m.contains(ATTR_ICE_CONTROLLED) {
            return RequestCheck::Reject(CODE_ROLE_CONFLICT);
        }

        RequestCheck::Valid
    }

    fn send_binding_success(
        &mut self,
        m: &Message,
        transport: TransportContext,
        now: Instant,
    ) -> Result<()> {
        let (ip, port) = (transport.peer_addr.ip(), transport.peer_addr.port());
        let mut out = Message::new();
        out.build(&[
            Box::new(m.clone()),
            Box::new(BINDING_SUCCESS),
            Box::new(XorMappedAddress { ip, port }),
            Box::new(MessageIntegrity::new_short_term_integrity(
                self.local_pwd.clone(),
            )),
            Box::new(FINGERPRINT),
        ])?;
        self.send_stun(&out, transport, now);
        Ok(())
    }

    fn send_binding_error(
        &mut self,
        m: &Message,
        code: ErrorCode,
        transport: TransportContext,
        now: Instant,
    ) -> Result<()> {
        let mut out = Message::new();
        out.build(&[
            Box::new(m.clone()),
            Box::new(MessageType::new(m.typ.method, CLASS_ERROR_RESPONSE)),
            Box::new(code),
            Box::new(FINGERPRINT),
        ])?;
        self.send_stun(&out, transport, now);
        Ok(())
    }

    fn send_stun(&mut self, msg: &Message, transport: TransportContext, now: Instant) {
        trace!("[{}]: send {} to {}", self.name(), msg, transport.peer_addr);
        self.transmits.push_back(TransportMessage {
            now,
            transport,
            message: BytesMut::from(&msg.raw[..]),
        });
    }

    fn select_tuple(&mut self, transport: TransportContext) {
        debug!("[{}]: selected tuple {}", self.name(), transport);
        self.selected_tuple = Some(transport);
        self.events.push_back(IceEvent::SelectedTuple(transport));
    }

    fn set_state(&mut self, new_state: IceState) {
        if self.state == new_state {
            return;
        }
        info!(
            "[{}]: Setting new connection state: {} -> {}",
            self.name(),
            self.state,
            new_state
        );
        self.state = new_state;

        let event = match new_state {
            IceState::Connected => Some(IceEvent::Connected),
            IceState::Completed => Some(IceEvent::Completed),
            IceState::Disconnected => Some(IceEvent::Disconnected),
            IceState::New | IceState::Closed => None,
        };
        if let Some(event) = event {
            self.events.push_back(event);
        }
    }

    fn consent_deadline(&self) -> Option<Instant> {
        if !self.state.is_connected() || self.consent_timeout == Duration::ZERO {
            return None;
        }
        self.last_consent.map(|last| last + self.consent_timeout)
    }
}

impl Protocol<TaggedBytesMut, (), ()> for IceServer {
    type Rout = ();
    type Wout = TaggedBytesMut;
    type Eout = IceEvent;
    type Error = Error;
    type Time = Instant;

    /// Processes one STUN datagram from `msg.transport.peer_addr`.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.state == IceState::Closed {
            return Err(Error::ErrIceServerClosed);
        }

        let mut m = Message::new();
        m.unmarshal_binary(&msg.message)?;
        if m.contains(ATTR_FINGERPRINT) {
            FINGERPRINT.check(&m)?;
        }

        match m.typ.class {
            CLASS_REQUEST if m.typ.method == METHOD_BINDING => {
                self.handle_binding_request(&m, msg.transport, msg.now)
            }
            CLASS_REQUEST => {
                warn!(
                    "[{}]: unsupported STUN method {} from {}",
                    self.name(),
                    m.typ.method,
                    msg.transport.peer_addr
                );
                self.send_binding_error(&m, CODE_BAD_REQUEST, msg.transport, msg.now)
            }
            _ => {
                trace!(
                    "[{}]: unhandled STUN from {} class({}) method({})",
                    self.name(),
                    msg.transport.peer_addr,
                    m.typ.class,
                    m.typ.method
                );
                Ok(())
            }
        }
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.transmits.pop_front()
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.events.pop_front()
    }

    fn handle_timeout(&mut self, now: Instant) -> Result<()> {
        match self.consent_deadline() {
            Some(deadline) if deadline <= now => {
                warn!(
                    "[{}]: no valid binding request for {:?}",
                    self.name(),
                    self.consent_timeout
                );
                self.set_state(IceState::Disconnected);
            }
            _ => {}
        }
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Instant> {
        self.consent_deadline()
    }

    fn close(&mut self) -> Result<()> {
        self.set_state(IceState::Closed);
        self.transmits.clear();
        self.events.clear();
        self.tuples.clear();
        self.selected_tuple = None;
        Ok(())
    }
}
