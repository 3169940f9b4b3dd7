use proxima_core::ClientId;
use tokio::time::Instant;

/// Which side of the pair sends the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The side whose id sorts after the other's initiates, so exactly one
    /// side of every pair sends an offer.
    pub fn between(local: &ClientId, remote: &ClientId) -> Self {
        if local > remote {
            Role::Initiator
        } else {
            Role::Responder
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerPhase {
    /// Introduced, no handshake started.
    Discovered,
    /// Initiator: offer pending or sent, waiting for the answer.
    Offering,
    /// Responder: waiting for the remote offer.
    Awaiting,
    /// Descriptions exchanged, trading connectivity candidates.
    Negotiating,
    Connected,
    Closing,
    Closed,
}

impl PeerPhase {
    pub fn is_terminal(self) -> bool {
        self == PeerPhase::Closed
    }

    fn allows(self, next: PeerPhase) -> bool {
        use PeerPhase::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closing) => true,
            (Closing, Closed) => true,
            (Discovered, Offering | Awaiting) => true,
            (Offering | Awaiting, Negotiating) => true,
            (Negotiating, Connected) => true,
            _ => false,
        }
    }
}

/// Per-peer handshake record, owned by the peer manager.
#[derive(Debug, Clone)]
pub struct PeerConnectionState {
    pub peer_id: ClientId,
    pub role: Role,
    /// Distinguishes this record from earlier ones for the same peer, so
    /// timers and link events from a torn-down attempt are ignored.
    pub token: u64,
    pub created_at: Instant,
    pub last_activity: Instant,
    phase: PeerPhase,
    remote_session_descriptor: Option<String>,
    attempt_started: bool,
}

impl PeerConnectionState {
    pub fn new(peer_id: ClientId, role: Role, token: u64, now: Instant) -> Self {
        Self {
            peer_id,
            role,
            token,
            created_at: now,
            last_activity: now,
            phase: PeerPhase::Discovered,
            remote_session_descriptor: None,
            attempt_started: false,
        }
    }

    pub fn phase(&self) -> PeerPhase {
        self.phase
    }

    pub fn remote_session_descriptor(&self) -> Option<&str> {
        self.remote_session_descriptor.as_deref()
    }

    pub fn attempt_started(&self) -> bool {
        self.attempt_started
    }

    pub(crate) fn mark_attempt_started(&mut self, now: Instant) {
        self.attempt_started = true;
        self.touch(now);
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Moves to `next` if the state machine allows it.
    pub(crate) fn advance(&mut self, next: PeerPhase) -> bool {
        if !self.phase.allows(next) {
            return false;
        }
        self.phase = next;
        true
    }

    /// The remote description is set once per record.
    pub(crate) fn set_remote_descriptor(&mut self, descriptor: String) -> bool {
        if self.remote_session_descriptor.is_some() {
            return false;
        }
        self.remote_session_descriptor = Some(descriptor);
        true
    }
}
