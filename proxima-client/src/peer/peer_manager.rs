use crate::peer::peer_state::{PeerConnectionState, PeerPhase, Role};
use proxima_core::ClientId;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Side effects requested by the manager. The engine executes them in order
/// and feeds their completions back as new events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAction {
    ScheduleAttempt {
        peer: ClientId,
        token: u64,
        delay: Duration,
    },
    ArmWatchdog {
        peer: ClientId,
        token: u64,
        after: Duration,
    },
    DisarmWatchdog {
        peer: ClientId,
    },
    /// Open a link as initiator and send the offer.
    Offer {
        peer: ClientId,
        token: u64,
    },
    /// Open a link as responder, apply the offer and send the answer.
    Answer {
        peer: ClientId,
        token: u64,
        offer: String,
    },
    ApplyAnswer {
        peer: ClientId,
        token: u64,
        answer: String,
    },
    ApplyCandidate {
        peer: ClientId,
        token: u64,
        candidate: String,
    },
    Established {
        peer: ClientId,
    },
    /// Cancel timers, close the link and forget per-peer buffers.
    Teardown {
        peer: ClientId,
        token: u64,
    },
    RequestRefresh,
}

/// Table of per-peer handshake state machines.
///
/// Synchronous and lock-free: every method is called from the engine's single
/// dispatch sequence, and timers re-enter through [`on_attempt_due`] and
/// [`on_watchdog`] carrying the token of the record that armed them.
///
/// [`on_attempt_due`]: PeerConnectionManager::on_attempt_due
/// [`on_watchdog`]: PeerConnectionManager::on_watchdog
pub struct PeerConnectionManager {
    local_id: ClientId,
    handshake_timeout: Duration,
    attempt_stagger: Duration,
    peers: HashMap<ClientId, PeerConnectionState>,
    next_token: u64,
    next_attempt_at: Option<Instant>,
}

impl PeerConnectionManager {
    pub fn new(local_id: ClientId, handshake_timeout: Duration, attempt_stagger: Duration) -> Self {
        Self {
            local_id,
            handshake_timeout,
            attempt_stagger,
            peers: HashMap::new(),
            next_token: 0,
            next_attempt_at: None,
        }
    }

    pub fn local_id(&self) -> &ClientId {
        &self.local_id
    }

    pub fn get(&self, peer: &ClientId) -> Option<&PeerConnectionState> {
        self.peers.get(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Token of the live record for `peer`, if any.
    pub fn token_of(&self, peer: &ClientId) -> Option<u64> {
        self.peers.get(peer).map(|state| state.token)
    }

    pub fn is_connected(&self, peer: &ClientId) -> bool {
        self.peers
            .get(peer)
            .is_some_and(|state| state.phase() == PeerPhase::Connected)
    }

    pub fn connected_peers(&self) -> Vec<ClientId> {
        let mut peers: Vec<ClientId> = self
            .peers
            .values()
            .filter(|state| state.phase() == PeerPhase::Connected)
            .map(|state| state.peer_id.clone())
            .collect();
        peers.sort();
        peers
    }

    /// Applies a full nearby list: ids without a record are introduced, records
    /// whose id is absent are torn down.
    pub fn on_nearby_peers(&mut self, nearby: &[ClientId], now: Instant) -> Vec<PeerAction> {
        let listed: BTreeSet<&ClientId> =
            nearby.iter().filter(|id| **id != self.local_id).collect();
        let mut actions = Vec::new();

        let mut lost: Vec<ClientId> = self
            .peers
            .keys()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        lost.sort();
        for peer in lost {
            info!("Peer {} left range", peer);
            self.teardown_into(&peer, &mut actions);
        }

        for peer in listed {
            if self.peers.contains_key(peer) {
                continue;
            }
            self.introduce(peer.clone(), now, &mut actions);
        }
        actions
    }

    pub fn on_attempt_due(&mut self, peer: &ClientId, token: u64, now: Instant) -> Vec<PeerAction> {
        let timeout = self.handshake_timeout;
        let Some(state) = self.live_record(peer, token) else {
            return Vec::new();
        };
        if state.role != Role::Initiator
            || state.phase() != PeerPhase::Offering
            || state.attempt_started()
        {
            return Vec::new();
        }
        state.mark_attempt_started(now);
        debug!("Starting handshake with {}", peer);
        vec![
            PeerAction::ArmWatchdog {
                peer: peer.clone(),
                token,
                after: timeout,
            },
            PeerAction::Offer {
                peer: peer.clone(),
                token,
            },
        ]
    }

    pub fn on_offer(&mut self, peer: &ClientId, offer: String, now: Instant) -> Vec<PeerAction> {
        if *peer == self.local_id {
            warn!("Ignoring offer addressed from our own id");
            return Vec::new();
        }
        let mut actions = Vec::new();

        match self.peers.get(peer).map(|state| (state.role, state.phase())) {
            None => {
                debug!("Offer from {} arrived before its introduction", peer);
                self.create_record(peer.clone(), Role::Responder, now, &mut actions);
            }
            Some((Role::Responder, PeerPhase::Awaiting)) => {}
            Some((Role::Responder, _)) => {
                info!("Peer {} restarted its handshake", peer);
                self.teardown_into(peer, &mut actions);
                self.create_record(peer.clone(), Role::Responder, now, &mut actions);
            }
            Some((Role::Initiator, phase)) => {
                warn!("Unexpected offer from {} while initiating ({:?})", peer, phase);
                return actions;
            }
        }

        let Some(state) = self.peers.get_mut(peer) else {
            return actions;
        };
        if state.set_remote_descriptor(offer.clone()) && state.advance(PeerPhase::Negotiating) {
            state.touch(now);
            actions.push(PeerAction::Answer {
                peer: peer.clone(),
                token: state.token,
                offer,
            });
        }
        actions
    }

    pub fn on_answer(&mut self, peer: &ClientId, answer: String, now: Instant) -> Vec<PeerAction> {
        let Some(state) = self.peers.get_mut(peer) else {
            debug!("Dropping answer from unknown peer {}", peer);
            return Vec::new();
        };
        if state.role != Role::Initiator || state.phase() != PeerPhase::Offering {
            warn!("Unexpected answer from {} in {:?}", peer, state.phase());
            return Vec::new();
        }
        if !state.set_remote_descriptor(answer.clone()) || !state.advance(PeerPhase::Negotiating) {
            return Vec::new();
        }
        state.touch(now);
        vec![PeerAction::ApplyAnswer {
            peer: peer.clone(),
            token: state.token,
            answer,
        }]
    }

    /// Candidates are applied in any live phase.
    pub fn on_candidate(
        &mut self,
        peer: &ClientId,
        candidate: String,
        now: Instant,
    ) -> Vec<PeerAction> {
        let Some(state) = self.peers.get_mut(peer) else {
            debug!("Dropping candidate from unknown peer {}", peer);
            return Vec::new();
        };
        if state.phase().is_terminal() {
            return Vec::new();
        }
        state.touch(now);
        vec![PeerAction::ApplyCandidate {
            peer: peer.clone(),
            token: state.token,
            candidate,
        }]
    }

    pub fn on_connected(&mut self, peer: &ClientId, token: u64, now: Instant) -> Vec<PeerAction> {
        let Some(state) = self.live_record(peer, token) else {
            return Vec::new();
        };
        if !state.advance(PeerPhase::Connected) {
            return Vec::new();
        }
        state.touch(now);
        info!("Connected to {}", peer);
        vec![
            PeerAction::DisarmWatchdog { peer: peer.clone() },
            PeerAction::Established { peer: peer.clone() },
        ]
    }

    /// The handshake bound elapsed. Fires at most once per record.
    pub fn on_watchdog(&mut self, peer: &ClientId, token: u64) -> Vec<PeerAction> {
        let Some(state) = self.live_record(peer, token) else {
            return Vec::new();
        };
        if state.phase() == PeerPhase::Connected {
            return Vec::new();
        }
        warn!("Handshake with {} timed out in {:?}", peer, state.phase());
        self.abandon(peer)
    }

    /// The transport for a live record failed or dropped.
    pub fn on_link_lost(&mut self, peer: &ClientId, token: u64) -> Vec<PeerAction> {
        let Some(state) = self.live_record(peer, token) else {
            return Vec::new();
        };
        warn!("Link to {} lost in {:?}", peer, state.phase());
        self.abandon(peer)
    }

    /// Idempotent: an unknown or already removed peer yields no actions.
    pub fn teardown(&mut self, peer: &ClientId) -> Vec<PeerAction> {
        let mut actions = Vec::new();
        self.teardown_into(peer, &mut actions);
        actions
    }

    pub fn teardown_all(&mut self) -> Vec<PeerAction> {
        let mut peers: Vec<ClientId> = self.peers.keys().cloned().collect();
        peers.sort();
        let mut actions = Vec::new();
        for peer in peers {
            self.teardown_into(&peer, &mut actions);
        }
        self.next_attempt_at = None;
        actions
    }

    fn abandon(&mut self, peer: &ClientId) -> Vec<PeerAction> {
        let mut actions = Vec::new();
        self.teardown_into(peer, &mut actions);
        actions.push(PeerAction::RequestRefresh);
        actions
    }

    fn live_record(&mut self, peer: &ClientId, token: u64) -> Option<&mut PeerConnectionState> {
        self.peers
            .get_mut(peer)
            .filter(|state| state.token == token && !state.phase().is_terminal())
    }

    fn introduce(&mut self, peer: ClientId, now: Instant, actions: &mut Vec<PeerAction>) {
        let role = Role::between(&self.local_id, &peer);
        debug!("Introduced to {} as {:?}", peer, role);
        self.create_record(peer, role, now, actions);
    }

    fn create_record(
        &mut self,
        peer: ClientId,
        role: Role,
        now: Instant,
        actions: &mut Vec<PeerAction>,
    ) {
        self.next_token += 1;
        let token = self.next_token;
        let mut state = PeerConnectionState::new(peer.clone(), role, token, now);

        match role {
            Role::Initiator => {
                state.advance(PeerPhase::Offering);
                let delay = self.claim_attempt_slot(now);
                actions.push(PeerAction::ScheduleAttempt {
                    peer: peer.clone(),
                    token,
                    delay,
                });
            }
            Role::Responder => {
                state.advance(PeerPhase::Awaiting);
                actions.push(PeerAction::ArmWatchdog {
                    peer: peer.clone(),
                    token,
                    after: self.handshake_timeout,
                });
            }
        }
        self.peers.insert(peer, state);
    }

    /// Attempts are spaced `attempt_stagger` apart; the first one in a quiet
    /// period starts immediately.
    fn claim_attempt_slot(&mut self, now: Instant) -> Duration {
        let slot = match self.next_attempt_at {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_attempt_at = Some(slot + self.attempt_stagger);
        slot - now
    }

    fn teardown_into(&mut self, peer: &ClientId, actions: &mut Vec<PeerAction>) {
        let Some(mut state) = self.peers.remove(peer) else {
            return;
        };
        state.advance(PeerPhase::Closing);
        actions.push(PeerAction::Teardown {
            peer: peer.clone(),
            token: state.token,
        });
        state.advance(PeerPhase::Closed);
        debug!("Removed peer {}", peer);
    }
}
