use crate::engine::{ClientEngine, ClientEvent, Timer, TimerEvent};
use crate::error::LinkError;
use crate::peer::{PeerAction, Role};
use crate::transport::{LinkEventSink, PeerLink};
use proxima_core::{ClientId, ClientMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

impl ClientEngine {
    /// Runs actions in order. Failures feed follow-up actions from the manager
    /// into the same queue.
    pub(crate) async fn apply(&mut self, actions: Vec<PeerAction>) {
        let mut queue: VecDeque<PeerAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            let follow_up = self.apply_one(action).await;
            queue.extend(follow_up);
        }
    }

    async fn apply_one(&mut self, action: PeerAction) -> Vec<PeerAction> {
        match action {
            PeerAction::ScheduleAttempt { peer, token, delay } => {
                let event = TimerEvent::AttemptDue {
                    peer: peer.clone(),
                    token,
                };
                let timer = self.schedule(event, token, delay);
                replace_timer(&mut self.attempts, peer, timer);
                Vec::new()
            }

            PeerAction::ArmWatchdog { peer, token, after } => {
                let event = TimerEvent::WatchdogFired {
                    peer: peer.clone(),
                    token,
                };
                let timer = self.schedule(event, token, after);
                replace_timer(&mut self.watchdogs, peer, timer);
                Vec::new()
            }

            PeerAction::DisarmWatchdog { peer } => {
                cancel_timer(&mut self.watchdogs, &peer);
                Vec::new()
            }

            PeerAction::Offer { peer, token } => match self.start_offer(&peer, token).await {
                Ok(()) => Vec::new(),
                Err(e) => {
                    warn!("Offer to {} failed: {}", peer, e);
                    self.manager.on_link_lost(&peer, token)
                }
            },

            PeerAction::Answer { peer, token, offer } => {
                match self.answer_offer(&peer, token, offer).await {
                    Ok(()) => Vec::new(),
                    Err(e) => {
                        warn!("Answering {} failed: {}", peer, e);
                        self.manager.on_link_lost(&peer, token)
                    }
                }
            }

            PeerAction::ApplyAnswer { peer, token, answer } => {
                let result = match self.links.get(&peer).cloned() {
                    Some(link) => link.accept_answer(answer).await,
                    None => Err(LinkError::Closed),
                };
                match result {
                    Ok(()) => {
                        self.described.insert(peer.clone());
                        self.flush_candidates(&peer).await;
                        Vec::new()
                    }
                    Err(e) => {
                        warn!("Applying answer from {} failed: {}", peer, e);
                        self.manager.on_link_lost(&peer, token)
                    }
                }
            }

            PeerAction::ApplyCandidate { peer, candidate, .. } => {
                let ready = self.described.contains(&peer);
                match self.links.get(&peer).cloned() {
                    Some(link) if ready => {
                        if let Err(e) = link.add_remote_candidate(candidate).await {
                            warn!("Candidate from {} rejected: {}", peer, e);
                        }
                    }
                    _ => {
                        debug!("Buffering early candidate from {}", peer);
                        self.pending_candidates.entry(peer).or_default().push(candidate);
                    }
                }
                Vec::new()
            }

            PeerAction::Established { peer } => {
                self.emit(ClientEvent::PeerConnected(peer.clone()));
                self.send_position_to(&peer).await;
                Vec::new()
            }

            PeerAction::Teardown { peer, .. } => {
                self.release(&peer).await;
                self.emit(ClientEvent::PeerGone(peer));
                Vec::new()
            }

            PeerAction::RequestRefresh => {
                if self.broker_connected {
                    self.to_broker(ClientMessage::RequestPeerRefresh);
                }
                Vec::new()
            }
        }
    }

    async fn start_offer(&mut self, peer: &ClientId, token: u64) -> Result<(), LinkError> {
        let link = self.open_link(peer, token, Role::Initiator).await?;
        let offer = link.create_offer().await?;
        self.to_broker(ClientMessage::SendOffer {
            target_id: peer.clone(),
            offer,
        });
        Ok(())
    }

    async fn answer_offer(
        &mut self,
        peer: &ClientId,
        token: u64,
        offer: String,
    ) -> Result<(), LinkError> {
        let link = self.open_link(peer, token, Role::Responder).await?;
        let answer = link.accept_offer(offer).await?;
        self.described.insert(peer.clone());
        self.to_broker(ClientMessage::SendAnswer {
            target_id: peer.clone(),
            answer,
        });
        self.flush_candidates(peer).await;
        Ok(())
    }

    async fn open_link(
        &mut self,
        peer: &ClientId,
        token: u64,
        role: Role,
    ) -> Result<Arc<dyn PeerLink>, LinkError> {
        let sink = LinkEventSink::new(peer.clone(), token, self.link_tx.clone());
        let link = self.factory.open(peer, role, sink).await?;
        if let Some(previous) = self.links.insert(peer.clone(), link.clone()) {
            let _ = previous.close().await;
        }
        Ok(link)
    }

    async fn flush_candidates(&mut self, peer: &ClientId) {
        let Some(candidates) = self.pending_candidates.remove(peer) else {
            return;
        };
        let Some(link) = self.links.get(peer).cloned() else {
            return;
        };
        for candidate in candidates {
            if let Err(e) = link.add_remote_candidate(candidate).await {
                warn!("Buffered candidate from {} rejected: {}", peer, e);
            }
        }
    }

    /// Drops everything held for `peer`. Safe to call more than once.
    pub(crate) async fn release(&mut self, peer: &ClientId) {
        cancel_timer(&mut self.attempts, peer);
        cancel_timer(&mut self.watchdogs, peer);
        self.described.remove(peer);
        self.pending_candidates.remove(peer);
        self.peer_positions.remove(peer);
        if let Some(link) = self.links.remove(peer) {
            if let Err(e) = link.close().await {
                debug!("Closing link to {}: {}", peer, e);
            }
        }
    }

    fn schedule(&self, event: TimerEvent, token: u64, after: Duration) -> Timer {
        let tx: mpsc::UnboundedSender<TimerEvent> = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(event);
        });
        Timer { token, task }
    }
}

fn replace_timer(timers: &mut HashMap<ClientId, Timer>, peer: ClientId, timer: Timer) {
    if let Some(old) = timers.insert(peer, timer) {
        old.task.abort();
    }
}

fn cancel_timer(timers: &mut HashMap<ClientId, Timer>, peer: &ClientId) {
    if let Some(timer) = timers.remove(peer) {
        timer.task.abort();
    }
}
