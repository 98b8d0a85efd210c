//! Events published after each committed match mutation, and the sinks that receive them.

use crate::models::Match;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// A completed state transition, carrying the full updated match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "match", rename_all = "kebab-case")]
pub enum MatchEvent {
    MatchStarted(Match),
    MatchPaused(Match),
    MatchResumed(Match),
    HalftimeStarted(Match),
    SecondHalfStarted(Match),
    MatchFinished(Match),
    MatchAborted(Match),
    MatchResultAdded(Match),
    LiveScoreUpdate(Match),
}

impl MatchEvent {
    /// Wire name, e.g. `match-started`.
    pub fn name(&self) -> &'static str {
        match self {
            MatchEvent::MatchStarted(_) => "match-started",
            MatchEvent::MatchPaused(_) => "match-paused",
            MatchEvent::MatchResumed(_) => "match-resumed",
            MatchEvent::HalftimeStarted(_) => "halftime-started",
            MatchEvent::SecondHalfStarted(_) => "second-half-started",
            MatchEvent::MatchFinished(_) => "match-finished",
            MatchEvent::MatchAborted(_) => "match-aborted",
            MatchEvent::MatchResultAdded(_) => "match-result-added",
            MatchEvent::LiveScoreUpdate(_) => "live-score-update",
        }
    }

    pub fn game(&self) -> &Match {
        match self {
            MatchEvent::MatchStarted(m)
            | MatchEvent::MatchPaused(m)
            | MatchEvent::MatchResumed(m)
            | MatchEvent::HalftimeStarted(m)
            | MatchEvent::SecondHalfStarted(m)
            | MatchEvent::MatchFinished(m)
            | MatchEvent::MatchAborted(m)
            | MatchEvent::MatchResultAdded(m)
            | MatchEvent::LiveScoreUpdate(m) => m,
        }
    }
}

/// Receiver of published events (e.g. a websocket broadcaster).
pub trait EventSink {
    fn publish(&self, event: &MatchEvent);
}

/// An event with its position in publication order. Numbering starts at 1.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub seq: u64,
    pub event: MatchEvent,
}

/// Events after a client's cursor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<SequencedEvent>,
    /// Cursor to send with the next request.
    pub next: u64,
    /// Some events after the cursor were already evicted from the log; the client
    /// should reload the tournament.
    pub missed: bool,
}

#[derive(Debug, Default)]
struct EventLog {
    last_seq: u64,
    events: VecDeque<SequencedEvent>,
}

/// Numbers every event, keeps the newest `capacity` of them for replay and forwards
/// them into a tokio broadcast channel. Clones share the log and the channel.
#[derive(Clone, Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<SequencedEvent>,
    log: Arc<Mutex<EventLog>>,
    capacity: usize,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            log: Arc::new(Mutex::new(EventLog::default())),
            capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequencedEvent> {
        self.tx.subscribe()
    }

    /// Sequence number of the newest event, 0 before the first one.
    pub fn latest(&self) -> u64 {
        self.log.lock().map(|backlog| backlog.last_seq).unwrap_or_default()
    }

    /// Logged events with a sequence number above `cursor`.
    ///
    /// A cursor ahead of the log (e.g. from before a restart) replays everything kept
    /// and is reported as `missed`.
    pub fn since(&self, cursor: u64) -> EventBatch {
        let backlog = match self.log.lock() {
            Ok(backlog) => backlog,
            Err(_) => {
                log::error!("event log lock poisoned");
                return EventBatch {
                    events: Vec::new(),
                    next: cursor,
                    missed: true,
                };
            }
        };
        let ahead = cursor > backlog.last_seq;
        let from = if ahead { 0 } else { cursor };
        let oldest = backlog.events.front().map_or(backlog.last_seq + 1, |e| e.seq);
        EventBatch {
            events: backlog.events.iter().filter(|e| e.seq > from).cloned().collect(),
            next: backlog.last_seq,
            missed: ahead || from + 1 < oldest,
        }
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &MatchEvent) {
        let mut backlog = match self.log.lock() {
            Ok(backlog) => backlog,
            Err(_) => {
                log::error!("event log lock poisoned, {} dropped", event.name());
                return;
            }
        };
        backlog.last_seq += 1;
        let sequenced = SequencedEvent {
            seq: backlog.last_seq,
            event: event.clone(),
        };
        backlog.events.push_back(sequenced.clone());
        while backlog.events.len() > self.capacity {
            backlog.events.pop_front();
        }
        // Sent under the lock so subscribers see the log order.
        match self.tx.send(sequenced) {
            Ok(receivers) => log::debug!(
                "published #{} {} to {} subscriber(s)",
                backlog.last_seq,
                event.name(),
                receivers
            ),
            Err(_) => log::debug!(
                "published #{} {} with no subscribers",
                backlog.last_seq,
                event.name()
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MatchEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Event names in publication order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(MatchEvent::name).collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &MatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
