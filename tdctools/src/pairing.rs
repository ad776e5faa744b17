//! Start/stop pairing of tags into timing sessions

use crate::Tag;

/// Relative stop times of one completed session, in ticks from its start
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pair {
    pub stop_a: i64,
    pub stop_b: i64,
}

impl Pair {
    /// Timing difference between the two stops, stop B minus stop A
    pub fn difference(&self) -> i64 {
        self.stop_b - self.stop_a
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Session {
    origin: i64,
    stop_a: Option<i64>,
    stop_b: Option<i64>,
    gate: Option<i64>,
}

/// State machine pairing start events with the stops that follow them.
///
/// A start tag opens a session; stop and gate tags inside the acceptance
/// window fill its slots, first arrival per slot winning. The session
/// completes as soon as both stop slots (and the gate slot, when a gate
/// channel is set) are filled. A fresh start while a session is still
/// open drops the unfinished one. Tags past the window are discarded
/// without closing the session.
#[derive(Clone, Debug)]
pub struct Pairing {
    start: u8,
    stop_a: u8,
    stop_b: u8,
    gate: Option<u8>,
    window: i64,
    session: Option<Session>,
    dropped: u64,
}

impl Pairing {
    pub fn new(start: u8, stops: (u8, u8), gate: Option<u8>, window: i64) -> Pairing {
        Pairing {
            start,
            stop_a: stops.0,
            stop_b: stops.1,
            gate,
            window,
            session: None,
            dropped: 0,
        }
    }

    /// Feed one tag through the machine, in stream order. Returns the
    /// completed pair when this tag finishes a session.
    pub fn push(&mut self, tag: Tag) -> Option<Pair> {
        if tag.channel == self.start {
            if self.session.take().is_some() {
                self.dropped += 1;
            }
            self.session = Some(Session {
                origin: tag.time,
                ..Session::default()
            });
            return None;
        }
        let session = self.session.as_mut()?;
        let delta = tag.time - session.origin;
        if delta >= self.window {
            return None;
        }
        if tag.channel == self.stop_a {
            session.stop_a.get_or_insert(delta);
        } else if tag.channel == self.stop_b {
            session.stop_b.get_or_insert(delta);
        } else if Some(tag.channel) == self.gate {
            session.gate.get_or_insert(delta);
        } else {
            return None;
        }
        if let Session { stop_a: Some(a), stop_b: Some(b), gate, .. } = *session {
            if self.gate.is_none() || gate.is_some() {
                self.session = None;
                return Some(Pair { stop_a: a, stop_b: b });
            }
        }
        None
    }

    /// Sessions dropped because a new start superseded them
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
