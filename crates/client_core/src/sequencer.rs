use std::collections::{HashMap, HashSet};

use shared::domain::{RequestKind, RequestSeq};

/// Identifies one issued request. Outcomes carry their ticket back so the
/// controller can tell a fresh result from a stale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub kind: RequestKind,
    pub seq: RequestSeq,
}

/// Per-kind request sequencing. Only the latest ticket issued for a kind may
/// settle it; anything older is stale.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: u64,
    latest: HashMap<RequestKind, RequestSeq>,
    in_flight: HashSet<RequestKind>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, kind: RequestKind) -> RequestTicket {
        self.next += 1;
        let seq = RequestSeq(self.next);
        self.latest.insert(kind, seq);
        self.in_flight.insert(kind);
        RequestTicket { kind, seq }
    }

    /// Marks `ticket` as settled. Returns false when a newer request of the
    /// same kind was issued (or the kind was abandoned) in the meantime.
    pub fn settle(&mut self, ticket: RequestTicket) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.in_flight.remove(&ticket.kind);
        true
    }

    /// Forgets the outstanding request of `kind`, turning its eventual
    /// outcome into a stale one.
    pub fn abandon(&mut self, kind: RequestKind) {
        self.latest.remove(&kind);
        self.in_flight.remove(&kind);
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.contains(&kind)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.seq)
    }
}
