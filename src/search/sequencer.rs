use std::sync::atomic::{AtomicU64, Ordering};

/// Issues increasing tickets so a late response never overwrites a newer search.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search, superseding every ticket issued before it.
    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}
