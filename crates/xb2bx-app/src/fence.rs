// Generation counters for in-flight requests.
//
// Requests are never cancelled. Instead each spawned task carries a `Ticket`
// naming its slot and the generation current when it started; the event loop
// drops completions whose ticket is no longer current. Starting a newer
// request in the same slot, or logging out, makes older tickets stale.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Auth,
    Listing,
    Detail,
    Insights,
    Research,
    Specs,
    Image,
    Opportunity,
    Mutation,
}

impl Slot {
    const COUNT: usize = 9;

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct Fence {
    generations: [u64; Slot::COUNT],
}

impl Fence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request that supersedes everything in flight in `slot`.
    pub fn begin(&mut self, slot: Slot) -> Ticket {
        let generation = &mut self.generations[slot.index()];
        *generation += 1;
        Ticket {
            slot,
            generation: *generation,
        }
    }

    /// Start a request that runs alongside others in `slot`. It goes stale
    /// only when the slot is advanced.
    pub fn join(&self, slot: Slot) -> Ticket {
        Ticket {
            slot,
            generation: self.generations[slot.index()],
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generations[ticket.slot.index()] == ticket.generation
    }

    /// Invalidate every outstanding ticket.
    pub fn advance_all(&mut self) {
        for generation in &mut self.generations {
            *generation += 1;
        }
    }
}
