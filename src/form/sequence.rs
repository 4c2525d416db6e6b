//! Request sequencing for responses that may arrive out of order

/// Opaque ticket handed out for one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Ticket for an address lookup
pub type LookupTicket = Ticket;

/// Ticket for a record fetch
pub type FetchTicket = Ticket;

/// Issues monotonically increasing tickets.
///
/// Only the most recently issued ticket is current; a response carrying any
/// older ticket is stale and must be dropped.
#[derive(Debug, Default, Clone)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn next(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest != 0 && ticket.0 == self.latest
    }
}
