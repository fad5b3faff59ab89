use crate::wire::Severity;

/* This enum exists to give callers some isolation from changes in the wire schema: client
    code names a Priority, and the mapping to the wire-level severity lives in exactly one
    place. */

/// Describes how important a message is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Priority {
    /// An FYI - not important, but you may want to know about it. A new user signed up,
    ///  a post was flagged.
    Low,

    /// Important.
    Medium,

    /// Show-stopping events - a database went down, a network link is flapping. Or a
    ///  great thing, like a customer spending a significant amount of money.
    High,
}

impl Priority {
    /// Map to the wire-level severity. The match is exhaustive, so adding a client-facing
    ///  priority without deciding its wire mapping does not compile.
    pub(crate) fn to_wire(self) -> Severity {
        match self {
            Priority::Low => Severity::Low,
            Priority::Medium => Severity::Medium,
            Priority::High => Severity::High,
        }
    }
}
