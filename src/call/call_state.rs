use std::fmt;

/// Where a client stands in the call lifecycle.
///
/// `Idle` and `ReceivingInvite` exist without a session; the remaining
/// states belong to the current [`CallSession`](crate::call::CallSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    ReceivingInvite,
    Inviting,
    Negotiating,
    Active,
    Ended,
}

impl CallState {
    /// A session in this state still owns a negotiator.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Inviting | Self::Negotiating | Self::Active)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ReceivingInvite => "Incoming call",
            Self::Inviting => "Calling",
            Self::Negotiating => "Connecting",
            Self::Active => "In call",
            Self::Ended => "Call ended",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
