use std::fmt;

/// Relay-assigned handle for one live connection.
///
/// Unique among connected clients, gone when the connection closes. Used as
/// the addressing key for invites and acceptances.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientIdentity({:?})", self.0)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque negotiation blob. The relay and the call layer only move it around;
/// only the negotiator that produced or consumes it looks inside.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SignalPayload(Vec<u8>);

impl SignalPayload {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Contents stay out of logs.
impl fmt::Debug for SignalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalPayload({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for SignalPayload {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}
