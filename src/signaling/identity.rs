use rand::Rng;

use crate::signaling::protocol::ClientIdentity;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of a generated identity.
pub const ID_LEN: usize = 20;

/// Source of fresh client identities.
///
/// The relay uses [`IdentityGenerator::random`]; tests script the sequence
/// with [`IdentityGenerator::from_fn`].
pub struct IdentityGenerator {
    next: Box<dyn FnMut() -> ClientIdentity + Send>,
}

impl IdentityGenerator {
    #[must_use]
    pub fn random() -> Self {
        Self::from_fn(|| {
            let mut rng = rand::thread_rng();
            let id: String = (0..ID_LEN)
                .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
                .collect();
            ClientIdentity::from(id)
        })
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut() -> ClientIdentity + Send + 'static,
    {
        Self { next: Box::new(f) }
    }

    /// Hands out `ids` in order, then falls back to random ones.
    #[must_use]
    pub fn scripted(ids: Vec<&str>) -> Self {
        let mut queue: std::collections::VecDeque<ClientIdentity> =
            ids.into_iter().map(ClientIdentity::from).collect();
        let mut fallback = Self::random();
        Self::from_fn(move || queue.pop_front().unwrap_or_else(|| fallback.next_id()))
    }

    pub fn next_id(&mut self) -> ClientIdentity {
        (self.next)()
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::random()
    }
}
