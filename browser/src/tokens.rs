/// Monotonic tag carried by every outgoing fetch. A response is applied
/// only while its token is still the latest issued for its scope, which is
/// how a slow response to an old query is kept from clobbering a newer one.
pub type RequestToken = u64;

/// Hands out strictly increasing tokens. One source per controller covers
/// every scope; per-scope "latest" bookkeeping lives with the scope owner.
#[derive(Clone, Debug, Default)]
pub struct TokenSource {
    next: RequestToken,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestToken {
        self.next += 1;
        self.next
    }
}
