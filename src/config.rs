use std::time::Duration;

/// Options governing the caller-side correlator.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Round-trip bound per request, as observed by the caller. Independent
    /// of any dispatcher-side `ttl` a request carries.
    pub request_timeout: Duration,
    /// How long a timed-out id is remembered so a late response is swallowed
    /// rather than reported as unmatched.
    pub grace_window: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            grace_window: Duration::from_secs(5),
        }
    }
}

impl RelayOptions {
    #[must_use]
    pub fn builder() -> RelayOptionsBuilder {
        RelayOptionsBuilder::new()
    }
}

/// Fluent builder for [`RelayOptions`].
#[derive(Debug, Clone, Default)]
pub struct RelayOptionsBuilder {
    opts: RelayOptions,
}

impl RelayOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.opts.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn grace_window(mut self, window: Duration) -> Self {
        self.opts.grace_window = window;
        self
    }

    #[must_use]
    pub fn finish(self) -> RelayOptions {
        self.opts
    }
}
