//! Connection options.

use std::collections::BTreeMap;
use std::time::Duration;

use ldapkit_asn1::DEFAULT_MAX_ELEMENT_SIZE;
use ldapkit_protocol::OperationType;

/// Default time to wait for an operation's final response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(300);

/// Options that govern how a connection tracks its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Default response timeout. `None` waits forever.
    pub response_timeout: Option<Duration>,
    /// Timeouts that replace the default for one kind of operation.
    pub response_timeout_overrides: BTreeMap<OperationType, Option<Duration>>,
    /// Send an abandon request when an operation times out.
    pub abandon_on_timeout: bool,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// First message ID handed out.
    pub initial_message_id: i32,
}

impl ConnectionOptions {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::new()
    }

    /// Returns the timeout that applies to `kind`, or `None` if operations of
    /// that kind wait forever.
    #[must_use]
    pub fn response_timeout_for(&self, kind: OperationType) -> Option<Duration> {
        self.response_timeout_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.response_timeout)
            .filter(|timeout| !timeout.is_zero())
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptionsBuilder::new().build()
    }
}

/// Builder for [`ConnectionOptions`].
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    response_timeout: Option<Duration>,
    response_timeout_overrides: BTreeMap<OperationType, Option<Duration>>,
    abandon_on_timeout: bool,
    max_message_size: usize,
    initial_message_id: i32,
}

impl ConnectionOptionsBuilder {
    /// Creates a builder holding the defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
            response_timeout_overrides: BTreeMap::new(),
            abandon_on_timeout: false,
            max_message_size: DEFAULT_MAX_ELEMENT_SIZE,
            initial_message_id: 1,
        }
    }

    /// Sets the default response timeout. `None` or zero disables it.
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the response timeout for one kind of operation.
    #[must_use]
    pub fn response_timeout_for(mut self, kind: OperationType, timeout: Option<Duration>) -> Self {
        self.response_timeout_overrides.insert(kind, timeout);
        self
    }

    /// Sends an abandon request for operations that time out.
    #[must_use]
    pub const fn abandon_on_timeout(mut self, abandon: bool) -> Self {
        self.abandon_on_timeout = abandon;
        self
    }

    /// Sets the largest inbound message accepted.
    #[must_use]
    pub const fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the first message ID handed out.
    #[must_use]
    pub const fn initial_message_id(mut self, id: i32) -> Self {
        self.initial_message_id = id;
        self
    }

    /// Builds the options.
    #[must_use]
    pub fn build(self) -> ConnectionOptions {
        ConnectionOptions {
            response_timeout: self.response_timeout,
            response_timeout_overrides: self.response_timeout_overrides,
            abandon_on_timeout: self.abandon_on_timeout,
            max_message_size: self.max_message_size,
            initial_message_id: self.initial_message_id,
        }
    }
}

impl Default for ConnectionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.response_timeout, Some(Duration::from_secs(300)));
        assert!(!options.abandon_on_timeout);
        assert_eq!(options.max_message_size, 20 * 1024 * 1024);
        assert_eq!(options.initial_message_id, 1);
        assert_eq!(
            options.response_timeout_for(OperationType::Search),
            Some(DEFAULT_RESPONSE_TIMEOUT)
        );
    }

    #[test]
    fn test_overrides() {
        let options = ConnectionOptions::builder()
            .response_timeout(Some(Duration::from_secs(10)))
            .response_timeout_for(OperationType::Search, None)
            .response_timeout_for(OperationType::Bind, Some(Duration::from_secs(2)))
            .abandon_on_timeout(true)
            .build();
        assert_eq!(options.response_timeout_for(OperationType::Search), None);
        assert_eq!(
            options.response_timeout_for(OperationType::Bind),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            options.response_timeout_for(OperationType::Add),
            Some(Duration::from_secs(10))
        );
        assert!(options.abandon_on_timeout);
    }

    #[test]
    fn test_zero_disables_timeout() {
        let options = ConnectionOptions::builder()
            .response_timeout(Some(Duration::ZERO))
            .build();
        assert_eq!(options.response_timeout_for(OperationType::Modify), None);
    }
}
