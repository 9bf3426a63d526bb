//! Client configuration and its compile-time defaults

/// NTP server used when none is configured
pub const DEFAULT_SERVER: &str = "pool.ntp.org";
/// Well-known NTP server port
pub const NTP_PORT: u16 = 123;
/// Local UDP port the transport is bound to
pub const DEFAULT_LOCAL_PORT: u16 = 1337;
/// User time offset in seconds
pub const DEFAULT_TIME_OFFSET: i32 = 0;
/// Minimum spacing between automatic resynchronizations
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 60_000;
/// Sleep between two transport polls while waiting for a response
pub const POLL_INTERVAL_MS: u32 = 10;
/// Number of polls before an exchange is given up (`POLL_INTERVAL_MS * MAX_POLL_ATTEMPTS` total)
pub const MAX_POLL_ATTEMPTS: u16 = 100;
/// NTP version advertised in outgoing requests
pub const DEFAULT_REQUEST_VERSION: u8 = 3;
/// Size of a NTP packet without extension fields
pub const NTP_PACKET_SIZE: usize = 48;

/// NTP client settings
///
/// Built once at startup and handed to [`crate::NtpClient::new`]. The time offset
/// and the update interval can be changed later through the client setters.
///
/// ```rust
/// use ntpclock::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_server("time.google.com")
///     .with_time_offset(3600)
///     .with_update_interval(30_000);
///
/// assert_eq!(config.server, "time.google.com");
/// assert_eq!(config.local_port, ntpclock::config::DEFAULT_LOCAL_PORT);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClientConfig<'a> {
    /// NTP server hostname or IP address
    pub server: &'a str,
    /// NTP server port
    pub server_port: u16,
    /// Local port the transport is opened on
    pub local_port: u16,
    /// Offset added to every projected time, e.g. a timezone. Not a protocol field
    pub time_offset_seconds: i32,
    /// Minimum time between two automatic synchronizations
    pub update_interval_millis: u32,
    /// Sleep between two transport polls
    pub poll_interval_millis: u32,
    /// Maximum number of polls per exchange
    pub max_poll_attempts: u16,
    /// Version field of outgoing requests.
    ///
    /// Servers answer with the version they were asked with, and responses
    /// older than `NTPv4` are rejected, so talking to a real server requires `4`.
    pub request_version: u8,
}

impl Default for ClientConfig<'_> {
    fn default() -> Self {
        ClientConfig {
            server: DEFAULT_SERVER,
            server_port: NTP_PORT,
            local_port: DEFAULT_LOCAL_PORT,
            time_offset_seconds: DEFAULT_TIME_OFFSET,
            update_interval_millis: DEFAULT_UPDATE_INTERVAL_MS,
            poll_interval_millis: POLL_INTERVAL_MS,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            request_version: DEFAULT_REQUEST_VERSION,
        }
    }
}

impl<'a> ClientConfig<'a> {
    /// Create a configuration for `server` with every other setting at its default
    #[must_use]
    pub fn new(server: &'a str) -> Self {
        ClientConfig {
            server,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_server(mut self, server: &'a str) -> Self {
        self.server = server;
        self
    }

    #[must_use]
    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    #[must_use]
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    #[must_use]
    pub fn with_time_offset(mut self, seconds: i32) -> Self {
        self.time_offset_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_update_interval(mut self, millis: u32) -> Self {
        self.update_interval_millis = millis;
        self
    }

    /// Set the polling schedule used while waiting for a response.
    /// The exchange timeout is `interval_millis * max_attempts`
    #[must_use]
    pub fn with_polling(mut self, interval_millis: u32, max_attempts: u16) -> Self {
        self.poll_interval_millis = interval_millis;
        self.max_poll_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_request_version(mut self, version: u8) -> Self {
        self.request_version = version;
        self
    }

    /// Total time an exchange may spend polling the transport
    #[must_use]
    pub fn exchange_timeout_millis(&self) -> u32 {
        self.poll_interval_millis
            .saturating_mul(u32::from(self.max_poll_attempts))
    }
}
