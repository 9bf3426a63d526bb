use core::fmt::{Display, Formatter};

/// `ntpclock` library result type
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the NTP clock.
/// Errors originate on the transport layer or while validating a response from a NTP server
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Leap Indicator (LI) of a NTP response reports an unsynchronized server
    IncorrectLeapIndicator,
    /// Version of a NTP response is older than `NTPv4`
    IncorrectResponseVersion,
    /// Mode of a NTP response is not "server"
    IncorrectMode,
    /// Stratum of a NTP response is unspecified (kiss-of-death) or reserved
    IncorrectStratumHeaders,
    /// Server has never synchronized itself: its reference timestamp is zero
    ZeroReferenceTimestamp,
    /// Payload size of a NTP response is shorter than a NTP packet
    IncorrectPayload,
    /// Transport could not be opened, or a datagram could not be sent/received
    Network,
    /// A NTP server address can not be resolved
    AddressResolve,
    /// No valid response arrived within the polling budget
    Timeout,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::IncorrectLeapIndicator => "server reports unsynchronized leap indicator",
            Error::IncorrectResponseVersion => "response version is older than NTPv4",
            Error::IncorrectMode => "response mode is not server",
            Error::IncorrectStratumHeaders => "response stratum is out of 1..=15",
            Error::ZeroReferenceTimestamp => "response reference timestamp is zero",
            Error::IncorrectPayload => "response is shorter than a NTP packet",
            Error::Network => "transport failure",
            Error::AddressResolve => "unable to resolve NTP server address",
            Error::Timeout => "no valid response before timeout",
        };

        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Last known good time received from a NTP server
///
/// `captured_at_millis` is the [`MonotonicClock`] reading that corresponds to
/// `epoch_seconds`, adjusted for the time spent polling the transport.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SynchronizedEpoch {
    /// Seconds since UNIX EPOCH "_1970-01-01 00:00:00 UTC_", `0` if never synchronized
    pub epoch_seconds: u64,
    /// Monotonic clock reading in milliseconds when `epoch_seconds` was established
    pub captured_at_millis: u32,
}

impl SynchronizedEpoch {
    /// Create a new synchronized epoch
    #[must_use]
    pub fn new(epoch_seconds: u64, captured_at_millis: u32) -> Self {
        SynchronizedEpoch {
            epoch_seconds,
            captured_at_millis,
        }
    }

    /// Whether the epoch has ever been set
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.epoch_seconds != 0
    }

    /// Milliseconds elapsed between `captured_at_millis` and `now_millis`.
    ///
    /// Uses wrapping subtraction, so a counter that overflowed in between still
    /// yields the right duration.
    #[must_use]
    pub fn elapsed_millis(&self, now_millis: u32) -> u32 {
        now_millis.wrapping_sub(self.captured_at_millis)
    }
}

/// A trait encapsulating the free-running millisecond counter of the platform
///
/// Embedded targets usually provide a tick counter (`millis()`, `SysTick`, RTOS ticks)
/// that starts at zero on boot and wraps around once it exceeds its native width.
/// `ntpclock` treats the counter as a 32-bit value and only ever subtracts two
/// readings with wrapping arithmetic.
pub trait MonotonicClock {
    /// Returns current counter value in milliseconds
    fn now_millis(&self) -> u32;

    /// Blocks the caller for approximately `ms` milliseconds.
    ///
    /// Used between transport polls while waiting for a NTP response.
    fn delay_ms(&mut self, ms: u32);
}

/// A trait encapsulating the datagram transport required for NTP exchanges
///
/// Modeled after connectionless UDP stacks on microcontrollers, where a socket is
/// bound to a local port once, outgoing datagrams are addressed by hostname and
/// incoming ones are polled for.
pub trait NtpTransport {
    /// Bind the transport to the given local port.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying socket can not be opened
    fn open(&mut self, local_port: u16) -> Result<()>;

    /// Release the underlying socket. Closing a closed transport is a no-op
    fn close(&mut self);

    /// Send `buf` as a single datagram to `host:port`. On success, returns the number
    /// of bytes written.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `host` can not be resolved or the underlying send fails
    fn send_datagram(&mut self, host: &str, port: u16, buf: &[u8]) -> Result<usize>;

    /// Size of the next pending datagram, `0` if there is none. Must not block
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying receive queue can not be inspected
    fn available_datagram_size(&mut self) -> Result<usize>;

    /// Read the pending datagram into `buf`, truncating it to `buf.len()`. On
    /// success, returns the number of bytes read.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an underlying receive fails
    fn read_datagram(&mut self, buf: &mut [u8]) -> Result<usize>;
}

#[cfg(feature = "std")]
/// Supplementary module to implement some `ntpclock` boilerplate that environments with
/// `std` enable have to re-implement.
mod sup {
    use std::time::{Duration, Instant};

    use crate::MonotonicClock;

    /// Standard library monotonic clock wrapper type
    /// that relies on `std::time::Instant` to provide millisecond ticks
    ///
    /// Ticks start at zero when the clock is created and wrap around after
    /// roughly 49.7 days, just like a 32-bit `millis()` counter would.
    #[derive(Copy, Clone, Debug)]
    pub struct StdClock {
        start: Instant,
    }

    impl StdClock {
        /// Create a clock counting from now
        #[must_use]
        pub fn new() -> Self {
            StdClock {
                start: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MonotonicClock for StdClock {
        #[allow(clippy::cast_possible_truncation)]
        fn now_millis(&self) -> u32 {
            self.start.elapsed().as_millis() as u32
        }

        fn delay_ms(&mut self, ms: u32) {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

#[cfg(feature = "std")]
pub use sup::*;

#[cfg(test)]
mod ntpclock_types_tests {
    use crate::SynchronizedEpoch;

    #[test]
    fn test_default_epoch_is_unset() {
        let epoch = SynchronizedEpoch::default();

        assert!(!epoch.is_set());
        assert_eq!(0, epoch.captured_at_millis);
        assert!(SynchronizedEpoch::new(1, 0).is_set());
    }

    #[test]
    fn test_elapsed_millis_across_wraparound() {
        let epoch = SynchronizedEpoch::new(1_700_000_000, u32::MAX - 499);

        assert_eq!(0, epoch.elapsed_millis(u32::MAX - 499));
        assert_eq!(499, epoch.elapsed_millis(u32::MAX));
        assert_eq!(500, epoch.elapsed_millis(0));
        assert_eq!(2_500, epoch.elapsed_millis(2_000));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_error_display() {
        use crate::Error;

        assert_eq!(
            "no valid response before timeout",
            Error::Timeout.to_string()
        );
        assert_eq!(
            "response mode is not server",
            Error::IncorrectMode.to_string()
        );
    }
}
