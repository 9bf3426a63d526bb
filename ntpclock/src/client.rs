use crate::config::ClientConfig;
#[cfg(any(feature = "log", feature = "defmt"))]
use crate::log::{debug, warn};
use crate::packet::NtpPacket;
use crate::projection::{self, ClockTime, Date, IsoDateTime};
use crate::{Error, MonotonicClock, NtpTransport, Result, SynchronizedEpoch};

/// NTP client keeping a wall clock on top of a monotonic millisecond counter
///
/// The client is meant to be driven from the main loop of the application:
/// [`NtpClient::update`] is cheap to call on every iteration and only talks to
/// the NTP server once the configured update interval has elapsed. In between,
/// time is extrapolated from the last accepted server response.
///
/// Failures never clear the last known good time: the projection keeps running
/// from the previous successful exchange.
///
/// # Example
///
/// ```rust
/// use ntpclock::{ClientConfig, MonotonicClock, NtpClient, NtpTransport, Result};
///
/// struct Ticks(u32);
///
/// impl MonotonicClock for Ticks {
///     fn now_millis(&self) -> u32 {
///         self.0
///     }
///     fn delay_ms(&mut self, ms: u32) {
///         self.0 = self.0.wrapping_add(ms);
///     }
/// }
///
/// struct Offline;
///
/// impl NtpTransport for Offline {
///     fn open(&mut self, _local_port: u16) -> Result<()> {
///         Ok(())
///     }
///     fn close(&mut self) {}
///     fn send_datagram(&mut self, _host: &str, _port: u16, buf: &[u8]) -> Result<usize> {
///         Ok(buf.len())
///     }
///     fn available_datagram_size(&mut self) -> Result<usize> {
///         Ok(0)
///     }
///     fn read_datagram(&mut self, _buf: &mut [u8]) -> Result<usize> {
///         Ok(0)
///     }
/// }
///
/// let mut client = NtpClient::new(ClientConfig::default(), Offline, Ticks(0));
///
/// // nobody answers, the exchange times out after a second of polling
/// assert!(!client.update());
/// assert!(!client.is_synchronized());
///
/// client.set_epoch_override(1_700_000_000);
/// assert_eq!(client.formatted_date(None).to_string(), "2023-11-14T22:13:20Z");
/// ```
pub struct NtpClient<'a, T, C>
where
    T: NtpTransport,
    C: MonotonicClock,
{
    config: ClientConfig<'a>,
    transport: T,
    clock: C,
    started: bool,
    epoch: SynchronizedEpoch,
}

impl<'a, T, C> NtpClient<'a, T, C>
where
    T: NtpTransport,
    C: MonotonicClock,
{
    /// Create an unsynchronized client. The transport is not opened until first use
    pub fn new(config: ClientConfig<'a>, transport: T, clock: C) -> Self {
        NtpClient {
            config,
            transport,
            clock,
            started: false,
            epoch: SynchronizedEpoch::default(),
        }
    }

    /// Open the transport on the configured local port. Does nothing if it is
    /// already open.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the transport can not be opened
    pub fn ensure_started(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        self.start_on(self.config.local_port)
    }

    /// Open the transport on `local_port`, which becomes the configured port.
    /// An already open transport is closed first.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the transport can not be opened
    pub fn start_on(&mut self, local_port: u16) -> Result<()> {
        if self.started {
            self.stop();
        }

        self.config.local_port = local_port;
        self.transport.open(local_port)?;
        self.started = true;
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!("transport opened on port {}", local_port);

        Ok(())
    }

    /// Close the transport. It is reopened by the next exchange
    pub fn stop(&mut self) {
        if self.started {
            self.transport.close();
            self.started = false;
            #[cfg(any(feature = "log", feature = "defmt"))]
            debug!("transport closed");
        }
    }

    /// Synchronize if the client never did or if the update interval elapsed.
    ///
    /// Returns `true` when the cached time is still fresh or a new exchange
    /// succeeded, `false` if a due exchange failed.
    pub fn update(&mut self) -> bool {
        if self.is_update_due() {
            return self.force_update();
        }

        true
    }

    /// Whether [`NtpClient::update`] would contact the server right now
    #[must_use]
    pub fn is_update_due(&self) -> bool {
        !self.epoch.is_set()
            || self.epoch.elapsed_millis(self.clock.now_millis())
                >= self.config.update_interval_millis
    }

    /// Run one NTP exchange regardless of the update interval.
    ///
    /// Returns `true` if a valid response replaced the stored epoch. On failure
    /// the previously stored epoch is kept.
    pub fn force_update(&mut self) -> bool {
        match self.try_force_update() {
            Ok(_) => true,
            Err(_err) => {
                #[cfg(any(feature = "log", feature = "defmt"))]
                warn!("NTP update from {} failed: {}", self.config.server, _err);
                false
            }
        }
    }

    /// Run one NTP exchange regardless of the update interval and report why
    /// it failed.
    ///
    /// On success returns the accepted epoch seconds (without the time offset).
    ///
    /// # Errors
    ///
    /// - [`Error::Network`]/[`Error::AddressResolve`] if the transport can not be
    ///   opened or the request can not be sent
    /// - [`Error::Timeout`] if no valid response arrived within
    ///   `poll_interval_millis * max_poll_attempts`
    pub fn try_force_update(&mut self) -> Result<u64> {
        self.ensure_started()?;
        self.send_request()?;

        let epoch = self.poll_response()?;
        self.epoch = epoch;
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!(
            "synchronized: epoch {} captured at {} ms",
            epoch.epoch_seconds, epoch.captured_at_millis
        );

        Ok(epoch.epoch_seconds)
    }

    fn send_request(&mut self) -> Result<()> {
        let request = NtpPacket::request_with_version(self.config.request_version);
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!(
            "send request - Address: {}:{}",
            self.config.server, self.config.server_port
        );

        let sent = self.transport.send_datagram(
            self.config.server,
            self.config.server_port,
            request.as_bytes(),
        )?;

        if sent == request.as_bytes().len() {
            Ok(())
        } else {
            Err(Error::Network)
        }
    }

    fn poll_response(&mut self) -> Result<SynchronizedEpoch> {
        let interval = self.config.poll_interval_millis;

        for attempt in 1..=u32::from(self.config.max_poll_attempts) {
            self.clock.delay_ms(interval);

            let Some(packet) = self.receive_valid_packet()? else {
                continue;
            };
            let now = self.clock.now_millis();
            // account for the time spent polling
            let captured_at_millis = now.wrapping_sub(interval.wrapping_mul(attempt));

            return Ok(SynchronizedEpoch::new(
                packet.transmit_epoch(),
                captured_at_millis,
            ));
        }

        Err(Error::Timeout)
    }

    /// Read the pending datagram, if any. Datagrams that are not a valid server
    /// response are consumed and dropped.
    fn receive_valid_packet(&mut self) -> Result<Option<NtpPacket>> {
        if self.transport.available_datagram_size()? == 0 {
            return Ok(None);
        }

        let mut packet = NtpPacket::default();
        let size = self.transport.read_datagram(packet.as_mut_bytes())?;

        if size < packet.as_bytes().len() {
            #[cfg(any(feature = "log", feature = "defmt"))]
            debug!("discarding response: {}", Error::IncorrectPayload);
            return Ok(None);
        }

        #[cfg(feature = "log")]
        crate::packet::debug_ntp_packet(&packet);

        match packet.check() {
            Ok(()) => Ok(Some(packet)),
            Err(_err) => {
                #[cfg(any(feature = "log", feature = "defmt"))]
                debug!("discarding response: {}", _err);
                Ok(None)
            }
        }
    }

    /// Replace the stored epoch without a network exchange, e.g. from a GPS or
    /// RTC. The current monotonic reading becomes the capture time.
    pub fn set_epoch_override(&mut self, epoch_seconds: u64) {
        self.epoch = SynchronizedEpoch::new(epoch_seconds, self.clock.now_millis());
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!("epoch overridden: {}", epoch_seconds);
    }

    /// Change the time offset, e.g. when the timezone changes
    pub fn set_time_offset(&mut self, offset_seconds: i32) {
        self.config.time_offset_seconds = offset_seconds;
    }

    /// Change the minimum time between two automatic synchronizations
    pub fn set_update_interval(&mut self, interval_millis: u32) {
        self.config.update_interval_millis = interval_millis;
    }

    /// Whether the client holds a time from a server or an override
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.epoch.is_set()
    }

    /// Whether the transport is currently open
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn synchronized_epoch(&self) -> SynchronizedEpoch {
        self.epoch
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig<'a> {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Seconds since UNIX EPOCH including the time offset
    #[must_use]
    pub fn current_epoch_seconds(&self) -> u64 {
        projection::current_epoch_seconds(
            &self.epoch,
            self.config.time_offset_seconds,
            self.clock.now_millis(),
        )
    }

    #[must_use]
    pub fn hours(&self) -> u8 {
        projection::hours(self.current_epoch_seconds())
    }

    #[must_use]
    pub fn minutes(&self) -> u8 {
        projection::minutes(self.current_epoch_seconds())
    }

    #[must_use]
    pub fn seconds(&self) -> u8 {
        projection::seconds(self.current_epoch_seconds())
    }

    /// Calendar date of `epoch_seconds`, or of the current time when `None`
    #[must_use]
    pub fn calendar_date(&self, epoch_seconds: Option<u64>) -> Date {
        projection::calendar_date(self.resolve(epoch_seconds))
    }

    #[must_use]
    pub fn year(&self) -> u32 {
        self.calendar_date(None).year
    }

    #[must_use]
    pub fn month(&self) -> u8 {
        self.calendar_date(None).month
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.calendar_date(None).day
    }

    /// `HH:MM:SS` of `epoch_seconds`, or of the current time when `None`
    #[must_use]
    pub fn formatted_time(&self, epoch_seconds: Option<u64>) -> ClockTime {
        ClockTime::from_epoch(self.resolve(epoch_seconds))
    }

    /// `YYYY-MM-DDTHH:MM:SSZ` of `epoch_seconds`, or of the current time when `None`
    #[must_use]
    pub fn formatted_date(&self, epoch_seconds: Option<u64>) -> IsoDateTime {
        IsoDateTime::from_epoch(self.resolve(epoch_seconds))
    }

    fn resolve(&self, epoch_seconds: Option<u64>) -> u64 {
        epoch_seconds.unwrap_or_else(|| self.current_epoch_seconds())
    }
}
