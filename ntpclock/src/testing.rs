//! Scripted transport and clock for exercising the client without a network
use crate::config::NTP_PACKET_SIZE;
use crate::packet::NtpPacket;
use crate::{Error, MonotonicClock, NtpTransport, Result};

const MAX_SCHEDULED: usize = 256;
const MAX_HOST_LEN: usize = 64;
const SHORT_DATAGRAM_SIZE: usize = 20;

#[derive(Copy, Clone)]
enum Datagram {
    Packet(NtpPacket),
    Short,
}

impl Datagram {
    fn len(&self) -> usize {
        match self {
            Datagram::Packet(_) => NTP_PACKET_SIZE,
            Datagram::Short => SHORT_DATAGRAM_SIZE,
        }
    }
}

#[derive(Copy, Clone)]
struct Scheduled {
    ready_at_poll: usize,
    datagram: Datagram,
}

/// Transport that delivers datagrams once a given number of polls happened.
///
/// Polls are counted over the whole lifetime of the transport, so responses for
/// several exchanges can be scheduled up front.
pub(crate) struct MockTransport {
    scheduled: [Option<Scheduled>; MAX_SCHEDULED],
    pending: Option<usize>,
    polls: usize,
    sent: usize,
    opened: usize,
    closed: usize,
    local_port: Option<u16>,
    fail_open: bool,
    fail_send: bool,
    last_request: Option<NtpPacket>,
    last_host: [u8; MAX_HOST_LEN],
    last_host_len: usize,
    last_port: u16,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        MockTransport {
            scheduled: [None; MAX_SCHEDULED],
            pending: None,
            polls: 0,
            sent: 0,
            opened: 0,
            closed: 0,
            local_port: None,
            fail_open: false,
            fail_send: false,
            last_request: None,
            last_host: [0u8; MAX_HOST_LEN],
            last_host_len: 0,
            last_port: 0,
        }
    }

    /// Make `packet` available from poll number `poll` (zero based) on
    pub(crate) fn respond_after(&mut self, poll: usize, packet: NtpPacket) {
        self.schedule(poll, Datagram::Packet(packet));
    }

    /// Make a truncated datagram available from poll number `poll` on
    pub(crate) fn respond_short_after(&mut self, poll: usize) {
        self.schedule(poll, Datagram::Short);
    }

    fn schedule(&mut self, poll: usize, datagram: Datagram) {
        let slot = self
            .scheduled
            .iter_mut()
            .find(|slot| slot.is_none())
            .expect("too many scheduled datagrams");

        *slot = Some(Scheduled {
            ready_at_poll: poll,
            datagram,
        });
    }

    pub(crate) fn fail_open(&mut self) {
        self.fail_open = true;
    }

    pub(crate) fn fail_send(&mut self) {
        self.fail_send = true;
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls
    }

    pub(crate) fn sent(&self) -> usize {
        self.sent
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed
    }

    pub(crate) fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    pub(crate) fn last_request(&self) -> Option<NtpPacket> {
        self.last_request
    }

    pub(crate) fn last_destination(&self) -> Option<(&str, u16)> {
        self.last_request?;
        let host = core::str::from_utf8(&self.last_host[..self.last_host_len]).ok()?;

        Some((host, self.last_port))
    }
}

impl NtpTransport for MockTransport {
    fn open(&mut self, local_port: u16) -> Result<()> {
        if self.fail_open {
            return Err(Error::Network);
        }

        self.opened += 1;
        self.local_port = Some(local_port);
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
        self.local_port = None;
    }

    fn send_datagram(&mut self, host: &str, port: u16, buf: &[u8]) -> Result<usize> {
        if self.fail_send {
            return Err(Error::Network);
        }

        let host = host.as_bytes();
        let len = host.len().min(MAX_HOST_LEN);
        self.last_host[..len].copy_from_slice(&host[..len]);
        self.last_host_len = len;
        self.last_port = port;
        self.last_request = NtpPacket::from_bytes(buf).ok();
        self.sent += 1;

        Ok(buf.len())
    }

    fn available_datagram_size(&mut self) -> Result<usize> {
        let poll = self.polls;
        self.polls += 1;

        self.pending = self.scheduled.iter().position(|slot| {
            slot.is_some_and(|scheduled| scheduled.ready_at_poll <= poll)
        });

        Ok(self
            .pending
            .and_then(|index| self.scheduled[index])
            .map_or(0, |scheduled| scheduled.datagram.len()))
    }

    fn read_datagram(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(scheduled) = self.pending.take().and_then(|index| self.scheduled[index].take())
        else {
            return Ok(0);
        };

        match scheduled.datagram {
            Datagram::Packet(packet) => {
                let len = buf.len().min(NTP_PACKET_SIZE);
                buf[..len].copy_from_slice(&packet.as_bytes()[..len]);
                Ok(len)
            }
            Datagram::Short => {
                let len = buf.len().min(SHORT_DATAGRAM_SIZE);
                buf[..len].fill(0xAA);
                Ok(len)
            }
        }
    }
}

/// Clock whose time only moves through [`MockClock::advance`] and `delay_ms`
pub(crate) struct MockClock {
    now: u32,
}

impl MockClock {
    pub(crate) fn new(now: u32) -> Self {
        MockClock { now }
    }

    pub(crate) fn advance(&mut self, ms: u32) {
        self.now = self.now.wrapping_add(ms);
    }

    pub(crate) fn now_millis_raw(&self) -> u32 {
        self.now
    }
}

impl MonotonicClock for MockClock {
    fn now_millis(&self) -> u32 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}
