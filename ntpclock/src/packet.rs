//! NTP packet codec
//!
//! Builds client requests and validates server responses. The packet is kept in
//! its wire representation (RFC 5905, big-endian) and fields are read through
//! accessors at fixed offsets:
//!
//! ```text
//!  0: LI | VN | Mode      1: Stratum      2: Poll      3: Precision
//!  4..8:   Root Delay
//!  8..12:  Root Dispersion
//! 12..16:  Reference ID
//! 16..24:  Reference Timestamp
//! 24..32:  Origin Timestamp
//! 32..40:  Receive Timestamp
//! 40..48:  Transmit Timestamp
//! ```
use crate::config::{DEFAULT_REQUEST_VERSION, NTP_PACKET_SIZE};
use crate::{Error, Result};

/// NTP mode value bit mask
pub(crate) const MODE_MASK: u8 = 0b0000_0111;
/// NTP mode bit mask shift value
pub(crate) const MODE_SHIFT: u8 = 0;
/// NTP version value bit mask
pub(crate) const VERSION_MASK: u8 = 0b0011_1000;
/// NTP version bit mask shift value
pub(crate) const VERSION_SHIFT: u8 = 3;
/// NTP LI (leap indicator) bit mask value
pub(crate) const LI_MASK: u8 = 0b1100_0000;
/// NTP LI bit mask shift value
pub(crate) const LI_SHIFT: u8 = 6;

const HEADER_OFFSET: usize = 0;
const STRATUM_OFFSET: usize = 1;
const POLL_OFFSET: usize = 2;
const PRECISION_OFFSET: usize = 3;
const REF_ID_OFFSET: usize = 12;
const REF_TIMESTAMP_OFFSET: usize = 16;
const TX_TIMESTAMP_OFFSET: usize = 40;
const TIMESTAMP_LEN: usize = 8;

/// Raw NTP message, 48 bytes in network byte order
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct NtpPacket(pub(crate) [u8; NTP_PACKET_SIZE]);

impl Default for NtpPacket {
    fn default() -> Self {
        NtpPacket([0u8; NTP_PACKET_SIZE])
    }
}

impl From<[u8; NTP_PACKET_SIZE]> for NtpPacket {
    fn from(buf: [u8; NTP_PACKET_SIZE]) -> Self {
        NtpPacket(buf)
    }
}

impl AsRef<[u8]> for NtpPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for NtpPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NtpPacket")
            .field("leap_indicator", &self.leap_indicator())
            .field("version", &self.version())
            .field("mode", &self.mode())
            .field("stratum", &self.stratum())
            .field("reference_timestamp", &self.reference_timestamp())
            .field("transmit_timestamp", &self.transmit_timestamp())
            .finish()
    }
}

impl NtpPacket {
    // First day UNIX era offset https://www.rfc-editor.org/rfc/rfc5905
    pub const NTP_TIMESTAMP_DELTA: u32 = 2_208_988_800u32;
    pub const LI_NO_WARNING: u8 = 0;
    pub const LI_UNSYNCHRONIZED: u8 = 3;
    pub const MODE_CLIENT: u8 = 3;
    pub const MODE_SERVER: u8 = 4;
    pub const MIN_RESPONSE_VERSION: u8 = 4;
    pub const MAX_STRATUM: u8 = 15;
    const REQUEST_POLL: u8 = 6;
    // 2^-20 s, about a microsecond
    const REQUEST_PRECISION: u8 = 0xEC;
    const REQUEST_REF_ID: [u8; 4] = *b"INIR";

    /// Client request with the default header: LI 0, version 3, mode 3
    #[must_use]
    pub fn request() -> NtpPacket {
        NtpPacket::request_with_version(DEFAULT_REQUEST_VERSION)
    }

    /// Client request advertising `version` in its header
    #[must_use]
    pub fn request_with_version(version: u8) -> NtpPacket {
        let mut packet = NtpPacket::default();

        packet.0[HEADER_OFFSET] =
            li_vn_mode(NtpPacket::LI_NO_WARNING, version, NtpPacket::MODE_CLIENT);
        packet.0[STRATUM_OFFSET] = 0;
        packet.0[POLL_OFFSET] = NtpPacket::REQUEST_POLL;
        packet.0[PRECISION_OFFSET] = NtpPacket::REQUEST_PRECISION;
        packet.0[REF_ID_OFFSET..REF_ID_OFFSET + 4]
            .copy_from_slice(&NtpPacket::REQUEST_REF_ID);

        packet
    }

    /// Copy a received datagram into a packet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectPayload`] if `buf` is shorter than a NTP packet.
    /// Bytes beyond the first 48 (extension fields, MAC) are ignored
    pub fn from_bytes(buf: &[u8]) -> Result<NtpPacket> {
        let raw = buf
            .get(..NTP_PACKET_SIZE)
            .ok_or(Error::IncorrectPayload)?;
        let mut packet = NtpPacket::default();

        packet.0.copy_from_slice(raw);
        Ok(packet)
    }

    /// Wire representation of the packet
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NTP_PACKET_SIZE] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; NTP_PACKET_SIZE] {
        &mut self.0
    }

    #[must_use]
    pub fn leap_indicator(&self) -> u8 {
        shifter(self.0[HEADER_OFFSET], LI_MASK, LI_SHIFT)
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        shifter(self.0[HEADER_OFFSET], VERSION_MASK, VERSION_SHIFT)
    }

    #[must_use]
    pub fn mode(&self) -> u8 {
        shifter(self.0[HEADER_OFFSET], MODE_MASK, MODE_SHIFT)
    }

    #[must_use]
    pub fn stratum(&self) -> u8 {
        self.0[STRATUM_OFFSET]
    }

    #[must_use]
    pub fn poll(&self) -> u8 {
        self.0[POLL_OFFSET]
    }

    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn precision(&self) -> i8 {
        self.0[PRECISION_OFFSET] as i8
    }

    #[must_use]
    pub fn reference_id(&self) -> [u8; 4] {
        let mut id = [0u8; 4];

        id.copy_from_slice(&self.0[REF_ID_OFFSET..REF_ID_OFFSET + 4]);
        id
    }

    /// Time the server clock was last set or corrected, NTP 64-bit format
    #[must_use]
    pub fn reference_timestamp(&self) -> u64 {
        self.read_timestamp(REF_TIMESTAMP_OFFSET)
    }

    /// Time the response left the server, NTP 64-bit format
    #[must_use]
    pub fn transmit_timestamp(&self) -> u64 {
        self.read_timestamp(TX_TIMESTAMP_OFFSET)
    }

    /// Integer seconds part of the transmit timestamp, seconds since 1900-01-01
    #[must_use]
    pub fn transmit_seconds(&self) -> u32 {
        let mut seconds = [0u8; 4];

        seconds.copy_from_slice(&self.0[TX_TIMESTAMP_OFFSET..TX_TIMESTAMP_OFFSET + 4]);
        u32::from_be_bytes(seconds)
    }

    /// Check a response before trusting its transmit timestamp.
    ///
    /// # Errors
    ///
    /// Returns the first rule the packet breaks:
    /// - [`Error::IncorrectLeapIndicator`] - LI is `11b`, server clock unsynchronized
    /// - [`Error::IncorrectResponseVersion`] - version is older than 4
    /// - [`Error::IncorrectMode`] - mode is not server (4)
    /// - [`Error::IncorrectStratumHeaders`] - stratum is 0 (kiss-of-death) or above 15
    /// - [`Error::ZeroReferenceTimestamp`] - the server has never been synchronized
    pub fn check(&self) -> Result<()> {
        if self.leap_indicator() == NtpPacket::LI_UNSYNCHRONIZED {
            return Err(Error::IncorrectLeapIndicator);
        }

        if self.version() < NtpPacket::MIN_RESPONSE_VERSION {
            return Err(Error::IncorrectResponseVersion);
        }

        if self.mode() != NtpPacket::MODE_SERVER {
            return Err(Error::IncorrectMode);
        }

        if self.stratum() == 0 || self.stratum() > NtpPacket::MAX_STRATUM {
            return Err(Error::IncorrectStratumHeaders);
        }

        if self.reference_timestamp() == 0 {
            return Err(Error::ZeroReferenceTimestamp);
        }

        Ok(())
    }

    /// `true` if the packet is a usable server response, see [`NtpPacket::check`]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Transmit timestamp converted to seconds since UNIX EPOCH.
    ///
    /// Only NTP era 0 is handled: once the 32-bit seconds field wraps on
    /// 2036-02-07T06:28:16Z the result starts over from a small value.
    #[must_use]
    pub fn transmit_epoch(&self) -> u64 {
        u64::from(
            self.transmit_seconds()
                .wrapping_sub(NtpPacket::NTP_TIMESTAMP_DELTA),
        )
    }

    fn read_timestamp(&self, offset: usize) -> u64 {
        let mut timestamp = [0u8; TIMESTAMP_LEN];

        timestamp.copy_from_slice(&self.0[offset..offset + TIMESTAMP_LEN]);
        u64::from_be_bytes(timestamp)
    }

    #[cfg(test)]
    pub(crate) fn set_header(&mut self, li: u8, version: u8, mode: u8) {
        self.0[HEADER_OFFSET] = li_vn_mode(li, version, mode);
    }

    #[cfg(test)]
    pub(crate) fn set_stratum(&mut self, stratum: u8) {
        self.0[STRATUM_OFFSET] = stratum;
    }

    #[cfg(test)]
    pub(crate) fn set_reference_timestamp(&mut self, timestamp: u64) {
        self.0[REF_TIMESTAMP_OFFSET..REF_TIMESTAMP_OFFSET + TIMESTAMP_LEN]
            .copy_from_slice(&timestamp.to_be_bytes());
    }

    #[cfg(test)]
    pub(crate) fn set_transmit_timestamp(&mut self, timestamp: u64) {
        self.0[TX_TIMESTAMP_OFFSET..TX_TIMESTAMP_OFFSET + TIMESTAMP_LEN]
            .copy_from_slice(&timestamp.to_be_bytes());
    }
}

/// Build the outgoing request packet, see [`NtpPacket::request`]
#[must_use]
pub fn build_request() -> NtpPacket {
    NtpPacket::request()
}

/// `true` if `packet` may be trusted, see [`NtpPacket::check`]
#[must_use]
pub fn validate(packet: &NtpPacket) -> bool {
    packet.is_valid()
}

/// Seconds since UNIX EPOCH carried by the transmit timestamp of `packet`
#[must_use]
pub fn extract_transmit_epoch(packet: &NtpPacket) -> u64 {
    packet.transmit_epoch()
}

/// Convert seconds since UNIX EPOCH into a NTP era 0 timestamp with zero fraction
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn epoch_to_ntp_timestamp(epoch_seconds: u64) -> u64 {
    let seconds = (epoch_seconds as u32).wrapping_add(NtpPacket::NTP_TIMESTAMP_DELTA);

    u64::from(seconds) << 32
}

fn shifter(val: u8, mask: u8, shift: u8) -> u8 {
    (val & mask) >> shift
}

fn li_vn_mode(li: u8, version: u8, mode: u8) -> u8 {
    ((li << LI_SHIFT) & LI_MASK)
        | ((version << VERSION_SHIFT) & VERSION_MASK)
        | ((mode << MODE_SHIFT) & MODE_MASK)
}

#[cfg(feature = "log")]
pub(crate) fn debug_ntp_packet(packet: &NtpPacket) {
    use log::debug;

    let delimiter = "================================================================";
    let ref_id = packet.reference_id();

    debug!("{}", delimiter);
    debug!("| Mode:\t\t{}", packet.mode());
    debug!("| Version:\t{}", packet.version());
    debug!("| Leap:\t\t{}", packet.leap_indicator());
    debug!("| Stratum:\t{}", packet.stratum());
    debug!("| Poll:\t\t{}", packet.poll());
    debug!("| Precision:\t\t{}", packet.precision());
    debug!(
        "| Reference ID:\t\t{}",
        core::str::from_utf8(&ref_id).unwrap_or("")
    );
    debug!(
        "| Reference timestamp (server):\t{:>16}",
        packet.reference_timestamp()
    );
    debug!(
        "| Transmit timestamp  (server):\t{:>16}",
        packet.transmit_timestamp()
    );
    debug!("{}", delimiter);
}

#[cfg(test)]
pub(crate) fn server_response(epoch_seconds: u64) -> NtpPacket {
    let mut packet = NtpPacket::default();

    packet.set_header(NtpPacket::LI_NO_WARNING, 4, NtpPacket::MODE_SERVER);
    packet.set_stratum(2);
    packet.set_reference_timestamp(epoch_to_ntp_timestamp(epoch_seconds - 16));
    packet.set_transmit_timestamp(epoch_to_ntp_timestamp(epoch_seconds));
    packet
}
