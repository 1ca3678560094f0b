//! Minimal XBee API-mode (AP=1) driver.
//!
//! Only what the node needs: Transmit Request frames for data and the `AI`
//! AT command to poll the association status. Frames on the wire:
//!
//! ```text
//! 0x7E | length (u16 BE) | frame data (length bytes) | checksum
//! ```
//!
//! The checksum is `0xFF` minus the low byte of the sum of the frame data.
//!
//! Reads never wait for a frame to start: a poll only consumes what the
//! module has already sent, so a silent module cannot stall the caller.

use embedded_io::{Read, ReadExactError, ReadReady, Write};
use heapless::Vec;

use crate::logging::debug;
use crate::radio::{RadioLink, TxFrame, LINK_MTU};

pub const START_DELIMITER: u8 = 0x7E;
pub const FRAME_TX_REQUEST: u8 = 0x10;
pub const FRAME_AT_COMMAND: u8 = 0x08;
pub const FRAME_AT_RESPONSE: u8 = 0x88;

/// Frame data of a Transmit Request without payload: type, id, 64-bit and 16-bit address, radius, options
const TX_HEADER_LEN: usize = 14;
/// Largest frame data the driver builds or accepts
pub const MAX_FRAME_DATA: usize = TX_HEADER_LEN + LINK_MTU;

const AT_STATUS_OK: u8 = 0x00;
const AI_ASSOCIATED: u8 = 0x00;

pub type FrameData = Vec<u8, MAX_FRAME_DATA>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XBeeError {
    #[error("serial port error: {0:?}")]
    Serial(embedded_io::ErrorKind),

    #[error("serial port closed mid-frame")]
    UnexpectedEof,

    #[error("frame data of {0} bytes does not fit")]
    FrameTooLong(usize),

    #[error("frame size {0} does not match its {1} data bytes")]
    SizeMismatch(u8, usize),

    #[error("checksum mismatch")]
    Checksum,

    #[error("AT command answered with status {0}")]
    AtStatus(u8),
}

impl<E: embedded_io::Error> From<ReadExactError<E>> for XBeeError {
    fn from(err: ReadExactError<E>) -> Self {
        match err {
            ReadExactError::UnexpectedEof => XBeeError::UnexpectedEof,
            ReadExactError::Other(e) => XBeeError::Serial(e.kind()),
        }
    }
}

fn serial_error<E: embedded_io::Error>(e: E) -> XBeeError {
    XBeeError::Serial(e.kind())
}

/// Checksum over the frame data
pub fn checksum(frame_data: &[u8]) -> u8 {
    let sum = frame_data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xFF - sum
}

/// Frame data of a Transmit Request for `frame`
pub fn tx_request(frame: &TxFrame<'_>) -> Result<FrameData, XBeeError> {
    if frame.size as usize != frame.data.len() {
        return Err(XBeeError::SizeMismatch(frame.size, frame.data.len()));
    }

    let mut data = FrameData::new();
    let too_long = XBeeError::FrameTooLong(TX_HEADER_LEN + frame.data.len());

    data.push(FRAME_TX_REQUEST).map_err(|_| too_long)?;
    data.push(frame.delivery.frame_id()).map_err(|_| too_long)?;
    data.extend_from_slice(&frame.address.to_be_bytes())
        .map_err(|_| too_long)?;
    data.extend_from_slice(&frame.nw_address.to_be_bytes())
        .map_err(|_| too_long)?;
    data.push(frame.radius).map_err(|_| too_long)?;
    data.push(frame.options.0).map_err(|_| too_long)?;
    data.extend_from_slice(frame.data).map_err(|_| too_long)?;

    Ok(data)
}

/// Frame data of a local AT command with no parameter
pub fn at_command(frame_id: u8, command: [u8; 2]) -> FrameData {
    let mut data = FrameData::new();
    // 4 bytes always fit
    let _ = data.extend_from_slice(&[FRAME_AT_COMMAND, frame_id, command[0], command[1]]);
    data
}

/// XBee module on a serial port in API mode 1
pub struct XBee<S> {
    serial: S,
    frame_id: u8,
}

impl<S: Read + ReadReady + Write> XBee<S> {
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            frame_id: 0,
        }
    }

    /// Wraps frame data in delimiter, length and checksum and writes it out
    pub fn write_frame(&mut self, frame_data: &[u8]) -> Result<(), XBeeError> {
        if frame_data.len() > MAX_FRAME_DATA {
            return Err(XBeeError::FrameTooLong(frame_data.len()));
        }
        let len = (frame_data.len() as u16).to_be_bytes();

        self.write_all(&[START_DELIMITER, len[0], len[1]])?;
        self.write_all(frame_data)?;
        self.write_all(&[checksum(frame_data)])?;
        self.serial.flush().map_err(serial_error)
    }

    /// Reads the next frame if one has started arriving.
    /// Bytes before a start delimiter are dropped. Once the delimiter is
    /// seen the rest of the frame is read to the end.
    /// returns the frame data, or None when the port has nothing pending
    pub fn read_frame(&mut self) -> Result<Option<FrameData>, XBeeError> {
        let mut byte = [0u8; 1];
        loop {
            if !self.serial.read_ready().map_err(serial_error)? {
                return Ok(None);
            }
            self.serial.read_exact(&mut byte)?;
            if byte[0] == START_DELIMITER {
                break;
            }
        }

        let mut len = [0u8; 2];
        self.serial.read_exact(&mut len)?;
        let len = u16::from_be_bytes(len) as usize;
        if len > MAX_FRAME_DATA {
            return Err(XBeeError::FrameTooLong(len));
        }

        let mut data = FrameData::new();
        data.resize(len, 0)
            .map_err(|_| XBeeError::FrameTooLong(len))?;
        self.serial.read_exact(&mut data)?;

        self.serial.read_exact(&mut byte)?;
        if checksum(&data) != byte[0] {
            return Err(XBeeError::Checksum);
        }

        Ok(Some(data))
    }

    /// Sends an AT command; the answer is picked up by `take_response`
    /// returns the frame id of the request
    pub fn send_command(&mut self, command: [u8; 2]) -> Result<u8, XBeeError> {
        let id = self.next_frame_id();
        self.write_frame(&at_command(id, command))?;
        Ok(id)
    }

    /// Drains pending frames looking for a response to `command`
    /// returns the value bytes of the last response, None if none has arrived
    pub fn take_response(&mut self, command: [u8; 2]) -> Result<Option<FrameData>, XBeeError> {
        let mut answer = None;
        while let Some(response) = self.read_frame()? {
            // [type, id, cmd0, cmd1, status, value..]
            if response.len() < 5 || response[0] != FRAME_AT_RESPONSE || response[2..4] != command {
                debug!("xbee: skipping frame type {}", response.first().copied().unwrap_or(0));
                continue;
            }
            if response[4] != AT_STATUS_OK {
                return Err(XBeeError::AtStatus(response[4]));
            }
            let mut value = FrameData::new();
            // shorter than the response it came from
            let _ = value.extend_from_slice(&response[5..]);
            answer = Some(value);
        }
        Ok(answer)
    }

    pub fn release(self) -> S {
        self.serial
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), XBeeError> {
        self.serial.write_all(bytes).map_err(serial_error)
    }

    /// Frame ids for commands that expect a response; 0 is reserved for "no response"
    fn next_frame_id(&mut self) -> u8 {
        self.frame_id = self.frame_id.wrapping_add(1);
        if self.frame_id == 0 {
            self.frame_id = 1;
        }
        self.frame_id
    }
}

impl<S: Read + ReadReady + Write> RadioLink for XBee<S> {
    type Error = XBeeError;

    fn init(&mut self) -> Result<(), XBeeError> {
        // The module powers up in API mode with its stored settings
        Ok(())
    }

    /// Reads the answer to the previous `AI` query and, unless it says
    /// associated, sends the next one. The first poll is always false.
    fn is_associated(&mut self) -> Result<bool, XBeeError> {
        let associated = match self.take_response(*b"AI")? {
            Some(value) => value.first() == Some(&AI_ASSOCIATED),
            None => false,
        };
        if !associated {
            self.send_command(*b"AI")?;
        }
        Ok(associated)
    }

    fn send(&mut self, frame: &TxFrame<'_>) -> Result<(), XBeeError> {
        let data = tx_request(frame)?;
        self.write_frame(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssociationPolicy, Config};
    use crate::error::Error;
    use crate::radio::{Delivery, TxOptions};
    use crate::sample_loop::SampleLoop;
    use crate::sensors::{AnalogInput, Sample};
    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use std::collections::VecDeque;

    const AI_COMMAND: [u8; 8] = [0x7E, 0x00, 0x04, 0x08, 0x01, b'A', b'I', 0x6C];
    const AI_JOINED: [u8; 10] = [0x7E, 0x00, 0x06, 0x88, 0x01, b'A', b'I', 0x00, 0x00, 0xEC];
    const AI_SCANNING: [u8; 10] = [0x7E, 0x00, 0x06, 0x88, 0x01, b'A', b'I', 0x00, 0xFF, 0xED];

    /// Serial port that is never ready unless bytes were queued.
    /// Reading past the queue reports end of input.
    #[derive(Default)]
    struct MockSerial {
        rx: VecDeque<u8>,
        tx: std::vec::Vec<u8>,
    }

    impl MockSerial {
        fn answering(bytes: &[u8]) -> Self {
            MockSerial {
                rx: bytes.iter().copied().collect(),
                tx: std::vec::Vec::new(),
            }
        }
    }

    impl embedded_io::ErrorType for MockSerial {
        type Error = Infallible;
    }

    impl Read for MockSerial {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl ReadReady for MockSerial {
        fn read_ready(&mut self) -> Result<bool, Infallible> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Write for MockSerial {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    struct Dark;

    impl AnalogInput for Dark {
        type Error = ();

        fn read_raw(&mut self) -> Result<u16, ()> {
            Ok(0)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn transmit_request_matches_reference_frame() {
        let frame = TxFrame {
            size: 8,
            delivery: Delivery::Acknowledged(0x01),
            address: 0x0013_A200_400A_0127,
            nw_address: 0xFFFE,
            radius: 0,
            options: TxOptions::NONE,
            data: b"TxData0A",
        };
        let mut xbee = XBee::new(MockSerial::default());
        xbee.send(&frame).unwrap();

        let expected = [
            0x7E, 0x00, 0x16, 0x10, 0x01, 0x00, 0x13, 0xA2, 0x00, 0x40, 0x0A, 0x01, 0x27, 0xFF,
            0xFE, 0x00, 0x00, 0x54, 0x78, 0x44, 0x61, 0x74, 0x61, 0x30, 0x41, 0x13,
        ];
        assert_eq!(xbee.release().tx, expected);
    }

    #[test]
    fn sample_frame_to_coordinator() {
        let bytes = Sample::new(900).to_bytes();
        let frame = TxFrame::to_coordinator(&bytes).unwrap();
        let mut xbee = XBee::new(MockSerial::default());
        xbee.send(&frame).unwrap();

        let tx = xbee.release().tx;
        assert_eq!(&tx[..3], &[0x7E, 0x00, 0x10]);
        assert_eq!(tx[3], FRAME_TX_REQUEST);
        assert_eq!(tx[4], 0x00); // no response requested
        assert_eq!(&tx[13..15], &[0xFF, 0xFE]);
        assert_eq!(&tx[17..19], &[0x84, 0x03]);
        assert_eq!(tx[19], 0x6B);
    }

    #[test]
    fn size_must_match_data_length() {
        let mut frame = TxFrame::to_coordinator(b"ab").unwrap();
        let mut xbee = XBee::new(MockSerial::default());

        frame.size = 5;
        assert_eq!(xbee.send(&frame), Err(XBeeError::SizeMismatch(5, 2)));
        frame.size = 1;
        assert_eq!(xbee.send(&frame), Err(XBeeError::SizeMismatch(1, 2)));
        assert!(xbee.release().tx.is_empty());
    }

    #[test]
    fn association_is_read_on_the_next_poll() {
        let mut xbee = XBee::new(MockSerial::default());
        assert_eq!(xbee.is_associated(), Ok(false));
        assert_eq!(xbee.serial.tx, AI_COMMAND);

        xbee.serial.tx.clear();
        xbee.serial.rx.extend(AI_JOINED);
        assert_eq!(xbee.is_associated(), Ok(true));
        // no further query once joined
        assert!(xbee.serial.tx.is_empty());
    }

    #[test]
    fn scanning_module_is_asked_again() {
        let mut xbee = XBee::new(MockSerial::answering(&AI_SCANNING));
        assert_eq!(xbee.is_associated(), Ok(false));
        assert_eq!(xbee.release().tx, AI_COMMAND);
    }

    #[test]
    fn unrelated_frames_are_skipped() {
        let mut rx = std::vec::Vec::new();
        rx.extend_from_slice(&[0x00, 0x13]); // line noise
        rx.extend_from_slice(&[0x7E, 0x00, 0x02, 0x8A, 0x02, 0x73]); // modem status
        rx.extend_from_slice(&AI_JOINED);
        let mut xbee = XBee::new(MockSerial::answering(&rx));
        assert_eq!(xbee.is_associated(), Ok(true));
    }

    #[test]
    fn noise_without_delimiter_returns_to_caller() {
        let mut xbee = XBee::new(MockSerial::answering(&[0x00, 0x13, 0x42]));
        assert_eq!(xbee.read_frame(), Ok(None));
        assert_eq!(xbee.is_associated(), Ok(false));
    }

    #[test]
    fn failed_at_command_reports_status() {
        let response = [0x7E, 0x00, 0x05, 0x88, 0x01, b'A', b'I', 0x02, 0xEA];
        let mut xbee = XBee::new(MockSerial::answering(&response));
        assert_eq!(xbee.is_associated(), Err(XBeeError::AtStatus(0x02)));
    }

    #[test]
    fn bad_checksum_is_reported() {
        let mut response = AI_JOINED;
        response[9] = 0xEE;
        let mut xbee = XBee::new(MockSerial::answering(&response));
        assert_eq!(xbee.is_associated(), Err(XBeeError::Checksum));
    }

    #[test]
    fn truncated_frame_is_unexpected_eof() {
        let mut xbee = XBee::new(MockSerial::answering(&[0x7E, 0x00]));
        assert_eq!(xbee.is_associated(), Err(XBeeError::UnexpectedEof));
    }

    #[test]
    fn silent_module_lets_bounded_association_time_out() {
        let config = Config::BASE.with_association(AssociationPolicy::Bounded { polls: 3 });
        let mut node = SampleLoop::new(config, XBee::new(MockSerial::default()), Dark, NoDelay);

        assert_eq!(node.associate(), Err(Error::AssociationTimeout(3)));
        let (xbee, _, _) = node.release();
        assert_eq!(xbee.release().tx.len(), 3 * AI_COMMAND.len());
    }

    #[test]
    fn frame_ids_skip_zero() {
        let mut xbee = XBee::new(MockSerial::default());
        xbee.frame_id = 0xFF;
        assert_eq!(xbee.next_frame_id(), 1);
    }
}
