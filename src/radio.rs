use crate::error::Error;
use crate::logging::debug;
use crate::sensors::Sample;

/// 64-bit address of the network coordinator
pub const COORDINATOR: u64 = 0x0000_0000_0000_0000;
/// 16-bit network address placeholder; the link layer resolves it
pub const NW_ADDR_UNKNOWN: u16 = 0xFFFE;
/// Broadcast radius of 0 lets the module use its maximum hop count
pub const MAX_RADIUS: u8 = 0x00;
/// Largest RF payload the link accepts in one frame
pub const LINK_MTU: usize = 84;

/// Whether the link should report delivery status for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Frame id 0: no transmit status is returned
    NoResponse,
    /// Non-zero frame id: the module answers with a transmit status
    Acknowledged(u8),
}

impl Delivery {
    pub const fn frame_id(self) -> u8 {
        match self {
            Delivery::NoResponse => 0x00,
            Delivery::Acknowledged(id) => id,
        }
    }
}

/// Transmit options bit field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxOptions(pub u8);

impl TxOptions {
    pub const NONE: TxOptions = TxOptions(0x00);
}

/// One outbound data frame, built fresh for every send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxFrame<'a> {
    pub size: u8,
    pub delivery: Delivery,
    pub address: u64,
    pub nw_address: u16,
    pub radius: u8,
    pub options: TxOptions,
    pub data: &'a [u8],
}

impl<'a> TxFrame<'a> {
    /// Frame for the coordinator with no acknowledgement requested
    pub fn to_coordinator(data: &'a [u8]) -> Result<Self, Error> {
        if data.len() > LINK_MTU {
            return Err(Error::PayloadTooLong(data.len()));
        }

        Ok(TxFrame {
            size: data.len() as u8,
            delivery: Delivery::NoResponse,
            address: COORDINATOR,
            nw_address: NW_ADDR_UNKNOWN,
            radius: MAX_RADIUS,
            options: TxOptions::NONE,
            data,
        })
    }
}

/// The radio module as seen by the firmware
pub trait RadioLink {
    type Error;

    /// Bring the link up. Called once before the association wait
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Whether the module has joined the network
    fn is_associated(&mut self) -> Result<bool, Self::Error>;

    /// Hand a frame to the module. Delivery is not confirmed
    fn send(&mut self, frame: &TxFrame<'_>) -> Result<(), Self::Error>;
}

/// Sends payloads to the coordinator over a `RadioLink`
pub struct FrameSender<R> {
    link: R,
}

impl<R: RadioLink> FrameSender<R> {
    pub fn new(link: R) -> Self {
        Self { link }
    }

    pub fn init(&mut self) -> Result<(), Error> {
        self.link.init().map_err(|_| Error::Init)
    }

    pub fn is_associated(&mut self) -> Result<bool, Error> {
        self.link.is_associated().map_err(|_| Error::Association)
    }

    /// Sends raw bytes in a single frame
    /// param bytes: payload, at most `LINK_MTU` long
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let frame = TxFrame::to_coordinator(bytes)?;
        debug!("tx {} bytes", frame.size);
        self.link.send(&frame).map_err(|_| Error::Send)
    }

    /// Sends the text bytes only, no terminator
    pub fn send_str(&mut self, text: &str) -> Result<(), Error> {
        self.send_bytes(text.as_bytes())
    }

    /// Sends the 2-byte encoding of a sample
    pub fn send_sample(&mut self, sample: Sample) -> Result<(), Error> {
        self.send_bytes(&sample.to_bytes())
    }

    pub fn link(&self) -> &R {
        &self.link
    }

    pub fn release(self) -> R {
        self.link
    }
}
