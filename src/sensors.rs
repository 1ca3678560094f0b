use crate::error::Error;

/// One raw analog reading of the light sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample(u16);

impl Sample {
    pub const fn new(raw: u16) -> Self {
        Sample(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Encodes the reading for the radio payload.
    /// Little-endian, matching the AVR memory layout the coordinator decodes.
    /// returns the two payload bytes, low byte first
    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// A single analog channel that can be converted on demand.
///
/// Implemented by the board binary on top of the HAL's ADC. Pin direction is
/// fixed by the HAL's type state before the channel is handed over.
pub trait AnalogInput {
    type Error;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Reads light samples from the configured analog channel
pub struct LightSensor<A> {
    input: A,
}

impl<A: AnalogInput> LightSensor<A> {
    pub fn new(input: A) -> Self {
        Self { input }
    }

    /// Takes one reading. No averaging, no range checks
    /// returns Sample
    pub fn sample(&mut self) -> Result<Sample, Error> {
        self.input
            .read_raw()
            .map(Sample::new)
            .map_err(|_| Error::Sample)
    }

    pub fn release(self) -> A {
        self.input
    }
}
