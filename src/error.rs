/// Failure kinds surfaced by the sample loop and its collaborators.
///
/// The default loop policy logs `Init` and `Send` and keeps going, the same as
/// a fire-and-forget radio stack would. Only a bounded association policy ever
/// turns `AssociationTimeout` into a returned error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("radio link failed to initialise")]
    Init,

    #[error("radio link rejected a frame")]
    Send,

    #[error("association status poll failed")]
    Association,

    #[error("no network association after {0} polls")]
    AssociationTimeout(u16),

    #[error("analog read of the light sensor failed")]
    Sample,

    #[error("payload of {0} bytes exceeds the link MTU")]
    PayloadTooLong(usize),
}
