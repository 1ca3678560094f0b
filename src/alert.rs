use heapless::String;
use ufmt::uwrite;

use crate::config::ALERT_THRESHOLD;
use crate::sensors::Sample;

/// Room for the alert text with any 5-digit threshold
pub const ALERT_CAPACITY: usize = 32;

pub type AlertMessage = String<ALERT_CAPACITY>;

/// Decides whether a sample warrants an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvaluator {
    threshold: u16,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(ALERT_THRESHOLD)
    }
}

impl AlertEvaluator {
    pub const fn new(threshold: u16) -> Self {
        Self { threshold }
    }

    /// Checks a sample against the threshold (strictly greater than)
    /// param sample: the current reading
    /// returns the alert text, or None when the reading is at or below the threshold
    pub fn evaluate(&self, sample: Sample) -> Option<AlertMessage> {
        if sample.raw() > self.threshold {
            Some(self.message())
        } else {
            None
        }
    }

    /// Formats the alert text: "alert, light above <threshold>"
    fn message(&self) -> AlertMessage {
        let mut message = AlertMessage::new();
        // "alert, light above " is 19 bytes and a u16 is at most 5 digits
        let _ = uwrite!(message, "alert, light above {}", self.threshold);
        message
    }
}

/// Evaluates against the default threshold
pub fn evaluate(sample: Sample) -> Option<AlertMessage> {
    AlertEvaluator::default().evaluate(sample)
}
