/// Counts down a fixed number of polls.
/// Used to bound the association wait when that policy is selected.
pub struct CountDownTimer {
    remaining: u16,
}

impl CountDownTimer {
    pub fn new(polls: u16) -> CountDownTimer {
        Self { remaining: polls }
    }

    pub fn tick(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
    }

    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}
