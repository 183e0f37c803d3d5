//! First-response-wins guard

/// Per-trial latch that admits exactly one response.
///
/// Both user input and the response-window timeout go through
/// [`ResponseGate::try_claim`], so whichever arrives first wins and the other
/// becomes a no-op.
#[derive(Debug, Clone, Default)]
pub struct ResponseGate {
    armed: bool,
    claimed: bool,
}

impl ResponseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate for a new trial
    pub fn arm(&mut self) {
        self.armed = true;
        self.claimed = false;
    }

    /// Close without claiming (trial cleared)
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Claim the trial's single response slot
    pub fn try_claim(&mut self) -> bool {
        if self.armed && !self.claimed {
            self.claimed = true;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }
}
