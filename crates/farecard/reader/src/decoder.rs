//! Family decoder seam

use std::fmt;

use crate::{CancelToken, Error, FeedbackSink, Result, snapshot::FamilyPayload, transceiver::Transceiver};

/// Result of a decoder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// The card was read
    Dumped(FamilyPayload),
    /// The card does not speak this decoder's protocol; try the next one
    NotApplicable,
}

/// Reads one chip family into a [`FamilyPayload`]
///
/// Return [`DumpOutcome::NotApplicable`] only for an early structural
/// mismatch. Once the card has been recognised, unexpected replies are
/// [`Error::Protocol`] and the dispatcher will not fall back.
pub trait FamilyDecoder: fmt::Debug + Send + Sync {
    /// Short decoder name, used in logs
    fn name(&self) -> &'static str;

    /// Read the card
    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome>;
}

/// Feedback and cancellation handed to a running decoder
pub struct DumpContext<'a> {
    feedback: &'a mut dyn FeedbackSink,
    cancel: CancelToken,
}

impl fmt::Debug for DumpContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpContext")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl<'a> DumpContext<'a> {
    /// Create a context around `feedback`
    pub fn new(feedback: &'a mut dyn FeedbackSink, cancel: CancelToken) -> Self {
        Self { feedback, cancel }
    }

    /// Fail with [`Error::Cancelled`] if the caller asked to stop
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Report progress
    pub fn progress(&mut self, current: usize, total: usize) {
        self.feedback.on_progress(current, total);
    }

    /// Report a status line
    pub fn status(&mut self, message: &str) {
        self.feedback.on_status(message);
    }

    /// The underlying sink
    pub fn feedback(&mut self) -> &mut dyn FeedbackSink {
        &mut *self.feedback
    }
}
