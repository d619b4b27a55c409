//! Progress and status reporting during a dump

use tracing::{debug, info};

use crate::family::CardFamily;

/// Observer notified while a card is being read
///
/// Calls are synchronous, ordered and best-effort: a sink cannot fail the
/// acquisition.
pub trait FeedbackSink {
    /// A human readable status line
    fn on_status(&mut self, message: &str);

    /// Progress through the current decoder's work, `current` of `total`
    fn on_progress(&mut self, current: usize, total: usize);

    /// The card family became known, or `None` if it could not be determined
    fn on_card_type_known(&mut self, family: Option<&CardFamily>);
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFeedback;

impl FeedbackSink for NoopFeedback {
    fn on_status(&mut self, _message: &str) {}

    fn on_progress(&mut self, _current: usize, _total: usize) {}

    fn on_card_type_known(&mut self, _family: Option<&CardFamily>) {}
}

/// Sink that turns feedback into `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFeedback;

impl FeedbackSink for TracingFeedback {
    fn on_status(&mut self, message: &str) {
        info!("{message}");
    }

    fn on_progress(&mut self, current: usize, total: usize) {
        debug!(current, total, "Dump progress");
    }

    fn on_card_type_known(&mut self, family: Option<&CardFamily>) {
        match family {
            Some(family) => info!(%family, "Card type detected"),
            None => info!("Card type unknown"),
        }
    }
}

impl<F: FeedbackSink + ?Sized> FeedbackSink for &mut F {
    fn on_status(&mut self, message: &str) {
        (**self).on_status(message);
    }

    fn on_progress(&mut self, current: usize, total: usize) {
        (**self).on_progress(current, total);
    }

    fn on_card_type_known(&mut self, family: Option<&CardFamily>) {
        (**self).on_card_type_known(family);
    }
}
