//! Card acquisition dispatcher

use std::collections::HashMap;

use tracing::{debug, info};

use crate::card::{
    ClassicDecoder, DesfireDecoder, FelicaDecoder, Iso7816Decoder, UltralightDecoder,
    classic::ClassicKeys, iso7816::Iso7816Config,
};
use crate::{
    CancelToken, CardSnapshot, DumpContext, DumpOutcome, Error, FamilyDecoder, FamilyKind,
    FeedbackSink, Result, Session, Transceiver, normalize_identifier,
};

/// Decoders per chip family, in the order they are tried
#[derive(Debug, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<FamilyKind, Vec<Box<dyn FamilyDecoder>>>,
}

impl DecoderRegistry {
    /// Registry without any decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in decoder and default configuration
    pub fn standard() -> Self {
        Self::standard_with(ClassicKeys::default(), Iso7816Config::default())
    }

    /// Registry with every built-in decoder
    ///
    /// ISO 7816 cards try DESFire before the generic ISO 7816 reader.
    pub fn standard_with(keys: ClassicKeys, iso7816: Iso7816Config) -> Self {
        let mut registry = Self::new();
        registry
            .register(FamilyKind::Iso7816, DesfireDecoder)
            .register(FamilyKind::Iso7816, Iso7816Decoder::new(iso7816))
            .register(FamilyKind::MifareClassic, ClassicDecoder::new(keys))
            .register(FamilyKind::MifareUltralight, UltralightDecoder)
            .register(FamilyKind::Felica, FelicaDecoder);
        registry
    }

    /// Append `decoder` to the decoders tried for `family`
    pub fn register<D: FamilyDecoder + 'static>(&mut self, family: FamilyKind, decoder: D) -> &mut Self {
        self.decoders.entry(family).or_default().push(Box::new(decoder));
        self
    }

    /// Decoders registered for `family`, in order
    pub fn decoders(&self, family: FamilyKind) -> &[Box<dyn FamilyDecoder>] {
        self.decoders.get(&family).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Dump a connected card
///
/// Decoders registered for the detected family are tried in order. Only
/// [`DumpOutcome::NotApplicable`] moves on to the next one; any error ends
/// the acquisition.
pub fn acquire<T, F>(transceiver: &mut T, registry: &DecoderRegistry, feedback: &mut F) -> Result<CardSnapshot>
where
    T: Transceiver + ?Sized,
    F: FeedbackSink + ?Sized,
{
    acquire_cancellable(transceiver, registry, feedback, CancelToken::new())
}

/// [`acquire`] with cooperative cancellation
pub fn acquire_cancellable<T, F>(
    transceiver: &mut T,
    registry: &DecoderRegistry,
    feedback: &mut F,
    cancel: CancelToken,
) -> Result<CardSnapshot>
where
    T: Transceiver + ?Sized,
    F: FeedbackSink + ?Sized,
{
    let family = match transceiver.detected_family() {
        Ok(family) => family,
        Err(e) => {
            feedback.on_card_type_known(None);
            return Err(e);
        }
    };
    feedback.on_card_type_known(Some(&family));
    info!(%family, "Card detected");

    let identifier = normalize_identifier(&family, transceiver.identifier().unwrap_or_default());

    let mut feedback = feedback;
    let mut context = DumpContext::new(&mut feedback, cancel);
    let mut transceiver = transceiver;

    for decoder in registry.decoders(family.kind()) {
        context.checkpoint()?;
        debug!(decoder = decoder.name(), "Trying decoder");
        match decoder.dump(&mut transceiver, &mut context)? {
            DumpOutcome::Dumped(payload) => {
                info!(decoder = decoder.name(), "Card dumped");
                return Ok(CardSnapshot::new(identifier, payload));
            }
            DumpOutcome::NotApplicable => {
                debug!(decoder = decoder.name(), "Decoder not applicable");
            }
        }
    }

    Err(Error::UnsupportedCard(format!("no decoder for {family}")))
}

/// Connect, dump and release a card
///
/// The transceiver is closed exactly once, whatever the outcome.
pub fn read_card<T, F>(transceiver: &mut T, registry: &DecoderRegistry, feedback: &mut F) -> Result<CardSnapshot>
where
    T: Transceiver + ?Sized,
    F: FeedbackSink + ?Sized,
{
    read_card_cancellable(transceiver, registry, feedback, CancelToken::new())
}

/// [`read_card`] with cooperative cancellation
pub fn read_card_cancellable<T, F>(
    transceiver: &mut T,
    registry: &DecoderRegistry,
    feedback: &mut F,
    cancel: CancelToken,
) -> Result<CardSnapshot>
where
    T: Transceiver + ?Sized,
    F: FeedbackSink + ?Sized,
{
    feedback.on_status("Connecting to card");
    let mut session = Session::open(transceiver)?;
    let snapshot = acquire_cancellable(session.transceiver(), registry, feedback, cancel);
    session.close();
    snapshot
}
