//! Common test utilities: a scripted card, a recording feedback sink and a
//! small sector scheme
#![allow(dead_code)]

use std::collections::VecDeque;

use bytes::Bytes;
use farecard_reader::{
    CardFamily, ClassicVariant, Error, FeedbackSink, Result, Transceiver,
    card::classic::{ClassicCard, ClassicKey, DEFAULT_KEYS, SectorRecord},
    transit::{
        Currency, DecodedBlock, ParseError, SectorScheme, Subscription, TransitBalance, Trip,
    },
};

/// Card replaying scripted replies, one per exchange
#[derive(Debug, Default)]
pub struct FakeCard {
    pub family: Option<CardFamily>,
    pub identifier: Vec<u8>,
    pub replies: VecDeque<Result<Bytes>>,
    pub sent: Vec<String>,
    pub connect_error: Option<Error>,
    pub connected: bool,
    pub close_count: usize,
}

impl FakeCard {
    pub fn new(family: CardFamily) -> Self {
        Self {
            family: Some(family),
            identifier: vec![0x04, 0xA2, 0x3F, 0x1A, 0x2B, 0x3C, 0x80],
            ..Default::default()
        }
    }

    /// A reader with nothing on it
    pub fn absent() -> Self {
        Self {
            connect_error: Some(Error::Transport(
                farecard_apdu_core::TransportError::NoCard("ACS ACR122U".into()),
            )),
            ..Default::default()
        }
    }

    /// Queue a reply given as hex, status word included
    pub fn reply(mut self, hex_reply: &str) -> Self {
        let bytes = hex::decode(hex_reply.replace(' ', "")).expect("valid hex in script");
        self.replies.push_back(Ok(Bytes::from(bytes)));
        self
    }

    pub fn fail(mut self, error: Error) -> Self {
        self.replies.push_back(Err(error));
        self
    }
}

impl Transceiver for FakeCard {
    fn connect(&mut self) -> Result<()> {
        if let Some(error) = self.connect_error.clone() {
            return Err(error);
        }
        self.connected = true;
        Ok(())
    }

    fn exchange(&mut self, command: &[u8]) -> Result<Bytes> {
        assert!(self.connected, "exchange on a closed card");
        self.sent.push(hex::encode_upper(command));
        self.replies
            .pop_front()
            .unwrap_or(Err(Error::Transport(farecard_apdu_core::TransportError::Timeout)))
    }

    fn identifier(&self) -> Option<&[u8]> {
        self.connected.then_some(self.identifier.as_slice())
    }

    fn detected_family(&self) -> Result<CardFamily> {
        self.family
            .ok_or_else(|| Error::UnsupportedCard("unrecognized ATR".into()))
    }

    fn close(&mut self) {
        self.connected = false;
        self.close_count += 1;
    }
}

/// Feedback call, as recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Status(String),
    Progress(usize, usize),
    CardType(Option<CardFamily>),
}

#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub events: Vec<Event>,
}

impl RecordingFeedback {
    pub fn progress_calls(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Progress(..)))
            .count()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn on_status(&mut self, message: &str) {
        self.events.push(Event::Status(message.to_string()));
    }

    fn on_progress(&mut self, current: usize, total: usize) {
        self.events.push(Event::Progress(current, total));
    }

    fn on_card_type_known(&mut self, family: Option<&CardFamily>) {
        self.events.push(Event::CardType(family.copied()));
    }
}

/// Marker in the first byte of every well-formed test sector
pub const MAGIC: u8 = 0x7E;

pub const HAS_SERIAL: u8 = 0x01;
pub const HAS_BALANCE: u8 = 0x02;
pub const HAS_SUBSCRIPTION: u8 = 0x04;
pub const HAS_TRIP: u8 = 0x08;
pub const PARSE_ERROR: u8 = 0x40;
pub const PANICS: u8 = 0x80;

/// Scheme over sectors `[8, 7, 4, 1]`
///
/// Sector layout: magic, flags, tag, balance.
#[derive(Debug, Default)]
pub struct TestScheme {
    pub leading_block_balance: bool,
}

impl SectorScheme for TestScheme {
    fn name(&self) -> &str {
        "test"
    }

    fn sector_order(&self) -> &[usize] {
        &[8, 7, 4, 1]
    }

    fn currency(&self) -> Currency {
        Currency::new("RUB", 2)
    }

    fn balance_precedence(&self) -> farecard_reader::transit::BalancePrecedence {
        if self.leading_block_balance {
            farecard_reader::transit::BalancePrecedence::LeadingBlock
        } else {
            farecard_reader::transit::BalancePrecedence::FirstAvailable
        }
    }

    fn check(&self, data: &[u8]) -> bool {
        data.first() == Some(&MAGIC)
    }

    fn parse(&self, data: &[u8]) -> std::result::Result<DecodedBlock, ParseError> {
        let (flags, tag, balance) = (data[1], data[2], data[3]);
        if flags & PANICS != 0 {
            panic!("corrupt sector {tag}");
        }
        if flags & PARSE_ERROR != 0 {
            return Err(ParseError::new(format!("bad sector {tag}")));
        }

        Ok(DecodedBlock {
            serial_number: (flags & HAS_SERIAL != 0).then(|| format!("SN{tag}")),
            balance: (flags & HAS_BALANCE != 0)
                .then(|| TransitBalance::new(i64::from(balance), self.currency())),
            trips: if flags & HAS_TRIP != 0 {
                vec![Trip {
                    route: Some(format!("R{tag}")),
                    ..Default::default()
                }]
            } else {
                Vec::new()
            },
            subscription: (flags & HAS_SUBSCRIPTION != 0).then(|| Subscription {
                name: format!("S{tag}"),
                ..Default::default()
            }),
            info: Vec::new(),
            debug: Vec::new(),
        })
    }
}

/// 64-byte sector payload in the test scheme layout
pub fn payload(flags: u8, tag: u8, balance: u8) -> Vec<u8> {
    let mut data = vec![0u8; 64];
    data[..4].copy_from_slice(&[MAGIC, flags, tag, balance]);
    data
}

pub fn authorized(index: usize, data: Vec<u8>) -> SectorRecord {
    SectorRecord::authorized(index, data, ClassicKey::a(DEFAULT_KEYS[0]))
}

pub fn classic_card(sectors: Vec<SectorRecord>) -> ClassicCard {
    ClassicCard {
        variant: ClassicVariant::OneK,
        sectors,
    }
}
