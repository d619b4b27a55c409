//! Human readable card summaries

use colored::Colorize;
use farecard_reader::{
    CardSnapshot, FamilyPayload,
    card::{
        classic::{ClassicCard, SectorOutcome},
        desfire::{DesfireCard, FileContent},
        felica::FelicaCard,
        iso7816::Iso7816Card,
        ultralight::UltralightCard,
    },
    transit::{ListItem, TransitData},
};

fn section_title(title: &str) -> String {
    format!("\n{}", title.bold().underline())
}

/// Print what was read from the card
pub fn print_snapshot(snapshot: &CardSnapshot) {
    println!("{}", section_title("Card info"));
    println!("  Identifier: {}", snapshot.identifier_hex());
    println!("  Scanned at: {}", snapshot.scanned_at.to_rfc3339());
    println!("  Payload: {}", snapshot.payload.name());

    match &snapshot.payload {
        FamilyPayload::Desfire(card) => print_desfire(card),
        FamilyPayload::Iso7816(card) => print_iso7816(card),
        FamilyPayload::Classic(card) => print_classic(card),
        FamilyPayload::Ultralight(card) => print_ultralight(card),
        FamilyPayload::Felica(card) => print_felica(card),
    }
}

/// Print the transit view of a recognised card
pub fn print_transit(view: &TransitData) {
    println!("{}", section_title(&format!("Transit card ({})", view.scheme)));
    if let Some(serial) = &view.serial_number {
        println!("  Serial number: {serial}");
    }
    println!("  Balance: {}", view.balance.to_string().bold());
    if let Some(warning) = view.warning {
        println!("  {}", warning.to_string().yellow());
    }

    if !view.subscriptions.is_empty() {
        println!("{}", section_title("Subscriptions"));
    }
    for subscription in &view.subscriptions {
        let until = subscription
            .valid_to
            .map(|to| format!(", valid to {}", to.format("%Y-%m-%d")))
            .unwrap_or_default();
        let trips = subscription
            .remaining_trips
            .map(|n| format!(", {n} trips left"))
            .unwrap_or_default();
        println!("  {}{until}{trips}", subscription.name);
    }

    if !view.trips.is_empty() {
        println!("{}", section_title("Trips"));
    }
    for trip in &view.trips {
        let when = trip
            .start_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown time".into());
        let place = [trip.route.as_deref(), trip.station.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");
        let fare = trip.fare.as_ref().map(|f| format!(" {f}")).unwrap_or_default();
        println!("  {when}  {place}{fare}");
    }

    for item in &view.info {
        match item {
            ListItem::Header { title } => println!("{}", section_title(title)),
            ListItem::Text { label, value } => println!("  {label}: {value}"),
        }
    }
}

fn print_desfire(card: &DesfireCard) {
    let hw = &card.manufacturing_data.hardware;
    println!(
        "  Hardware: vendor {:02X}, version {}, {} bytes",
        hw.vendor_id,
        hw.version,
        hw.storage_bytes()
    );

    println!("{}", section_title("Applications"));
    for app in &card.applications {
        println!("  {:06X}", app.id);
        for file in &app.files {
            let content = match &file.content {
                FileContent::Standard { data } | FileContent::Record { data } => {
                    format!("{} bytes", data.len())
                }
                FileContent::Value { value } => format!("value {value}"),
                FileContent::Unauthorized { message } => message.yellow().to_string(),
                FileContent::Invalid { message } => message.red().to_string(),
            };
            println!("    file {:02X}: {content}", file.id);
        }
    }
}

fn print_iso7816(card: &Iso7816Card) {
    println!("{}", section_title("Applications"));
    if card.applications.is_empty() {
        println!("  {}", "No known application".yellow());
    }
    for app in &card.applications {
        println!("  {}", hex::encode_upper(&app.aid));
        for file in &app.files {
            let partial = if file.partial { " (partial)" } else { "" };
            println!("    SFI {:02}: {} records{partial}", file.sfi, file.records.len());
        }
    }
}

fn print_classic(card: &ClassicCard) {
    println!("{}", section_title(&format!("MIFARE Classic {}", card.variant)));
    for sector in &card.sectors {
        let status = match &sector.outcome {
            SectorOutcome::Authorized { key } => format!("key {}", key.key_type).green(),
            SectorOutcome::Unauthorized => "unauthorized".yellow(),
            SectorOutcome::ReadError { message } => message.red(),
        };
        println!("  sector {:2}: {status}", sector.index);
    }
}

fn print_ultralight(card: &UltralightCard) {
    println!("{}", section_title(&format!("{} pages", card.pages.len())));
    for page in &card.pages {
        println!("  {:3}: {}", page.index, hex::encode_upper(&page.data));
    }
}

fn print_felica(card: &FelicaCard) {
    println!("  IDm: {}", hex::encode_upper(&card.idm));
    println!("  PMm: {}", hex::encode_upper(&card.pmm));
    for system in &card.systems {
        println!("{}", section_title(&format!("System {:04X}", system.code)));
        for service in &system.services {
            let content = if service.blocks.is_empty() {
                "no readable blocks".yellow().to_string()
            } else {
                format!("{} blocks", service.blocks.len())
            };
            println!("  service {:04X}: {content}", service.code);
        }
    }
}
