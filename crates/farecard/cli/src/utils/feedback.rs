use colored::Colorize;
use farecard_reader::{CardFamily, FeedbackSink};

/// Feedback sink printing to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintFeedback;

impl FeedbackSink for PrintFeedback {
    fn on_status(&mut self, message: &str) {
        println!("{message}");
    }

    fn on_progress(&mut self, current: usize, total: usize) {
        println!("Dumping: ({current} / {total})");
    }

    fn on_card_type_known(&mut self, family: Option<&CardFamily>) {
        match family {
            Some(family) => println!("Card type: {}", family.to_string().bold()),
            None => println!("{}", "Unknown card type".yellow()),
        }
    }
}
