//! Slash commands and the text the REPL prints for them.

use parley_session::UsageLedger;

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Exit,
    Reset,
    Stats,
    Summary,
    Help,
    Unknown(&'a str),
    /// Anything that is not a slash command goes to the model.
    Message(&'a str),
}

/// Parse one trimmed, non-empty input line.
pub fn parse(input: &str) -> Command<'_> {
    if !input.starts_with('/') {
        return Command::Message(input);
    }
    let cmd = input.split_whitespace().next().unwrap_or(input);
    match cmd {
        "/exit" | "/quit" => Command::Exit,
        "/reset" => Command::Reset,
        "/stats" => Command::Stats,
        "/summary" => Command::Summary,
        "/help" => Command::Help,
        _ => Command::Unknown(cmd),
    }
}

/// Usage report for `/stats` and the exit line.
pub fn format_stats(ledger: &UsageLedger) -> String {
    format!(
        "Last request  — input: {}, output: {}, cost: ${:.6}\n\
         Total         — input: {}, output: {}, cost: ${:.6}\n\
         Requests: {}, compressions: {}",
        ledger.last.input_tokens,
        ledger.last.output_tokens,
        ledger.last.cost_usd,
        ledger.total.input_tokens,
        ledger.total.output_tokens,
        ledger.total.cost_usd,
        ledger.total.requests,
        ledger.compressions,
    )
}

/// Status line printed after every reply.
pub fn format_turn_status(turn_count: usize, compressed: bool) -> String {
    if compressed {
        format!("[{turn_count} turns in context, older turns compressed into summary]")
    } else {
        format!("[{turn_count} turns in context]")
    }
}

pub fn help_text() -> &'static str {
    "Available commands:\n  \
     /help     — Show this help\n  \
     /stats    — Show token usage and cost\n  \
     /summary  — Show the running summary of older turns\n  \
     /reset    — Start a new topic (clears history and summary)\n  \
     /exit     — Exit (also /quit)"
}
