//! Keyword command parsing for inbound chat text.
//!
//! Parsing is pure: the channel layer decides what each [`Command`] does.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Catalog,
    Categories,
    ProductDetail,
    Search,
    AddToCart,
    ViewCart,
    RemoveFromCart,
    ClearCart,
    Checkout,
    TrackOrder,
    OrderHistory,
    Help,
    StoreInfo,
}

/// Keywords in priority order. The first prefix match wins.
pub const COMMAND_TABLE: &[(&str, Command)] = &[
    ("KATALOG", Command::Catalog),
    ("CATALOG", Command::Catalog),
    ("KATEGORI", Command::Categories),
    ("CATEGORY", Command::Categories),
    ("PRODUK", Command::ProductDetail),
    ("PRODUCT", Command::ProductDetail),
    ("CARI", Command::Search),
    ("SEARCH", Command::Search),
    ("BELI", Command::AddToCart),
    ("BUY", Command::AddToCart),
    ("KERANJANG", Command::ViewCart),
    ("CART", Command::ViewCart),
    ("HAPUS", Command::RemoveFromCart),
    ("REMOVE", Command::RemoveFromCart),
    ("DELETE", Command::RemoveFromCart),
    ("KOSONGKAN", Command::ClearCart),
    ("CLEAR", Command::ClearCart),
    ("CHECKOUT", Command::Checkout),
    ("PESAN", Command::Checkout),
    ("ORDER", Command::Checkout),
    ("CEK", Command::TrackOrder),
    ("CHECK", Command::TrackOrder),
    ("TRACK", Command::TrackOrder),
    ("PESANAN", Command::OrderHistory),
    ("ORDERS", Command::OrderHistory),
    ("RIWAYAT", Command::OrderHistory),
    ("HISTORY", Command::OrderHistory),
    ("HELP", Command::Help),
    ("MENU", Command::Help),
    ("INFO", Command::StoreInfo),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Command,
    pub keyword: &'static str,
    /// Whitespace-split remainder in the sender's original casing.
    pub args: Vec<String>,
}

impl ParsedCommand {
    pub fn arg_text(&self) -> String {
        self.args.join(" ")
    }
}

pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    let upper = trimmed.to_ascii_uppercase();

    COMMAND_TABLE.iter().find(|(keyword, _)| upper.starts_with(keyword)).map(
        |(keyword, command)| ParsedCommand {
            command: *command,
            keyword: *keyword,
            args: trimmed[keyword.len()..].split_whitespace().map(str::to_owned).collect(),
        },
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyArgs {
    pub sku: String,
    pub quantity: u32,
}

/// `BELI <sku> [qty]`. A missing, zero or malformed quantity means one.
pub fn parse_buy_args(args: &[String]) -> Option<BuyArgs> {
    let sku = args.first()?.trim().to_ascii_uppercase();
    if sku.is_empty() {
        return None;
    }

    let quantity =
        args.get(1).and_then(|raw| raw.parse::<u32>().ok()).filter(|qty| *qty > 0).unwrap_or(1);

    Some(BuyArgs { sku, quantity })
}

/// Finds the first `ORD-` token and returns it upper-cased.
pub fn parse_order_id(text: &str) -> Option<String> {
    let upper = text.to_ascii_uppercase();
    let mut search_from = 0;

    while let Some(offset) = upper[search_from..].find("ORD-") {
        let start = search_from + offset;
        let token: String = upper[start + 4..]
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
            .collect();
        let token = token.trim_end_matches('-');
        if !token.is_empty() {
            return Some(format!("ORD-{token}"));
        }
        search_from = start + 4;
    }

    None
}

const GREETINGS: &[&str] = &[
    "halo",
    "hai",
    "hi",
    "hello",
    "hey",
    "selamat pagi",
    "selamat siang",
    "selamat sore",
    "selamat malam",
    "assalamualaikum",
];

const THANKS: &[&str] = &["terima kasih", "thank you", "thanks", "makasih", "thx"];

const CANCEL_WORDS: &[&str] = &["batal", "cancel"];

const AFFIRMATIVE_WORDS: &[&str] = &["ya", "yes", "ok"];

pub fn is_greeting(text: &str) -> bool {
    contains_any_phrase(text, GREETINGS)
}

pub fn is_thank_you(text: &str) -> bool {
    contains_any_phrase(text, THANKS)
}

pub fn is_cancel(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    CANCEL_WORDS.contains(&normalized.as_str())
}

pub fn is_affirmative(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    AFFIRMATIVE_WORDS.contains(&normalized.as_str())
}

pub fn is_skip(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("skip")
}

/// Whole-word phrase match, so `hi` does not fire on `nothing`.
fn contains_any_phrase(text: &str, phrases: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> =
        lowered.split(|ch: char| !ch.is_alphanumeric()).filter(|word| !word.is_empty()).collect();

    phrases.iter().any(|phrase| {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        words.windows(needle.len()).any(|window| {
            window.iter().zip(&needle).all(|(word, expected)| is_stretched(word, expected))
        })
    })
}

/// `word` equals `expected`, allowing its last letter to repeat: "pagiii", "makasihh".
fn is_stretched(word: &str, expected: &str) -> bool {
    let Some(rest) = word.strip_prefix(expected) else {
        return false;
    };
    match expected.chars().last() {
        Some(last) => rest.chars().all(|ch| ch == last),
        None => rest.is_empty(),
    }
}
