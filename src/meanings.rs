//! Static reference data: pre-authored general meanings for every card
//! and orientation, the canonical deck list, and the image naming rule.
//!
//! The meanings table is bundled into the binary and loaded once; it is
//! never written at runtime.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::providers::Orientation;

/// Pre-authored meanings for one card.
#[derive(Debug, Clone, Deserialize)]
pub struct CardMeaning {
    pub upright: String,
    pub reversed: String,
}

impl CardMeaning {
    pub fn for_orientation(&self, orientation: Orientation) -> &str {
        match orientation {
            Orientation::Upright => &self.upright,
            Orientation::Reversed => &self.reversed,
        }
    }
}

static GENERAL_MEANINGS: LazyLock<HashMap<String, CardMeaning>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/general_meanings.json"))
        .expect("bundled general_meanings.json is valid")
});

/// Look up the general meaning for a card and orientation.
///
/// Models sometimes drop the "The " article ("Fool" for "The Fool"),
/// so the literal name is tried first and the prefixed variant second.
pub fn general_meaning(card: &str, orientation: Orientation) -> Option<&'static str> {
    GENERAL_MEANINGS
        .get(card)
        .or_else(|| GENERAL_MEANINGS.get(format!("The {card}").as_str()))
        .map(|m| m.for_orientation(orientation))
}

/// Image file name for a card and orientation: spaces become
/// underscores, the orientation is capitalized, `.jpg` suffix.
/// "The Fool" upright -> `The_Fool_Upright.jpg`.
pub fn image_file_name(card: &str, orientation: Orientation) -> String {
    format!(
        "{}_{}.jpg",
        card.replace(' ', "_"),
        orientation.capitalized()
    )
}

/// The 78 Rider-Waite cards, majors first, in deck order.
#[rustfmt::skip]
pub const DECK: [&str; 78] = [
    "The Fool", "The Magician", "The High Priestess", "The Empress", "The Emperor",
    "The Hierophant", "The Lovers", "The Chariot", "Strength", "The Hermit",
    "Wheel of Fortune", "Justice", "The Hanged Man", "Death", "Temperance",
    "The Devil", "The Tower", "The Star", "The Moon", "The Sun", "Judgement", "The World",
    "Ace of Wands", "Two of Wands", "Three of Wands", "Four of Wands", "Five of Wands",
    "Six of Wands", "Seven of Wands", "Eight of Wands", "Nine of Wands", "Ten of Wands",
    "Page of Wands", "Knight of Wands", "Queen of Wands", "King of Wands",
    "Ace of Cups", "Two of Cups", "Three of Cups", "Four of Cups", "Five of Cups",
    "Six of Cups", "Seven of Cups", "Eight of Cups", "Nine of Cups", "Ten of Cups",
    "Page of Cups", "Knight of Cups", "Queen of Cups", "King of Cups",
    "Ace of Swords", "Two of Swords", "Three of Swords", "Four of Swords", "Five of Swords",
    "Six of Swords", "Seven of Swords", "Eight of Swords", "Nine of Swords", "Ten of Swords",
    "Page of Swords", "Knight of Swords", "Queen of Swords", "King of Swords",
    "Ace of Pentacles", "Two of Pentacles", "Three of Pentacles", "Four of Pentacles",
    "Five of Pentacles", "Six of Pentacles", "Seven of Pentacles", "Eight of Pentacles",
    "Nine of Pentacles", "Ten of Pentacles", "Page of Pentacles", "Knight of Pentacles",
    "Queen of Pentacles", "King of Pentacles",
];
