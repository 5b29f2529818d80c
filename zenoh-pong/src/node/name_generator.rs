//! Readable default node names
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Seed words for the name chain: table-tennis players, paddles and arcade vocabulary
const SEED_WORDS: &[&str] = &[
    "Rally", "Volley", "Spin", "Smash", "Lob", "Serve", "Chop", "Drive",
    "Paddle", "Racket", "Blade", "Bounce", "Pixel", "Sprite", "Arcade", "Joystick",
    "Waldner", "Persson", "Appelgren", "Boll", "Samsonov", "Primorac", "Gatien", "Kreanga",
    "Teensy", "Oled", "Flex", "Canbus", "Baud", "Frame", "Signal", "Pulse",
    "Atari", "Magnavox", "Odyssey", "Tennis", "Ping", "Pong", "Table", "Net",
];

fn name_chain() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(SEED_WORDS.iter().copied())
        .build()
}

/// Generate a short pronounceable name that is a valid keyexpr chunk
pub fn generate_name() -> String {
    let mut chain = name_chain();
    loop {
        let name = chain.generate_one();
        if !name.is_empty() && name.len() <= 10 && name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return name;
        }
    }
}

/// Name with a numeric suffix, e.g. "Volpin_417"
pub fn generate_unique_name() -> String {
    let suffix: u16 = rand::random::<u16>() % 1000;
    format!("{}_{}", generate_name(), suffix)
}
