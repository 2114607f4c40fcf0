//! Share-phrase generation: title-cased words drawn from a fixed list, with
//! an optional trailing digit suffix. Kept separate from `peerhop-core`
//! since nothing in the wire protocol depends on how a share code is chosen
//! or displayed — only that both peers agree on its bytes.
//!
//! The embedded list is a curated few hundred words, not a full diceware
//! word list; see the crate's design notes for why.

use rand_core::RngCore;

const WORDS: &str = include_str!("words.txt");

fn all_words() -> Vec<&'static str> {
    WORDS.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn random_word(words: &[&str]) -> String {
    let idx = (rand_core::OsRng.next_u32() as usize) % words.len();
    title_case(words[idx])
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Generate a LAN discovery phrase: two title-cased words directly
/// concatenated, followed by a random 0-999 suffix with no separator.
pub fn generate_lan_phrase() -> String {
    let words = all_words();
    let mut phrase = String::new();
    phrase.push_str(&random_word(&words));
    phrase.push_str(&random_word(&words));
    let suffix = rand_core::OsRng.next_u32() % 1000;
    phrase.push_str(&suffix.to_string());
    phrase
}

/// Generate a relay share code: three title-cased words concatenated, no
/// digits. The caller appends the arbiter's 4-digit pair code afterward.
pub fn generate_relay_share_code() -> String {
    let words = all_words();
    let mut phrase = String::new();
    for _ in 0..3 {
        phrase.push_str(&random_word(&words));
    }
    phrase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lan_phrase_ends_in_digits() {
        let phrase = generate_lan_phrase();
        let trailing_digits: String = phrase.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
        assert!(!trailing_digits.is_empty());
    }

    #[test]
    fn relay_share_code_has_no_digits() {
        let code = generate_relay_share_code();
        assert!(code.chars().all(|c| c.is_alphabetic()));
        assert!(!code.is_empty());
    }

    #[test]
    fn title_case_capitalizes_first_letter_only() {
        assert_eq!(title_case("apple"), "Apple");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn word_list_is_nonempty_and_has_no_blank_entries() {
        let words = all_words();
        assert!(words.len() > 50);
        assert!(words.iter().all(|w| !w.is_empty()));
    }
}
