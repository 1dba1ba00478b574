//! WS token strength policy.

use rand::{Rng, seq::SliceRandom};

const SPECIALS: &[u8] = b"!@#$%^&*()-_=+[]{}";
const GENERATED_LEN: usize = 24;

/// Strong means: length ≥ 12 with at least one digit, one lowercase, one
/// uppercase, and one special character.
#[must_use]
pub fn is_strong_token(token: &str) -> bool {
    token.len() >= 12
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().any(|c| c.is_ascii_lowercase())
        && token.chars().any(|c| c.is_ascii_uppercase())
        && token.chars().any(|c| SPECIALS.contains(&(c as u8)))
}

/// Generate a token that satisfies [`is_strong_token`].
#[must_use]
pub fn generate_strong_token() -> String {
    let mut rng = rand::rng();

    let classes: [&[u8]; 4] = [
        b"0123456789",
        b"abcdefghijklmnopqrstuvwxyz",
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
        SPECIALS,
    ];

    // One character from every class, the rest drawn from all of them.
    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.random_range(0..class.len())])
        .collect();
    let pool: Vec<u8> = classes.concat();
    while chars.len() < GENERATED_LEN {
        chars.push(pool[rng.random_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    String::from_utf8_lossy(&chars).into_owned()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case::all_classes_present("Aa1!Aa1!Aa1!", true)]
    #[case::too_short("Aa1!short", false)]
    #[case::no_uppercase("aa1!aa1!aa1!", false)]
    #[case::no_lowercase("AA1!AA1!AA1!", false)]
    #[case::no_digit("Aaa!Aaa!Aaa!", false)]
    #[case::no_special("Aa12Aa12Aa12", false)]
    #[case::empty("", false)]
    fn strength_predicate(#[case] token: &str, #[case] strong: bool) {
        assert_eq!(is_strong_token(token), strong);
    }

    #[test]
    fn generated_tokens_are_strong_and_distinct() {
        let a = generate_strong_token();
        let b = generate_strong_token();
        assert!(is_strong_token(&a));
        assert!(is_strong_token(&b));
        assert_ne!(a, b);
    }
}
