use rand::Rng;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SPECIALS: &str = "!£$%&*;:@~#<>,./?";

/// Random string of `length` letters and digits, plus punctuation when
/// `special` is set
pub fn random_string(length: usize, special: bool) -> String {
    let mut alphabet: Vec<char> = NUMBERS.chars().chain(LETTERS.chars()).collect();
    if special {
        alphabet.extend(SPECIALS.chars());
    }

    let mut rng = rand::rng();
    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

/// Random string of decimal digits (login codes)
pub fn random_digits(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string_alphanumeric() {
        let value = random_string(20, false);
        assert_eq!(value.chars().count(), 20);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_string_with_specials_stays_in_alphabet() {
        let value = random_string(500, true);
        assert_eq!(value.chars().count(), 500);
        assert!(value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c)));
    }

    #[test]
    fn test_random_digits() {
        let code = random_digits(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(random_digits(0), "");
    }
}
