//! Synthetic and fixed test data

use std::path::Path;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

const MASK_CHAR: char = '*';

/// Minimum generated password length.
const MIN_PASSWORD_LEN: usize = 12;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*?-_";

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bram", "Clara", "Dmitri", "Elena", "Farid", "Greta", "Hugo", "Ines", "Jonas",
    "Katya", "Luca", "Mara", "Nils", "Olga", "Priya", "Quinn", "Rosa", "Sven", "Tessa",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Bergman", "Castillo", "Duarte", "Eriksen", "Fontaine", "Gallo", "Hartmann",
    "Ivanov", "Jensen", "Kowalski", "Lindqvist", "Moreau", "Novak", "Okafor", "Petrov",
];

/// Gender drawn uniformly for generated users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// A synthetic user record, produced fresh per test invocation.
///
/// No persistence and no uniqueness guarantee beyond the generator's
/// randomness; email/mobile collisions are acceptably rare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTestData {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    /// ISO date, e.g. `1987-04-12`
    pub dob: String,
    pub mobile: String,
    pub gender: Gender,
}

/// Generate a user with independently randomized fields.
pub fn generate_random_user() -> UserTestData {
    let mut rng = rand::thread_rng();

    let first = *FIRST_NAMES.choose(&mut rng).unwrap_or(&FIRST_NAMES[0]);
    let last = *LAST_NAMES.choose(&mut rng).unwrap_or(&LAST_NAMES[0]);
    let suffix: String = (0..8)
        .map(|_| LOWER[rng.gen_range(0..LOWER.len())] as char)
        .collect();
    let email = format!(
        "{}.{}.{}@example.test",
        first.to_lowercase(),
        last.to_lowercase(),
        suffix
    );

    let password = generate_password(&mut rng, MIN_PASSWORD_LEN);

    let year = rng.gen_range(1960..=2002);
    let month = rng.gen_range(1..=12);
    let day = rng.gen_range(1..=28);
    let dob = NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1990-01-01".to_string());

    let mobile: String = std::iter::once('7')
        .chain((0..9).map(|_| DIGITS[rng.gen_range(0..DIGITS.len())] as char))
        .collect();

    let gender = if rng.gen_bool(0.5) {
        Gender::Male
    } else {
        Gender::Female
    };

    UserTestData {
        email,
        confirm_password: password.clone(),
        password,
        first_name: first.to_string(),
        last_name: last.to_string(),
        display_name: format!("{first} {last}"),
        dob,
        mobile,
        gender,
    }
}

/// Generate a password of at least `len` characters containing at least one
/// uppercase letter, one lowercase letter, one digit and one symbol, then
/// shuffled so the class positions are not predictable.
fn generate_password(rng: &mut impl Rng, len: usize) -> String {
    let len = len.max(MIN_PASSWORD_LEN);
    let pool: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = vec![
        UPPER[rng.gen_range(0..UPPER.len())],
        LOWER[rng.gen_range(0..LOWER.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        SYMBOLS[rng.gen_range(0..SYMBOLS.len())],
    ];
    while chars.len() < len {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(rng);

    chars.into_iter().map(|b| b as char).collect()
}

/// The canonical valid user from the fixed data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

/// One invalid-credential case with its expected error classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidCredentialCase {
    pub email: String,
    pub password: String,
    pub expected_error: String,
    #[serde(default)]
    pub description: String,
}

/// Contents of the fixed-user fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedUsers {
    pub valid: FixedUser,
    #[serde(default)]
    pub invalid: Vec<InvalidCredentialCase>,
}

/// Load the fixed-user fixture. A missing file is surfaced as
/// [`HarnessError::DataNotFound`]; silently proceeding with empty test data
/// would produce misleading passes.
pub fn load_fixed_users(path: &Path) -> Result<FixedUsers> {
    if !path.exists() {
        return Err(HarnessError::DataNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Mask all but the last `visible` characters of `value`.
///
/// For log output only, never for comparison logic. When `visible` covers
/// the whole value everything is masked; revealing the full secret on a
/// caller bug is the worse failure.
pub fn mask_sensitive(value: &str, visible: usize) -> String {
    let len = value.chars().count();
    if len == 0 {
        return String::new();
    }
    let keep = if visible >= len { 0 } else { visible };
    let masked: String = std::iter::repeat(MASK_CHAR).take(len - keep).collect();
    let tail: String = value.chars().skip(len - keep).collect();
    format!("{masked}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn satisfies_policy(pw: &str) -> bool {
        pw.len() >= MIN_PASSWORD_LEN
            && pw.chars().any(|c| c.is_ascii_uppercase())
            && pw.chars().any(|c| c.is_ascii_lowercase())
            && pw.chars().any(|c| c.is_ascii_digit())
            && pw.chars().any(|c| SYMBOLS.contains(&(c as u8)))
    }

    #[test]
    fn generated_passwords_satisfy_policy() {
        for _ in 0..200 {
            let user = generate_random_user();
            assert!(
                satisfies_policy(&user.password),
                "policy violation: {}",
                user.password
            );
            assert_eq!(user.password, user.confirm_password);
        }
    }

    #[test]
    fn generated_emails_are_distinct() {
        let emails: HashSet<String> = (0..100).map(|_| generate_random_user().email).collect();
        assert_eq!(emails.len(), 100);
    }

    #[test]
    fn generated_user_has_plausible_fields() {
        let user = generate_random_user();
        assert!(user.email.contains('@'));
        assert_eq!(user.mobile.len(), 10);
        assert!(user.mobile.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(user.dob.len(), 10);
        assert!(user.display_name.contains(&user.first_name));
    }

    #[test]
    fn mask_keeps_only_the_tail() {
        assert_eq!(mask_sensitive("secretvalue1234", 4), "***********1234");
        assert_eq!(mask_sensitive("secretvalue1234", 4).len(), 15);
    }

    #[test]
    fn mask_never_reveals_everything() {
        assert_eq!(mask_sensitive("abc", 10), "***");
        assert_eq!(mask_sensitive("", 4), "");
        assert_eq!(mask_sensitive("abcd", 0), "****");
    }

    #[test]
    fn missing_fixture_file_is_data_not_found() {
        let err = load_fixed_users(Path::new("/nonexistent/users.json")).unwrap_err();
        assert!(matches!(err, HarnessError::DataNotFound { .. }));
    }

    #[test]
    fn fixture_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{
                "valid": { "email": "qa@example.test", "password": "Pw!234567890" },
                "invalid": [
                    { "email": "qa@example.test", "password": "nope", "expected_error": "invalid_credentials" }
                ]
            }"#,
        )
        .unwrap();

        let users = load_fixed_users(&path).unwrap();
        assert_eq!(users.valid.email, "qa@example.test");
        assert_eq!(users.invalid.len(), 1);
        assert_eq!(users.invalid[0].expected_error, "invalid_credentials");
    }
}
