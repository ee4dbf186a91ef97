//! Synthetic visitor identities.

use serde::{Deserialize, Serialize};

use crate::random::{RandomSource, pick};

const FIRST_NAMES: [&str; 10] = [
    "John", "Jane", "Michael", "Emily", "David", "Sarah", "Robert", "Lisa", "James", "Mary",
];

const LAST_NAMES: [&str; 10] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];

const CITIES: [&str; 5] = ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"];

const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%";

pub const PASSWORD_LEN: usize = 12;

/// A made-up visitor. Uniqueness across calls is not guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeIdentity {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub phone: String,
    pub age: u8,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
}

impl FakeIdentity {
    /// Draw a fresh identity from `rng`.
    pub fn generate(rng: &dyn RandomSource) -> Self {
        let first_name = *pick(rng, &FIRST_NAMES);
        let last_name = *pick(rng, &LAST_NAMES);
        let suffix = rng.between(0, 9999);
        let first = first_name.to_lowercase();
        let last = last_name.to_lowercase();

        Self {
            username: format!("{first}{last}{suffix}"),
            email: format!("{first}.{last}{suffix}@example.com"),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: random_password(rng),
            phone: phone_number(rng),
            age: rng.between(18, 67) as u8,
            address: format!("{} Main St", rng.between(0, 9998)),
            city: pick(rng, &CITIES).to_string(),
            country: "United States".to_string(),
            zip_code: rng.between(10_000, 99_999).to_string(),
        }
    }
}

/// 12 characters from mixed case letters, digits and `!@#$%`.
pub fn random_password(rng: &dyn RandomSource) -> String {
    (0..PASSWORD_LEN)
        .map(|_| char::from(*pick(rng, PASSWORD_ALPHABET)))
        .collect()
}

/// `+1` followed by ten digits, the first non-zero.
pub fn phone_number(rng: &dyn RandomSource) -> String {
    format!("+1{}", rng.between(1_000_000_000, 9_999_999_999))
}
