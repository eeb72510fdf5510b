//! Participants are not stored on their own: a participant is the normalized
//! email used as key by lists, expenses and settlements.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// A normalized (NFKC, trimmed, lower-cased) email.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    /// Normalizes `raw` without checking the email shape.
    pub fn new(raw: &str) -> Self {
        Self(normalize_email(raw))
    }

    /// Normalizes `raw` and rejects values that are not an email address.
    pub fn parse(raw: &str) -> ResultEngine<Self> {
        let participant = Self::new(raw);
        if !is_valid_email(participant.as_str()) {
            return Err(EngineError::Validation(format!(
                "invalid email: {}",
                raw.trim()
            )));
        }
        Ok(participant)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Participant {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Participant {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

/// `local@host.tld`, with the character classes accepted by the sharing form.
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = (2..=64).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}
