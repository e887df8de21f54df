use std::fmt;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::ids::UserId;
use crate::errors::DomainError;

pub const REVIEW_ID_BODY_LEN: usize = 7;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl ReviewId {
    /// `#` followed by seven ASCII alphanumerics.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let body: String =
            rng.sample_iter(&Alphanumeric).take(REVIEW_ID_BODY_LEN).map(char::from).collect();
        Self(format!("#{body}"))
    }

    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix('#')
            .map(|body| {
                body.len() == REVIEW_ID_BODY_LEN && body.chars().all(|ch| ch.is_ascii_alphanumeric())
            })
            .unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvariantViolation(format!(
                "star rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn tone(self) -> RatingTone {
        match self.0 {
            5 => RatingTone::Success,
            3 | 4 => RatingTone::Neutral,
            _ => RatingTone::Alert,
        }
    }
}

impl TryFrom<u8> for StarRating {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StarRating> for u8 {
    fn from(value: StarRating) -> Self {
        value.0
    }
}

/// Colour family of the posted review summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingTone {
    Success,
    Neutral,
    Alert,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub reviewer_id: UserId,
    pub reviewer_name: String,
    pub stars: StarRating,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub staff: String,
    pub ticket: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn comment_or_placeholder(&self) -> &str {
        self.comment.as_deref().filter(|text| !text.trim().is_empty()).unwrap_or("No comment")
    }
}
