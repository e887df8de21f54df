use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::UserId;
use crate::domain::review::{Review, ReviewId, StarRating};
use crate::flows::FlowTransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackState {
    Rating,
    Details,
    Submitted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackEvent {
    RateService(u8),
    CommentSubmitted(String),
    ImagesAttached(Vec<String>),
    Finish,
}

impl FeedbackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RateService(_) => "rate_service",
            Self::CommentSubmitted(_) => "comment_submitted",
            Self::ImagesAttached(_) => "images_attached",
            Self::Finish => "finish",
        }
    }
}

/// What the interaction layer should do after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackAction {
    RenderDetails,
    Finalize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackTransition {
    pub from: FeedbackState,
    pub to: FeedbackState,
    pub action: FeedbackAction,
}

/// Rating panel state for one closed ticket, owned by the ticket's requester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSession {
    pub reviewer_id: UserId,
    pub reviewer_name: String,
    pub ticket: String,
    pub staff: String,
    pub state: FeedbackState,
    pub stars: Option<StarRating>,
    pub comment: Option<String>,
    pub images: Vec<String>,
}

impl FeedbackSession {
    pub fn new(
        reviewer_id: UserId,
        reviewer_name: impl Into<String>,
        ticket: impl Into<String>,
        staff: impl Into<String>,
    ) -> Self {
        Self {
            reviewer_id,
            reviewer_name: reviewer_name.into(),
            ticket: ticket.into(),
            staff: staff.into(),
            state: FeedbackState::Rating,
            stars: None,
            comment: None,
            images: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: FeedbackEvent) -> Result<FeedbackTransition, FlowTransitionError> {
        let from = self.state;
        let name = event.name();

        let (to, action) = match (from, event) {
            (FeedbackState::Rating, FeedbackEvent::RateService(value)) => {
                let stars =
                    StarRating::new(value).map_err(|_| FlowTransitionError::RatingOutOfRange(value))?;
                self.stars = Some(stars);
                self.comment = None;
                self.images.clear();
                (FeedbackState::Details, FeedbackAction::RenderDetails)
            }
            (FeedbackState::Details, FeedbackEvent::CommentSubmitted(text)) => {
                let text = text.trim();
                self.comment = (!text.is_empty()).then(|| text.to_owned());
                (FeedbackState::Details, FeedbackAction::RenderDetails)
            }
            (FeedbackState::Details, FeedbackEvent::ImagesAttached(urls)) => {
                self.images.extend(urls);
                (FeedbackState::Details, FeedbackAction::RenderDetails)
            }
            (FeedbackState::Details, FeedbackEvent::Finish) => {
                (FeedbackState::Submitted, FeedbackAction::Finalize)
            }
            (state, _) => {
                return Err(FlowTransitionError::InvalidFeedbackEvent { state, event: name });
            }
        };

        self.state = to;
        Ok(FeedbackTransition { from, to, action })
    }

    /// Returns a submitted session to `Details` when its review could not be stored.
    pub fn reopen(&mut self) -> bool {
        if self.state != FeedbackState::Submitted {
            return false;
        }
        self.state = FeedbackState::Details;
        true
    }

    pub fn has_comment(&self) -> bool {
        self.comment.is_some()
    }

    /// Builds the stored record once a rating has been chosen.
    pub fn to_review(&self, id: ReviewId, created_at: DateTime<Utc>) -> Option<Review> {
        let stars = self.stars?;
        Some(Review {
            id,
            reviewer_id: self.reviewer_id,
            reviewer_name: self.reviewer_name.clone(),
            stars,
            comment: self.comment.clone(),
            images: self.images.clone(),
            staff: self.staff.clone(),
            ticket: self.ticket.clone(),
            created_at,
        })
    }
}

/// Clips free text to at most `max_chars` characters.
pub fn clip_comment(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
