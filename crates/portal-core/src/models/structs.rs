use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::enums::{LayerRole, UserRole};

pub const CARD_TITLE_MAX: usize = 255;
pub const CARD_SUMMARY_MAX: usize = 500;
pub const LAYER_TITLE_MAX: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWithRole {
    pub id: Uuid,
    pub title: String,
    pub role: LayerRole,
    pub created_at: DateTime<Utc>,
}

/// A historical event. Years are negative for BCE; month and day are
/// optional so partially known dates can be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub article: Option<String>,
    pub start_year: i32,
    pub start_month: Option<i32>,
    pub start_day: Option<i32>,
    pub end_year: Option<i32>,
    pub end_month: Option<i32>,
    pub end_day: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardWithLayer {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub start_year: i32,
    pub start_month: Option<i32>,
    pub start_day: Option<i32>,
    pub end_year: Option<i32>,
    pub end_month: Option<i32>,
    pub end_day: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub layer_id: Uuid,
    pub layer_title: String,
    pub role: LayerRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCard {
    pub title: String,
    pub summary: Option<String>,
    pub article: Option<String>,
    pub start_year: i32,
    pub start_month: Option<i32>,
    pub start_day: Option<i32>,
    pub end_year: Option<i32>,
    pub end_month: Option<i32>,
    pub end_day: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CardValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title too long")]
    TitleTooLong,
    #[error("summary too long")]
    SummaryTooLong,
    #[error("month out of range")]
    InvalidMonth,
    #[error("day out of range")]
    InvalidDay,
    #[error("day given without month")]
    DayWithoutMonth,
    #[error("end date given without end year")]
    EndWithoutYear,
    #[error("end date precedes start date")]
    EndBeforeStart,
}

impl NewCard {
    #[must_use]
    pub fn new(title: impl Into<String>, start_year: i32) -> Self {
        Self {
            title: title.into(),
            start_year,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CardValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CardValidationError::EmptyTitle);
        }
        if title.chars().count() > CARD_TITLE_MAX {
            return Err(CardValidationError::TitleTooLong);
        }
        if self
            .summary
            .as_deref()
            .is_some_and(|summary| summary.chars().count() > CARD_SUMMARY_MAX)
        {
            return Err(CardValidationError::SummaryTooLong);
        }
        check_partial_date(self.start_month, self.start_day)?;
        if self.end_year.is_none() && (self.end_month.is_some() || self.end_day.is_some()) {
            return Err(CardValidationError::EndWithoutYear);
        }
        check_partial_date(self.end_month, self.end_day)?;
        if let Some(end_year) = self.end_year {
            let start = (self.start_year, self.start_month.unwrap_or(1), self.start_day.unwrap_or(1));
            let end = (end_year, self.end_month.unwrap_or(12), self.end_day.unwrap_or(31));
            if end < start {
                return Err(CardValidationError::EndBeforeStart);
            }
        }
        Ok(())
    }
}

fn check_partial_date(month: Option<i32>, day: Option<i32>) -> Result<(), CardValidationError> {
    match (month, day) {
        (None, Some(_)) => Err(CardValidationError::DayWithoutMonth),
        (Some(month), _) if !(1..=12).contains(&month) => Err(CardValidationError::InvalidMonth),
        (_, Some(day)) if !(1..=31).contains(&day) => Err(CardValidationError::InvalidDay),
        _ => Ok(()),
    }
}
