// src/models/course.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor_id: i64,

    /// Price in the provider currency, two decimals. Zero means free.
    pub price: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_price))]
    pub price: Decimal,
}

fn validate_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(validator::ValidationError::new("price_cannot_be_negative"));
    }
    if price.normalize().scale() > 2 {
        return Err(validator::ValidationError::new("price_max_two_decimals"));
    }
    Ok(())
}
