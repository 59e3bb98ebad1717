//! User entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription tier stored on each user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Pro,
}

impl From<&str> for SubscriptionTier {
    // Only an explicit "free" is metered.
    fn from(s: &str) -> Self {
        match s {
            "free" => SubscriptionTier::Free,
            _ => SubscriptionTier::Pro,
        }
    }
}

impl From<SubscriptionTier> for String {
    fn from(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Free => "free".to_string(),
            SubscriptionTier::Pro => "pro".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text", default_value = "free")]
    pub subscription: String,

    #[sea_orm(default_value = 0)]
    pub papers_processed: i32,

    /// Monthly ceiling for free-tier users
    #[sea_orm(default_value = 5)]
    pub papers_limit: i32,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::from(self.subscription.as_str())
    }

    /// Whether this user is metered and has used up the monthly allowance
    pub fn quota_exhausted(&self) -> bool {
        self.tier() == SubscriptionTier::Free && self.papers_processed >= self.papers_limit
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper::Entity")]
    Papers,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Papers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(subscription: &str, processed: i32, limit: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            email: "reader@example.com".to_string(),
            subscription: subscription.to_string(),
            papers_processed: processed,
            papers_limit: limit,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!(SubscriptionTier::from("free"), SubscriptionTier::Free);
        assert_eq!(SubscriptionTier::from("pro"), SubscriptionTier::Pro);
        assert_eq!(String::from(SubscriptionTier::Free), "free");
    }

    #[test]
    fn test_quota_exhausted_at_limit() {
        assert!(!user("free", 4, 5).quota_exhausted());
        assert!(user("free", 5, 5).quota_exhausted());
        assert!(user("free", 9, 5).quota_exhausted());
    }

    #[test]
    fn test_pro_never_exhausted() {
        assert!(!user("pro", 500, 5).quota_exhausted());
    }
}
