//! SeaORM entity models
//!
//! Database entities for Resplain

mod paper;
mod user;

pub use paper::{
    summary_columns as paper_summary_columns, ActiveModel as PaperActiveModel,
    Column as PaperColumn, Entity as PaperEntity, Model as Paper, PaperSummary, DEFAULT_CATEGORY,
};

pub use user::{Column as UserColumn, Entity as UserEntity, Model as User, SubscriptionTier};
