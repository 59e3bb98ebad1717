//! Paper entity

use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// Category assigned when none is given
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user, immutable after creation
    #[sea_orm(indexed)]
    pub user_id: Uuid,

    /// Filename with its extension stripped
    #[sea_orm(column_type = "Text")]
    pub filename: String,

    #[sea_orm(column_type = "Text")]
    pub original_name: String,

    #[sea_orm(column_type = "Text")]
    pub explanation: String,

    #[sea_orm(column_type = "Text")]
    pub age_level: String,

    #[sea_orm(default_value = false, indexed)]
    pub is_public: bool,

    #[sea_orm(column_type = "Text", default_value = "General")]
    pub category: String,

    pub created_at: DateTimeWithTimeZone,
}

// Join path only: no foreign key is created, and papers outlive their owner row.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Entity::belongs_to(super::user::Entity)
            .from(Column::UserId)
            .to(super::user::Column::Id)
            .into()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Paper projection without the explanation body
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct PaperSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub age_level: String,
    pub is_public: bool,
    pub category: String,
    pub created_at: DateTimeWithTimeZone,
}

impl From<&Model> for PaperSummary {
    fn from(paper: &Model) -> Self {
        Self {
            id: paper.id,
            user_id: paper.user_id,
            filename: paper.filename.clone(),
            original_name: paper.original_name.clone(),
            age_level: paper.age_level.clone(),
            is_public: paper.is_public,
            category: paper.category.clone(),
            created_at: paper.created_at,
        }
    }
}

/// Columns selected for [`PaperSummary`]
pub fn summary_columns() -> [Column; 8] {
    [
        Column::Id,
        Column::UserId,
        Column::Filename,
        Column::OriginalName,
        Column::AgeLevel,
        Column::IsPublic,
        Column::Category,
        Column::CreatedAt,
    ]
}
