use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::errors;

/// Row of the `organizations` table.
///
/// The list / structured columns are nullable here so rows written before the
/// JSONB defaults existed still load; callers turn `None` into empty values.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub rub_balance: String,
    #[sea_orm(column_type = "Text")]
    pub video_cut_description_end_sample: String,
    #[sea_orm(column_type = "Text")]
    pub publication_text_end_sample: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tone_of_voice: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub brand_rules: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub compliance_rules: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub audience_insights: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub products: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub locale: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub additional_info: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert a row carrying only `name`; every other column takes its DB default.
pub async fn create<C: ConnectionTrait>(db: &C, name: &str) -> Result<i64, errors::ModelError> {
    let am = ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };
    let res = Entity::insert(am).exec(db).await?;
    Ok(res.last_insert_id)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// All rows, newest first. `id` breaks ties between rows created in the same instant.
pub async fn list_newest_first<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, errors::ModelError> {
    let rows = Entity::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

/// Write only the columns set on `changes`. Returns affected rows; an
/// unchanged active model issues no statement.
pub async fn update_columns<C: ConnectionTrait>(db: &C, id: i64, changes: ActiveModel) -> Result<u64, errors::ModelError> {
    if !changes.is_changed() {
        return Ok(0);
    }
    let res = Entity::update_many()
        .set(changes)
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub async fn set_balance<C: ConnectionTrait>(db: &C, id: i64, rub_balance: &str) -> Result<u64, errors::ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::RubBalance, Expr::value(rub_balance.to_string()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, errors::ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected)
}
