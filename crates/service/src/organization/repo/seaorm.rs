use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, NotSet, Set};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::ServiceError;
use crate::organization::domain::{Organization, OrganizationPatch};
use crate::organization::repository::OrganizationRepository;
use models::organization;

/// SeaORM-backed repository implementation.
pub struct SeaOrmOrganizationRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmOrganizationRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait::async_trait]
impl OrganizationRepository for SeaOrmOrganizationRepository {
    #[instrument(name = "OrganizationRepo.create", skip(self), err)]
    async fn create(&self, name: &str) -> Result<i64, ServiceError> {
        Ok(organization::create(&self.db, name).await?)
    }

    #[instrument(name = "OrganizationRepo.get_by_id", skip(self), err)]
    async fn get_by_id(&self, id: i64) -> Result<Option<Organization>, ServiceError> {
        organization::find_by_id(&self.db, id)
            .await?
            .map(to_domain)
            .transpose()
    }

    #[instrument(name = "OrganizationRepo.list", skip(self), err)]
    async fn list(&self) -> Result<Vec<Organization>, ServiceError> {
        organization::list_newest_first(&self.db)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    #[instrument(name = "OrganizationRepo.update", skip(self, patch), err)]
    async fn update(&self, id: i64, patch: &OrganizationPatch) -> Result<(), ServiceError> {
        if patch.is_empty() {
            return Ok(());
        }
        let changes = to_active_model(patch)?;
        organization::update_columns(&self.db, id, changes).await?;
        Ok(())
    }

    #[instrument(name = "OrganizationRepo.set_balance", skip(self), err)]
    async fn set_balance(&self, id: i64, rub_balance: &str) -> Result<(), ServiceError> {
        organization::set_balance(&self.db, id, rub_balance).await?;
        Ok(())
    }

    #[instrument(name = "OrganizationRepo.delete", skip(self), err)]
    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let affected = organization::delete(&self.db, id).await?;
        if affected == 0 {
            warn!(organization_id = id, "delete matched no rows");
        }
        Ok(())
    }
}

fn to_domain(row: organization::Model) -> Result<Organization, ServiceError> {
    let rub_balance = Decimal::from_str(row.rub_balance.trim())
        .map_err(|e| ServiceError::Db(format!("organization {} has a corrupt balance {:?}: {}", row.id, row.rub_balance, e)))?;
    Ok(Organization {
        id: row.id,
        name: row.name,
        rub_balance,
        video_cut_description_end_sample: row.video_cut_description_end_sample,
        publication_text_end_sample: row.publication_text_end_sample,
        tone_of_voice: from_json(row.id, "tone_of_voice", row.tone_of_voice)?,
        brand_rules: from_json(row.id, "brand_rules", row.brand_rules)?,
        compliance_rules: from_json(row.id, "compliance_rules", row.compliance_rules)?,
        audience_insights: from_json(row.id, "audience_insights", row.audience_insights)?,
        products: from_json(row.id, "products", row.products)?,
        locale: from_json(row.id, "locale", row.locale)?,
        additional_info: from_json(row.id, "additional_info", row.additional_info)?,
        created_at: row.created_at,
    })
}

/// NULL reads back as the empty value of the target type.
fn from_json<T: DeserializeOwned + Default>(id: i64, column: &str, value: Option<Value>) -> Result<T, ServiceError> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v)
            .map_err(|e| ServiceError::Db(format!("organization {id}: column {column} is malformed: {e}"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Option<Value>, ServiceError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| ServiceError::Validation(e.to_string()))
}

fn to_active_model(patch: &OrganizationPatch) -> Result<organization::ActiveModel, ServiceError> {
    let mut am = organization::ActiveModel {
        id: NotSet,
        ..Default::default()
    };
    if let Some(v) = &patch.name { am.name = Set(v.clone()); }
    if let Some(v) = &patch.video_cut_description_end_sample { am.video_cut_description_end_sample = Set(v.clone()); }
    if let Some(v) = &patch.publication_text_end_sample { am.publication_text_end_sample = Set(v.clone()); }
    if let Some(v) = &patch.tone_of_voice { am.tone_of_voice = Set(to_json(v)?); }
    if let Some(v) = &patch.brand_rules { am.brand_rules = Set(to_json(v)?); }
    if let Some(v) = &patch.compliance_rules { am.compliance_rules = Set(to_json(v)?); }
    if let Some(v) = &patch.audience_insights { am.audience_insights = Set(to_json(v)?); }
    if let Some(v) = &patch.products { am.products = Set(to_json(v)?); }
    if let Some(v) = &patch.locale { am.locale = Set(to_json(v)?); }
    if let Some(v) = &patch.additional_info { am.additional_info = Set(to_json(v)?); }
    Ok(am)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use sea_orm::ActiveValue;
    use serde_json::json;

    #[test]
    fn patch_maps_only_present_fields() {
        let patch = OrganizationPatch {
            name: Some("renamed".into()),
            locale: Some(serde_json::from_value(json!({"language": "ru"})).unwrap()),
            ..Default::default()
        };
        let am = to_active_model(&patch).unwrap();
        assert_eq!(am.name, ActiveValue::Set("renamed".to_string()));
        assert_eq!(am.locale, ActiveValue::Set(Some(json!({"language": "ru"}))));
        assert!(matches!(am.brand_rules, ActiveValue::NotSet));
        assert!(matches!(am.rub_balance, ActiveValue::NotSet));
    }

    #[test]
    fn null_json_columns_read_back_empty() {
        let rules: Vec<String> = from_json(1, "brand_rules", None).unwrap();
        assert!(rules.is_empty());
        let locale: crate::organization::domain::Locale = from_json(1, "locale", Some(Value::Null)).unwrap();
        assert!(locale.is_empty());
    }

    #[test]
    fn malformed_json_column_is_a_store_failure() {
        let res: Result<Vec<String>, _> = from_json(7, "tone_of_voice", Some(json!({"not": "a list"})));
        assert!(matches!(res, Err(ServiceError::Db(_))));
    }

    #[tokio::test]
    async fn seaorm_repository_roundtrip() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let repo = SeaOrmOrganizationRepository::new(db);

        let id = repo.create("Roundtrip").await?;
        let created = repo.get_by_id(id).await?.expect("created row");
        assert_eq!(created.rub_balance, Decimal::ZERO);
        assert!(created.products.is_empty());
        assert!(created.locale.is_empty());

        let patch = OrganizationPatch {
            tone_of_voice: Some(vec!["friendly".into()]),
            products: Some(vec![serde_json::from_value(json!({"name": "Widget", "price": "9.99"})).unwrap()]),
            ..Default::default()
        };
        repo.update(id, &patch).await?;
        repo.update(id, &OrganizationPatch::default()).await?;
        repo.set_balance(id, "42.10").await?;

        let after = repo.get_by_id(id).await?.expect("updated row");
        assert_eq!(after.name, "Roundtrip");
        assert_eq!(after.tone_of_voice, vec!["friendly".to_string()]);
        assert_eq!(after.products[0]["name"], json!("Widget"));
        assert_eq!(after.rub_balance.to_string(), "42.10");

        repo.delete(id).await?;
        assert!(repo.get_by_id(id).await?.is_none());
        repo.delete(id).await?;
        Ok(())
    }
}
