use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque product record; no business rules read its keys.
pub type Product = Map<String, Value>;
/// Opaque locale structure.
pub type Locale = Map<String, Value>;

/// Organization (business view). Collections are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub rub_balance: Decimal,
    pub video_cut_description_end_sample: String,
    pub publication_text_end_sample: String,
    pub tone_of_voice: Vec<String>,
    pub brand_rules: Vec<String>,
    pub compliance_rules: Vec<String>,
    pub audience_insights: Vec<String>,
    pub products: Vec<Product>,
    pub locale: Locale,
    pub additional_info: Vec<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl Organization {
    /// A freshly created organization: only `name` given, everything else at its default.
    pub fn new(id: i64, name: impl Into<String>, created_at: DateTime<FixedOffset>) -> Self {
        Self {
            id,
            name: name.into(),
            rub_balance: Decimal::ZERO,
            video_cut_description_end_sample: String::new(),
            publication_text_end_sample: String::new(),
            tone_of_voice: Vec::new(),
            brand_rules: Vec::new(),
            compliance_rules: Vec::new(),
            audience_insights: Vec::new(),
            products: Vec::new(),
            locale: Locale::new(),
            additional_info: Vec::new(),
            created_at,
        }
    }
}

/// Partial update. `None` leaves the stored value alone; `Some` writes it,
/// including `Some(String::new())` / `Some(vec![])`, which clear the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub video_cut_description_end_sample: Option<String>,
    #[serde(default)]
    pub publication_text_end_sample: Option<String>,
    #[serde(default)]
    pub tone_of_voice: Option<Vec<String>>,
    #[serde(default)]
    pub brand_rules: Option<Vec<String>>,
    #[serde(default)]
    pub compliance_rules: Option<Vec<String>>,
    #[serde(default)]
    pub audience_insights: Option<Vec<String>>,
    #[serde(default)]
    pub products: Option<Vec<Product>>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default)]
    pub additional_info: Option<Vec<String>>,
}

impl OrganizationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.video_cut_description_end_sample.is_none()
            && self.publication_text_end_sample.is_none()
            && self.tone_of_voice.is_none()
            && self.brand_rules.is_none()
            && self.compliance_rules.is_none()
            && self.audience_insights.is_none()
            && self.products.is_none()
            && self.locale.is_none()
            && self.additional_info.is_none()
    }

    /// Apply the populated fields to an in-memory organization.
    pub fn apply_to(&self, org: &mut Organization) {
        if let Some(v) = &self.name { org.name = v.clone(); }
        if let Some(v) = &self.video_cut_description_end_sample { org.video_cut_description_end_sample = v.clone(); }
        if let Some(v) = &self.publication_text_end_sample { org.publication_text_end_sample = v.clone(); }
        if let Some(v) = &self.tone_of_voice { org.tone_of_voice = v.clone(); }
        if let Some(v) = &self.brand_rules { org.brand_rules = v.clone(); }
        if let Some(v) = &self.compliance_rules { org.compliance_rules = v.clone(); }
        if let Some(v) = &self.audience_insights { org.audience_insights = v.clone(); }
        if let Some(v) = &self.products { org.products = v.clone(); }
        if let Some(v) = &self.locale { org.locale = v.clone(); }
        if let Some(v) = &self.additional_info { org.additional_info = v.clone(); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Organization {
        Organization::new(1, "Acme", chrono::Utc::now().fixed_offset())
    }

    #[test]
    fn serializes_balance_as_string_and_collections_as_arrays() {
        let mut org = sample();
        org.rub_balance = "100.50".parse().unwrap();
        let v = serde_json::to_value(&org).unwrap();
        assert_eq!(v["rub_balance"], json!("100.50"));
        assert_eq!(v["tone_of_voice"], json!([]));
        assert_eq!(v["locale"], json!({}));
        assert!(v["created_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn absent_and_null_fields_are_not_set() {
        let patch: OrganizationPatch = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn explicit_empty_values_are_set() {
        let patch: OrganizationPatch =
            serde_json::from_value(json!({"brand_rules": [], "publication_text_end_sample": ""})).unwrap();
        assert!(!patch.is_empty());

        let mut org = sample();
        org.brand_rules = vec!["no slang".into()];
        org.publication_text_end_sample = "bye".into();
        org.name = "kept".into();
        patch.apply_to(&mut org);
        assert!(org.brand_rules.is_empty());
        assert_eq!(org.publication_text_end_sample, "");
        assert_eq!(org.name, "kept");
    }
}
