use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::routes::organization::{
    BalanceBody, BalanceResponse, CreateOrganizationBody, CreateOrganizationResponse, MessageResponse,
};

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct OrganizationDoc {
    pub id: i64,
    pub name: String,
    /// Decimal as a string, e.g. "100.50".
    pub rub_balance: String,
    pub video_cut_description_end_sample: String,
    pub publication_text_end_sample: String,
    pub tone_of_voice: Vec<String>,
    pub brand_rules: Vec<String>,
    pub compliance_rules: Vec<String>,
    pub audience_insights: Vec<String>,
    pub products: Vec<serde_json::Value>,
    pub locale: serde_json::Value,
    pub additional_info: Vec<String>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct OrganizationListDoc {
    pub organizations: Vec<OrganizationDoc>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateOrganizationDoc {
    pub organization_id: i64,
    pub name: Option<String>,
    pub video_cut_description_end_sample: Option<String>,
    pub publication_text_end_sample: Option<String>,
    pub tone_of_voice: Option<Vec<String>>,
    pub brand_rules: Option<Vec<String>>,
    pub compliance_rules: Option<Vec<String>>,
    pub audience_insights: Option<Vec<String>>,
    pub products: Option<Vec<serde_json::Value>>,
    pub locale: Option<serde_json::Value>,
    pub additional_info: Option<Vec<String>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::organization::create,
        crate::routes::organization::get_by_id,
        crate::routes::organization::get_all,
        crate::routes::organization::update,
        crate::routes::organization::delete,
        crate::routes::organization::top_up,
        crate::routes::organization::debit,
    ),
    components(
        schemas(
            OrganizationDoc,
            OrganizationListDoc,
            UpdateOrganizationDoc,
            CreateOrganizationBody,
            CreateOrganizationResponse,
            MessageResponse,
            BalanceBody,
            BalanceResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "organization"),
        (name = "balance")
    )
)]
pub struct ApiDoc;
