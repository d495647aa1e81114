use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use service::organization::{Organization, OrganizationPatch};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::errors::ApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationBody {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationResponse {
    pub organization_id: i64,
}

#[derive(Debug, Serialize)]
pub struct OrganizationListResponse {
    pub organizations: Vec<Organization>,
}

/// `organization_id` plus any subset of the editable fields.
#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationBody {
    pub organization_id: i64,
    #[serde(flatten)]
    pub patch: OrganizationPatch,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of the service-to-service balance routes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BalanceBody {
    pub organization_id: i64,
    /// Decimal amount; a JSON number is accepted and kept as written.
    #[serde(alias = "amount", deserialize_with = "string_or_number")]
    pub amount_rub: String,
    pub interserver_secret_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub organization_id: i64,
    pub amount_rub: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("amount must be a string or a number, got {other}"))),
    }
}

#[utoipa::path(post, path = "/create", tag = "organization",
    request_body = CreateOrganizationBody,
    responses((status = 201, description = "Created", body = CreateOrganizationResponse), (status = 500, description = "Store failure")))]
#[instrument(name = "OrganizationController.create", skip(state, body), fields(name = %body.name), err(Display))]
pub async fn create(
    State(state): State<ServerState>,
    Json(body): Json<CreateOrganizationBody>,
) -> Result<(StatusCode, Json<CreateOrganizationResponse>), ApiError> {
    info!("creating organization");
    let organization_id = state.organizations.create(&body.name).await?;
    info!(organization_id, "organization created");
    Ok((StatusCode::CREATED, Json(CreateOrganizationResponse { organization_id })))
}

#[utoipa::path(get, path = "/{organization_id}", tag = "organization",
    params(("organization_id" = i64, Path, description = "Organization id")),
    responses((status = 200, description = "Organization", body = crate::openapi::OrganizationDoc), (status = 404, description = "Not Found")))]
#[instrument(name = "OrganizationController.get_by_id", skip(state), err(Display))]
pub async fn get_by_id(
    State(state): State<ServerState>,
    WithRejection(Path(organization_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Organization>, ApiError> {
    info!("fetching organization");
    let org = state.organizations.get_by_id(organization_id).await?;
    Ok(Json(org))
}

#[utoipa::path(get, path = "/all", tag = "organization",
    responses((status = 200, description = "All organizations, newest first", body = crate::openapi::OrganizationListDoc)))]
#[instrument(name = "OrganizationController.get_all", skip(state), err(Display))]
pub async fn get_all(State(state): State<ServerState>) -> Result<Json<OrganizationListResponse>, ApiError> {
    let organizations = state.organizations.list().await?;
    info!(count = organizations.len(), "organizations listed");
    Ok(Json(OrganizationListResponse { organizations }))
}

#[utoipa::path(put, path = "/", tag = "organization",
    request_body = crate::openapi::UpdateOrganizationDoc,
    responses((status = 200, description = "Updated"), (status = 404, description = "Not Found")))]
#[instrument(name = "OrganizationController.update", skip(state, body), fields(organization_id = body.organization_id), err(Display))]
pub async fn update(
    State(state): State<ServerState>,
    Json(body): Json<UpdateOrganizationBody>,
) -> Result<Json<Value>, ApiError> {
    info!("updating organization");
    state.organizations.update(body.organization_id, &body.patch).await?;
    info!("organization updated");
    Ok(Json(serde_json::json!({})))
}

#[utoipa::path(delete, path = "/{organization_id}", tag = "organization",
    params(("organization_id" = i64, Path, description = "Organization id")),
    responses((status = 200, description = "Deleted", body = MessageResponse), (status = 404, description = "Not Found")))]
#[instrument(name = "OrganizationController.delete", skip(state), err(Display))]
pub async fn delete(
    State(state): State<ServerState>,
    WithRejection(Path(organization_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!("deleting organization");
    state.organizations.delete(organization_id).await?;
    info!("organization deleted");
    Ok(Json(MessageResponse { message: "Organization deleted successfully".into() }))
}

#[utoipa::path(post, path = "/balance/top-up", tag = "balance",
    request_body = BalanceBody,
    responses((status = 200, description = "Balance topped up", body = BalanceResponse),
        (status = 400, description = "Malformed amount"), (status = 403, description = "Invalid interserver secret key"), (status = 404, description = "Not Found")))]
#[instrument(name = "OrganizationController.top_up", skip(state, body), fields(organization_id = body.organization_id), err(Display))]
pub async fn top_up(
    State(state): State<ServerState>,
    Json(body): Json<BalanceBody>,
) -> Result<Json<BalanceResponse>, ApiError> {
    check_interserver_secret(&state, &body.interserver_secret_key, "top_up")?;
    let amount = parse_amount(&body.amount_rub)?;
    info!(%amount, "topping up balance");
    state.organizations.top_up(body.organization_id, amount).await?;
    info!("balance topped up");
    Ok(Json(BalanceResponse { organization_id: body.organization_id, amount_rub: body.amount_rub }))
}

#[utoipa::path(post, path = "/balance/debit", tag = "balance",
    request_body = BalanceBody,
    responses((status = 200, description = "Balance debited", body = BalanceResponse),
        (status = 400, description = "Malformed amount"), (status = 403, description = "Invalid interserver secret key"),
        (status = 404, description = "Not Found"), (status = 409, description = "Insufficient balance")))]
#[instrument(name = "OrganizationController.debit", skip(state, body), fields(organization_id = body.organization_id), err(Display))]
pub async fn debit(
    State(state): State<ServerState>,
    Json(body): Json<BalanceBody>,
) -> Result<Json<BalanceResponse>, ApiError> {
    check_interserver_secret(&state, &body.interserver_secret_key, "debit")?;
    let amount = parse_amount(&body.amount_rub)?;
    info!(%amount, "debiting balance");
    state.organizations.debit(body.organization_id, amount).await?;
    info!("balance debited");
    Ok(Json(BalanceResponse { organization_id: body.organization_id, amount_rub: body.amount_rub }))
}

fn check_interserver_secret(state: &ServerState, provided: &str, operation: &str) -> Result<(), ApiError> {
    if provided != &*state.interserver_secret_key {
        warn!(operation, "invalid interserver secret key");
        return Err(ApiError::InvalidInterserverSecret);
    }
    Ok(())
}

fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw.trim()).map_err(|e| ApiError::BadRequest(format!("invalid amount {raw:?}: {e}")))
}
