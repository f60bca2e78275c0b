//! BOM Handlers
//!
//! Header metadata and item maintenance by BOM and item id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bomgraph_models::{
    BomHeader, BomHeaderId, BomHeaderUpdate, BomItem, BomItemId, BomItemUpdate, NewBomItem,
    PartTypeId,
};
use bomgraph_utils::BomError;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveBomRequest {
    pub version: i32,
    pub is_active: bool,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub component_part_type_id: PartTypeId,
    pub quantity: Decimal,
    pub unit_of_measure: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub sequence: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearItemsResponse {
    pub bom_id: BomHeaderId,
    pub removed: u64,
}

/// GET /api/v1/boms/:id
pub async fn get_bom(
    State(state): State<AppState>,
    Path(id): Path<BomHeaderId>,
) -> ApiResult<Json<BomHeader>> {
    let bom = state
        .engine
        .get_bom(id)
        .await?
        .ok_or_else(|| BomError::not_found(format!("BOM {}", id)))?;
    Ok(Json(bom))
}

/// PUT /api/v1/boms/:id
pub async fn save_bom(
    State(state): State<AppState>,
    Path(id): Path<BomHeaderId>,
    Json(request): Json<SaveBomRequest>,
) -> ApiResult<Json<BomHeader>> {
    let update = BomHeaderUpdate {
        id,
        version: request.version,
        is_active: request.is_active,
        effective_date: request.effective_date,
        expiration_date: request.expiration_date,
    };
    Ok(Json(state.engine.save_bom(update).await?))
}

/// DELETE /api/v1/boms/:id
pub async fn delete_bom(
    State(state): State<AppState>,
    Path(id): Path<BomHeaderId>,
) -> ApiResult<StatusCode> {
    state.engine.delete_bom(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/boms/:id/items
pub async fn add_bom_item(
    State(state): State<AppState>,
    Path(id): Path<BomHeaderId>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<BomItem>)> {
    let unit = request
        .unit_of_measure
        .unwrap_or_else(|| state.engine.config().default_unit_of_measure.clone());
    let mut item = NewBomItem::new(request.component_part_type_id, request.quantity).with_unit(unit);
    item.notes = request.notes;

    let result = state.engine.add_item(id, item).await;
    state.metrics.record_insert(&result);
    Ok((StatusCode::CREATED, Json(result?)))
}

/// DELETE /api/v1/boms/:id/items
pub async fn clear_bom_items(
    State(state): State<AppState>,
    Path(id): Path<BomHeaderId>,
) -> ApiResult<Json<ClearItemsResponse>> {
    let removed = state.engine.clear_items(id).await?;
    Ok(Json(ClearItemsResponse { bom_id: id, removed }))
}

/// PUT /api/v1/items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<BomItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .update_item(BomItemUpdate {
            id,
            quantity: request.quantity,
            unit_of_measure: request.unit_of_measure,
            sequence: request.sequence,
            notes: request.notes,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<BomItemId>,
) -> ApiResult<StatusCode> {
    state.engine.remove_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
