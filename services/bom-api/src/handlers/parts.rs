//! Part Type Handlers
//!
//! Catalog lookups and the current BOM of a part type.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use bomgraph_models::{BomHeader, PartType, PartTypeId};
use bomgraph_utils::BomError;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/v1/parts/:id
pub async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<Json<PartType>> {
    let part = state
        .engine
        .part_type(id)
        .await?
        .ok_or_else(|| BomError::not_found(format!("Part type {}", id)))?;
    Ok(Json(part))
}

/// GET /api/v1/parts/:id/bom
pub async fn get_part_bom(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<Json<BomHeader>> {
    let bom = state
        .engine
        .get_bom_for_part(id)
        .await?
        .ok_or_else(|| BomError::not_found(format!("BOM for part type {}", id)))?;
    Ok(Json(bom))
}

/// POST /api/v1/parts/:id/bom
pub async fn create_part_bom(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<(StatusCode, Json<BomHeader>)> {
    let bom = state.engine.create_bom(id).await?;
    Ok((StatusCode::CREATED, Json(bom)))
}
