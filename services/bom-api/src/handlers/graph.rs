//! Composition Graph Handlers
//!
//! Where-used, closures, explosion and the guarded component insert.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use bomgraph_engine::CycleReason;
use bomgraph_models::{BomItem, ExplosionLine, PartType, PartTypeId};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddComponentRequest {
    pub component_part_type_id: PartTypeId,
    pub quantity: Decimal,
    pub unit_of_measure: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplosionQuery {
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CycleCheckQuery {
    pub parent: PartTypeId,
    pub child: PartTypeId,
}

#[derive(Debug, Serialize)]
pub struct ClosureResponse {
    pub part_type_id: PartTypeId,
    /// Sorted ascending.
    pub part_type_ids: Vec<PartTypeId>,
}

impl ClosureResponse {
    fn new(part_type_id: PartTypeId, ids: HashSet<PartTypeId>) -> Self {
        let mut part_type_ids: Vec<_> = ids.into_iter().collect();
        part_type_ids.sort_unstable();
        Self {
            part_type_id,
            part_type_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CycleCheckResponse {
    pub parent: PartTypeId,
    pub child: PartTypeId,
    pub would_create_cycle: bool,
    pub reason: Option<CycleReason>,
}

/// GET /api/v1/parts/:id/where-used
pub async fn where_used(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<Json<Vec<PartType>>> {
    Ok(Json(state.engine.where_used(id).await?))
}

/// GET /api/v1/parts/:id/ancestors
pub async fn ancestors(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<Json<ClosureResponse>> {
    let ids = state.engine.ancestor_ids(id).await?;
    Ok(Json(ClosureResponse::new(id, ids)))
}

/// GET /api/v1/parts/:id/descendants
pub async fn descendants(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
) -> ApiResult<Json<ClosureResponse>> {
    let ids = state.engine.descendant_ids(id).await?;
    Ok(Json(ClosureResponse::new(id, ids)))
}

/// GET /api/v1/parts/:id/explosion?quantity=
pub async fn explosion(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
    Query(query): Query<ExplosionQuery>,
) -> ApiResult<Json<Vec<ExplosionLine>>> {
    let quantity = query.quantity.unwrap_or(Decimal::ONE);
    Ok(Json(state.engine.explode(id, quantity).await?))
}

/// POST /api/v1/parts/:id/components
pub async fn add_component(
    State(state): State<AppState>,
    Path(id): Path<PartTypeId>,
    Json(request): Json<AddComponentRequest>,
) -> ApiResult<(StatusCode, Json<BomItem>)> {
    let result = state
        .engine
        .try_add_component(
            id,
            request.component_part_type_id,
            request.quantity,
            request.unit_of_measure,
        )
        .await;
    state.metrics.record_insert(&result);
    Ok((StatusCode::CREATED, Json(result?)))
}

/// GET /api/v1/cycle-check?parent=&child=
pub async fn cycle_check(
    State(state): State<AppState>,
    Query(query): Query<CycleCheckQuery>,
) -> ApiResult<Json<CycleCheckResponse>> {
    let reason = state.engine.cycle_reason(query.parent, query.child).await?;
    Ok(Json(CycleCheckResponse {
        parent: query.parent,
        child: query.child,
        would_create_cycle: reason.is_some(),
        reason,
    }))
}
