//! Composition Resolver
//!
//! Selects the single "current" header of a part type. The same rule backs
//! the descendant walk and the where-used query, so both cycle-guard
//! directions see one graph.

use bomgraph_models::{BomHeader, BomItem, PartTypeId};
use bomgraph_utils::BomResult;

use crate::store::CompositionGraph;

/// Resolve the header with the greatest version, optionally restricted to
/// active headers. Pure selection over the store; no traversal.
pub async fn resolve<G>(
    graph: &G,
    part_type_id: PartTypeId,
    active_only: bool,
) -> BomResult<Option<BomHeader>>
where
    G: CompositionGraph + ?Sized,
{
    let header = graph.header_for_part_type(part_type_id, active_only).await?;
    tracing::trace!(
        part_type_id,
        active_only,
        resolved = ?header.as_ref().map(|h| (h.id, h.version)),
        "resolved composition"
    );
    Ok(header)
}

/// The current composition: highest active version.
pub async fn resolve_current<G>(graph: &G, part_type_id: PartTypeId) -> BomResult<Option<BomHeader>>
where
    G: CompositionGraph + ?Sized,
{
    resolve(graph, part_type_id, true).await
}

/// Items of the current composition; empty when the part has no BOM.
pub async fn current_components<G>(graph: &G, part_type_id: PartTypeId) -> BomResult<Vec<BomItem>>
where
    G: CompositionGraph + ?Sized,
{
    Ok(resolve_current(graph, part_type_id)
        .await?
        .map(|header| header.items)
        .unwrap_or_default())
}
