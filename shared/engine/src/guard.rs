//! Cycle Guard
//!
//! Decides whether adding `child` as a component of `parent` would close a
//! loop in the composition graph. The guard only reads; committing the edge
//! atomically with the decision is the store's job (`add_item_checked` and
//! the header writes that change which BOM is current).

use serde::{Deserialize, Serialize};

use bomgraph_models::PartTypeId;
use bomgraph_utils::BomResult;

use crate::closure;
use crate::store::CompositionGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleReason {
    /// Parent and child are the same part type.
    SelfReference,
    /// The child already (transitively) uses the parent.
    ChildIsAncestor,
    /// The parent already appears inside the child's own composition.
    ParentIsDescendant,
}

impl std::fmt::Display for CycleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfReference => write!(f, "part cannot contain itself"),
            Self::ChildIsAncestor => write!(f, "component is already an ancestor of the parent"),
            Self::ParentIsDescendant => write!(f, "parent already appears in the component's composition"),
        }
    }
}

/// Why the edge parent→child would be cyclic, or `None` when it is safe.
///
/// Checks run in order: self reference, child among the parent's
/// ancestors (where-used walk), parent among the child's descendants
/// (direct BOM walk). The last two agree on a consistent graph; both run so
/// that partially inconsistent data is still caught.
pub async fn cycle_reason<G>(
    graph: &G,
    parent_part_type_id: PartTypeId,
    child_part_type_id: PartTypeId,
) -> BomResult<Option<CycleReason>>
where
    G: CompositionGraph + ?Sized,
{
    if parent_part_type_id == child_part_type_id {
        return Ok(Some(CycleReason::SelfReference));
    }

    let ancestors = closure::ancestor_ids(graph, parent_part_type_id).await?;
    if ancestors.contains(&child_part_type_id) {
        return Ok(Some(CycleReason::ChildIsAncestor));
    }

    let descendants = closure::descendant_ids(graph, child_part_type_id).await?;
    if descendants.contains(&parent_part_type_id) {
        return Ok(Some(CycleReason::ParentIsDescendant));
    }

    Ok(None)
}

pub async fn would_create_cycle<G>(
    graph: &G,
    parent_part_type_id: PartTypeId,
    child_part_type_id: PartTypeId,
) -> BomResult<bool>
where
    G: CompositionGraph + ?Sized,
{
    let reason = cycle_reason(graph, parent_part_type_id, child_part_type_id).await?;
    if let Some(reason) = reason {
        tracing::warn!(
            parent = parent_part_type_id,
            child = child_part_type_id,
            %reason,
            "composition edge would create a cycle"
        );
    }
    Ok(reason.is_some())
}

/// First component of the part's current BOM that closes a loop, checked
/// against the graph as it stands with that BOM in place.
///
/// Used after a header write changes which header is current: the items of
/// the newly current header become live edges at once, and none of them went
/// through the guard as edges of the current composition.
pub async fn cyclic_component<G>(
    graph: &G,
    part_type_id: PartTypeId,
) -> BomResult<Option<(PartTypeId, CycleReason)>>
where
    G: CompositionGraph + ?Sized,
{
    let Some(header) = graph.header_for_part_type(part_type_id, true).await? else {
        return Ok(None);
    };

    for child in header.component_ids() {
        if let Some(reason) = cycle_reason(graph, part_type_id, child).await? {
            return Ok(Some((child, reason)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::GraphBuilder;

    #[tokio::test]
    async fn self_loop_is_rejected() {
        let graph = GraphBuilder::new();
        let p = graph.part("P").await;

        assert!(would_create_cycle(graph.store(), p, p).await.unwrap());
        assert_eq!(
            cycle_reason(graph.store(), p, p).await.unwrap(),
            Some(CycleReason::SelfReference)
        );
    }

    #[tokio::test]
    async fn direct_two_cycle_is_rejected() {
        let graph = GraphBuilder::new();
        let [a, b] = graph.parts(["A", "B"]).await;
        graph.edge(a, b).await;

        assert!(would_create_cycle(graph.store(), b, a).await.unwrap());
        assert_eq!(
            cycle_reason(graph.store(), b, a).await.unwrap(),
            Some(CycleReason::ChildIsAncestor)
        );
    }

    #[tokio::test]
    async fn transitive_cycle_is_rejected() {
        let graph = GraphBuilder::new();
        let [a, b, c] = graph.parts(["A", "B", "C"]).await;
        graph.edge(a, b).await;
        graph.edge(b, c).await;

        assert!(would_create_cycle(graph.store(), c, a).await.unwrap());
    }

    #[tokio::test]
    async fn disjoint_trees_are_accepted() {
        let graph = GraphBuilder::new();
        let [a, b, c, x, y] = graph.parts(["A", "B", "C", "X", "Y"]).await;
        graph.edge(a, x).await;
        graph.edge(b, y).await;

        assert!(!would_create_cycle(graph.store(), a, b).await.unwrap());
        assert!(!would_create_cycle(graph.store(), b, c).await.unwrap());
        assert!(!would_create_cycle(graph.store(), a, y).await.unwrap());
    }

    #[tokio::test]
    async fn shared_component_is_not_a_cycle() {
        let graph = GraphBuilder::new();
        let [a, b, bolt] = graph.parts(["A", "B", "BOLT"]).await;
        graph.edge(a, bolt).await;
        graph.edge(b, bolt).await;

        assert!(!would_create_cycle(graph.store(), a, b).await.unwrap());
    }

    /// Graph whose where-used index has lost every row.
    struct StaleWhereUsed<'a>(&'a crate::MemoryBomStore);

    #[async_trait::async_trait]
    impl<'a> CompositionGraph for StaleWhereUsed<'a> {
        async fn part_type(&self, id: PartTypeId) -> BomResult<Option<bomgraph_models::PartType>> {
            self.0.part_type(id).await
        }

        async fn header_for_part_type(
            &self,
            part_type_id: PartTypeId,
            active_only: bool,
        ) -> BomResult<Option<bomgraph_models::BomHeader>> {
            self.0.header_for_part_type(part_type_id, active_only).await
        }

        async fn items(&self, header_id: i64) -> BomResult<Vec<bomgraph_models::BomItem>> {
            self.0.items(header_id).await
        }

        async fn where_used(&self, _part_type_id: PartTypeId) -> BomResult<Vec<bomgraph_models::PartType>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn descendant_walk_catches_edges_missing_from_where_used() {
        let graph = GraphBuilder::new();
        let [a, b, c] = graph.parts(["A", "B", "C"]).await;
        graph.edge(b, c).await;
        graph.edge(c, a).await;

        let stale = StaleWhereUsed(graph.store());
        assert_eq!(
            cycle_reason(&stale, a, b).await.unwrap(),
            Some(CycleReason::ParentIsDescendant)
        );
        assert!(!would_create_cycle(&stale, b, a).await.unwrap());
        assert!(!would_create_cycle(graph.store(), b, a).await.unwrap());
    }

    #[tokio::test]
    async fn cyclic_component_checks_every_edge_of_the_current_bom() {
        let graph = GraphBuilder::new();
        let [a, b, c] = graph.parts(["A", "B", "C"]).await;
        graph.edge(a, b).await;

        assert_eq!(cyclic_component(graph.store(), a).await.unwrap(), None);
        assert_eq!(cyclic_component(graph.store(), c).await.unwrap(), None);

        let b_bom = graph.header(b, 1, true).await;
        graph.item(b_bom, c).await;
        graph.item(b_bom, a).await;

        assert_eq!(
            cyclic_component(graph.store(), b).await.unwrap(),
            Some((a, CycleReason::ChildIsAncestor))
        );
    }
}
