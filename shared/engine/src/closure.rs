//! Closure Engine
//!
//! Ancestor and descendant closures over the derived composition graph.
//! Both walks use an explicit worklist and an owned visited set; a node is
//! expanded at most once, so inconsistent (cyclic) data still terminates.
//! Every expansion is one round trip to the store.

use std::collections::HashSet;

use bomgraph_models::{PartType, PartTypeId};
use bomgraph_utils::BomResult;

use crate::resolver;
use crate::store::CompositionGraph;

/// One-hop where-used: part types whose current BOM lists `part_type_id`.
pub async fn where_used<G>(graph: &G, part_type_id: PartTypeId) -> BomResult<Vec<PartType>>
where
    G: CompositionGraph + ?Sized,
{
    graph.where_used(part_type_id).await
}

/// Every part type with a composition path down to `part_type_id`.
pub async fn ancestor_ids<G>(graph: &G, part_type_id: PartTypeId) -> BomResult<HashSet<PartTypeId>>
where
    G: CompositionGraph + ?Sized,
{
    let mut ancestors = HashSet::new();
    let mut pending = vec![part_type_id];
    let mut expanded = 0usize;

    while let Some(current) = pending.pop() {
        expanded += 1;
        for parent in graph.where_used(current).await? {
            if ancestors.insert(parent.id) {
                pending.push(parent.id);
            }
        }
    }

    tracing::debug!(part_type_id, expanded, found = ancestors.len(), "ancestor closure");
    Ok(ancestors)
}

/// Every part type reachable from `part_type_id` through current BOMs.
pub async fn descendant_ids<G>(graph: &G, part_type_id: PartTypeId) -> BomResult<HashSet<PartTypeId>>
where
    G: CompositionGraph + ?Sized,
{
    let mut descendants = HashSet::new();
    let mut pending = vec![part_type_id];
    let mut expanded = 0usize;

    while let Some(current) = pending.pop() {
        expanded += 1;
        let Some(header) = resolver::resolve_current(graph, current).await? else {
            continue;
        };
        for component in header.component_ids() {
            if descendants.insert(component) {
                pending.push(component);
            }
        }
    }

    tracing::debug!(part_type_id, expanded, found = descendants.len(), "descendant closure");
    Ok(descendants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::GraphBuilder;

    fn set(ids: &[PartTypeId]) -> HashSet<PartTypeId> {
        ids.iter().copied().collect()
    }

    #[tokio::test]
    async fn closures_follow_chain() {
        let graph = GraphBuilder::new();
        let [a, b, c, d] = graph.parts(["A", "B", "C", "D"]).await;
        graph.edge(a, b).await;
        graph.edge(b, c).await;
        graph.edge(c, d).await;

        assert_eq!(ancestor_ids(graph.store(), d).await.unwrap(), set(&[a, b, c]));
        assert_eq!(ancestor_ids(graph.store(), b).await.unwrap(), set(&[a]));
        assert_eq!(descendant_ids(graph.store(), a).await.unwrap(), set(&[b, c, d]));
        assert!(descendant_ids(graph.store(), d).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn diamond_is_visited_once_per_node() {
        let graph = GraphBuilder::new();
        let [top, left, right, bottom] = graph.parts(["TOP", "LEFT", "RIGHT", "BOTTOM"]).await;
        graph.edge(top, left).await;
        graph.edge(top, right).await;
        graph.edge(left, bottom).await;
        graph.edge(right, bottom).await;

        assert_eq!(ancestor_ids(graph.store(), bottom).await.unwrap(), set(&[top, left, right]));
        assert_eq!(descendant_ids(graph.store(), top).await.unwrap(), set(&[left, right, bottom]));
    }

    #[tokio::test]
    async fn where_used_is_distinct_and_ordered_by_part_number() {
        let graph = GraphBuilder::new();
        let [zeta, alpha, bolt] = graph.parts(["ZETA", "ALPHA", "BOLT"]).await;
        graph.edge(zeta, bolt).await;
        graph.edge(alpha, bolt).await;
        // Same component twice on one BOM still yields one parent.
        let header = graph.current_header(alpha).await;
        graph.item(header, bolt).await;

        let parents: Vec<_> = where_used(graph.store(), bolt)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.part_number)
            .collect();
        assert_eq!(parents, vec!["ALPHA", "ZETA"]);
    }

    #[tokio::test]
    async fn superseded_versions_are_not_edges() {
        let graph = GraphBuilder::new();
        let [parent, old_child, new_child] = graph.parts(["PARENT", "OLD", "NEW"]).await;
        let v1 = graph.header(parent, 1, true).await;
        graph.item(v1, old_child).await;
        let v2 = graph.header(parent, 2, true).await;
        graph.item(v2, new_child).await;

        assert!(where_used(graph.store(), old_child).await.unwrap().is_empty());
        assert!(ancestor_ids(graph.store(), old_child).await.unwrap().is_empty());
        assert_eq!(descendant_ids(graph.store(), parent).await.unwrap(), set(&[new_child]));
    }

    #[tokio::test]
    async fn cyclic_data_terminates() {
        let graph = GraphBuilder::new();
        let [a, b, c] = graph.parts(["A", "B", "C"]).await;
        // Written behind the guard's back.
        graph.edge(a, b).await;
        graph.edge(b, c).await;
        graph.edge(c, a).await;

        assert_eq!(ancestor_ids(graph.store(), a).await.unwrap(), set(&[a, b, c]));
        assert_eq!(descendant_ids(graph.store(), a).await.unwrap(), set(&[a, b, c]));
    }

    #[tokio::test]
    async fn repeated_traversals_agree() {
        let graph = GraphBuilder::new();
        let [a, b, c, d] = graph.parts(["A", "B", "C", "D"]).await;
        graph.edge(a, b).await;
        graph.edge(a, c).await;
        graph.edge(c, d).await;

        let first = descendant_ids(graph.store(), a).await.unwrap();
        let second = descendant_ids(graph.store(), a).await.unwrap();
        assert_eq!(first, second);

        let first = ancestor_ids(graph.store(), d).await.unwrap();
        let second = ancestor_ids(graph.store(), d).await.unwrap();
        assert_eq!(first, second);
    }
}
