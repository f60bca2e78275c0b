//! BOM explosion
//!
//! Flattens the current composition of a part type into indented lines with
//! extended quantities, depth-first in item order.

use std::collections::HashSet;

use rust_decimal::Decimal;

use bomgraph_models::{BomItem, ExplosionLine, PartCategory, PartTypeId};
use bomgraph_utils::BomResult;

use crate::resolver;
use crate::store::CompositionGraph;

struct Frame {
    part_type_id: PartTypeId,
    quantity: Decimal,
    level: usize,
    items: std::vec::IntoIter<BomItem>,
}

async fn open_frame<G>(
    graph: &G,
    part_type_id: PartTypeId,
    quantity: Decimal,
    level: usize,
) -> BomResult<Option<Frame>>
where
    G: CompositionGraph + ?Sized,
{
    let items = resolver::current_components(graph, part_type_id).await?;
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(Frame {
        part_type_id,
        quantity,
        level,
        items: items.into_iter(),
    }))
}

/// Explode `part_type_id` for `quantity` units.
///
/// Only components whose category can carry a BOM are descended into. A
/// part already on the current path is listed but not re-entered, and no
/// line deeper than `max_depth` is produced.
pub async fn explode<G>(
    graph: &G,
    part_type_id: PartTypeId,
    quantity: Decimal,
    max_depth: usize,
) -> BomResult<Vec<ExplosionLine>>
where
    G: CompositionGraph + ?Sized,
{
    let mut lines = Vec::new();
    if max_depth == 0 {
        return Ok(lines);
    }

    let mut on_path = HashSet::new();
    let mut stack = Vec::new();
    if let Some(root) = open_frame(graph, part_type_id, quantity, 0).await? {
        on_path.insert(part_type_id);
        stack.push(root);
    }

    while let Some(frame) = stack.last_mut() {
        let Some(item) = frame.items.next() else {
            on_path.remove(&frame.part_type_id);
            stack.pop();
            continue;
        };

        let level = frame.level + 1;
        let extended = item.quantity * frame.quantity;
        let (part_number, part_name, category) = match &item.component {
            Some(c) => (c.part_number.clone(), c.name.clone(), Some(c.category)),
            None => ("Unknown".to_string(), "Unknown".to_string(), None),
        };

        lines.push(ExplosionLine {
            level,
            part_type_id: item.component_part_type_id,
            part_number,
            part_name,
            quantity: extended,
            unit_of_measure: item.unit_of_measure.clone(),
            category: category.unwrap_or(PartCategory::Component),
        });

        let descend = category.map_or(false, |c| c.can_have_bom())
            && level < max_depth
            && !on_path.contains(&item.component_part_type_id);
        if descend {
            if let Some(child) = open_frame(graph, item.component_part_type_id, extended, level).await? {
                on_path.insert(child.part_type_id);
                stack.push(child);
            }
        }
    }

    tracing::debug!(part_type_id, %quantity, lines = lines.len(), "exploded BOM");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::GraphBuilder;

    #[tokio::test]
    async fn quantities_multiply_through_levels() {
        let graph = GraphBuilder::new();
        let bike = graph.part("BIKE").await;
        let wheel = graph.part("WHEEL").await;
        let spoke = graph.raw("SPOKE").await;
        let frame = graph.raw("FRAME").await;
        graph.edge_qty(bike, frame, Decimal::ONE).await;
        graph.edge_qty(bike, wheel, Decimal::from(2)).await;
        graph.edge_qty(wheel, spoke, Decimal::from(32)).await;

        let lines = explode(graph.store(), bike, Decimal::from(3), 10).await.unwrap();
        let summary: Vec<_> = lines
            .iter()
            .map(|l| (l.level, l.part_number.as_str(), l.quantity))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "FRAME", Decimal::from(3)),
                (1, "WHEEL", Decimal::from(6)),
                (2, "SPOKE", Decimal::from(192)),
            ]
        );
        assert_eq!(lines[2].indented_part_number(), "        SPOKE");
    }

    #[tokio::test]
    async fn raw_materials_are_not_descended() {
        let graph = GraphBuilder::new();
        let kit = graph.part("KIT").await;
        let ore = graph.raw("ORE").await;
        let slag = graph.raw("SLAG").await;
        graph.edge(kit, ore).await;
        // A BOM on a raw material written around the catalog rule.
        let header = graph.header(ore, 1, true).await;
        graph.item(header, slag).await;

        let lines = explode(graph.store(), kit, Decimal::ONE, 10).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].part_number, "ORE");
    }

    #[tokio::test]
    async fn cyclic_data_is_listed_once_per_path() {
        let graph = GraphBuilder::new();
        let [a, b] = graph.parts(["A", "B"]).await;
        graph.edge(a, b).await;
        graph.edge(b, a).await;

        let lines = explode(graph.store(), a, Decimal::ONE, 10).await.unwrap();
        let numbers: Vec<_> = lines.iter().map(|l| (l.level, l.part_number.as_str())).collect();
        assert_eq!(numbers, vec![(1, "B"), (2, "A")]);
    }

    #[tokio::test]
    async fn depth_limit_truncates() {
        let graph = GraphBuilder::new();
        let [a, b, c, d] = graph.parts(["A", "B", "C", "D"]).await;
        graph.edge(a, b).await;
        graph.edge(b, c).await;
        graph.edge(c, d).await;

        let lines = explode(graph.store(), a, Decimal::ONE, 2).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.level <= 2));
        assert!(explode(graph.store(), a, Decimal::ONE, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn part_without_bom_explodes_to_nothing() {
        let graph = GraphBuilder::new();
        let p = graph.part("P").await;
        assert!(explode(graph.store(), p, Decimal::ONE, 10).await.unwrap().is_empty());
    }
}
