use crate::strokes::path::DrawingPath;

/// Sort strokes into reading order: by first point's row, then column.
///
/// The sort is stable, so strokes starting on the same pixel keep their extraction order.
pub fn order_strokes(mut paths: Vec<DrawingPath>) -> Vec<DrawingPath> {
    paths.sort_by_key(|p| {
        let first = p.first();
        (first.y, first.x)
    });
    paths
}

#[cfg(test)]
#[path = "../../tests/unit/strokes/order.rs"]
mod tests;
