use crate::types::{Segment, SegmentationStats};

/// Keep segments with `area >= min_area`, preserving order
pub fn filter_by_min_area(segments: &[Segment], min_area: usize) -> Vec<Segment> {
    segments
        .iter()
        .filter(|segment| segment.area >= min_area)
        .cloned()
        .collect()
}

/// Largest first. Equal areas keep their relative order.
pub fn sort_by_area_descending(segments: &[Segment]) -> Vec<Segment> {
    let mut sorted = segments.to_vec();
    sort_in_place_by_area_descending(&mut sorted);
    sorted
}

pub(crate) fn sort_in_place_by_area_descending(segments: &mut [Segment]) {
    // `sort_by` is stable
    segments.sort_by(|a, b| b.area.cmp(&a.area));
}

/// Count, total, rounded mean and extremes of the segment areas.
/// An empty list yields all zeros.
pub fn compute_stats(segments: &[Segment]) -> SegmentationStats {
    let Some(first) = segments.first() else {
        return SegmentationStats::default();
    };

    let mut largest = first;
    let mut smallest = first;
    let mut total_area = 0usize;

    for segment in segments {
        total_area += segment.area;
        if segment.area > largest.area {
            largest = segment;
        }
        if segment.area < smallest.area {
            smallest = segment;
        }
    }

    let count = segments.len();

    SegmentationStats {
        count,
        total_area,
        average_area: rounded_mean(total_area, count),
        max_area: largest.area,
        min_area: smallest.area,
        largest_id: Some(largest.id),
        smallest_id: Some(smallest.id),
    }
}

/// Integer mean rounded half up
fn rounded_mean(total: usize, count: usize) -> usize {
    (2 * total + count) / (2 * count)
}
