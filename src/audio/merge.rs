use super::Interval;

/// Fuse consecutive intervals whose gap is at most `join_secs`.
///
/// Input is expected in start order, as subtitles appear in a document.
/// A merged interval keeps the later of the two ends, so an interval nested
/// inside the current one never shortens it.
pub fn merge_intervals<I>(intervals: I, join_secs: f64) -> Vec<Interval>
where
    I: IntoIterator<Item = Interval>,
{
    let mut merged = Vec::new();
    let mut intervals = intervals.into_iter();

    let Some(mut current) = intervals.next() else {
        return merged;
    };

    for next in intervals {
        let gap = next.start - current.end;

        if gap <= join_secs {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }

    merged.push(current);
    merged
}
