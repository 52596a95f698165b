use crate::models::MetricResult;

/// Cut page `page` of `limit` entries out of every sortable metric
///
/// Pages are 1-based. A zero page or limit leaves the result unchanged;
/// a page past the end yields empty metrics.
pub fn page(result: &mut MetricResult, page: usize, limit: usize) {
    if page < 1 || limit < 1 {
        return;
    }

    let start = (page - 1).saturating_mul(limit);
    let end = page.saturating_mul(limit);

    for metric in result.results.iter_mut().filter(|m| m.is_sortable()) {
        let values = &mut metric.data.result;
        if start >= values.len() {
            values.clear();
            continue;
        }
        values.truncate(end.min(values.len()));
        values.drain(..start);
    }

    result.current_page = page;
    result.total_pages = result.total_items.div_ceil(limit);
}
