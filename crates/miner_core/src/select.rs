use chrono::Duration;

use crate::{JobHandle, JobRecord, WriterType};

/// Two imports this close together are treated as one import batch.
pub const SIBLING_WINDOW_SECS: i64 = 60;

/// Picks the job mining should target.
///
/// A raw import yields a `mork` store and a `networkx` view a few seconds
/// apart; a request for the store is redirected to its `networkx` sibling
/// when one exists. Without a usable request the most recent `networkx`
/// import wins, then the first entry.
pub fn select_active_job(history: &[JobRecord], requested: Option<&str>) -> Option<JobHandle> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());
    if let Some(matched) =
        requested.and_then(|id| history.iter().find(|record| record.job_id.as_str() == id))
    {
        if matched.writer_type != WriterType::Mork {
            return Some(matched.job_id.clone());
        }
        let sibling = networkx_sibling(history, matched);
        return Some(sibling.unwrap_or(matched).job_id.clone());
    }

    history
        .iter()
        .filter(|record| record.writer_type == WriterType::Networkx)
        .max_by_key(|record| record.imported_on)
        .or_else(|| history.first())
        .map(|record| record.job_id.clone())
}

fn networkx_sibling<'a>(history: &'a [JobRecord], anchor: &JobRecord) -> Option<&'a JobRecord> {
    let window = Duration::seconds(SIBLING_WINDOW_SECS);
    history
        .iter()
        .filter(|record| record.writer_type == WriterType::Networkx)
        .map(|record| ((record.imported_on - anchor.imported_on).abs(), record))
        .filter(|(gap, _)| *gap <= window)
        .min_by_key(|(gap, _)| *gap)
        .map(|(_, record)| record)
}
