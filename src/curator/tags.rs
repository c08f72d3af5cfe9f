//! Writes the greenlit tag onto a thread.
//!
//! Archived threads cannot have their tags edited, so the write is wrapped
//! in an unarchive / re-archive pair. The re-archive is attempted whenever
//! the thread was unarchived, whatever the tag write returned.

use std::future::Future;

use tracing::warn;

use crate::error::PlatformError;
use crate::platform::{CandidateThread, ForumPlatform, TagRef};

/// The thread's tags with `greenlit` appended, unless already present.
pub fn with_greenlit_tag(current: &[TagRef], greenlit: &TagRef) -> Vec<TagRef> {
    let mut tags = current.to_vec();
    if !tags.contains(greenlit) {
        tags.push(greenlit.clone());
    }
    tags
}

/// Run `op` with the thread open, restoring the archived flag afterwards.
///
/// If unarchiving fails, `op` is not run. If `op` fails, the re-archive is
/// still attempted and `op`'s error is returned.
pub async fn with_unarchived<T, F, Fut>(
    platform: &dyn ForumPlatform,
    thread: &CandidateThread,
    op: F,
) -> Result<T, PlatformError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    if !thread.archived {
        return op().await;
    }

    platform.set_archived(thread, false).await?;
    let result = op().await;
    let rearchived = platform.set_archived(thread, true).await;

    match (result, rearchived) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(rearchive_err)) => {
            warn!(
                thread_id = %thread.id,
                error = %rearchive_err,
                "Failed to re-archive thread after failed tag update"
            );
            Err(e)
        }
    }
}

/// Add the greenlit tag to `thread` and write the tag set back.
/// Returns the tag set that was written.
pub async fn apply_greenlit(
    platform: &dyn ForumPlatform,
    thread: &CandidateThread,
    greenlit: &TagRef,
) -> Result<Vec<TagRef>, PlatformError> {
    let tags = with_greenlit_tag(&thread.tags, greenlit);
    with_unarchived(platform, thread, || platform.set_tags(thread, &tags)).await?;
    Ok(tags)
}
