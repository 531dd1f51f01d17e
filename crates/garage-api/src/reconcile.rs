//! Image-set reconciliation for car updates.
//!
//! Pure set math over storage references: no I/O happens here. Callers write
//! `next_images` to the record and hand `files_to_delete` to the storage layer.

use garage_types::models::MAX_IMAGES;

/// Outcome of reconciling a car's images with an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Retained images in their original order, then uploads in upload order.
    pub next_images: Vec<String>,
    /// References that were on the record and must be removed from storage.
    pub files_to_delete: Vec<String>,
}

/// The request carried more uploads plus deletions than one update may.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{uploaded} uploads + {deleted} deletions exceeds {max}", max = MAX_IMAGES)]
pub struct LimitExceeded {
    pub uploaded: usize,
    pub deleted: usize,
}

/// Compute the next image list for a record.
///
/// The limit applies to the shape of the request (`uploaded + deletions`),
/// not to the resulting total. Deletion references the record doesn't hold
/// are ignored, so stale or repeated requests are harmless.
pub fn reconcile(
    current: &[String],
    uploaded: &[String],
    deletions: &[String],
) -> Result<Reconciliation, LimitExceeded> {
    if uploaded.len() + deletions.len() > MAX_IMAGES {
        return Err(LimitExceeded {
            uploaded: uploaded.len(),
            deleted: deletions.len(),
        });
    }

    let (removed, retained): (Vec<&String>, Vec<&String>) =
        current.iter().partition(|img| deletions.contains(img));

    let mut files_to_delete: Vec<String> = Vec::with_capacity(removed.len());
    for img in removed {
        if !files_to_delete.contains(img) {
            files_to_delete.push(img.clone());
        }
    }

    let next_images = retained
        .into_iter()
        .cloned()
        .chain(uploaded.iter().cloned())
        .collect();

    Ok(Reconciliation {
        next_images,
        files_to_delete,
    })
}
