//! Save-time conflict resolution.
//!
//! Two requests that load the same record and save independently must not
//! let the second save drop keys the first one added. At save time the live
//! record is compared with its snapshot; if it changed, the backend is read
//! again and, when someone else wrote in the meantime, the live record is
//! overlaid on top of that fresh value key by key.
//!
//! There is no compare-and-swap: a write landing between the re-read and our
//! own write is still lost.

use serde_json::Value;

use crate::record::{SessionRecord, SessionSnapshot};

/// What the store should do with a record at save time.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing changed since load; skip the write.
    Unchanged,

    /// Persist this record.
    Write {
        record: SessionRecord,
        /// Whether a concurrent write was folded in.
        merged: bool,
    },
}

/// Decide what to persist for `current`, loaded as `snapshot`.
///
/// `read_fresh` is only called when `current` differs from `snapshot`, and
/// must return what the backend holds right now (`None` if nothing).
pub fn resolve<E>(
    current: &SessionRecord,
    snapshot: &SessionSnapshot,
    read_fresh: impl FnOnce() -> Result<Option<SessionRecord>, E>,
) -> Result<Resolution, E> {
    if current == snapshot.record() {
        return Ok(Resolution::Unchanged);
    }

    match read_fresh()? {
        Some(mut fresh) if fresh != *snapshot.record() => {
            deep_merge(&mut fresh, current);
            Ok(Resolution::Write {
                record: fresh,
                merged: true,
            })
        }
        _ => Ok(Resolution::Write {
            record: current.clone(),
            merged: false,
        }),
    }
}

/// Overlay `overlay` onto `base`.
///
/// Keys only in `base` are kept. Where both sides hold a map the merge
/// recurses; otherwise the overlay value wins.
pub fn deep_merge(base: &mut SessionRecord, overlay: &SessionRecord) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(base_map)), Value::Object(overlay_map)) => {
                deep_merge(base_map, overlay_map);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
