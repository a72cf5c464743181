//! The rebuild verdict: the coherency gate for the entire cache.
//!
//! Pure function, no I/O. Everything feeding it — forced-rebuild flag, slot
//! existence, stored and current revisions — is resolved by the caller.

/// Decide whether the slot's index must be rebuilt.
///
/// Rebuild when a rebuild is forced, when there is no cached index, or when
/// the cached revision cannot be confirmed to match the remote tip. Only a
/// present-and-equal pair of revisions allows reuse: an unknown revision on
/// either side counts as a mismatch, favoring freshness over cache reuse.
pub fn needs_rebuild(
    force: bool,
    slot_exists: bool,
    stored_sha: Option<&str>,
    current_sha: Option<&str>,
) -> bool {
    if force || !slot_exists {
        return true;
    }

    match (stored_sha, current_sha) {
        (Some(stored), Some(current)) => stored != current,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_always_rebuilds() {
        for slot_exists in [false, true] {
            for stored in [None, Some("sha1")] {
                for current in [None, Some("sha1"), Some("sha2")] {
                    assert!(
                        needs_rebuild(true, slot_exists, stored, current),
                        "force=true must rebuild (slot_exists={}, stored={:?}, current={:?})",
                        slot_exists,
                        stored,
                        current
                    );
                }
            }
        }
    }

    #[test]
    fn missing_slot_always_rebuilds() {
        for stored in [None, Some("sha1")] {
            for current in [None, Some("sha1"), Some("sha2")] {
                assert!(needs_rebuild(false, false, stored, current));
            }
        }
    }

    #[test]
    fn equal_present_shas_reuse() {
        assert!(!needs_rebuild(false, true, Some("sha1"), Some("sha1")));
        assert!(!needs_rebuild(
            false,
            true,
            Some("abc123def456"),
            Some("abc123def456")
        ));
    }

    #[test]
    fn unequal_shas_rebuild() {
        assert!(needs_rebuild(false, true, Some("sha1"), Some("sha2")));
        assert!(needs_rebuild(false, true, Some("old_sha"), Some("new_sha")));
    }

    #[test]
    fn absent_stored_sha_rebuilds() {
        assert!(needs_rebuild(false, true, None, Some("sha1")));
    }

    #[test]
    fn absent_current_sha_rebuilds() {
        assert!(needs_rebuild(false, true, Some("sha1"), None));
    }

    #[test]
    fn both_absent_rebuilds() {
        assert!(needs_rebuild(false, true, None, None));
    }
}
