//! Stable identifiers for live machines.

slotmap::new_key_type! {
    /// Handle to a machine instance in the registry.
    ///
    /// Keys of deleted machines are never reused for a different live
    /// machine, so a stale handle simply fails lookup.
    pub struct MachineId;
}
