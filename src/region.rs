/// Read-only view of the critical-region state machine.
///
/// The event loop never calls these itself. Handlers reach the collaborator
/// through [`Context::critical_region`](crate::Context::critical_region) and
/// treat the answers as plain data.
pub trait CriticalRegion {
    fn is_idle(&self) -> bool;

    fn is_free(&self) -> bool;

    /// Whether the region's bookkeeping is internally consistent.
    fn is_sane(&self) -> bool;

    /// Number of requests queued for the region.
    fn pending_count(&self) -> usize;
}
