use anyhow::Result;

use crate::model::RoutingTable;

/// Installs a computed routing table into some external forwarding plane.
/// Kernel FIB programming is out of scope; `NullForwardingApplier` is the
/// only implementation, kept as the seam a real installer would hang off.
pub trait RouteInstaller: Send {
    fn install(&mut self, table: &RoutingTable) -> Result<()>;
}

pub struct NullForwardingApplier;

impl RouteInstaller for NullForwardingApplier {
    fn install(&mut self, _table: &RoutingTable) -> Result<()> {
        Ok(())
    }
}
