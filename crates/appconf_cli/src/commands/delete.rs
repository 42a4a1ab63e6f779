//! Delete command.

use appconf_core::ResourceIdentifier;
use appconf_reconciler::Reconciler;

/// Runs the delete command.
pub fn run(reconciler: &Reconciler, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResourceIdentifier::decode(id)?;
    reconciler.delete(&id)?;
    println!("Deleted {}", id);
    Ok(())
}
