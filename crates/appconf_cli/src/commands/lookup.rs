//! Lookup command.

use super::{EntryReport, Format, Kind};
use appconf_core::{Label, ResourceIdentifier};
use appconf_reconciler::Reconciler;

/// Runs the lookup command.
pub fn run(
    reconciler: &Reconciler,
    endpoint: &str,
    label: &Label,
    key: &str,
    kind: Kind,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = match kind {
        Kind::KeyValue => EntryReport::from_managed(&reconciler.lookup_key_value(endpoint, label, key)?),
        Kind::Secret => {
            EntryReport::from_managed(&reconciler.lookup_secret_reference(endpoint, label, key)?)
        }
        Kind::Feature => {
            let feature = reconciler.lookup_feature(endpoint, label, key)?;
            let id = ResourceIdentifier::feature_from_endpoint(endpoint, label.clone(), key)?;
            EntryReport::from_feature(&id, &feature)
        }
    };

    report.print(format)
}
