//! Create and update commands.

use super::{EntryReport, Format, Kind};
use appconf_core::{Label, Payload, ResourceIdentifier};
use appconf_reconciler::{Declaration, Reconciler};

/// Builds the payload for `kind` from command-line values.
///
/// For feature flags `value` is the description.
pub fn payload(
    kind: Kind,
    value: Option<String>,
    enabled: bool,
    latest_version: bool,
) -> Result<Payload, Box<dyn std::error::Error>> {
    match kind {
        Kind::KeyValue => {
            let value = value.ok_or("--value is required for key-value entries")?;
            Ok(Payload::plain(value))
        }
        Kind::Secret => {
            let locator = value.ok_or("--value (the secret locator) is required for secrets")?;
            Ok(Payload::secret_reference(&locator, latest_version)?)
        }
        Kind::Feature => Ok(Payload::feature(enabled, value.unwrap_or_default())),
    }
}

/// Runs the create command.
pub fn create(
    reconciler: &Reconciler,
    endpoint: &str,
    label: Label,
    key: &str,
    payload: Payload,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let declaration = Declaration {
        endpoint: endpoint.to_string(),
        label,
        key: key.to_string(),
        payload,
    };

    let managed = reconciler.create(&declaration)?;
    EntryReport::from_managed(&managed).print(format)
}

/// Runs the update command.
pub fn update(
    reconciler: &Reconciler,
    id: &str,
    payload: Payload,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResourceIdentifier::decode(id)?;
    let managed = reconciler.update(&id, &payload)?;
    EntryReport::from_managed(&managed).print(format)
}
