//! Read and import commands.

use super::{EntryReport, Format, Kind};
use appconf_core::{IdentifierKind, PayloadKind, ResourceIdentifier};
use appconf_reconciler::{ReadOutcome, Reconciler};
use tracing::info;

/// Runs the read command.
pub fn read(
    reconciler: &Reconciler,
    id: &str,
    kind: Option<Kind>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResourceIdentifier::decode(id)?;

    match reconciler.read(&id, payload_kind(kind, &id))? {
        ReadOutcome::Present(managed) => EntryReport::from_managed(&managed).print(format),
        ReadOutcome::Absent => {
            info!("{} no longer exists", id);
            match format {
                Format::Json => println!("null"),
                Format::Text => println!("{} is absent", id),
            }
            Ok(())
        }
    }
}

/// Runs the import command.
pub fn import(
    reconciler: &Reconciler,
    id: &str,
    kind: Option<Kind>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = payload_kind(kind, &ResourceIdentifier::decode(id)?);
    let managed = reconciler.import(id, kind)?;
    EntryReport::from_managed(&managed).print(format)
}

/// Codec for an identifier; feature identifiers imply the feature codec.
fn payload_kind(kind: Option<Kind>, id: &ResourceIdentifier) -> PayloadKind {
    match (kind, id.kind()) {
        (Some(kind), _) => kind.into(),
        (None, IdentifierKind::Feature) => PayloadKind::FeatureFlag,
        (None, IdentifierKind::KeyValue) => PayloadKind::Plain,
    }
}
