use crate::check::ValidationConfig;
use crate::io::Error;
use crate::reference::{self, QmRegion, ReferenceSystem, SystemSpec};
use std::io::Read;

/// Reads a TOML system description and builds the reference system and,
/// when the description has a `[qm]` section, its QM region.
pub fn read<R: Read>(mut reader: R) -> Result<(ReferenceSystem, Option<QmRegion>), Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let spec = SystemSpec::from_toml_str(&text)?;
    Ok(reference::build(&spec)?)
}

/// Reads a TOML validation config.
pub fn read_config<R: Read>(mut reader: R) -> Result<ValidationConfig, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(ValidationConfig::from_toml_str(&text)?)
}
