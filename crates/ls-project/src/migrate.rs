//! Schema migration framework.

use crate::ProjectError;
use crate::schema::LoopDef;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut def: LoopDef) -> Result<LoopDef, ProjectError> {
    while def.version < LATEST_VERSION {
        def = migrate_one_version(def)?;
    }
    Ok(def)
}

fn migrate_one_version(def: LoopDef) -> Result<LoopDef, ProjectError> {
    match def.version {
        0 => migrate_v0_to_v1(def),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files carried generator tags in any case; v1 stores them lowercase.
fn migrate_v0_to_v1(mut def: LoopDef) -> Result<LoopDef, ProjectError> {
    for generator in &mut def.generators {
        generator.kind = generator.kind.trim().to_ascii_lowercase();
    }
    def.version = 1;
    Ok(def)
}
