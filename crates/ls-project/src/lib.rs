//! ls-project: loop definition file format and validation.

pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_loop};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse, migrate and validate a YAML loop definition.
pub fn from_yaml_str(content: &str) -> ProjectResult<LoopDef> {
    let def: LoopDef = serde_yaml::from_str(content)?;
    let def = migrate_to_latest(def)?;
    validate_loop(&def)?;
    Ok(def)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<LoopDef> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &std::path::Path, def: &LoopDef) -> ProjectResult<()> {
    validate_loop(def)?;
    let content = serde_yaml::to_string(def)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<LoopDef> {
    let content = std::fs::read_to_string(path)?;
    let mut def: LoopDef = serde_json::from_str(&content)?;
    def = migrate_to_latest(def)?;
    validate_loop(&def)?;
    Ok(def)
}

pub fn save_json(path: &std::path::Path, def: &LoopDef) -> ProjectResult<()> {
    validate_loop(def)?;
    let content = serde_json::to_string_pretty(def)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<LoopDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
