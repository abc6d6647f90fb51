//! Loop definition validation logic.

use crate::schema::{LoopDef, PlantModelDef};
use ls_controls::create_regulator;
use ls_signals::{GeneratorKind, SignalError, create_generator};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_loop(def: &LoopDef) -> Result<(), ValidationError> {
    if def.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: def.version,
        });
    }

    if def.name.trim().is_empty() {
        return Err(invalid("name", &def.name, "must not be empty"));
    }
    if !(def.period_s.is_finite() && def.period_s > 0.0) {
        return Err(invalid("period_s", def.period_s, "must be positive"));
    }
    if def.steps == 0 {
        return Err(invalid("steps", def.steps, "must be at least 1"));
    }

    let mut names = HashSet::new();
    let block_names = def
        .generators
        .iter()
        .map(|g| &g.name)
        .chain([&def.regulator.name, &def.plant.name]);
    for name in block_names {
        if name.trim().is_empty() {
            return Err(invalid("block name", name, "must not be empty"));
        }
        if !names.insert(name.trim()) {
            return Err(ValidationError::DuplicateId {
                id: name.clone(),
                context: format!("loop '{}' blocks", def.name),
            });
        }
    }

    for generator in &def.generators {
        let field = format!("generators.{}", generator.name);
        if generator.kind.parse::<GeneratorKind>().is_err() {
            return Err(ValidationError::Unsupported {
                feature: format!("generator type '{}'", generator.kind),
                reason: format!(
                    "expected one of {}",
                    GeneratorKind::ALL.map(GeneratorKind::tag).join(", ")
                ),
            });
        }
        match create_generator(&generator.kind, &generator.params) {
            Ok(_) => {}
            Err(SignalError::InvalidParameter { what }) => {
                return Err(invalid(&field, &generator.kind, &what));
            }
            Err(e) => return Err(invalid(&field, &generator.kind, &e.to_string())),
        }
    }

    if let Err(e) = create_regulator(&def.regulator.spec, def.period_s) {
        return Err(invalid(
            &format!("regulator.{}", def.regulator.name),
            def.regulator.spec.kind(),
            &e.to_string(),
        ));
    }

    validate_plant(&def.plant.model, &format!("plant.{}", def.plant.name))?;

    Ok(())
}

fn validate_plant(model: &PlantModelDef, field: &str) -> Result<(), ValidationError> {
    match model {
        PlantModelDef::Arx {
            a,
            b,
            initial_inputs,
            initial_outputs,
            ..
        } => {
            if b.is_empty() {
                return Err(invalid(field, "b", "needs at least one b coefficient"));
            }
            check_finite(field, "a", a)?;
            check_finite(field, "b", b)?;
            check_finite(field, "initial_inputs", initial_inputs)?;
            check_finite(field, "initial_outputs", initial_outputs)?;
        }
        PlantModelDef::TransferFunction {
            numerator,
            denominator,
            ..
        } => {
            if numerator.is_empty() {
                return Err(invalid(field, "numerator", "must not be empty"));
            }
            match denominator.first() {
                None => return Err(invalid(field, "denominator", "must not be empty")),
                Some(d0) if *d0 == 0.0 => {
                    return Err(invalid(field, "denominator[0]", "must be non-zero"));
                }
                Some(_) => {}
            }
            check_finite(field, "numerator", numerator)?;
            check_finite(field, "denominator", denominator)?;
        }
        PlantModelDef::Series { stages: children }
        | PlantModelDef::Parallel { branches: children } => {
            if children.is_empty() {
                return Err(invalid(field, model.kind(), "needs at least one stage"));
            }
            for (i, child) in children.iter().enumerate() {
                validate_plant(child, &format!("{field}.{}[{i}]", model.kind()))?;
            }
        }
    }
    Ok(())
}

fn check_finite(field: &str, what: &str, values: &[f64]) -> Result<(), ValidationError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(invalid(&format!("{field}.{what}"), v, "must be finite")),
        None => Ok(()),
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
