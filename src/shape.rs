//! Record shapes: entities, relations, and the per-entity observation records
//! nested inside the observation commands.

use serde_json::Value;

use crate::error::{FieldPath, ValidationFailure, Violations};
use crate::graph::{
    Entity, ObservationDeletion, ObservationInput, Relation, MAX_NAME_LENGTH, MAX_OBSERVATION_LENGTH,
};
use crate::rules::{ArrayRule, StrRule, StrictObject};

pub(crate) const ENTITY_NAME: StrRule = StrRule::non_empty("Entity name cannot be empty")
    .max_len(MAX_NAME_LENGTH, "Entity name too long (max 100 characters)");

/// Reference to an entity by name. Only the entity's own `name` carries the
/// length ceiling; references are checked against the store instead.
pub(crate) const ENTITY_REF: StrRule = StrRule::non_empty("Entity name cannot be empty");

const ENTITY_TYPE: StrRule = StrRule::non_empty("Entity type cannot be empty");

pub(crate) const OBSERVATION: StrRule = StrRule::non_empty("Observation cannot be empty")
    .max_len(MAX_OBSERVATION_LENGTH, "Observation too long (max 1000 characters)");

/// Observations named for deletion only need to be non-empty
const OBSERVATION_REF: StrRule = StrRule::non_empty("Observation cannot be empty");

const FROM: StrRule = StrRule::non_empty("Source entity name cannot be empty");
const TO: StrRule = StrRule::non_empty("Target entity name cannot be empty");
const RELATION_TYPE: StrRule = StrRule::non_empty("Relation type cannot be empty");

const CONTENTS: ArrayRule = ArrayRule::non_empty("Must provide at least one observation");

pub(crate) fn entity(value: &Value, path: &FieldPath, out: &mut Violations) -> Option<Entity> {
    let obj = StrictObject::open(value, path, &["name", "entityType", "observations"], out)?;

    let name = obj.required("name", "string", out, |v, p, out| ENTITY_NAME.check(v, p, out));
    let entity_type = obj.required("entityType", "string", out, |v, p, out| ENTITY_TYPE.check(v, p, out));
    let observations = obj.optional("observations", out, |v, p, out| {
        ArrayRule::any().check(v, p, out, |v, p, out| OBSERVATION.check(v, p, out))
    });

    match (name, entity_type, observations) {
        (Some(name), Some(entity_type), Some(observations)) => Some(Entity {
            name,
            entity_type,
            observations: observations.unwrap_or_default(),
        }),
        _ => None,
    }
}

pub(crate) fn relation(value: &Value, path: &FieldPath, out: &mut Violations) -> Option<Relation> {
    let obj = StrictObject::open(value, path, &["from", "to", "relationType"], out)?;

    let from = obj.required("from", "string", out, |v, p, out| FROM.check(v, p, out));
    let to = obj.required("to", "string", out, |v, p, out| TO.check(v, p, out));
    let relation_type = obj.required("relationType", "string", out, |v, p, out| {
        RELATION_TYPE.check(v, p, out)
    });

    match (from, to, relation_type) {
        (Some(from), Some(to), Some(relation_type)) => Some(Relation {
            from,
            to,
            relation_type,
        }),
        _ => None,
    }
}

pub(crate) fn observation_input(
    value: &Value,
    path: &FieldPath,
    out: &mut Violations,
) -> Option<ObservationInput> {
    let obj = StrictObject::open(value, path, &["entityName", "contents"], out)?;

    let entity_name = obj.required("entityName", "string", out, |v, p, out| ENTITY_REF.check(v, p, out));
    let contents = obj.required("contents", "array", out, |v, p, out| {
        CONTENTS.check(v, p, out, |v, p, out| OBSERVATION.check(v, p, out))
    });

    Some(ObservationInput {
        entity_name: entity_name?,
        contents: contents?,
    })
}

pub(crate) fn observation_deletion(
    value: &Value,
    path: &FieldPath,
    out: &mut Violations,
) -> Option<ObservationDeletion> {
    let obj = StrictObject::open(value, path, &["entityName", "observations"], out)?;

    let entity_name = obj.required("entityName", "string", out, |v, p, out| ENTITY_REF.check(v, p, out));
    let observations = obj.required("observations", "array", out, |v, p, out| {
        CONTENTS.check(v, p, out, |v, p, out| OBSERVATION_REF.check(v, p, out))
    });

    Some(ObservationDeletion {
        entity_name: entity_name?,
        observations: observations?,
    })
}

/// Validate a single entity record, filling in absent `observations`.
pub fn validate_entity(raw: &Value) -> Result<Entity, ValidationFailure> {
    let mut out = Violations::default();
    let value = entity(raw, &FieldPath::root(), &mut out);
    out.finish(value)
}

/// Validate a single relation record.
pub fn validate_relation(raw: &Value) -> Result<Relation, ValidationFailure> {
    let mut out = Violations::default();
    let value = relation(raw, &FieldPath::root(), &mut out);
    out.finish(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Rule, ViolationKind};
    use serde_json::json;

    #[test]
    fn entity_reports_every_bad_field_at_once() {
        let err = validate_entity(&json!({
            "name": "",
            "entityType": 7,
            "observations": ["ok", ""],
            "extra": 1
        }))
        .unwrap_err();

        assert_eq!(err.len(), 4);
        assert_eq!(
            err.at("name")[0].kind,
            ViolationKind::ConstraintViolation {
                rule: Rule::MinLength,
                limit: 1
            }
        );
        assert!(matches!(err.at("entityType")[0].kind, ViolationKind::TypeMismatch { .. }));
        assert_eq!(err.at("observations[1]")[0].message, "Observation cannot be empty");
        assert_eq!(err.at("extra")[0].kind, ViolationKind::UnknownField);
    }

    #[test]
    fn entity_null_observations_is_not_absent() {
        let err = validate_entity(&json!({ "name": "A", "entityType": "x", "observations": null })).unwrap_err();
        assert_eq!(
            err.at("observations")[0].kind,
            ViolationKind::TypeMismatch {
                expected: "array",
                found: "null"
            }
        );
    }

    #[test]
    fn relation_allows_self_loop() {
        let relation = validate_relation(&json!({ "from": "A", "to": "A", "relationType": "self" })).unwrap();
        assert_eq!(relation.from, relation.to);
    }

    #[test]
    fn relation_must_be_object() {
        let err = validate_relation(&json!(["A", "B", "knows"])).unwrap_err();
        assert_eq!(err.at("<root>").len(), 1);
    }
}
