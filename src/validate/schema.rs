/// JSON Schemas for submission files, derived from the record types.
///
/// Published through `validate_content --schema <kind>` for editors and
/// contributors. The validator parses entries into the same types, so an
/// entry that satisfies the schema also parses.

use schemars::{schema_for, JsonSchema, Schema};
use serde_json::json;

use crate::core::content::ContentKind;
use crate::schema::danger::Danger;
use crate::schema::encounter::Encounter;
use crate::schema::location::Location;
use crate::schema::npc::NpcTemplate;
use crate::schema::skill_check::SkillCheck;

/// Submission file with typed entries. Only used to derive the schema.
#[derive(JsonSchema)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct TypedSubmission<T> {
    kind: ContentKind,
    #[serde(default)]
    author: Option<String>,
    entries: Vec<T>,
}

/// Schema for a submission file targeting the `kind` table.
pub fn submission_schema(kind: ContentKind) -> Schema {
    match kind {
        ContentKind::Encounter => typed::<Encounter>(kind),
        ContentKind::Location => typed::<Location>(kind),
        ContentKind::Npc => typed::<NpcTemplate>(kind),
        ContentKind::SkillCheck => typed::<SkillCheck>(kind),
        ContentKind::Danger => typed::<Danger>(kind),
    }
}

fn typed<T: JsonSchema>(kind: ContentKind) -> Schema {
    let mut schema = schema_for!(TypedSubmission<T>);
    schema.insert("title".to_string(), json!(format!("LoreWeaver {} submission", kind)));
    // The file must name this table, not any table
    if let Some(properties) = schema.get_mut("properties").and_then(|p| p.as_object_mut()) {
        properties.insert("kind".to_string(), json!({ "const": kind.name() }));
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::test_library;
    use crate::schema::MAX_WEIGHT;
    use serde::Serialize;
    use serde_json::Value;
    use std::collections::BTreeSet;

    /// The definition the `entries` items point at.
    fn entry_definition(schema: &Schema) -> &Value {
        let value = schema.as_value();
        let reference = value["properties"]["entries"]["items"]["$ref"]
            .as_str()
            .unwrap();
        let name = reference.trim_start_matches("#/$defs/");
        &value["$defs"][name]
    }

    fn property_names(definition: &Value) -> BTreeSet<String> {
        definition["properties"].as_object().unwrap().keys().cloned().collect()
    }

    fn field_names<T: Serialize>(record: &T) -> BTreeSet<String> {
        serde_json::to_value(record)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }

    #[test]
    fn entry_properties_match_record_fields() {
        let library = test_library();
        let cases = [
            (ContentKind::Encounter, field_names(&library.encounters[0])),
            (ContentKind::Location, field_names(&library.locations[0])),
            (ContentKind::Npc, field_names(&library.npcs[0])),
            (ContentKind::SkillCheck, field_names(&library.skill_checks[0])),
            (ContentKind::Danger, field_names(&library.dangers[0])),
        ];
        for (kind, fields) in cases {
            let schema = submission_schema(kind);
            let definition = entry_definition(&schema);
            assert_eq!(property_names(definition), fields, "{} schema", kind);
            assert_eq!(definition["additionalProperties"], json!(false), "{} schema", kind);
        }
    }

    #[test]
    fn submission_envelope() {
        let schema = submission_schema(ContentKind::SkillCheck);
        let value = schema.as_value();
        assert_eq!(value["title"], "LoreWeaver skill_check submission");
        assert_eq!(value["properties"]["kind"], json!({ "const": "skill_check" }));
        assert_eq!(value["additionalProperties"], json!(false));

        let required: BTreeSet<&str> = value["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, BTreeSet::from(["kind", "entries"]));

        let dc = &entry_definition(&schema)["properties"]["dc"];
        assert_eq!(dc["minimum"], 5);
        assert_eq!(dc["maximum"], 30);
    }

    #[test]
    fn encounter_rules_carried_into_schema() {
        let schema = submission_schema(ContentKind::Encounter);
        let definition = entry_definition(&schema);

        let required: BTreeSet<&str> = definition["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, BTreeSet::from(["title", "descriptions", "resolutions"]));

        let weight = &definition["properties"]["weight"];
        assert_eq!(weight["minimum"], 1);
        assert_eq!(weight["maximum"], MAX_WEIGHT);
        assert_eq!(weight["default"], 1);

        let environments = schema.as_value()["$defs"]["Environment"]["enum"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(environments, 10);
    }
}
