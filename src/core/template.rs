/// Description templating: parsing `{slot}` placeholders and rendering them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("unknown slot '{{{0}}}'")]
    UnknownSlot(String),
}

/// Slots a description variant may reference.
pub const KNOWN_SLOTS: &[&str] = &[
    "npc",
    "npc.name",
    "npc.archetype",
    "location",
    "environment",
    "danger",
    "skill",
];

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A placeholder: `{location}` or `{npc.name}`.
    Slot(String),
}

/// A parsed template, as a sequence of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{slot}` or `{slot.field}` → `Slot`
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    if !literal_buf.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(TemplateError::Parse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(TemplateError::Parse("unclosed brace".to_string()));
                    }

                    let content: String = chars[start..end].iter().collect();
                    let content = content.trim();
                    if content.is_empty() {
                        return Err(TemplateError::Parse("empty braces".to_string()));
                    }
                    if content.starts_with('.') || content.ends_with('.') {
                        return Err(TemplateError::Parse(format!(
                            "malformed slot '{}'",
                            content
                        )));
                    }

                    segments.push(Segment::Slot(content.to_string()));
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(TemplateError::Parse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(Segment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    /// Slot names referenced by this template, in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Slots that are not in [`KNOWN_SLOTS`].
    pub fn unknown_slots(&self) -> Vec<String> {
        self.slots()
            .filter(|s| !KNOWN_SLOTS.contains(s))
            .map(str::to_string)
            .collect()
    }

    pub fn render(&self, values: &SlotValues) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownSlot(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Values substituted into slots during rendering.
#[derive(Debug, Clone, Default)]
pub struct SlotValues {
    values: HashMap<String, String>,
}

impl SlotValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(slot.to_string(), value.into());
        self
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.values.get(slot).map(String::as_str)
    }
}

/// Parse and render in one step.
pub fn render_str(input: &str, values: &SlotValues) -> Result<String, TemplateError> {
    Template::parse(input)?.render(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("A quiet road.").unwrap();
        assert_eq!(t.segments, vec![Segment::Literal("A quiet road.".to_string())]);
    }

    #[test]
    fn parse_slots() {
        let t = Template::parse("{npc.name} waits at {location}.").unwrap();
        assert_eq!(t.segments.len(), 4);
        assert_eq!(t.segments[0], Segment::Slot("npc.name".to_string()));
        assert_eq!(t.segments[2], Segment::Slot("location".to_string()));
        assert_eq!(t.slots().collect::<Vec<_>>(), vec!["npc.name", "location"]);
    }

    #[test]
    fn parse_escaped_braces() {
        let t = Template::parse("Use {{braces}} here.").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Literal("Use {braces} here.".to_string())]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(Template::parse("Bad {} here").is_err());
        assert!(Template::parse("Bad {outer{inner}} here").is_err());
        assert!(Template::parse("Bad {unclosed here").is_err());
        assert!(Template::parse("Bad } here").is_err());
        assert!(Template::parse("Bad {.name} here").is_err());
    }

    #[test]
    fn unknown_slots_reported() {
        let t = Template::parse("{npc} meets {dragon} near {location}").unwrap();
        assert_eq!(t.unknown_slots(), vec!["dragon".to_string()]);
    }

    #[test]
    fn render_substitutes_values() {
        let mut values = SlotValues::new();
        values.set("npc", "Mira").set("location", "the old mill");
        let out = render_str("{npc} hides in {location}.", &values).unwrap();
        assert_eq!(out, "Mira hides in the old mill.");
    }

    #[test]
    fn render_missing_slot_is_error() {
        let values = SlotValues::new();
        assert_eq!(
            render_str("Beware {danger}.", &values),
            Err(TemplateError::UnknownSlot("danger".to_string()))
        );
    }
}
