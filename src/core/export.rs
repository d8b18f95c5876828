/// Export strategies for rendering a generated encounter for sharing.

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::core::generator::GeneratedEncounter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format '{0}' (expected markdown, text, json or html)")]
    UnknownFormat(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// A way of turning an encounter into a shareable document.
pub trait Exporter {
    /// Display name of the format.
    fn name(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn export(&self, encounter: &GeneratedEncounter) -> Result<String, ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    PlainText,
    Json,
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Markdown, Self::PlainText, Self::Json, Self::Html];

    /// The strategy implementing this format.
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            Self::Markdown => Box::new(MarkdownExporter),
            Self::PlainText => Box::new(PlainTextExporter),
            Self::Json => Box::new(JsonExporter),
            Self::Html => Box::new(HtmlExporter),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" | "plain" => Ok(Self::PlainText),
            "json" => Ok(Self::Json),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Export an encounter and write it to `path`.
pub fn export_to_file(
    encounter: &GeneratedEncounter,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let contents = format.exporter().export(encounter)?;
    std::fs::write(path, contents)?;
    tracing::info!("Exported '{}' to {}", encounter.title, path.display());
    Ok(())
}

fn environment_label(encounter: &GeneratedEncounter) -> String {
    encounter
        .environment
        .map(|e| e.to_string())
        .unwrap_or_else(|| "any".to_string())
}

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn name(&self) -> &'static str {
        "Markdown"
    }

    fn file_extension(&self) -> &'static str {
        "md"
    }

    fn export(&self, encounter: &GeneratedEncounter) -> Result<String, ExportError> {
        let mut out = String::new();
        writeln!(out, "# {}", encounter.title)?;
        writeln!(out)?;
        writeln!(out, "*Environment: {}*", environment_label(encounter))?;
        if !encounter.tags.is_empty() {
            writeln!(out, "*Tags: {}*", encounter.tags.join(", "))?;
        }
        writeln!(out)?;
        writeln!(out, "{}", encounter.description)?;

        if let Some(location) = &encounter.location {
            writeln!(out)?;
            writeln!(out, "## Location: {}", location.name)?;
            writeln!(out)?;
            writeln!(out, "- {}", location.primary)?;
            writeln!(out, "- {}", location.secondary)?;
            writeln!(out, "- {}", location.tertiary)?;
        }

        if !encounter.npcs.is_empty() {
            writeln!(out)?;
            writeln!(out, "## NPCs")?;
            writeln!(out)?;
            for npc in &encounter.npcs {
                writeln!(
                    out,
                    "- **{}** ({}): {}; {}. Wants to {}.",
                    npc.name, npc.archetype, npc.appearance, npc.personality, npc.motivation
                )?;
            }
        }

        if !encounter.skill_checks.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Skill Checks")?;
            writeln!(out)?;
            for check in &encounter.skill_checks {
                writeln!(out, "- {}", check.summary())?;
            }
        }

        if let Some(danger) = &encounter.danger {
            writeln!(out)?;
            writeln!(out, "## Danger: {} ({})", danger.title, danger.severity)?;
            writeln!(out)?;
            writeln!(out, "{}", danger.description)?;
        }

        writeln!(out)?;
        writeln!(out, "## Resolutions")?;
        writeln!(out)?;
        for (i, resolution) in encounter.resolutions.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, resolution)?;
        }
        Ok(out)
    }
}

pub struct PlainTextExporter;

impl Exporter for PlainTextExporter {
    fn name(&self) -> &'static str {
        "Plain text"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn export(&self, encounter: &GeneratedEncounter) -> Result<String, ExportError> {
        let mut out = String::new();
        writeln!(out, "{}", encounter.title.to_uppercase())?;
        writeln!(out, "{}", "=".repeat(encounter.title.chars().count()))?;
        writeln!(out, "Environment: {}", environment_label(encounter))?;
        writeln!(out)?;
        writeln!(out, "{}", encounter.description)?;

        if let Some(location) = &encounter.location {
            writeln!(out)?;
            writeln!(
                out,
                "Location: {} ({}; {}; {})",
                location.name, location.primary, location.secondary, location.tertiary
            )?;
        }
        for npc in &encounter.npcs {
            writeln!(out, "NPC: {}, {} ({})", npc.name, npc.archetype, npc.personality)?;
        }
        for check in &encounter.skill_checks {
            writeln!(out, "Check: {}", check.summary())?;
        }
        if let Some(danger) = &encounter.danger {
            writeln!(out, "Danger: {} [{}]", danger.title, danger.severity)?;
        }

        writeln!(out)?;
        writeln!(out, "Resolutions:")?;
        for resolution in &encounter.resolutions {
            writeln!(out, "  * {}", resolution)?;
        }
        Ok(out)
    }
}

pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, encounter: &GeneratedEncounter) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(encounter)?)
    }
}

pub struct HtmlExporter;

/// Escape text for safe inclusion in HTML element content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Exporter for HtmlExporter {
    fn name(&self) -> &'static str {
        "HTML"
    }

    fn file_extension(&self) -> &'static str {
        "html"
    }

    fn export(&self, encounter: &GeneratedEncounter) -> Result<String, ExportError> {
        let e = escape_html;
        let mut out = String::new();
        writeln!(out, "<article class=\"encounter\">")?;
        writeln!(out, "  <h1>{}</h1>", e(&encounter.title))?;
        writeln!(
            out,
            "  <p class=\"environment\">{}</p>",
            e(&environment_label(encounter))
        )?;
        writeln!(out, "  <p class=\"description\">{}</p>", e(&encounter.description))?;

        if let Some(location) = &encounter.location {
            writeln!(out, "  <section class=\"location\">")?;
            writeln!(out, "    <h2>{}</h2>", e(&location.name))?;
            writeln!(out, "    <ul>")?;
            for detail in [&location.primary, &location.secondary, &location.tertiary] {
                writeln!(out, "      <li>{}</li>", e(detail))?;
            }
            writeln!(out, "    </ul>")?;
            writeln!(out, "  </section>")?;
        }

        if !encounter.npcs.is_empty() {
            writeln!(out, "  <section class=\"npcs\">")?;
            writeln!(out, "    <ul>")?;
            for npc in &encounter.npcs {
                writeln!(
                    out,
                    "      <li><strong>{}</strong> ({}): {}; {}. Wants to {}.</li>",
                    e(&npc.name),
                    e(&npc.archetype),
                    e(&npc.appearance),
                    e(&npc.personality),
                    e(&npc.motivation)
                )?;
            }
            writeln!(out, "    </ul>")?;
            writeln!(out, "  </section>")?;
        }

        if !encounter.skill_checks.is_empty() {
            writeln!(out, "  <section class=\"skill-checks\">")?;
            writeln!(out, "    <ul>")?;
            for check in &encounter.skill_checks {
                writeln!(out, "      <li>{}</li>", e(&check.summary()))?;
            }
            writeln!(out, "    </ul>")?;
            writeln!(out, "  </section>")?;
        }

        if let Some(danger) = &encounter.danger {
            writeln!(
                out,
                "  <aside class=\"danger {}\">{}: {}</aside>",
                danger.severity,
                e(&danger.title),
                e(&danger.description)
            )?;
        }

        writeln!(out, "  <ol class=\"resolutions\">")?;
        for resolution in &encounter.resolutions {
            writeln!(out, "    <li>{}</li>", e(resolution))?;
        }
        writeln!(out, "  </ol>")?;
        writeln!(out, "</article>")?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::sample_encounter;
    use crate::schema::npc::Npc;
    use crate::schema::skill_check::SkillCheck;

    #[test]
    fn format_parsing() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::PlainText);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
    }

    #[test]
    fn every_format_mentions_title_and_resolutions() {
        let enc = sample_encounter();
        for format in ExportFormat::ALL {
            let out = format.exporter().export(&enc).unwrap();
            assert!(out.contains(&enc.resolutions[0]), "{:?} missing resolution", format);
            if format != ExportFormat::PlainText {
                assert!(out.contains(&enc.title), "{:?} missing title", format);
            }
        }
    }

    #[test]
    fn markdown_numbers_resolutions() {
        let enc = sample_encounter();
        let out = MarkdownExporter.export(&enc).unwrap();
        assert!(out.starts_with(&format!("# {}", enc.title)));
        assert!(out.contains("## Resolutions"));
        assert!(out.contains(&format!("1. {}", enc.resolutions[0])));
        assert!(out.contains(&format!("2. {}", enc.resolutions[1])));
    }

    #[test]
    fn json_export_parses_back() {
        let enc = sample_encounter();
        let out = JsonExporter.export(&enc).unwrap();
        let back: GeneratedEncounter = serde_json::from_str(&out).unwrap();
        assert_eq!(back, enc);
    }

    #[test]
    fn html_is_escaped() {
        let mut enc = sample_encounter();
        enc.title = "<script>alert('x')</script>".to_string();
        let out = HtmlExporter.export(&enc).unwrap();
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn html_carries_checks_and_npc_details() {
        let mut enc = sample_encounter();
        enc.npcs = vec![Npc {
            name: "Wren".to_string(),
            archetype: "Peddler".to_string(),
            appearance: "a patched green cloak".to_string(),
            personality: "nervous".to_string(),
            motivation: "sell the last bottle".to_string(),
        }];
        enc.skill_checks = vec![SkillCheck {
            skill: "Perception".to_string(),
            description: "Spot the tripwire".to_string(),
            dc: 14,
            environments: vec![],
            tags: vec![],
        }];

        let out = HtmlExporter.export(&enc).unwrap();
        assert!(out.contains(
            "<strong>Wren</strong> (Peddler): a patched green cloak; nervous. Wants to sell the last bottle."
        ));
        assert!(out.contains("<section class=\"skill-checks\">"));
        assert!(out.contains("<li>Perception (DC 14): Spot the tripwire</li>"));

        enc.skill_checks.clear();
        let out = HtmlExporter.export(&enc).unwrap();
        assert!(!out.contains("skill-checks"));
    }

    #[test]
    fn export_to_file_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encounter.md");
        let enc = sample_encounter();
        export_to_file(&enc, ExportFormat::Markdown, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(&enc.title));
    }
}
