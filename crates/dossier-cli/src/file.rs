//! Template files on disk.
//!
//! A template file holds a template record as the API returns it. Fields the
//! draft does not know about, such as the id or the author, are kept as they
//! are when the file is written back.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use dossier_template::{Template, TemplateDraft};
use ecow::EcoString;
use serde_json::{Map, Value};

/// A template file.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    path: PathBuf,
    extra: Map<String, Value>,
    /// The editable fields.
    pub draft: TemplateDraft,
}

impl TemplateFile {
    /// A new file holding a draft.
    pub fn new(path: &Path, draft: TemplateDraft) -> Self {
        Self {
            path: path.to_owned(),
            extra: Map::new(),
            draft,
        }
    }

    /// Reads a template file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template file {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        let Value::Object(extra) = value else {
            bail!("{} does not hold a template object", path.display());
        };
        let draft = serde_json::from_value(Value::Object(extra.clone()))
            .with_context(|| format!("{} does not hold a template", path.display()))?;

        Ok(Self {
            path: path.to_owned(),
            extra,
            draft,
        })
    }

    /// The file a template record is saved to.
    pub fn from_template(path: &Path, template: &Template) -> anyhow::Result<Self> {
        let Value::Object(extra) = serde_json::to_value(template)? else {
            bail!("template {} did not encode to an object", template.id);
        };
        Ok(Self {
            path: path.to_owned(),
            extra,
            draft: template.draft.clone(),
        })
    }

    /// The path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The id of the stored template this file was downloaded from.
    pub fn id(&self) -> Option<EcoString> {
        self.extra.get("id").and_then(Value::as_str).map(Into::into)
    }

    /// The file contents.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let Value::Object(fields) = serde_json::to_value(&self.draft)? else {
            bail!("template draft did not encode to an object");
        };
        let mut merged = self.extra.clone();
        merged.extend(fields);
        Ok(serde_json::to_string_pretty(&Value::Object(merged))?)
    }

    /// Writes the file back to its path.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&self.path)
    }

    /// Writes the file to another path.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write template file {}", path.display()))
    }
}

/// Writes to a file, or to stdout for `-`.
pub fn write_output(output: &str, contents: &str) -> anyhow::Result<()> {
    if output == "-" {
        std::io::stdout()
            .write_all(contents.as_bytes())
            .context("failed to write to stdout")?;
    } else {
        std::fs::write(output, contents).with_context(|| format!("failed to write file {output}"))?;
    }
    Ok(())
}
