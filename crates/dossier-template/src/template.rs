//! Template records as exchanged with the server.

use ecow::{EcoString, eco_format};
use serde::{Deserialize, Deserializer, Serialize};

use crate::block::{Block, nullable};
use crate::sanitize::{ValidationError, sanitize};

/// The file type assumed when a record does not carry one.
pub const DEFAULT_FILE_TYPE: &str = "WORD";
/// The font assumed when a record does not carry one.
pub const DEFAULT_FONT: &str = "Arial";
/// The font size, in points, assumed when a record does not carry one.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;
/// The text color assumed when a record does not carry one.
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// The document structure of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Always `documento`.
    #[serde(rename = "tipo", default)]
    pub kind: StructureKind,
    /// The document title.
    #[serde(rename = "titulo", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<EcoString>,
    /// The top-level blocks.
    #[serde(rename = "bloques", default)]
    pub blocks: Vec<Block>,
}

impl Structure {
    /// Creates an untitled structure.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            kind: StructureKind::Document,
            title: None,
            blocks,
        }
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The tag of a [`Structure`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureKind {
    /// `documento`
    #[default]
    #[serde(rename = "documento")]
    Document,
}

/// The editable part of a template, also used as the create and update
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    /// `nombre`
    #[serde(rename = "nombre", default, deserialize_with = "nullable")]
    pub name: EcoString,
    /// `descripcion`
    #[serde(rename = "descripcion", default, deserialize_with = "nullable")]
    pub description: EcoString,
    /// `tipo_archivo`
    #[serde(
        rename = "tipo_archivo",
        default = "default_file_type",
        deserialize_with = "nullable_file_type"
    )]
    pub file_type: EcoString,
    /// `titulo`
    #[serde(rename = "titulo", default, deserialize_with = "nullable")]
    pub title: EcoString,
    /// `encabezado`
    #[serde(rename = "encabezado", default, deserialize_with = "nullable")]
    pub header: EcoString,
    /// `pie_pagina`
    #[serde(rename = "pie_pagina", default, deserialize_with = "nullable")]
    pub footer: EcoString,
    /// `fuente`
    #[serde(rename = "fuente", default = "default_font", deserialize_with = "nullable_font")]
    pub font: EcoString,
    /// `tamano_fuente`, in points.
    #[serde(
        rename = "tamano_fuente",
        default = "default_font_size",
        deserialize_with = "nullable_font_size"
    )]
    pub font_size: f32,
    /// `color_texto`
    #[serde(
        rename = "color_texto",
        default = "default_text_color",
        deserialize_with = "nullable_text_color"
    )]
    pub text_color: EcoString,
    /// `autogenerar_indice`
    #[serde(rename = "autogenerar_indice", default, deserialize_with = "nullable")]
    pub auto_index: bool,
    /// `estructura`
    #[serde(rename = "estructura", default, deserialize_with = "nullable")]
    pub structure: Structure,
}

impl Default for TemplateDraft {
    fn default() -> Self {
        Self::new("")
    }
}

impl TemplateDraft {
    /// Creates a draft with the default settings and no blocks.
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            description: EcoString::new(),
            file_type: default_file_type(),
            title: EcoString::new(),
            header: EcoString::new(),
            footer: EcoString::new(),
            font: default_font(),
            font_size: DEFAULT_FONT_SIZE,
            text_color: default_text_color(),
            auto_index: false,
            structure: Structure::default(),
        }
    }

    /// A copy of `template` named `"{name} (Copia)"`.
    pub fn duplicate_of(template: &Template) -> Self {
        Self {
            name: eco_format!("{} (Copia)", template.draft.name),
            ..template.draft.clone()
        }
    }

    /// The draft with its blocks sanitized, ready to be submitted.
    pub fn sanitized(&self) -> Result<Self, ValidationError> {
        let blocks = sanitize(&self.structure.blocks)?;
        Ok(Self {
            structure: Structure {
                blocks,
                ..self.structure.clone()
            },
            ..self.clone()
        })
    }
}

/// A stored template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// The server-assigned identifier.
    pub id: EcoString,
    /// The editable fields.
    #[serde(flatten)]
    pub draft: TemplateDraft,
    /// `creado_por`
    #[serde(rename = "creado_por", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
    /// `creado_en`
    #[serde(rename = "creado_en", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<EcoString>,
    /// `estilos_detectados`, filled in by the server for imported documents.
    #[serde(
        rename = "estilos_detectados",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detected_styles: Option<DetectedStyles>,
}

impl Template {
    /// The template name.
    pub fn name(&self) -> &str {
        &self.draft.name
    }

    /// The structure of the template.
    pub fn structure(&self) -> &Structure {
        &self.draft.structure
    }

    /// A short label for the file type.
    pub fn file_type_label(&self) -> &'static str {
        if self.draft.file_type == DEFAULT_FILE_TYPE {
            "Word"
        } else {
            "Otro"
        }
    }
}

/// Keeps the templates whose name contains `query`, ignoring case.
pub fn filter_by_name<'a>(templates: &'a [Template], query: &str) -> Vec<&'a Template> {
    let query = query.trim().to_lowercase();
    templates
        .iter()
        .filter(|template| template.name().to_lowercase().contains(&query))
        .collect()
}

/// The author of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user identifier.
    pub id: EcoString,
    /// The login name.
    #[serde(default)]
    pub username: EcoString,
    /// The e-mail address.
    #[serde(default)]
    pub email: EcoString,
    /// The role of the user.
    #[serde(default)]
    pub role: UserRole,
}

/// The role of a [`User`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// `admin`
    Admin,
    /// `revisor`
    Revisor,
    /// `editor`
    Editor,
    /// `usuario`
    #[default]
    Usuario,
    /// A role this client does not know about.
    #[serde(other)]
    Other,
}

/// Styles found by the server in an imported document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedStyles {
    /// `nombres_estilos`
    #[serde(rename = "nombres_estilos", default, skip_serializing_if = "Vec::is_empty")]
    pub style_names: Vec<EcoString>,
    /// `estilos_personalizados`
    #[serde(
        rename = "estilos_personalizados",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub custom_styles: Vec<CustomStyle>,
}

/// A named character style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomStyle {
    /// `nombre`
    #[serde(rename = "nombre")]
    pub name: EcoString,
    /// `fuente`
    #[serde(rename = "fuente", default, skip_serializing_if = "Option::is_none")]
    pub font: Option<EcoString>,
    /// `tamano_fuente`
    #[serde(rename = "tamano_fuente", default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// `color`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<EcoString>,
    /// `negrita`
    #[serde(rename = "negrita", default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// `cursiva`
    #[serde(rename = "cursiva", default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

fn default_file_type() -> EcoString {
    DEFAULT_FILE_TYPE.into()
}

fn default_font() -> EcoString {
    DEFAULT_FONT.into()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_text_color() -> EcoString {
    DEFAULT_TEXT_COLOR.into()
}

fn nullable_file_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EcoString, D::Error> {
    Option::deserialize(deserializer).map(|value| value.unwrap_or_else(default_file_type))
}

fn nullable_font<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EcoString, D::Error> {
    Option::deserialize(deserializer).map(|value| value.unwrap_or_else(default_font))
}

fn nullable_font_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    Option::deserialize(deserializer).map(|value| value.unwrap_or(DEFAULT_FONT_SIZE))
}

fn nullable_text_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EcoString, D::Error> {
    Option::deserialize(deserializer).map(|value| value.unwrap_or_else(default_text_color))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::block::BlockKind;

    fn record(value: serde_json::Value) -> Template {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_settings_take_defaults() {
        let template = record(json!({
            "id": "t1",
            "nombre": "Informe",
            "descripcion": null,
            "fuente": null,
            "creado_por": { "id": "u1", "username": "ana", "email": "a@x", "role": "auditor" }
        }));

        assert_eq!(template.draft.file_type, "WORD");
        assert_eq!(template.draft.font, "Arial");
        assert_eq!(template.draft.font_size, 12.0);
        assert_eq!(template.draft.text_color, "#000000");
        assert!(!template.draft.auto_index);
        assert!(template.structure().is_empty());
        assert_eq!(template.created_by.as_ref().unwrap().role, UserRole::Other);
        assert_eq!(template.file_type_label(), "Word");
    }

    #[test]
    fn record_with_structure() {
        let template = record(json!({
            "id": "t2",
            "nombre": "Acta",
            "descripcion": "",
            "tipo_archivo": "PDF",
            "tamano_fuente": 10.5,
            "estructura": {
                "tipo": "documento",
                "titulo": "Acta de inicio",
                "bloques": [{ "tipo": "placeholder", "clave": "fecha" }]
            },
            "estilos_detectados": {
                "estilos_personalizados": [{ "nombre": "Cita", "cursiva": true }]
            }
        }));

        assert_eq!(template.file_type_label(), "Otro");
        assert_eq!(template.draft.font_size, 10.5);
        assert_eq!(template.structure().title.as_deref(), Some("Acta de inicio"));
        assert_eq!(template.structure().blocks[0].kind(), Some(BlockKind::Placeholder));
        let styles = template.detected_styles.unwrap();
        assert_eq!(styles.custom_styles[0].italic, Some(true));
    }

    #[test]
    fn draft_payload() {
        let mut draft = TemplateDraft::new("Nueva");
        draft.structure.blocks.push(BlockKind::Placeholder.create());

        assert_eq!(
            serde_json::to_value(draft.sanitized().unwrap()).unwrap(),
            json!({
                "nombre": "Nueva",
                "descripcion": "",
                "tipo_archivo": "WORD",
                "titulo": "",
                "encabezado": "",
                "pie_pagina": "",
                "fuente": "Arial",
                "tamano_fuente": 12.0,
                "color_texto": "#000000",
                "autogenerar_indice": false,
                "estructura": {
                    "tipo": "documento",
                    "bloques": [{ "tipo": "placeholder", "clave": "placeholder_1" }]
                }
            })
        );

        assert_eq!(
            TemplateDraft::new("Vacía").sanitized(),
            Err(ValidationError::EmptyStructure)
        );
    }

    #[test]
    fn duplicate_and_search() {
        let templates = vec![
            record(json!({ "id": "1", "nombre": "Informe Anual" })),
            record(json!({ "id": "2", "nombre": "acta" })),
            record(json!({ "id": "3", "nombre": "Informe mensual" })),
        ];

        let names: Vec<_> = filter_by_name(&templates, "INFORME")
            .into_iter()
            .map(Template::name)
            .collect();
        assert_eq!(names, ["Informe Anual", "Informe mensual"]);
        assert_eq!(filter_by_name(&templates, "").len(), 3);

        let copy = TemplateDraft::duplicate_of(&templates[1]);
        assert_eq!(copy.name, "acta (Copia)");
        assert_eq!(copy.font, templates[1].draft.font);
    }
}
