//! Documents and modules, as far as template workflows need them.

use ecow::EcoString;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Shown when a document-from-template request is incomplete.
pub const INCOMPLETE_REQUEST_MESSAGE: &str =
    "Debes seleccionar una plantilla, módulo y escribir un nombre.";

/// The role of a stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// `plantilla`
    #[serde(rename = "plantilla")]
    Template,
    /// `anexo`
    #[serde(rename = "anexo")]
    Annex,
    /// `informe`
    #[serde(rename = "informe")]
    Report,
    /// `otro`
    #[default]
    #[serde(rename = "otro", other)]
    Other,
}

/// A module of a records file. Documents are filed under modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// The module identifier.
    pub id: EcoString,
    /// `numero`
    #[serde(rename = "numero", default)]
    pub number: u32,
    /// `titulo`
    #[serde(rename = "titulo", default)]
    pub title: EcoString,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The document identifier.
    pub id: EcoString,
    /// `nombre`
    #[serde(rename = "nombre", default)]
    pub name: EcoString,
    /// `tipo`
    #[serde(rename = "tipo", default)]
    pub kind: DocumentKind,
    /// The revision number.
    #[serde(default)]
    pub version: u32,
    /// The media type of the stored file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<EcoString>,
    /// `modulo`
    #[serde(rename = "modulo", default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
}

/// Keeps the documents that can be attached as annexes.
pub fn annexes(documents: &[Document]) -> Vec<&Document> {
    documents
        .iter()
        .filter(|document| document.kind == DocumentKind::Annex)
        .collect()
}

/// The body of `POST /documentos/word/from-plantilla/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFromTemplate {
    /// `modulo_id`
    #[serde(rename = "modulo_id")]
    pub module_id: EcoString,
    /// `nombre`
    #[serde(rename = "nombre")]
    pub name: EcoString,
    /// `tipo`
    #[serde(rename = "tipo")]
    pub kind: DocumentKind,
    /// `anexos`, the ids of the attached documents.
    #[serde(rename = "anexos")]
    pub annexes: Vec<EcoString>,
}

impl DocumentFromTemplate {
    /// Checks the request before it is sent.
    pub fn validate(&self, template_id: &str) -> ApiResult<()> {
        if template_id.trim().is_empty()
            || self.module_id.trim().is_empty()
            || self.name.trim().is_empty()
        {
            return Err(ApiError::Validation(INCOMPLETE_REQUEST_MESSAGE.into()));
        }
        Ok(())
    }
}

/// The answer of `POST /documentos/generar-plantilla/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTemplate {
    /// A confirmation for the user.
    #[serde(default)]
    pub message: EcoString,
    /// The id of the new template.
    #[serde(rename = "plantillaId")]
    pub template_id: EcoString,
    /// The name of the new template.
    #[serde(rename = "nombre", default)]
    pub name: EcoString,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_documents() {
        let documents: Vec<Document> = serde_json::from_value(json!([
            {
                "id": "d1",
                "nombre": "Anexo A",
                "tipo": "anexo",
                "version": 2,
                "mime_type": "application/pdf",
                "modulo": { "id": "m1", "numero": 3, "titulo": "Capítulo 3", "estado": "borrador" },
                "ruta_archivo": "x/y.pdf"
            },
            { "id": "d2", "nombre": "Informe", "tipo": "informe", "modulo": null },
            { "id": "d3", "nombre": "Raro", "tipo": "borrador" }
        ]))
        .unwrap();

        assert_eq!(documents[0].module.as_ref().map(|m| m.number), Some(3));
        assert_eq!(documents[1].module, None);
        assert_eq!(documents[2].kind, DocumentKind::Other);

        let annexes = annexes(&documents);
        assert_eq!(annexes.len(), 1);
        assert_eq!(annexes[0].id, "d1");
    }

    #[test]
    fn validate_document_requests() {
        let mut request = DocumentFromTemplate {
            module_id: "m1".into(),
            name: "Informe final".into(),
            kind: DocumentKind::Report,
            annexes: vec!["d1".into()],
        };
        assert!(request.validate("t1").is_ok());
        assert!(request.validate(" ").is_err());

        request.name = "   ".into();
        let err = request.validate("t1").unwrap_err();
        assert_eq!(err.message(), INCOMPLETE_REQUEST_MESSAGE);

        request.name = "Informe".into();
        request.module_id = EcoString::new();
        assert!(matches!(request.validate("t1"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn encode_document_request() {
        let request = DocumentFromTemplate {
            module_id: "m1".into(),
            name: "Acta".into(),
            kind: DocumentKind::Template,
            annexes: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "modulo_id": "m1", "nombre": "Acta", "tipo": "plantilla", "anexos": [] })
        );
    }
}
