//! The blocking HTTP client.

use std::path::PathBuf;

use dossier_template::{Submission, Template, TemplateDraft};
use ecow::{EcoString, eco_format};
use reqwest::Method;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::{Certificate, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::document::{Document, DocumentFromTemplate, DocumentKind, GeneratedTemplate, Module};
use crate::error::{ApiError, ApiResult};

/// The server used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// How to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// The root URL of the API, without a trailing slash.
    pub base_url: EcoString,
    /// A bearer token sent with every request.
    pub token: Option<EcoString>,
    /// A PEM certificate to trust in addition to the system roots.
    pub cert_path: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: None,
            cert_path: None,
        }
    }
}

/// A client of the template and document endpoints.
///
/// Every call is a single blocking request. Nothing is retried, and updates
/// overwrite whatever the server holds.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: EcoString,
    token: Option<EcoString>,
    http: reqwest::blocking::Client,
}

impl Client {
    /// Creates a client.
    pub fn new(options: &ClientOptions) -> ApiResult<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(cert_path) = &options.cert_path {
            let cert = std::fs::read(cert_path)
                .ok()
                .and_then(|buf| Certificate::from_pem(&buf).ok());
            match cert {
                Some(cert) => builder = builder.add_root_certificate(cert),
                None => log::warn!("ignoring unreadable certificate {}", cert_path.display()),
            }
        }

        Ok(Self {
            base_url: options.base_url.trim_end_matches('/').into(),
            token: options.token.clone().filter(|token| !token.is_empty()),
            http: builder.build()?,
        })
    }

    /// The root URL of the API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /plantillas`
    pub fn list_templates(&self) -> ApiResult<Vec<Template>> {
        self.call(Method::GET, "/plantillas", "Error al cargar plantillas")
    }

    /// `GET /plantillas/{id}`
    pub fn get_template(&self, id: &str) -> ApiResult<Template> {
        let path = eco_format!("/plantillas/{id}");
        self.call(Method::GET, &path, "Error al cargar la plantilla")
    }

    /// `POST /plantillas`. The draft is sanitized first.
    pub fn create_template(&self, draft: &TemplateDraft) -> ApiResult<Template> {
        let draft = draft.sanitized()?;
        self.call_with(Method::POST, "/plantillas", &draft, "Error al crear plantilla")
    }

    /// `PATCH /plantillas/{id}`. The draft is sanitized first.
    pub fn update_template(&self, id: &str, draft: &TemplateDraft) -> ApiResult<Template> {
        let draft = draft.sanitized()?;
        let path = eco_format!("/plantillas/{id}");
        self.call_with(Method::PATCH, &path, &draft, "Error al actualizar plantilla")
    }

    /// Sends the outcome of an edit session.
    pub fn submit(&self, submission: &Submission) -> ApiResult<Template> {
        match submission {
            Submission::Create(draft) => self.create_template(draft),
            Submission::Update { id, draft } => self.update_template(id, draft),
        }
    }

    /// `DELETE /plantillas/{id}`
    pub fn delete_template(&self, id: &str) -> ApiResult<()> {
        let path = eco_format!("/plantillas/{id}");
        self.send(self.request(Method::DELETE, &path), "Error al eliminar plantilla")?;
        Ok(())
    }

    /// `POST /plantillas/{id}/duplicate`
    pub fn duplicate_template(&self, id: &str) -> ApiResult<Template> {
        let path = eco_format!("/plantillas/{id}/duplicate");
        self.call(Method::POST, &path, "Error al duplicar plantilla")
    }

    /// `GET /documentos`
    pub fn list_documents(&self) -> ApiResult<Vec<Document>> {
        self.call(Method::GET, "/documentos", "Error al cargar documentos")
    }

    /// `GET /modulos`
    pub fn list_modules(&self) -> ApiResult<Vec<Module>> {
        self.call(Method::GET, "/modulos", "Error al cargar datos iniciales")
    }

    /// `POST /documentos/word/from-plantilla/{id}`. Incomplete requests are
    /// rejected without contacting the server.
    pub fn create_document_from_template(
        &self,
        template_id: &str,
        request: &DocumentFromTemplate,
    ) -> ApiResult<Document> {
        request.validate(template_id)?;
        let path = eco_format!("/documentos/word/from-plantilla/{}", template_id.trim());
        self.call_with(
            Method::POST,
            &path,
            request,
            "Error al crear documento desde plantilla",
        )
    }

    /// `PATCH /documentos/{id}` with a new kind.
    pub fn set_document_kind(&self, id: &str, kind: DocumentKind) -> ApiResult<Document> {
        let path = eco_format!("/documentos/{id}");
        self.call_with(
            Method::PATCH,
            &path,
            &json!({ "tipo": kind }),
            "Error al actualizar documento",
        )
    }

    /// Turns a stored document into a template.
    ///
    /// The server derives the template, then the document itself is marked
    /// as a template.
    pub fn generate_template(&self, document_id: &str) -> ApiResult<GeneratedTemplate> {
        let path = eco_format!("/documentos/generar-plantilla/{document_id}");
        let generated: GeneratedTemplate =
            self.call(Method::POST, &path, "Error al generar plantilla")?;
        self.set_document_kind(document_id, DocumentKind::Template)?;
        Ok(generated)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = eco_format!("{}{path}", self.base_url);
        log::debug!("{method} {url}");
        let request = self.http.request(method, url.as_str());
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self.send(self.request(method, path), fallback)?;
        decode(response)
    }

    fn call_with<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self.send(self.request(method, path).json(body), fallback)?;
        decode(response)
    }

    fn send(&self, request: RequestBuilder, fallback: &str) -> ApiResult<Response> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let err = ApiError::remote(status.as_u16(), &body, fallback);
        if status == StatusCode::UNAUTHORIZED {
            log::warn!("the server rejected the credentials: {err}");
        } else {
            log::debug!("request failed: {err}");
        }
        Err(err)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes()?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use dossier_template::{Block, BlockKind, Edit, EditSession};

    use super::*;

    /// Answers one request per response, in order, and hands back the raw
    /// requests.
    fn serve(responses: Vec<(u16, &'static str)>) -> (ClientOptions, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            requests
        });

        let options = ClientOptions {
            base_url: base_url.into(),
            ..ClientOptions::default()
        };
        (options, handle)
    }

    fn read_request(stream: &mut impl Read) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length || n == 0 {
                    return String::from_utf8_lossy(&data).into_owned();
                }
            } else if n == 0 {
                return text.into_owned();
            }
        }
    }

    fn body_of(request: &str) -> serde_json::Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    const TEMPLATE: &str = r##"{
        "id": "t1",
        "nombre": "Acta",
        "descripcion": null,
        "fuente": "Arial",
        "tamano_fuente": 12,
        "color_texto": "#000000",
        "autogenerar_indice": false,
        "creado_por": { "id": "u1", "username": "ana", "email": "ana@example.com", "role": "editor" },
        "creado_en": "2024-05-01T10:00:00.000Z",
        "estructura": { "tipo": "documento", "bloques": [{ "tipo": "capitulo", "titulo": "Uno", "bloques": [] }] }
    }"##;

    #[test]
    fn fetch_templates() {
        let list: &'static str = format!("[{TEMPLATE}]").leak();
        let (mut options, server) = serve(vec![(200, list), (200, TEMPLATE)]);
        options.token = Some("secret".into());
        let client = Client::new(&options).unwrap();

        let templates = client.list_templates().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name(), "Acta");
        assert_eq!(templates[0].draft.description, "");

        let template = client.get_template("t1").unwrap();
        assert_eq!(template.structure().blocks[0].kind(), Some(BlockKind::Chapter));

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /plantillas HTTP/1.1"));
        assert!(requests[0].to_lowercase().contains("authorization: bearer secret"));
        assert!(requests[1].starts_with("GET /plantillas/t1 HTTP/1.1"));
    }

    #[test]
    fn submissions_are_sanitized() {
        let (options, server) = serve(vec![(201, TEMPLATE)]);
        let client = Client::new(&options).unwrap();

        let mut session = EditSession::create(TemplateDraft::new("Acta"));
        session.apply(&Edit::AddBlock(BlockKind::Chapter)).unwrap();
        let template = client.submit(&session.submission().unwrap()).unwrap();
        assert_eq!(template.id, "t1");

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /plantillas HTTP/1.1"));
        assert!(!requests[0].to_lowercase().contains("authorization"));
        let body = body_of(&requests[0]);
        assert_eq!(body["nombre"], "Acta");
        assert_eq!(body["estructura"]["bloques"][0]["titulo"], "capitulo 1");
    }

    #[test]
    fn empty_structures_are_not_sent() {
        let client = Client::new(&ClientOptions {
            base_url: "http://127.0.0.1:9".into(),
            ..ClientOptions::default()
        })
        .unwrap();

        let err = client.update_template("t1", &TemplateDraft::new("Vacía")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut draft = TemplateDraft::new("Rota");
        draft.structure.blocks = vec![Block::Corrupt(serde_json::Value::Null)];
        assert!(matches!(client.create_template(&draft), Err(ApiError::Validation(_))));
    }

    #[test]
    fn server_errors_carry_the_message() {
        let (options, server) = serve(vec![
            (409, r#"{"statusCode":409,"message":"La plantilla está en uso"}"#),
            (500, "oops"),
        ]);
        let client = Client::new(&options).unwrap();

        let err = client.delete_template("t1").unwrap_err();
        assert!(matches!(err, ApiError::Remote { status: 409, .. }));
        assert_eq!(err.message(), "La plantilla está en uso");

        let err = client.duplicate_template("t1").unwrap_err();
        assert_eq!(err.message(), "Error al duplicar plantilla");

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("DELETE /plantillas/t1 HTTP/1.1"));
        assert!(requests[1].starts_with("POST /plantillas/t1/duplicate HTTP/1.1"));
    }

    #[test]
    fn documents_from_templates() {
        let document = r#"{"id":"d9","nombre":"Informe","tipo":"informe","version":1}"#;
        let (options, server) = serve(vec![(201, document)]);
        let client = Client::new(&options).unwrap();

        let request = DocumentFromTemplate {
            module_id: "m1".into(),
            name: "Informe".into(),
            kind: DocumentKind::Report,
            annexes: vec!["d1".into(), "d2".into()],
        };
        assert!(matches!(
            client.create_document_from_template("", &request),
            Err(ApiError::Validation(_))
        ));

        let created = client.create_document_from_template("t1", &request).unwrap();
        assert_eq!(created.kind, DocumentKind::Report);

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("POST /documentos/word/from-plantilla/t1 HTTP/1.1"));
        assert_eq!(body_of(&requests[0])["anexos"], json!(["d1", "d2"]));
    }

    #[test]
    fn generate_template_marks_the_document() {
        let generated = r#"{"message":"Plantilla generada","plantillaId":"t7","nombre":"Acta"}"#;
        let document = r#"{"id":"d1","nombre":"Acta","tipo":"plantilla"}"#;
        let (options, server) = serve(vec![(201, generated), (200, document)]);
        let client = Client::new(&options).unwrap();

        let generated = client.generate_template("d1").unwrap();
        assert_eq!(generated.template_id, "t7");
        assert_eq!(generated.message, "Plantilla generada");

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /documentos/generar-plantilla/d1 HTTP/1.1"));
        assert!(requests[1].starts_with("PATCH /documentos/d1 HTTP/1.1"));
        assert_eq!(body_of(&requests[1]), json!({ "tipo": "plantilla" }));
    }

    #[test]
    fn trailing_slashes_are_dropped() {
        let client = Client::new(&ClientOptions {
            base_url: "http://localhost:3000/api/".into(),
            ..ClientOptions::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
    }
}
