use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;

/// A request on its way through the `Gateway`.
///
/// `retried` flips to true when the gateway replays the request after a
/// credential renewal; a request is never replayed twice.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `"cart/add/"`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub retried: bool,
    /// Attach the session's access credential and renew it on a 401
    pub authenticated: bool,
}

/// Payload of a request. Kept as plain data so a replay can rebuild it.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<FormPart>),
}

/// One field of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl ToString) -> Self {
        FormPart::Text {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Build a fresh multipart form from `parts`
pub(crate) fn build_form(parts: &[FormPart]) -> reqwest::Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let file = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn queries(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Serialize `body` as the JSON payload
    pub fn json<B: Serialize>(mut self, body: &B) -> serde_json::Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Send `parts` as multipart/form-data
    pub fn form(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(RequestBody::Form(parts));
        self
    }

    /// Send without credentials (sign-in, registration)
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}
