use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    api::{extract_data, extract_list, ApiClient},
    error::{Error, Result},
    listing::DeleteConfirmation,
    models::{
        deserialize_nullable_bool, deserialize_nullable_string, Operator, OperatorFields,
        OperatorPayload,
    },
};

/// Minimum password length accepted on create (and on update when changed).
pub const MIN_PASSWORD_LEN: usize = 4;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

#[derive(Debug, Deserialize)]
struct OperatorDetail {
    #[serde(rename = "nome", default, deserialize_with = "deserialize_nullable_string")]
    name: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    email: String,
    #[serde(rename = "admin", default, deserialize_with = "deserialize_nullable_bool")]
    is_admin: bool,
}

/// Operator CRUD against `/operador/*`.
#[derive(Debug, Clone)]
pub struct OperatorController {
    api: ApiClient,
}

impl OperatorController {
    /// Controller issuing requests through `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All operators visible to the caller.
    ///
    /// Non-admins only see their own record. This is a display filter; the
    /// server remains the authority on what each operator may access.
    pub async fn list(&self) -> Result<Vec<Operator>> {
        let body = self.api.get("/operador/").await?;
        let operators: Vec<Operator> = extract_list(&body, "/data/operador")?;

        let session = self.api.session();
        if session.is_admin() {
            return Ok(operators);
        }
        let own_id = session.profile().map(|profile| profile.operator_id);
        let visible: Vec<Operator> = operators
            .into_iter()
            .filter(|operator| Some(operator.id) == own_id)
            .collect();
        debug!(visible = visible.len(), "filtered operator list for non-admin");
        Ok(visible)
    }

    /// Load one operator for the edit form.
    pub async fn fetch(&self, id: i64) -> Result<Operator> {
        let body = self.api.get(&format!("/operador/pesquisa/{id}")).await?;
        let detail: OperatorDetail = extract_data(&body, "/data")?;
        Ok(Operator {
            id,
            name: detail.name,
            email: detail.email,
            is_admin: detail.is_admin,
        })
    }

    /// Validate and create an operator. Invalid input never reaches the network.
    pub async fn create(&self, fields: &OperatorFields) -> Result<Value> {
        let payload = validate_create(fields)?;
        let body = self.api.post("/operador/cad", &payload).await?;
        info!(email = %payload.email, "operator created");
        Ok(body)
    }

    /// Update an operator; a blank password leaves the stored one unchanged.
    pub async fn update(&self, id: i64, fields: &OperatorFields) -> Result<Value> {
        let payload = validate_update(fields)?;
        let body = self
            .api
            .put(&format!("/operador/edit/{id}"), &payload)
            .await?;
        info!(id, password_changed = payload.password.is_some(), "operator updated");
        Ok(body)
    }

    /// Delete a confirmed operator and return its id so the caller can drop it
    /// from its list.
    pub async fn remove(&self, confirmation: DeleteConfirmation) -> Result<i64> {
        let id = confirmation.id();
        self.api.delete(&format!("/operador/delete/{id}")).await?;
        info!(id, "operator deleted");
        Ok(id)
    }
}

fn validate_identity(fields: &OperatorFields) -> Result<(String, String)> {
    let name = fields.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("name is required".to_string()));
    }
    let email = fields.email.as_str();
    if email.trim().is_empty() {
        return Err(Error::Validation("email is required".to_string()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(Error::Validation("invalid email".to_string()));
    }
    Ok((name.to_string(), email.to_string()))
}

fn password_too_short() -> Error {
    Error::Validation(format!(
        "password must be at least {MIN_PASSWORD_LEN} characters"
    ))
}

/// Checks run before `POST /operador/cad`.
pub fn validate_create(fields: &OperatorFields) -> Result<OperatorPayload> {
    let (name, email) = validate_identity(fields)?;
    if fields.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(password_too_short());
    }
    Ok(OperatorPayload {
        name,
        email,
        password: Some(fields.password.clone()),
        is_admin: fields.is_admin,
    })
}

/// Checks run before `PUT /operador/edit/:id`; blank password means unchanged.
pub fn validate_update(fields: &OperatorFields) -> Result<OperatorPayload> {
    let (name, email) = validate_identity(fields)?;
    let password = if fields.password.trim().is_empty() {
        None
    } else if fields.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(password_too_short());
    } else {
        Some(fields.password.clone())
    };
    Ok(OperatorPayload {
        name,
        email,
        password,
        is_admin: fields.is_admin,
    })
}
