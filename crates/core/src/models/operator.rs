#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_nullable_bool, deserialize_nullable_string};

/// Operator record as listed by the API. The password is never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(rename = "id_operador", deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(rename = "nome", default, deserialize_with = "deserialize_nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub email: String,
    #[serde(rename = "admin", default, deserialize_with = "deserialize_nullable_bool")]
    pub is_admin: bool,
}

/// Operator form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorFields {
    pub name: String,
    pub email: String,
    /// Blank on update means "leave unchanged".
    pub password: String,
    pub is_admin: bool,
}

impl From<&Operator> for OperatorFields {
    fn from(operator: &Operator) -> Self {
        Self {
            name: operator.name.clone(),
            email: operator.email.clone(),
            password: String::new(),
            is_admin: operator.is_admin,
        }
    }
}

/// Body of `POST /operador/cad` and `PUT /operador/edit/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorPayload {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    /// Omitted from the JSON entirely when `None`.
    #[serde(rename = "senha", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "admin")]
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_password_is_not_serialized() {
        let payload = OperatorPayload {
            name: "Ana".to_string(),
            email: "a@b.com".to_string(),
            password: None,
            is_admin: false,
        };
        let value = serde_json::to_value(&payload).expect("serializable");
        assert!(value.get("senha").is_none());
        assert_eq!(value["nome"], json!("Ana"));
        assert_eq!(value["admin"], json!(false));
    }

    #[test]
    fn form_fields_never_carry_the_stored_password() {
        let operator: Operator = serde_json::from_value(json!({
            "id_operador": 3,
            "nome": "Caio",
            "email": "caio@yard.com",
            "admin": true,
            "senha": "hash"
        }))
        .expect("valid operator");
        let fields = OperatorFields::from(&operator);
        assert!(fields.password.is_empty());
        assert!(fields.is_admin);
    }
}
