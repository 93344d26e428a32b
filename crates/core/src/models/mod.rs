//! Shared domain models and their wire representations.
//!
//! The REST API speaks Portuguese field names (`nome`, `placa`, ...); the
//! Rust types use English names and map them with serde renames.

mod customer;
mod operator;

use serde::{de, Deserialize, Deserializer, Serialize};

pub use customer::{
    Customer, CustomerFields, CustomerSummary, Vehicle, VehiclePayload, VehicleSummary,
};
pub use operator::{Operator, OperatorFields, OperatorPayload};

/// Profile of the logged-in operator, persisted as `usuarioLogado`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Server id of the operator.
    #[serde(rename = "id_operador", deserialize_with = "deserialize_id")]
    pub operator_id: i64,
    /// Display name.
    #[serde(rename = "nome")]
    pub name: String,
    /// Login email.
    pub email: String,
    /// Whether the operator may see every record.
    #[serde(rename = "admin", default)]
    pub is_admin: bool,
}

/// Body returned by `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Admin flag of the operator.
    #[serde(default, deserialize_with = "deserialize_nullable_bool")]
    pub admin: bool,
    /// Server id of the operator.
    #[serde(deserialize_with = "deserialize_id")]
    pub id_operador: i64,
    /// Display name.
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub nome: String,
    /// Login email.
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub email: String,
}

impl LoginResponse {
    /// Profile stored alongside the token.
    pub fn profile(&self) -> Profile {
        Profile {
            operator_id: self.id_operador,
            name: self.nome.clone(),
            email: self.email.clone(),
            is_admin: self.admin,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// Accept ids sent either as JSON numbers or numeric strings.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(value) => Ok(value),
        RawId::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid id '{text}'"))),
    }
}

/// Optional variant of [`deserialize_id`]; `null` and missing map to `None`.
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(value)) => Ok(Some(value)),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid id '{text}'"))),
    }
}

/// Accept `null` where a string is expected.
pub(crate) fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `null` where a boolean is expected.
pub(crate) fn deserialize_nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_response_builds_profile() {
        let response: LoginResponse = serde_json::from_value(json!({
            "token": "T1",
            "admin": false,
            "id_operador": 7,
            "nome": "Ana",
            "email": "a@b.com"
        }))
        .expect("valid login body");

        let profile = response.profile();
        assert_eq!(profile.operator_id, 7);
        assert_eq!(profile.name, "Ana");
        assert!(!profile.is_admin);
    }

    #[test]
    fn ids_may_arrive_as_strings() {
        let profile: Profile = serde_json::from_value(json!({
            "id_operador": "12",
            "nome": "Bia",
            "email": "bia@yard.com",
            "admin": true
        }))
        .expect("string id accepted");
        assert_eq!(profile.operator_id, 12);

        let serialized = serde_json::to_value(&profile).expect("serializable");
        assert_eq!(serialized["id_operador"], json!(12));
        assert_eq!(serialized["admin"], json!(true));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let result = serde_json::from_value::<Profile>(json!({
            "id_operador": "abc",
            "nome": "X",
            "email": "x@y.z"
        }));
        assert!(result.is_err());
    }
}
