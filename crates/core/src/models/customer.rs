#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_nullable_string, deserialize_optional_id};

/// Row of the customer listing (`GET /cliente/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    #[serde(rename = "id_cliente", deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(rename = "nome", deserialize_with = "deserialize_nullable_string")]
    pub name: String,
    #[serde(rename = "carros", default)]
    pub vehicles: Vec<VehicleSummary>,
}

impl CustomerSummary {
    /// Comma separated `model (plate)` list for the listing view.
    pub fn vehicles_label(&self) -> String {
        if self.vehicles.is_empty() {
            return "-".to_string();
        }
        self.vehicles
            .iter()
            .map(|vehicle| format!("{} ({})", vehicle.model, vehicle.plate))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Vehicle as embedded in a listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSummary {
    #[serde(rename = "modelo", default, deserialize_with = "deserialize_nullable_string")]
    pub model: String,
    #[serde(rename = "placa", default, deserialize_with = "deserialize_nullable_string")]
    pub plate: String,
}

/// Customer with its vehicles, as edited in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Server id; absent until created.
    #[serde(
        rename = "id_cliente",
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(rename = "nome", default, deserialize_with = "deserialize_nullable_string")]
    pub name: String,
    /// Birth date string; `yyyy-mm-dd` once loaded into a form.
    #[serde(
        rename = "dt_nascimento",
        default,
        deserialize_with = "deserialize_nullable_string"
    )]
    pub birth_date: String,
    #[serde(rename = "carros", default)]
    pub vehicles: Vec<Vehicle>,
}

impl Customer {
    /// Fields sent on create and update.
    pub fn fields(&self) -> CustomerFields {
        CustomerFields {
            name: self.name.clone(),
            birth_date: self.birth_date.clone(),
        }
    }
}

/// Payload of `POST /cliente/cad` and `PUT /cliente/edit/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFields {
    #[serde(rename = "nome")]
    pub name: String,
    /// Sent verbatim from the form field.
    #[serde(rename = "dt_nascimento")]
    pub birth_date: String,
}

/// Vehicle row owned by a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Server id; absent until created.
    #[serde(
        rename = "id_carro",
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(rename = "modelo", default, deserialize_with = "deserialize_nullable_string")]
    pub model: String,
    #[serde(rename = "placa", default, deserialize_with = "deserialize_nullable_string")]
    pub plate: String,
    #[serde(rename = "cor", default, deserialize_with = "deserialize_nullable_string")]
    pub color: String,
    /// Owning customer; set once the customer exists server-side.
    #[serde(
        rename = "id_cliente",
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_customer_id: Option<i64>,
}

impl Vehicle {
    /// New unsaved vehicle.
    pub fn new(model: impl Into<String>, plate: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            model: model.into(),
            plate: plate.into(),
            color: color.into(),
            owner_customer_id: None,
        }
    }

    /// Both model and plate are blank or whitespace.
    pub fn is_blank(&self) -> bool {
        self.model.trim().is_empty() && self.plate.trim().is_empty()
    }

    /// Name used in failure messages: model, then plate, then position.
    pub fn label(&self, index: usize) -> String {
        let model = self.model.trim();
        if !model.is_empty() {
            return model.to_string();
        }
        let plate = self.plate.trim();
        if !plate.is_empty() {
            return plate.to_string();
        }
        format!("#{}", index + 1)
    }

    /// Wire payload tagged with the owning customer.
    pub fn payload(&self, customer_id: i64) -> VehiclePayload {
        VehiclePayload {
            model: self.model.clone(),
            plate: self.plate.clone(),
            color: self.color.clone(),
            customer_id,
        }
    }
}

/// Payload of `POST /carro/cad` and `PUT /carro/edit/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehiclePayload {
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "cor")]
    pub color: String,
    #[serde(rename = "id_cliente")]
    pub customer_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_customer_detail_with_vehicles() {
        let customer: Customer = serde_json::from_value(json!({
            "id_cliente": 4,
            "nome": "Joao",
            "dt_nascimento": "01/02/2000",
            "carros": [
                { "id_carro": 9, "modelo": "Fit", "placa": "ABC1234", "cor": null },
                { "id_carro": "10", "modelo": "Civic", "placa": "XYZ9876" }
            ]
        }))
        .expect("valid customer");

        assert_eq!(customer.id, Some(4));
        assert_eq!(customer.vehicles.len(), 2);
        assert_eq!(customer.vehicles[0].color, "");
        assert_eq!(customer.vehicles[1].id, Some(10));
    }

    #[test]
    fn payload_carries_owner_id() {
        let vehicle = Vehicle::new("Fit", "ABC1234", "red");
        let payload = serde_json::to_value(vehicle.payload(42)).expect("serializable");
        assert_eq!(
            payload,
            json!({ "modelo": "Fit", "placa": "ABC1234", "cor": "red", "id_cliente": 42 })
        );
    }

    #[test]
    fn labels_fall_back_to_plate_then_position() {
        assert_eq!(Vehicle::new("Civic", "X", "").label(0), "Civic");
        assert_eq!(Vehicle::new("  ", "XYZ9876", "").label(1), "XYZ9876");
        assert_eq!(Vehicle::new("", "", "blue").label(2), "#3");
        assert!(Vehicle::new(" ", "\t", "blue").is_blank());
        assert!(!Vehicle::new("", "ABC", "").is_blank());
    }

    #[test]
    fn listing_label_joins_vehicles() {
        let summary: CustomerSummary = serde_json::from_value(json!({
            "id_cliente": 1,
            "nome": "Ana",
            "carros": [{ "modelo": "Fit", "placa": "ABC1234" }, { "modelo": "Uno", "placa": "QQQ1111" }]
        }))
        .expect("valid summary");
        assert_eq!(summary.vehicles_label(), "Fit (ABC1234), Uno (QQQ1111)");

        let empty: CustomerSummary =
            serde_json::from_value(json!({ "id_cliente": 2, "nome": "Bia" })).expect("valid");
        assert_eq!(empty.vehicles_label(), "-");
    }
}
