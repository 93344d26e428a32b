use serde::Deserialize;
use tracing::{info, warn};

use super::wrap_unless_expired;
use crate::{
    api::{extract_data, extract_list, ApiClient},
    dates,
    error::{Error, Result, VehicleFailure},
    listing::DeleteConfirmation,
    models::{
        deserialize_id, deserialize_optional_id, Customer, CustomerFields, CustomerSummary,
        Vehicle,
    },
};

/// Customer plus its vehicle rows, as held by a create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerForm {
    /// Server id; `None` on the create form.
    pub id: Option<i64>,
    pub name: String,
    /// `yyyy-mm-dd`, sent verbatim.
    pub birth_date: String,
    pub vehicles: Vec<Vehicle>,
}

impl CustomerForm {
    /// Empty create form with one blank vehicle row.
    pub fn new() -> Self {
        Self {
            vehicles: vec![Vehicle::default()],
            ..Self::default()
        }
    }

    /// Append a blank vehicle row.
    pub fn add_vehicle(&mut self) -> usize {
        self.vehicles.push(Vehicle::default());
        self.vehicles.len() - 1
    }

    /// Customer fields as sent to the API.
    pub fn fields(&self) -> CustomerFields {
        CustomerFields {
            name: self.name.clone(),
            birth_date: self.birth_date.clone(),
        }
    }
}

impl From<Customer> for CustomerForm {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            birth_date: customer.birth_date,
            vehicles: customer.vehicles,
        }
    }
}

/// Result of a fully successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCustomer {
    /// Server-assigned customer id.
    pub id: i64,
    /// Ids returned for the created vehicles, in submission order when known.
    pub vehicle_ids: Vec<i64>,
}

/// Counts for a fully successful update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Vehicles created with `POST /carro/cad`.
    pub created: usize,
    /// Vehicles updated with `PUT /carro/edit/:id`.
    pub updated: usize,
    /// Blank rows that were not sent.
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct CreatedCustomerId {
    #[serde(deserialize_with = "deserialize_id")]
    id_cliente: i64,
}

#[derive(Debug, Deserialize)]
struct CreatedVehicleId {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id_carro: Option<i64>,
}

/// Customer CRUD against `/cliente/*`, orchestrating vehicles on `/carro/*`.
///
/// Every multi-request workflow runs strictly in order, awaiting each response
/// before the next request, so a vehicle is never posted before its owner
/// exists. Nothing is retried and nothing is rolled back.
#[derive(Debug, Clone)]
pub struct CustomerController {
    api: ApiClient,
}

impl CustomerController {
    /// Controller issuing requests through `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All customers with their vehicle summaries.
    pub async fn list(&self) -> Result<Vec<CustomerSummary>> {
        let body = self.api.get("/cliente/").await?;
        extract_list(&body, "/data/clientes")
    }

    /// Load one customer into a form, converting its birth date for editing.
    pub async fn fetch(&self, id: i64) -> Result<CustomerForm> {
        let body = self.api.get(&format!("/cliente/pesquisa/{id}")).await?;
        let mut customer: Customer = extract_data(&body, "/data")?;
        customer.id = Some(id);
        customer.birth_date = dates::to_input(&customer.birth_date);
        for vehicle in &mut customer.vehicles {
            vehicle.owner_customer_id = Some(id);
        }
        Ok(customer.into())
    }

    /// Create a customer, then each vehicle in order under the new id.
    ///
    /// If the customer itself fails, no vehicle is sent. If a vehicle fails,
    /// the pipeline stops there and the error names that vehicle; the customer
    /// and the vehicles before it stay created.
    pub async fn create(
        &self,
        fields: &CustomerFields,
        vehicles: &[Vehicle],
    ) -> Result<CreatedCustomer> {
        let body = self
            .api
            .post("/cliente/cad", fields)
            .await
            .map_err(|err| wrap_unless_expired(err, Error::CustomerNotCreated))?;
        let created: CreatedCustomerId = extract_data(&body, "/data")
            .map_err(|err| Error::CustomerNotCreated(Box::new(err)))?;
        let customer_id = created.id_cliente;
        info!(customer_id, vehicles = vehicles.len(), "customer created");

        let mut vehicle_ids = Vec::with_capacity(vehicles.len());
        for (index, vehicle) in vehicles.iter().enumerate() {
            match self
                .api
                .post("/carro/cad", &vehicle.payload(customer_id))
                .await
            {
                Ok(body) => {
                    let created = extract_data::<CreatedVehicleId>(&body, "/data");
                    if let Ok(CreatedVehicleId { id_carro: Some(id) }) = created {
                        vehicle_ids.push(id);
                    }
                }
                Err(err) if err.is_session_expired() => return Err(err),
                Err(err) => {
                    let label = vehicle.label(index);
                    warn!(customer_id, index, %label, %err, "vehicle creation failed");
                    return Err(Error::VehicleNotCreated {
                        customer_id,
                        label,
                        created: vehicle_ids,
                        source: Box::new(err),
                    });
                }
            }
        }

        Ok(CreatedCustomer {
            id: customer_id,
            vehicle_ids,
        })
    }

    /// Update a customer, then sync its vehicles one by one.
    ///
    /// Rows with blank model and plate are skipped. Rows with an id are
    /// updated, the rest created. A failing vehicle does not stop the others;
    /// all failures are reported together at the end.
    pub async fn update(
        &self,
        id: i64,
        fields: &CustomerFields,
        vehicles: &[Vehicle],
    ) -> Result<SyncReport> {
        self.api
            .put(&format!("/cliente/edit/{id}"), fields)
            .await
            .map_err(|err| wrap_unless_expired(err, Error::CustomerNotUpdated))?;

        let mut report = SyncReport::default();
        let mut failures = Vec::new();
        for (index, vehicle) in vehicles.iter().enumerate() {
            if vehicle.is_blank() {
                report.skipped += 1;
                continue;
            }

            let payload = vehicle.payload(id);
            let result = match vehicle.id {
                Some(vehicle_id) => {
                    self.api
                        .put(&format!("/carro/edit/{vehicle_id}"), &payload)
                        .await
                }
                None => self.api.post("/carro/cad", &payload).await,
            };

            match result {
                Ok(_) if vehicle.id.is_some() => report.updated += 1,
                Ok(_) => report.created += 1,
                Err(err) if err.is_session_expired() => return Err(err),
                Err(err) => {
                    let label = vehicle.label(index);
                    warn!(customer_id = id, index, %label, %err, "vehicle sync failed");
                    failures.push(VehicleFailure {
                        index,
                        label,
                        message: err.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(Error::VehiclesNotSynced { failures });
        }
        info!(
            customer_id = id,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "customer updated"
        );
        Ok(report)
    }

    /// Remove the vehicle row at `index` from the form.
    ///
    /// Saved vehicles are deleted on the server first; if that fails the row
    /// stays. Unsaved rows are dropped without a request.
    pub async fn remove_vehicle(&self, form: &mut CustomerForm, index: usize) -> Result<Vehicle> {
        let vehicle_id = form
            .vehicles
            .get(index)
            .map(|vehicle| vehicle.id)
            .ok_or_else(|| Error::Validation(format!("no vehicle at position {}", index + 1)))?;

        if let Some(vehicle_id) = vehicle_id {
            self.api
                .delete(&format!("/carro/delete/{vehicle_id}"))
                .await?;
            info!(vehicle_id, "vehicle deleted");
        }
        Ok(form.vehicles.remove(index))
    }

    /// Delete a confirmed customer. Its vehicles are left untouched.
    pub async fn delete(&self, confirmation: DeleteConfirmation) -> Result<i64> {
        let id = confirmation.id();
        self.api.delete(&format!("/cliente/delete/{id}")).await?;
        info!(id, "customer deleted");
        Ok(id)
    }
}
