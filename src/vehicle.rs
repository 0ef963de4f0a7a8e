//! Vehicle record transactions
//!
//! Builds the free-text transactions stored in the ledger. The ledger never
//! parses them; reports find a vehicle by searching for its VIN.

use chrono::{Local, NaiveDate};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Register a new vehicle and its first owner
pub fn add_vehicle(vin: &str, make: &str, model: &str, year: u32, owner: &str) -> String {
    log::info!("Vehicle registered: {} {}, Owner: {}", make, model, owner);
    format!(
        "AddVehicle: {}, {}, {}, {}, Owner: {}",
        vin, make, model, year, owner
    )
}

/// Move a vehicle to a new owner
pub fn transfer_ownership(vin: &str, from: &str, to: &str) -> String {
    log::info!("Ownership of VIN {} transferred from {} to {}", vin, from, to);
    format!("TransferOwnership: {}, From: {}, To: {}", vin, from, to)
}

/// Record a maintenance job, dated today
pub fn record_maintenance(vin: &str, description: &str) -> String {
    record_maintenance_on(vin, description, today())
}

pub fn record_maintenance_on(vin: &str, description: &str, date: NaiveDate) -> String {
    log::info!("Maintenance recorded for {}: {}", vin, description);
    format!(
        "RecordMaintenance: {}, Description: {}, Date: {}",
        vin,
        description,
        date.format("%Y-%m-%d")
    )
}

/// Report an accident, dated today
pub fn report_accident(vin: &str, description: &str) -> String {
    report_accident_on(vin, description, today())
}

pub fn report_accident_on(vin: &str, description: &str, date: NaiveDate) -> String {
    log::info!("Accident reported for {}: {}", vin, description);
    format!(
        "ReportAccident: {}, Description: {}, Date: {}",
        vin,
        description,
        date.format("%Y-%m-%d")
    )
}
