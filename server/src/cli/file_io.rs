//! Import and export of the club's static configuration (locations and their tables) as JSON file
use crate::cli::CliAuthTokenKey;
use crate::cli_error::CliError;
use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::LocationWithTables;
use crate::data_store::{get_store_from_env, ReservationStore};
use log::info;
use rezervari_api_types::Location;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read a JSON list of locations with their tables from the given file and create or update them
/// in the database.
pub fn load_locations_from_file(path: &Path) -> Result<(), CliError> {
    let f = File::open(path).map_err(|e| file_error(path, e))?;
    let locations: Vec<Location> =
        serde_json::from_reader(BufReader::new(f)).map_err(|e| file_error(path, e))?;
    check_locations(&locations).map_err(CliError::InvalidLocations)?;

    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());
    let count = locations.len();
    data_store.import_locations(
        &auth_token,
        locations
            .into_iter()
            .map(LocationWithTables::from_api)
            .collect(),
    )?;
    info!("Imported {} location(s) from {:?}.", count, path);
    Ok(())
}

/// Write all locations with their tables to the given file, in the format read by
/// [load_locations_from_file].
pub fn export_locations_to_file(path: &Path) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let locations = data_store
        .get_locations(&auth_token)?
        .into_iter()
        .map(|location| {
            let tables = data_store.get_tables(&auth_token, location.id)?;
            Ok(location.into_api(tables))
        })
        .collect::<Result<Vec<Location>, CliError>>()?;

    let f = File::create(path).map_err(|e| file_error(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(f), &locations)
        .map_err(|e| file_error(path, e))?;
    info!("Exported {} location(s) to {:?}.", locations.len(), path);
    Ok(())
}

fn file_error(path: &Path, error: impl std::fmt::Display) -> CliError {
    CliError::FileError {
        path: path.to_owned(),
        error: error.to_string(),
    }
}

/// Check the consistency of a location configuration before it is written to the database.
fn check_locations(locations: &[Location]) -> Result<(), String> {
    let mut location_ids = HashSet::new();
    let mut table_ids = HashSet::new();
    for location in locations {
        if !location_ids.insert(location.id) {
            return Err(format!("Duplicate location id {}", location.id));
        }
        if location.name.trim().is_empty() {
            return Err(format!("Location {} has no name", location.id));
        }
        for (open, close) in [
            (location.weekday_open_hour, location.weekday_close_hour),
            (location.weekend_open_hour, location.weekend_close_hour),
        ] {
            if !(0..24).contains(&open) || close > 24 || open >= close {
                return Err(format!(
                    "Invalid opening hours {}-{} of location '{}'",
                    open, close, location.name
                ));
            }
        }
        if location.slot_duration <= 0 {
            return Err(format!(
                "Slot duration of location '{}' must be positive",
                location.name
            ));
        }
        if location.tables.is_empty() {
            return Err(format!("Location '{}' has no tables", location.name));
        }
        for table in location.tables.iter() {
            if !table_ids.insert(table.id) {
                return Err(format!("Duplicate table id {}", table.id));
            }
        }
    }
    Ok(())
}
