use std::collections::HashMap;
use std::path::Path;

use crate::api::scenario_dto::ScenarioDto;
use crate::domain::scenario::{GeneratedScenario, Scenario};
use crate::domain::utils::id::{AccountName, UserName};
use crate::domain::workload::user::User;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads a scenario configuration, or the defaults when no file is given.
pub fn load_scenario_dto(file_path: Option<&Path>) -> Result<ScenarioDto> {
    match file_path {
        Some(path) => {
            let dto = parse_json_file::<ScenarioDto>(path)?;
            log::info!("Scenario configuration '{}' parsed successfully.", path.display());
            Ok(dto)
        }
        None => Ok(ScenarioDto::default()),
    }
}

/// Generates a topology and a workload on it in one go.
pub fn generate_scenario(dto: ScenarioDto, users: Vec<User>, accounts: HashMap<UserName, AccountName>) -> Result<GeneratedScenario> {
    let mut scenario = Scenario::new(dto)?;
    let generated = scenario.generate(users, accounts)?;
    log::info!(
        "Scenario generated: {} node groups, {} machines, {} jobs.",
        generated.topology.nodes().len(),
        generated.topology.total_machines(),
        generated.entries.len()
    );

    Ok(generated)
}
