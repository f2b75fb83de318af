use std::process::ExitCode;

use log::error;
use murmuration::{Scenario, Simulation};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scenario = match std::env::args().nth(1) {
        Some(name) => match name.parse::<Scenario>() {
            Ok(scenario) => scenario,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Scenario::Murmuration,
    };

    log::info!("Scenario: {}", scenario);
    match Simulation::from_scenario(scenario).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
