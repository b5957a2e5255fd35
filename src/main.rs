use anyhow::{anyhow, Result};
use log::{error, info};
use crate::initialization::init;
use crate::worker::run;

mod config;
mod initialization;
mod logging;
mod manager_google_auth;
mod manager_nest;
mod manager_sheets;
mod manager_weather;
mod mapper;
pub mod models;
mod worker;

#[cfg(test)]
mod test_server;

fn main() -> Result<()> {
    // Load config and set up all managers. If initialization fails, we are pretty much out of luck
    // and can't even log.
    let mgr = match init() {
        Ok(m) => m,
        Err(e) => {
            return Err(anyhow!("Initialization failed: {}", e));
        }
    };

    match run(&mgr) {
        Ok(_) => {
            info!("Row appended");
        },
        Err(e) => {
            error!("Run failed: {}", e);
            return Err(e)?;
        }
    }

    Ok(())
}
