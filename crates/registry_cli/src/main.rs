//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `registry_core` linkage and database bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use registry_core::{
    open_db, RegistryConfig, ResidentService, SqliteResidentRepository, SqliteUserRepository,
    UserService,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("registry_core ping={}", registry_core::ping());
    println!("registry_core version={}", registry_core::core_version());

    match bootstrap() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("registry bootstrap failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistryConfig::from_env()?;
    let conn = open_db(&config.db_path)?;
    let seeded = UserService::new(SqliteUserRepository::new(&conn)).seed_default_users()?;
    let residents = ResidentService::new(SqliteResidentRepository::new(&conn)).list()?;

    println!("registry db={}", config.db_path.display());
    println!("registry seeded_users={seeded} residents={}", residents.len());
    println!(
        "registry port={} grace_ms={}",
        config.port,
        config.grace_period.as_millis()
    );
    Ok(())
}
