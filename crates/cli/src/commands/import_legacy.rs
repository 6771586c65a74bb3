use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde_json::json;

use staffmove_core::PersonnelId;
use staffmove_db::legacy::{import_movements, map_personnel, ImportRejection};
use staffmove_db::{LegacyExport, LegacyValidators, SqlMovementStore, SqlPersonnelDirectory};

use crate::commands::{open_pool, prepare, to_data, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ImportLegacyArgs {
    #[arg(help = "JSON export: an object with `personnel` and `movements`, or a movement array")]
    pub path: PathBuf,
    #[arg(long, help = "Service chief assigned to undecided hierarchy steps")]
    pub chief_fallback: Option<String>,
    #[arg(long, help = "HR member assigned to undecided HR steps")]
    pub hr_fallback: Option<String>,
}

pub fn run(args: ImportLegacyArgs) -> CommandResult {
    let command = "import-legacy";
    let export = match fs::read_to_string(&args.path) {
        Ok(raw) => match LegacyExport::from_json(&raw) {
            Ok(export) => export,
            Err(error) => {
                return CommandResult::failure(
                    command,
                    "legacy_format",
                    format!("{} is not a legacy export: {error}", args.path.display()),
                    2,
                )
            }
        },
        Err(error) => {
            return CommandResult::failure(
                command,
                "legacy_read",
                format!("failed to read {}: {error}", args.path.display()),
                2,
            )
        }
    };
    let validators = LegacyValidators {
        service_chief: args.chief_fallback.map(PersonnelId),
        hr: args.hr_fallback.map(PersonnelId),
    };

    let (config, runtime) = match prepare(command) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        // Staff first so imported chains point at known people.
        let directory = SqlPersonnelDirectory::new(pool.clone());
        let mut personnel_imported = 0usize;
        let mut personnel_rejected = Vec::new();
        for (index, legacy) in export.personnel.into_iter().enumerate() {
            match map_personnel(legacy) {
                Ok(person) => {
                    directory
                        .upsert(&person)
                        .await
                        .map_err(|error| ("persistence", error.to_string(), 4u8))?;
                    personnel_imported += 1;
                }
                Err(error) => {
                    personnel_rejected.push(ImportRejection { index, reason: error.to_string() })
                }
            }
        }

        let store = SqlMovementStore::new(pool.clone());
        let report = import_movements(&store, export.movements, &validators, Utc::now())
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;
        pool.close().await;

        tracing::info!(
            event_name = "legacy.import_completed",
            personnel_imported,
            movements_imported = report.imported.len(),
            movements_rejected = report.rejected.len(),
            "legacy import finished"
        );
        Ok::<_, (&'static str, String, u8)>((personnel_imported, personnel_rejected, report))
    });

    match result {
        Ok((personnel_imported, personnel_rejected, report)) => CommandResult::success_with_data(
            command,
            format!(
                "imported {personnel_imported} personnel and {} movement(s); {} movement(s) rejected",
                report.imported.len(),
                report.rejected.len()
            ),
            Some(json!({
                "personnel_imported": personnel_imported,
                "personnel_rejected": to_data(&personnel_rejected),
                "movements": to_data(&report),
            })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}
