use serde::Serialize;

use staffmove_core::config::{AppConfig, LoadOptions};
use staffmove_core::{PersonnelDirectory, PersonnelRole};
use staffmove_db::{connect_with_settings, migrations, DbPool, SqlPersonnelDirectory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(skipped(
                &DATABASE_CHECKS,
                "skipped because configuration did not load",
            ));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

const DATABASE_CHECKS: [&str; 3] = ["database_connectivity", "schema_migrations", "hr_validator"];

fn skipped(names: &[&'static str], reason: &str) -> Vec<DoctorCheck> {
    names
        .iter()
        .map(|name| DoctorCheck {
            name: *name,
            status: CheckStatus::Skipped,
            details: reason.to_string(),
        })
        .collect()
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return skipped(
                &DATABASE_CHECKS,
                &format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                let mut checks = vec![DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                }];
                checks.extend(skipped(
                    &DATABASE_CHECKS[1..],
                    "skipped because the database is unreachable",
                ));
                return checks;
            }
        };

        let mut checks = vec![DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        }];

        match migrations::run_pending(&pool).await {
            Ok(()) => {
                checks.push(DoctorCheck {
                    name: "schema_migrations",
                    status: CheckStatus::Pass,
                    details: "schema is up to date".to_string(),
                });
                checks.push(check_hr_validator(&pool, &config.workflow.hr_service).await);
            }
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "schema_migrations",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                });
                checks.extend(skipped(
                    &DATABASE_CHECKS[2..],
                    "skipped because the schema is not current",
                ));
            }
        }

        pool.close().await;
        checks
    })
}

/// Movements that need HR cannot be submitted until the configured HR service has an active
/// member.
async fn check_hr_validator(pool: &DbPool, hr_service: &str) -> DoctorCheck {
    let directory = SqlPersonnelDirectory::new(pool.clone());
    match directory.find_active_by_role_and_service(PersonnelRole::Hr, hr_service).await {
        Ok(Some(person)) => DoctorCheck {
            name: "hr_validator",
            status: CheckStatus::Pass,
            details: format!("`{}` validates for `{hr_service}`", person.id),
        },
        Ok(None) => DoctorCheck {
            name: "hr_validator",
            status: CheckStatus::Fail,
            details: format!(
                "no active hr member in `{hr_service}`; load staff or run `staffmove seed`"
            ),
        },
        Err(error) => DoctorCheck {
            name: "hr_validator",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
