use planpal_core::config::{AppConfig, LoadOptions};
use planpal_db::connect_with_settings;
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG_VALIDATION, EXIT_DB_CONNECTIVITY};

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
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    message: String,
    checks: Vec<DoctorCheck>,
}

/// Readiness report. Providers without a key are `skipped`, not failed:
/// suggestions then come from the static catalog.
pub fn run(json_output: bool) -> CommandResult {
    let (report, exit_code) = build_report();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"doctor\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> (DoctorReport, u8) {
    let mut checks = Vec::new();
    let mut failure = None;

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(provider_check(
                "places_provider",
                config.providers.places_configured(),
                &config.providers.places_base_url,
            ));
            checks.push(provider_check(
                "movies_provider",
                config.providers.movies_configured(),
                &config.providers.movies_base_url,
            ));

            let database = check_database_connectivity(&config);
            if database.status == CheckStatus::Fail {
                failure = Some(("db_connectivity", EXIT_DB_CONNECTIVITY));
            }
            checks.push(database);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["places_provider", "movies_provider", "database_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
            failure = Some(("config_validation", EXIT_CONFIG_VALIDATION));
        }
    }

    let (status, error_class, message, exit_code) = match failure {
        None => ("ok", None, "doctor: all readiness checks passed", 0),
        Some((error_class, exit_code)) => {
            ("error", Some(error_class), "doctor: one or more readiness checks failed", exit_code)
        }
    };

    let message = message.to_string();
    let report = DoctorReport { command: "doctor", status, error_class, message, checks };
    (report, exit_code)
}

fn provider_check(name: &'static str, configured: bool, base_url: &str) -> DoctorCheck {
    if configured {
        DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("API key present; live requests go to `{base_url}`"),
        }
    } else {
        DoctorCheck {
            name,
            status: CheckStatus::Skipped,
            details: "no API key configured; static fallback catalog in use".to_string(),
        }
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let connection = pool
            .acquire()
            .await
            .map_err(|error| format!("failed to acquire a connection: {error}"))?;
        drop(connection);
        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.message.clone());

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
