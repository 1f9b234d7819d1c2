use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;

use corey_agent::HttpAgentClient;
use corey_core::config::{AppConfig, LoadOptions};

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

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> ExitCode {
    let report = build_report(config_path);
    let exit_code = if report.overall_status == CheckStatus::Pass {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if json_output {
        let payload = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        println!("{payload}");
    } else {
        println!("{}", render_human(&report));
    }

    exit_code
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_agent_client(&config));
            checks.push(check_fund_thresholds(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "agent_client",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "fund_thresholds",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
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

fn check_agent_client(config: &AppConfig) -> DoctorCheck {
    match HttpAgentClient::from_config(&config.agents) {
        Ok(_) => DoctorCheck {
            name: "agent_client",
            status: CheckStatus::Pass,
            details: format!(
                "client ready for `{}` (support agent `{}`, approval agent `{}`)",
                config.agents.base_url,
                config.agents.support_agent_id,
                config.agents.approval_agent_id
            ),
        },
        Err(error) => DoctorCheck {
            name: "agent_client",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_fund_thresholds(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "fund_thresholds",
        status: CheckStatus::Pass,
        details: format!(
            "{}% allocation, payout at ${} and {} conversions",
            config.fund.pro_fund_percentage,
            config.fund.pro_fund_threshold,
            config.fund.conversion_count_threshold
        ),
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
