//! CLI `doctor` command.

use std::fmt;

use anyhow::{bail, Context, Result};

use revdict::config::RevdictConfig;
use revdict::db::{self, HealthReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "ok",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        })
    }
}

struct Check {
    name: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self { name, status, detail: detail.into() }
    }
}

/// Diagnose the database and provider configuration.
///
/// Exits with an error when any check fails so scripts can gate on it.
pub fn doctor(config: &RevdictConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("No database at {}.", db_path.display());
        println!("`revdict import <file>` creates one.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let conn = db::open_database(&db_path)
        .with_context(|| format!("cannot open {} (corrupt?)", db_path.display()))?;
    let report = db::check_database_health(&conn).context("health check did not run")?;

    println!("{} ({})", db_path.display(), format_bytes(file_size));
    println!(
        "schema v{}, sqlite-vec {}, {} entries / {} features / {} vectors",
        report.schema_version,
        report.sqlite_vec_version,
        report.entry_count,
        report.feature_count,
        report.embedding_count,
    );
    println!();

    let checks = run_checks(config, &report, std::env::var_os("OPENAI_API_KEY").is_some());
    for check in &checks {
        println!("[{:>4}] {:<22} {}", check.status, check.name, check.detail);
    }

    let failed = checks.iter().filter(|c| c.status == Status::Fail).count();
    if failed > 0 {
        println!();
        println!("Recover by restoring a backup, or salvage readable rows with");
        println!("`revdict export > entries.jsonl` and import them into a fresh database.");
        bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn run_checks(config: &RevdictConfig, report: &HealthReport, has_openai_key: bool) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(if report.integrity_ok {
        Check::new("integrity", Status::Ok, "PRAGMA integrity_check passed")
    } else {
        Check::new("integrity", Status::Fail, report.integrity_details.clone())
    });

    checks.push(if report.unknown_model_ids.is_empty() {
        Check::new("model ids", Status::Ok, "all stored vectors have a known model")
    } else {
        Check::new(
            "model ids",
            Status::Warn,
            format!("unknown model ids {:?} are ignored by search", report.unknown_model_ids),
        )
    });

    checks.push(if report.unembedded_features == 0 {
        Check::new("feature coverage", Status::Ok, "every feature has a vector")
    } else {
        Check::new(
            "feature coverage",
            Status::Warn,
            format!("{} feature(s) have no vector", report.unembedded_features),
        )
    });

    checks.push(match config.swama.enabled {
        true => Check::new("swama", Status::Ok, config.swama.endpoint.clone()),
        false => Check::new("swama", Status::Ok, "disabled"),
    });

    checks.push(match (config.openai.enabled, has_openai_key) {
        (false, _) => Check::new("openai", Status::Ok, "disabled"),
        (true, true) => Check::new("openai", Status::Ok, config.openai.endpoint.clone()),
        (true, false) => Check::new("openai", Status::Fail, "enabled but OPENAI_API_KEY is unset"),
    });

    if !config.swama.enabled && !config.openai.enabled {
        checks.push(Check::new("providers", Status::Fail, "no embedding provider is enabled"));
    }

    checks
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> HealthReport {
        HealthReport {
            integrity_ok: true,
            integrity_details: "ok".into(),
            schema_version: 2,
            sqlite_vec_version: "v0.1.6".into(),
            entry_count: 1,
            feature_count: 1,
            embedding_count: 1,
            unembedded_features: 0,
            unknown_model_ids: Vec::new(),
        }
    }

    fn statuses(checks: &[Check]) -> Vec<(&'static str, Status)> {
        checks.iter().map(|c| (c.name, c.status)).collect()
    }

    #[test]
    fn default_config_on_healthy_db_passes() {
        let checks = run_checks(&RevdictConfig::default(), &healthy(), false);
        assert!(checks.iter().all(|c| c.status == Status::Ok), "{:?}", statuses(&checks));
    }

    #[test]
    fn openai_without_key_fails() {
        let mut config = RevdictConfig::default();
        config.openai.enabled = true;
        let checks = run_checks(&config, &healthy(), false);
        assert!(statuses(&checks).contains(&("openai", Status::Fail)));

        let checks = run_checks(&config, &healthy(), true);
        assert!(statuses(&checks).contains(&("openai", Status::Ok)));
    }

    #[test]
    fn gaps_in_data_are_warnings() {
        let report = HealthReport {
            unembedded_features: 3,
            unknown_model_ids: vec![9],
            ..healthy()
        };
        let checks = run_checks(&RevdictConfig::default(), &report, false);
        let s = statuses(&checks);
        assert!(s.contains(&("model ids", Status::Warn)));
        assert!(s.contains(&("feature coverage", Status::Warn)));
    }

    #[test]
    fn no_providers_fails() {
        let mut config = RevdictConfig::default();
        config.swama.enabled = false;
        let checks = run_checks(&config, &healthy(), false);
        assert!(statuses(&checks).contains(&("providers", Status::Fail)));
    }

    #[test]
    fn bytes_are_humanised() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
