use std::fmt::Write;

use anyhow::{Context, Error};
use serde::Serialize;

use crate::{
    checks::{CheckResult, CheckStatus},
    framework::Framework,
    RHUI_CHECK_VERSION,
};

/// Outcome of a whole run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub version: &'static str,
    pub timestamp: String,
    pub framework: Framework,
    pub fix_mode: bool,
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn new(framework: Framework, fix_mode: bool, results: Vec<CheckResult>) -> Self {
        Self {
            version: RHUI_CHECK_VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            framework,
            fix_mode,
            results,
        }
    }

    /// Whether no check failed. Skipped and fixed checks count as healthy.
    pub fn is_healthy(&self) -> bool {
        !self.results.iter().any(CheckResult::is_failure)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Framework: {}", self.framework);
        for result in &self.results {
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                result.status, result.check, result.summary
            );
            for detail in &result.details {
                let _ = writeln!(out, "    {detail}");
            }
        }

        let _ = write!(
            out,
            "{} passed, {} failed, {} fixed, {} skipped",
            self.count(CheckStatus::Pass),
            self.count(CheckStatus::Fail),
            self.count(CheckStatus::Fixed),
            self.count(CheckStatus::Skipped),
        );
        out
    }

    pub fn render_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;

    use crate::checks::CheckKind;

    fn sample_results() -> Vec<CheckResult> {
        vec![
            CheckResult::pass(CheckKind::RegionConfig, "2 region server(s) configured")
                .with_details(vec!["1.1.1.1".into(), "2.2.2.2".into()]),
            CheckResult::skipped(CheckKind::RegionCerts, "not needed"),
            CheckResult::fixed(CheckKind::Repositories, "Moved 1 stale repository file(s)"),
        ]
    }

    #[test]
    fn test_is_healthy() {
        let mut report = Report::new(Framework::Azure, true, sample_results());
        assert!(report.is_healthy());

        report
            .results
            .push(CheckResult::fail(CheckKind::Credentials, "missing"));
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_render_text() {
        let report = Report::new(Framework::Ec2, false, sample_results());
        assert_eq!(
            report.render_text(),
            indoc! {"
                Framework: ec2
                [PASS] region-config: 2 region server(s) configured
                    1.1.1.1
                    2.2.2.2
                [SKIPPED] region-certs: Skipped: not needed
                [FIXED] repositories: Moved 1 stale repository file(s)
                1 passed, 0 failed, 1 fixed, 1 skipped"}
        );
    }

    #[test]
    fn test_render_json() {
        let report = Report::new(Framework::Gce, true, sample_results());
        let value: serde_json::Value =
            serde_json::from_str(&report.render_json().unwrap()).unwrap();

        assert_eq!(value["version"], RHUI_CHECK_VERSION);
        assert_eq!(value["framework"], "gce");
        assert_eq!(value["fix_mode"], true);
        assert_eq!(value["results"][0]["check"], "region-config");
        assert_eq!(value["results"][0]["status"], "pass");
        assert_eq!(value["results"][0]["details"][1], "2.2.2.2");
        assert!(value["results"][1].get("details").is_none());
        assert_eq!(value["results"][2]["status"], "fixed");
    }
}
