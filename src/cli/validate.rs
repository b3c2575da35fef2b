//! `redirkit validate`: check request documents offline.

use anyhow::{Result, bail};

use crate::config::RedirConfig;
use crate::log;
use crate::request::{LoadReport, RequestLoader};
use crate::utils::plural_count;

/// Load every request document and report what a build would skip.
pub fn validate_requests(config: &RedirConfig, strict: bool) -> Result<()> {
    let loader = RequestLoader::scan(&config.build.data);
    if loader.files().is_empty() {
        log!("validate"; "no request documents under {}", config.build.data.display());
        return Ok(());
    }

    log!("validate"; "checking {}", plural_count(loader.files().len(), "document"));
    let report = loader.load();
    report.log_warnings();
    check_report(&report, strict)
}

fn check_report(report: &LoadReport, strict: bool) -> Result<()> {
    log!(
        "validate";
        "{} valid in {}",
        plural_count(report.request_count(), "redirect"),
        plural_count(report.groups.len(), "owner group")
    );

    let rejected = report.rejected_documents.len() + report.rejected_entries.len();
    if rejected == 0 {
        log!("done"; "all request documents valid");
    } else if strict {
        bail!("validation failed: {} rejected", plural_count(rejected, "item"));
    }
    Ok(())
}
