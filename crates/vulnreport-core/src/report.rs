use std::collections::HashMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{ImageScanDetail, Package, ScanResult, Vulnerability};

/// Columns of the report, in output order.
pub const HEADER: [&str; 26] = [
    "Vulnerability ID",
    "Severity",
    "Package name",
    "Package version",
    "Package type",
    "Package path",
    "Image",
    "OS Name",
    "CVSS version",
    "CVSS score",
    "CVSS vector",
    "Vuln link",
    "Vuln Publish date",
    "Vuln Fix date",
    "Fix version",
    "Public Exploit",
    "K8S cluster name",
    "K8S namespace name",
    "K8S workload type",
    "K8S workload name",
    "K8S container name",
    "Image ID",
    "K8S POD count",
    "Package suggested fix",
    "In use",
    "Risk accepted",
];

/// Value written for the columns the API does not expose (vuln link, pod
/// count, risk accepted). Kept in the output contract so downstream
/// spreadsheets keep their column layout.
pub const PLACEHOLDER: &str = "TODO";

/// One flattened (scan result x package x vulnerability) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub vuln_id: String,
    pub severity: String,
    pub package_name: String,
    pub package_version: String,
    pub package_type: String,
    pub package_path: String,
    pub image: String,
    pub os_name: String,
    pub cvss_version: String,
    pub cvss_score: String,
    pub cvss_vector: String,
    pub vuln_link: String,
    pub vuln_publish_date: String,
    pub vuln_fix_date: String,
    pub fix_version: String,
    pub public_exploit: String,
    pub cluster_name: String,
    pub namespace_name: String,
    pub workload_type: String,
    pub workload_name: String,
    pub container_name: String,
    pub image_id: String,
    pub pod_count: String,
    pub package_suggested_fix: String,
    pub in_use: String,
    pub risk_accepted: String,
}

impl ReportRow {
    /// Field values in the same order as [`HEADER`].
    pub fn as_record(&self) -> [&str; 26] {
        [
            &self.vuln_id,
            &self.severity,
            &self.package_name,
            &self.package_version,
            &self.package_type,
            &self.package_path,
            &self.image,
            &self.os_name,
            &self.cvss_version,
            &self.cvss_score,
            &self.cvss_vector,
            &self.vuln_link,
            &self.vuln_publish_date,
            &self.vuln_fix_date,
            &self.fix_version,
            &self.public_exploit,
            &self.cluster_name,
            &self.namespace_name,
            &self.workload_type,
            &self.workload_name,
            &self.container_name,
            &self.image_id,
            &self.pod_count,
            &self.package_suggested_fix,
            &self.in_use,
            &self.risk_accepted,
        ]
    }
}

/// Keep only results whose severity buckets sum to a positive count.
pub fn with_vulnerabilities(results: Vec<ScanResult>) -> Vec<ScanResult> {
    results
        .into_iter()
        .filter(|r| r.vuln_total_by_severity.total() > 0)
        .collect()
}

/// Cross-join every kept result's packages with their vulnerabilities.
/// Results whose image pull string is blank are skipped with a warning;
/// the upstream API returns such blank documents when the image is no
/// longer running. Packages without vulnerabilities contribute no rows.
pub fn build_rows(
    results: &[ScanResult],
    details: &HashMap<String, ImageScanDetail>,
) -> Result<Vec<ReportRow>> {
    let mut rows = Vec::new();

    for result in results {
        let detail = details
            .get(&result.result_id)
            .ok_or_else(|| Error::MissingDetail(result.result_id.clone()))?;

        if detail.metadata.pull_string.is_empty() {
            warn!(
                result_id = %result.result_id,
                "blank image pull string, skipping result"
            );
            continue;
        }

        for package in &detail.packages {
            let Some(vulns) = &package.vulns else {
                continue;
            };
            for vuln in vulns {
                rows.push(flatten(result, detail, package, vuln));
            }
        }
    }

    Ok(rows)
}

fn flatten(
    result: &ScanResult,
    detail: &ImageScanDetail,
    package: &Package,
    vuln: &Vulnerability,
) -> ReportRow {
    let scope = &result.scope;
    let cvss = &vuln.cvss_score.value;

    ReportRow {
        vuln_id: vuln.name.clone(),
        severity: vuln.severity.value.clone(),
        package_name: package.name.clone(),
        package_version: package.version.clone(),
        package_type: package.package_type.clone(),
        package_path: package.path.clone(),
        image: detail.metadata.pull_string.clone(),
        os_name: detail.metadata.base_os.clone(),
        cvss_version: cvss.version.clone(),
        cvss_score: cvss.score.map(|s| s.to_string()).unwrap_or_default(),
        cvss_vector: cvss.vector.clone(),
        vuln_link: PLACEHOLDER.to_string(),
        vuln_publish_date: vuln.disclosure_date.clone(),
        vuln_fix_date: vuln.solution_date.clone(),
        fix_version: vuln.fixed_in_version.clone(),
        public_exploit: vuln.exploitable.to_string(),
        cluster_name: scope.cluster_name.clone(),
        namespace_name: scope.namespace_name.clone(),
        workload_type: scope.workload_type.clone(),
        workload_name: scope.workload_name.clone(),
        container_name: scope.container_name.clone(),
        image_id: detail.metadata.image_id.clone(),
        pod_count: PLACEHOLDER.to_string(),
        package_suggested_fix: package.suggested_fix.clone(),
        in_use: package
            .in_use
            .map(|b| b.to_string())
            .unwrap_or_default(),
        risk_accepted: PLACEHOLDER.to_string(),
    }
}
