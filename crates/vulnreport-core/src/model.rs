use serde::Deserialize;

/// One page of the runtime results list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeResultsPage {
    pub page: PageInfo,
    #[serde(default)]
    pub data: Vec<ScanResult>,
}

/// Cursor metadata attached to every list page. `next` is absent on the
/// final page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub next: Option<String>,
}

/// One workload's scan summary from the list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub result_id: String,
    pub scope: WorkloadScope,
    pub vuln_total_by_severity: VulnTotals,
}

/// Kubernetes scope of a runtime result. The upstream API uses dotted
/// key names inside the `scope` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkloadScope {
    #[serde(rename = "kubernetes.cluster.name", default)]
    pub cluster_name: String,
    #[serde(rename = "kubernetes.namespace.name", default)]
    pub namespace_name: String,
    #[serde(rename = "kubernetes.workload.name", default)]
    pub workload_name: String,
    #[serde(rename = "kubernetes.workload.type", default)]
    pub workload_type: String,
    #[serde(rename = "kubernetes.pod.container.name", default)]
    pub container_name: String,
}

/// Vulnerability counts per severity bucket.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VulnTotals {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub negligible: u64,
}

impl VulnTotals {
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.negligible
    }
}

/// Envelope of the per-result detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanDetailResponse {
    pub result: ImageScanDetail,
}

/// Full scan document for one image.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageScanDetail {
    pub metadata: ImageMetadata,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Image identity. Every field defaults: the API returns a blank document
/// when the image is no longer running, and that document must still parse
/// so the row builder can skip it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    #[serde(default)]
    pub pull_string: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub base_os: String,
}

/// One package found in the image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub suggested_fix: String,
    #[serde(default)]
    pub in_use: Option<bool>,
    #[serde(default)]
    pub vulns: Option<Vec<Vulnerability>>,
}

/// One vulnerability affecting a package. `disclosure_date` and
/// `exploitable` are always present upstream; a payload without them is a
/// parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub severity: VulnSeverity,
    #[serde(default)]
    pub cvss_score: CvssScore,
    pub disclosure_date: String,
    #[serde(default)]
    pub solution_date: String,
    pub exploitable: bool,
    #[serde(default)]
    pub fixed_in_version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnSeverity {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub source_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssScore {
    #[serde(default)]
    pub value: CvssValue,
    #[serde(default)]
    pub source_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CvssValue {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub vector: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_page() {
        let body = r#"{
            "page": { "total": 2, "next": "abc123" },
            "data": [
                {
                    "resultId": "scan-1",
                    "scope": {
                        "kubernetes.cluster.name": "prod",
                        "kubernetes.namespace.name": "default",
                        "kubernetes.workload.name": "api",
                        "kubernetes.workload.type": "deployment",
                        "kubernetes.pod.container.name": "api"
                    },
                    "vulnTotalBySeverity": {
                        "critical": 1, "high": 2, "medium": 3, "low": 0, "negligible": 4
                    }
                }
            ]
        }"#;

        let page: RuntimeResultsPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.page.next.as_deref(), Some("abc123"));
        assert_eq!(page.data.len(), 1);

        let result = &page.data[0];
        assert_eq!(result.result_id, "scan-1");
        assert_eq!(result.scope.cluster_name, "prod");
        assert_eq!(result.scope.container_name, "api");
        assert_eq!(result.vuln_total_by_severity.total(), 10);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let body = r#"{ "page": { "total": 0 }, "data": [] }"#;
        let page: RuntimeResultsPage = serde_json::from_str(body).unwrap();
        assert!(page.page.next.is_none());
        assert!(page.data.is_empty());
    }

    #[test]
    fn test_parse_detail_document() {
        let body = r#"{
            "result": {
                "metadata": {
                    "pullString": "docker.io/library/nginx:1.25",
                    "imageId": "sha256:deadbeef",
                    "baseOs": "debian 12"
                },
                "packages": [
                    {
                        "name": "openssl",
                        "version": "3.0.2",
                        "type": "os",
                        "path": "/usr/lib/openssl",
                        "suggestedFix": "3.0.9",
                        "inUse": true,
                        "vulns": [
                            {
                                "name": "CVE-2023-0464",
                                "severity": { "value": "high", "sourceName": "nvd" },
                                "cvssScore": {
                                    "value": { "version": "3.1", "score": 7.5, "vector": "CVSS:3.1/AV:N" },
                                    "sourceName": "nvd"
                                },
                                "disclosureDate": "2023-03-22",
                                "solutionDate": "2023-03-28",
                                "exploitable": false,
                                "fixedInVersion": "3.0.9"
                            }
                        ]
                    },
                    { "name": "clean-pkg", "version": "1.0" }
                ]
            }
        }"#;

        let detail: ScanDetailResponse = serde_json::from_str(body).unwrap();
        let image = detail.result;
        assert_eq!(image.metadata.image_id, "sha256:deadbeef");
        assert_eq!(image.packages.len(), 2);

        let pkg = &image.packages[0];
        assert_eq!(pkg.package_type, "os");
        assert_eq!(pkg.in_use, Some(true));
        let vuln = &pkg.vulns.as_ref().unwrap()[0];
        assert_eq!(vuln.name, "CVE-2023-0464");
        assert_eq!(vuln.cvss_score.value.score, Some(7.5));
        assert!(!vuln.exploitable);

        // A package without a vulns key parses with None.
        assert!(image.packages[1].vulns.is_none());
    }

    #[test]
    fn test_blank_detail_document_parses() {
        let body = r#"{ "result": { "metadata": { "pullString": "" } } }"#;
        let detail: ScanDetailResponse = serde_json::from_str(body).unwrap();
        assert!(detail.result.metadata.pull_string.is_empty());
        assert!(detail.result.packages.is_empty());
    }
}
