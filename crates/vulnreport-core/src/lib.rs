pub mod client;
pub mod csv_output;
pub mod error;
pub mod model;
pub mod report;

pub use client::{RetryPolicy, SecureClient};
pub use error::{Error, Result};
pub use model::{ImageScanDetail, ScanResult};
pub use report::{build_rows, with_vulnerabilities, ReportRow};
