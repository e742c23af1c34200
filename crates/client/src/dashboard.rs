//! Dashboard aggregate counts.

use crate::error::Result;
use crate::gateway::Gateway;
use serde::{Deserialize, Serialize};

/// Aggregate counts for the dashboard view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub patient_count: u64,
    pub test_count: u64,
    pub abnormal_count: u64,
}

/// Fetch the summary counts through the gateway.
pub async fn fetch_summary(gateway: &Gateway) -> Result<DashboardSummary> {
    gateway.get_json("/dashboard/summary", &[]).await
}
