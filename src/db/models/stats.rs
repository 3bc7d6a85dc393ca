use serde::Serialize;

/// Lot statistics. Revenue fields are admin-only and omitted entirely from
/// the response for regular users.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_spaces: i64,
    pub occupied_spaces: i64,
    pub free_spaces: i64,
    /// Whole percentage in [0, 100]
    pub occupancy_rate: u32,
    /// Mean stay of currently active sessions, "{h}h {m}min"
    pub average_stay_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_revenue: Option<f64>,
}
