//! Report generation for gateway statistics

use serde::Serialize;

use crate::stats::{GatewayStats, StatsSnapshot};

/// JSON structure for the periodic report
#[derive(Serialize)]
struct ReportJson<'a> {
    ts_time: String,
    ehub_universe: u8,
    mapped_entities: u64,
    patches_active: u64,
    stats: &'a StatsSnapshot,
}

pub struct Reporter;

impl Reporter {
    /// Pretty-printed JSON snapshot for the CLI
    pub fn generate_json_report(stats: &GatewayStats, ehub_universe: u8) -> String {
        let snap = stats.snapshot();
        let rep = ReportJson {
            ts_time: chrono::Utc::now().to_rfc3339(),
            ehub_universe,
            mapped_entities: snap.mapped_table_size,
            patches_active: snap.patches_active,
            stats: &snap,
        };
        serde_json::to_string_pretty(&rep)
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}
