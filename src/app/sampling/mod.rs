//! Connectivity sampling: poll a `dumpsys` service, extract signal metrics,
//! and print them as timestamped tables.

pub mod monitor;
pub mod parse;
pub mod table;

use serde::{Deserialize, Serialize};

use self::parse::SignalParser;
use self::table::{render_message, render_table, Column, CELLULAR_COLUMNS, WIFI_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Cellular,
    Wifi,
}

impl SampleKind {
    pub fn id(self) -> &'static str {
        match self {
            SampleKind::Cellular => "cellular",
            SampleKind::Wifi => "wifi",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "cellular" | "gprs" | "telephony" => Some(SampleKind::Cellular),
            "wifi" | "rssi" => Some(SampleKind::Wifi),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SampleKind::Cellular => "Get GPRS Signal",
            SampleKind::Wifi => "Get WiFi RSSI",
        }
    }

    pub fn service(self) -> &'static str {
        match self {
            SampleKind::Cellular => "telephony.registry",
            SampleKind::Wifi => "wifi",
        }
    }

    pub fn args(self) -> Vec<String> {
        vec!["shell".to_string(), "dumpsys".to_string(), self.service().to_string()]
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            SampleKind::Cellular => &CELLULAR_COLUMNS,
            SampleKind::Wifi => &WIFI_COLUMNS,
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            SampleKind::Cellular => "No signal strength information found.",
            SampleKind::Wifi => "No RSSI information found.",
        }
    }
}

/// Extracts one cycle's rows from `raw`, in column order.
pub fn extract_rows(kind: SampleKind, parser: &SignalParser, raw: &str) -> Vec<Vec<String>> {
    match kind {
        SampleKind::Cellular => parser
            .cellular(raw)
            .into_iter()
            .map(|sample| vec![sample.signal_strength, sample.network_type, sample.data_state])
            .collect(),
        SampleKind::Wifi => parser
            .wifi(raw)
            .into_iter()
            .map(|sample| {
                vec![
                    sample.ssid,
                    sample.bssid,
                    sample.frequency,
                    sample.rssi,
                    sample.link_speed,
                ]
            })
            .collect(),
    }
}

/// Text appended to the console for one cycle, plus the number of rows found.
pub fn render_cycle(kind: SampleKind, parser: &SignalParser, raw: &str, timestamp: &str) -> (String, usize) {
    let rows = extract_rows(kind, parser, raw);
    if rows.is_empty() {
        return (render_message(timestamp, kind.empty_message()), 0);
    }
    (render_table(timestamp, kind.columns(), &rows), rows.len())
}
