use regex::Regex;
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CellularSample {
    pub signal_strength: String,
    pub network_type: String,
    pub data_state: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WifiSample {
    pub ssid: String,
    pub bssid: String,
    pub frequency: String,
    pub rssi: String,
    pub link_speed: String,
}

/// Pulls the connectivity metrics out of raw `dumpsys` text. Each pattern is
/// applied to the whole dump; the n-th matches of every pattern form row n.
pub struct SignalParser {
    re_signal_strength: Regex,
    re_network_type: Regex,
    re_data_state: Regex,
    re_rssi: Regex,
    re_ssid: Regex,
    re_bssid: Regex,
    re_frequency: Regex,
    re_link_speed: Regex,
}

impl Default for SignalParser {
    fn default() -> Self {
        Self {
            re_signal_strength: Regex::new(r"SignalStrength: (\d+)").expect("signal strength regex"),
            re_network_type: Regex::new(r"NetworkType: (\d+)").expect("network type regex"),
            re_data_state: Regex::new(r"DataState: (\d+)").expect("data state regex"),
            re_rssi: Regex::new(r"RSSI: (-\d+)").expect("rssi regex"),
            re_ssid: Regex::new(r"SSID: (\S+)").expect("ssid regex"),
            re_bssid: Regex::new(r"BSSID: (\S+)").expect("bssid regex"),
            re_frequency: Regex::new(r"Frequency: (\d+)").expect("frequency regex"),
            re_link_speed: Regex::new(r"Link speed: (\d+)").expect("link speed regex"),
        }
    }
}

impl SignalParser {
    pub fn cellular(&self, raw: &str) -> Vec<CellularSample> {
        let strengths = capture_all(&self.re_signal_strength, raw);
        let network_types = capture_all(&self.re_network_type, raw);
        let data_states = capture_all(&self.re_data_state, raw);

        strengths
            .into_iter()
            .enumerate()
            .map(|(index, signal_strength)| CellularSample {
                signal_strength,
                network_type: nth_or_na(&network_types, index),
                data_state: nth_or_na(&data_states, index),
            })
            .collect()
    }

    pub fn wifi(&self, raw: &str) -> Vec<WifiSample> {
        let rssi = capture_all(&self.re_rssi, raw);
        let ssids = capture_all(&self.re_ssid, raw);
        let bssids = capture_all(&self.re_bssid, raw);
        let frequencies = capture_all(&self.re_frequency, raw);
        let link_speeds = capture_all(&self.re_link_speed, raw);

        rssi.into_iter()
            .enumerate()
            .map(|(index, rssi)| WifiSample {
                ssid: nth_or_na(&ssids, index),
                bssid: nth_or_na(&bssids, index),
                frequency: nth_or_na(&frequencies, index),
                rssi,
                link_speed: nth_or_na(&link_speeds, index),
            })
            .collect()
    }
}

fn capture_all(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|value| value.as_str().to_string()))
        .collect()
}

fn nth_or_na(values: &[String], index: usize) -> String {
    values
        .get(index)
        .cloned()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
