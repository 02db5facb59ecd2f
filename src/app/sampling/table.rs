#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: usize,
}

pub const CELLULAR_COLUMNS: [Column; 3] = [
    Column { title: "Signal Strength", width: 20 },
    Column { title: "Network Type", width: 20 },
    Column { title: "Data State", width: 20 },
];

pub const WIFI_COLUMNS: [Column; 5] = [
    Column { title: "SSID", width: 20 },
    Column { title: "BSSID", width: 20 },
    Column { title: "Frequency", width: 10 },
    Column { title: "RSSI", width: 10 },
    Column { title: "Link Speed", width: 10 },
];

fn pad_cells<'a>(cells: impl IntoIterator<Item = &'a str>, columns: &[Column]) -> String {
    cells
        .into_iter()
        .zip(columns)
        .map(|(cell, column)| format!("{cell:<width$}", width = column.width))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `[timestamp] <titles>`, a dashed rule one wider than that line, then one
/// left-aligned line per row.
pub fn render_table(timestamp: &str, columns: &[Column], rows: &[Vec<String>]) -> String {
    let header = format!(
        "[{timestamp}] {}",
        pad_cells(columns.iter().map(|column| column.title), columns)
    );
    let mut out = String::with_capacity(header.len() * (rows.len() + 2) * 2);
    out.push_str(&header);
    out.push('\n');
    // The rule also covers the header's line break.
    out.push_str(&"-".repeat(header.chars().count() + 1));
    out.push('\n');
    for row in rows {
        out.push_str(&pad_cells(row.iter().map(String::as_str), columns));
        out.push('\n');
    }
    out
}

pub fn render_message(timestamp: &str, message: &str) -> String {
    format!("[{timestamp}] {message}\n")
}
