use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Preview images larger than this are not inlined into the webview.
pub const MAX_PREVIEW_BYTES: u64 = 16 * 1024 * 1024;

pub fn png_bytes_to_data_url(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() < PNG_SIGNATURE.len() {
        return Err("Screenshot data is empty".to_string());
    }
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err("Screenshot data is not a PNG".to_string());
    }

    let encoded = STANDARD.encode(bytes);
    Ok(format!("data:image/png;base64,{encoded}"))
}

pub fn png_file_to_data_url(path: &Path) -> Result<String, String> {
    let metadata = fs::metadata(path).map_err(|err| format!("Screenshot not readable: {err}"))?;
    if metadata.len() > MAX_PREVIEW_BYTES {
        return Err("Screenshot is too large to preview".to_string());
    }
    let bytes = fs::read(path).map_err(|err| format!("Screenshot not readable: {err}"))?;
    png_bytes_to_data_url(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_png() {
        assert!(png_bytes_to_data_url(&[]).unwrap_err().contains("empty"));
        assert!(png_bytes_to_data_url(b"not a png").unwrap_err().contains("PNG"));
    }

    #[test]
    fn encodes_png_file() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let path = dir.path().join("screenshot.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\nfake").expect("write");
        let url = png_file_to_data_url(&path).expect("url");
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = png_file_to_data_url(Path::new("/no/such/screenshot.png")).unwrap_err();
        assert!(err.contains("not readable"));
    }
}
