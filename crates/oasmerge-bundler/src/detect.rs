//! Cheap detection of OpenAPI 3 documents.
//!
//! A file is a spec when one of its lines starts with `openapi: X.Y.Z`.
//! Files are read line by line and reading stops at the first match. Only the
//! first [`MAX_LINE_LEN`] bytes of a line are buffered and matched.

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

/// Bytes of a line examined before the rest of it is skipped.
pub const MAX_LINE_LEN: u64 = 4096;

fn openapi_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^openapi:\s*[0-9]+\.[0-9]+\.[0-9]+").expect("valid regex"))
}

/// Whether a single line declares an OpenAPI version.
pub fn is_openapi_line(line: &str) -> bool {
    openapi_line().is_match(line)
}

/// Whether the file at `path` looks like an OpenAPI 3 document.
///
/// Non-UTF-8 bytes are replaced before matching. Read errors propagate.
pub async fn is_openapi_spec(path: &Path) -> io::Result<bool> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    // Set while the chunks being read are the tail of an over-long line.
    let mut continuation = false;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(false);
        }
        if !continuation {
            let line = String::from_utf8_lossy(&buf);
            if is_openapi_line(line.trim_end_matches(['\n', '\r'])) {
                return Ok(true);
            }
        }
        continuation = !buf.ends_with(b"\n");
    }
}
