use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};

/// Load a typed input document from `--input`, else from piped stdin.
///
/// Returns `Ok(None)` on an interactive terminal or an empty pipe so the
/// caller can fall back to its command-line flags.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let (source, contents) = match path {
        Some(path) => {
            let contents =
                fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
            (path, contents)
        }
        None if atty::is(atty::Stream::Stdin) => return Ok(None),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            ("stdin", buffer)
        }
    };

    if contents.trim().is_empty() {
        if path.is_some() {
            return Err(format!("Input file '{source}' is empty").into());
        }
        return Ok(None);
    }
    tracing::debug!(source, "reading input document");
    let value = serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {source}: {e}"))?;
    Ok(Some(value))
}
