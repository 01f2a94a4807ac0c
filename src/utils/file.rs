use std::fs::{remove_file, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::err;

/// Deletes `path` if it exists. Returns whether anything was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(err!("Failed to remove {}: {e}", path.display())),
    }
}

/// Writes `value` as indented JSON, replacing any previous file at `path`.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    remove_if_exists(path)?;
    let file =
        File::create(path).map_err(|e| err!("Failed to create {}: {e}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads raw issue records from a JSON array, or from the `_items` of a page object.
pub fn read_issue_records(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).map_err(|e| err!("Failed to open {}: {e}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| err!("{} is not valid JSON: {e}", path.display()))?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("_items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(err!("{} has no '_items' array", path.display())),
        },
        _ => Err(err!("{} must contain a JSON array of issues", path.display())),
    }
}

/// SARIF `sourceLanguage` for a file, guessed from its extension.
pub fn get_source_language(file_path: &str) -> Option<&'static str> {
    let extension = Path::new(file_path).extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "c" | "h" => Some("c"),
        "cc" | "cpp" | "cxx" | "hpp" => Some("cplusplus"),
        "cs" => Some("csharp"),
        "go" => Some("go"),
        "java" => Some("java"),
        "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
        "kt" | "kts" => Some("kotlin"),
        "php" => Some("php"),
        "py" => Some("python"),
        "rb" => Some("ruby"),
        "rs" => Some("rust"),
        "scala" => Some("scala"),
        "swift" => Some("swift"),
        "ts" | "tsx" => Some("typescript"),
        _ => None,
    }
}
