use std::path::Path;

use anyhow::Result;

use crate::output::sarif::SarifLog;
use crate::utils::file::write_json_pretty;

pub fn export_sarif(path: &Path, sarif: &SarifLog) -> Result<()> {
    write_json_pretty(path, sarif)?;
    println!("SARIF file written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::output::sarif::{convert_values, ConvertOptions};

    #[test]
    fn written_file_reads_back_with_retained_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("polaris_issues.sarif");
        fs::write(&path, "stale").unwrap();
        let values = json!([
            {"id": "a", "location": {"filePath": "a.py", "line": 1}},
            {"id": "b", "triageProperties": [{"key": "is-dismissed", "value": true}]},
            {"id": "c", "occurrenceProperties": [{"key": "severity", "value": "low"}]}
        ]);
        let sarif = convert_values(values.as_array().unwrap(), &ConvertOptions::default());

        export_sarif(&path, &sarif).unwrap();

        let read_back: SarifLog =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back.results().len(), 2);
        assert_eq!(read_back, sarif);
    }
}
