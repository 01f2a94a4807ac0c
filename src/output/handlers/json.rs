use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::utils::file::write_json_pretty;

/// Writes the raw records exactly as Polaris returned them.
pub fn export_issues_json(path: &Path, issues: &[Value]) -> Result<()> {
    write_json_pretty(path, &issues)?;
    println!("Issues written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn keeps_record_key_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("issues_output.json");
        let issues = vec![json!({"zeta": 1, "alpha": 2, "id": "i-1"})];

        export_issues_json(&path, &issues).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let zeta = written.find("zeta").unwrap();
        let alpha = written.find("alpha").unwrap();
        assert!(zeta < alpha);
        let parsed: Vec<Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, issues);
    }
}
