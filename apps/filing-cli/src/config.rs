use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filing_core::PipelinePlan;
use filing_types::{CaseIntake, CourtRules};

pub const RULES_ENV: &str = "FILING_RULES";

/// Court rules from `--rules`, else `FILING_RULES`, else defaults
pub fn load_rules(path: Option<&Path>) -> Result<CourtRules> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(RULES_ENV).map(PathBuf::from));

    match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read court rules {}", path.display()))?;
            let rules = CourtRules::from_json(&json)
                .with_context(|| format!("Invalid court rules {}", path.display()))?;
            tracing::info!(path = %path.display(), "Loaded court rules");
            Ok(rules)
        }
        None => {
            tracing::info!("Using default court rules");
            Ok(CourtRules::default())
        }
    }
}

pub fn load_intake(path: &Path) -> Result<CaseIntake> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read intake {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid intake {}", path.display()))
}

pub fn load_plan(path: &Path) -> Result<PipelinePlan> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    PipelinePlan::from_json(&json).with_context(|| format!("Invalid plan {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rules_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"accepted_languages": ["en", "hi"], "min_margin_mm": 30}"#)
            .unwrap();

        let rules = load_rules(Some(&path)).unwrap();
        assert_eq!(rules.accepted_languages, vec!["en", "hi"]);
        assert_eq!(rules.min_margin_mm, 30);
        assert_eq!(rules.min_font_size_pt, CourtRules::default().min_font_size_pt);
    }

    #[test]
    fn test_missing_rules_file_is_error() {
        let err = load_rules(Some(Path::new("/nonexistent/rules.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read court rules"));
    }

    #[test]
    fn test_load_intake() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.json");
        std::fs::write(
            &path,
            r#"{
                "court": "High Court of Bombay",
                "case_type": "Writ Petition",
                "petitioner": "A. Sharma",
                "respondent": "State of Maharashtra",
                "documents": [
                    {"id": "p", "name": "Petition", "kind": "petition", "page_count": 10, "language": "en", "text": "Petition"}
                ]
            }"#,
        )
        .unwrap();

        let intake = load_intake(&path).unwrap();
        assert_eq!(intake.documents.len(), 1);
        assert!(!intake.documents[0].certified);
    }
}
