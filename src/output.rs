use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::RunResult;

/// `{root}/{source slug}/{YYYY-MM-DD}.json`, dated by the run's timestamp.
pub fn run_path(root: &Path, run: &RunResult) -> PathBuf {
    root.join(slugify(&run.source))
        .join(format!("{}.json", run.scraped_at.date_naive()))
}

pub fn write_run(root: &Path, run: &RunResult) -> Result<PathBuf> {
    let path = run_path(root, run);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(run)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Lowercase ASCII-ish directory name: "Prefeitura de São Carlos" → "prefeitura-de-sao-carlos".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("CezcomRH"), "cezcomrh");
        assert_eq!(
            slugify("Prefeitura de São Carlos - Casa do Trabalhador"),
            "prefeitura-de-sao-carlos-casa-do-trabalhador"
        );
    }

    #[test]
    fn writes_dated_file() {
        let root = std::env::temp_dir().join(format!("vagas-output-{}", std::process::id()));
        let run = RunResult::new("CezcomRH", BTreeMap::new(), Vec::new());

        let path = write_run(&root, &run).unwrap();
        assert!(path.starts_with(root.join("cezcomrh")));
        assert!(path.to_string_lossy().ends_with(&format!("{}.json", run.scraped_at.date_naive())));

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["source"], "CezcomRH");
        assert_eq!(saved["total"], 0);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
