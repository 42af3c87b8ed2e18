//! Persisted expression results and the offline eval pass.
//!
//! Results live in a UTF-8 CSV file with an `expr,eval` header row. The eval
//! pass scans the Markdown under `docs/`, evaluates every expression once and
//! produces the map that `$eval{}` reads at render time.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::evaluator::EvaluationContext;
use crate::expr::{Expr, ExpressionResultMap, find_exprs};
use crate::source::{SiteVersion, VersionKind, walk_files};

const HEADER: [&str; 2] = ["expr", "eval"];

/// Reads and writes expression result files.
pub struct EvalStore;

impl EvalStore {
    /// Load a result file.
    pub fn load(path: &Path) -> Result<ExpressionResultMap> {
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(csv_error)?;

        let mut results = ExpressionResultMap::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let (Some(expr), Some(value)) = (record.get(0), record.get(1)) else {
                continue;
            };
            results.insert(expr.to_owned(), value.to_owned());
        }
        debug!(path = %path.display(), count = results.len(), "Loaded expression results");
        Ok(results)
    }

    /// Write a result file, creating parent directories.
    pub fn save(results: &ExpressionResultMap, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(HEADER).map_err(csv_error)?;
        for (expr, value) in results {
            writer.write_record([expr, value]).map_err(csv_error)?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
        info!(path = %path.display(), count = results.len(), "Saved expression results");
        Ok(())
    }
}

/// Evaluate every expression found in the Markdown files under `docs_dir`.
///
/// Malformed and parameterized expressions always fail. Evaluation failures
/// fail in strict mode and are skipped with a warning otherwise.
pub fn eval_docs(docs_dir: &Path, evaluation: &EvaluationContext, strict: bool) -> Result<ExpressionResultMap> {
    if !docs_dir.is_dir() {
        return Err(Error::MissingFile(docs_dir.to_path_buf()));
    }
    let mut files = Vec::new();
    walk_files(docs_dir, "", &mut files)?;
    files.sort();

    let mut results = ExpressionResultMap::new();
    for rel in files.iter().filter(|f| f.ends_with(".md")) {
        let rel = rel.trim_start_matches('/');
        let path = docs_dir.join(rel);
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;

        for raw in find_exprs(&text) {
            if results.contains_key(&raw) {
                continue;
            }
            let expr = Expr::parse(&raw, rel)?;
            match expr.evaluate(evaluation, rel) {
                Ok(value) => {
                    results.insert(raw, value);
                }
                Err(err) if !strict => {
                    warn!(rel_path = rel, expr = %raw, error = %err, "Skipping expression");
                }
                Err(err) => return Err(err),
            }
        }
    }
    info!(dir = %docs_dir.display(), count = results.len(), "Evaluated expressions");
    Ok(results)
}

/// Loads the expression results of a version.
pub trait ExpressionResultProvider: Send + Sync {
    fn load_results(&self, version: &SiteVersion) -> Result<ExpressionResultMap>;
}

/// Result files on disk: one for the snapshot, one per release tag.
#[derive(Debug, Clone)]
pub struct CsvResultProvider {
    eval_file: PathBuf,
    release_evals_dir: PathBuf,
}

impl CsvResultProvider {
    pub fn new(eval_file: impl Into<PathBuf>, release_evals_dir: impl Into<PathBuf>) -> Self {
        Self {
            eval_file: eval_file.into(),
            release_evals_dir: release_evals_dir.into(),
        }
    }

    fn file_for(&self, version: &SiteVersion) -> PathBuf {
        match &version.kind {
            VersionKind::Snapshot => self.eval_file.clone(),
            VersionKind::Release { tag } => self.release_evals_dir.join(format!("{tag}.csv")),
        }
    }
}

impl ExpressionResultProvider for CsvResultProvider {
    /// A missing file yields an empty map, so `$eval{}` lookups fail at
    /// render time with the expression named.
    fn load_results(&self, version: &SiteVersion) -> Result<ExpressionResultMap> {
        let path = self.file_for(version);
        if !path.is_file() {
            debug!(path = %path.display(), version = %version.version, "No expression results");
            return Ok(ExpressionResultMap::new());
        }
        EvalStore::load(&path)
    }
}
