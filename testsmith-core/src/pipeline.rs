//! Pipeline orchestration: fetch → catalog → synthesize → archive.
//!
//! The orchestrator sequences the whole run for one repository URL inside
//! a caller-supplied workspace directory. All state, including the
//! per-name occurrence counter used for output file naming, is scoped to
//! a single run: concurrent runs in separate workspaces cannot interfere.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::archive;
use crate::error::{Error, Result};
use crate::extract;
use crate::repo;
use crate::synthesize::Synthesizer;

const TEST_FILE_EXT: &str = "py";

/// Everything a run leaves on disk, plus a report of what happened.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub archive_path: PathBuf,
    pub repo_dir: PathBuf,
    pub test_dir: PathBuf,
    pub report: PipelineReport,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub generated: Vec<GeneratedTest>,
    pub skipped: Vec<SkippedFunction>,
}

#[derive(Debug, Clone)]
pub struct GeneratedTest {
    pub function: String,
    pub output_path: PathBuf,
}

/// A catalogued function whose definition could not be re-extracted from
/// its file. Surfaced in the report instead of being silently dropped.
#[derive(Debug, Clone)]
pub struct SkippedFunction {
    pub file: PathBuf,
    pub function: String,
}

/// Output file name for one function, disambiguated by how many times the
/// name has occurred so far in this run: the first occurrence uses the
/// `test_<name>_test` convention, later ones `<name>_<n>_test`.
fn test_file_name(function: &str, occurrence: u32) -> String {
    if occurrence > 1 {
        format!("{function}_{occurrence}_test.{TEST_FILE_EXT}")
    } else {
        format!("test_{function}_test.{TEST_FILE_EXT}")
    }
}

/// Runs the full pipeline for `repo_url` inside `workspace`.
///
/// Clones (or reuses) the repository at `<workspace>/<identifier>`, writes
/// one generated test per catalogued function under
/// `<workspace>/<identifier>_tests`, mirroring the source tree with one
/// subdirectory per source file, and zips that tree into
/// `<workspace>/<identifier>_tests.zip`.
///
/// Fail-fast: the first fetch, parse, synthesis or archive failure aborts
/// the run. Files already written stay on disk; the caller owns cleanup.
pub async fn generate_tests<S>(
    repo_url: &str,
    workspace: &Path,
    synthesizer: &S,
) -> Result<PipelineOutput>
where
    S: Synthesizer + ?Sized,
{
    let repo_name = repo::repo_name_from_url(repo_url)?;
    let repo_dir = repo::clone_repo(repo_url, workspace)?;

    let test_dir = workspace.join(format!("{repo_name}_tests"));
    fs::create_dir_all(&test_dir)?;

    let catalog = extract::catalog(&repo_dir)?;
    info!(files = catalog.len(), repo = %repo_name, "Function extraction complete");

    let mut report = PipelineReport::default();
    let mut occurrences: HashMap<String, u32> = HashMap::new();

    for file in &catalog {
        let relative = file.path.strip_prefix(&repo_dir).unwrap_or(&file.path);
        let parent = relative.parent().unwrap_or_else(|| Path::new(""));
        let file_stem = file
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sub_dir = test_dir.join(parent).join(&file_stem);
        fs::create_dir_all(&sub_dir)?;

        let code = fs::read_to_string(&file.path)?;

        for function in &file.functions {
            let occurrence = {
                let count = occurrences.entry(function.clone()).or_insert(0);
                *count += 1;
                *count
            };

            let Some(snippet) = extract::function_snippet(function, &code)? else {
                warn!(
                    function = %function,
                    file = %file.path.display(),
                    "Catalogued function has no extractable definition, skipping"
                );
                report.skipped.push(SkippedFunction {
                    file: file.path.clone(),
                    function: function.clone(),
                });
                continue;
            };

            let test_code = synthesizer.synthesize(function, &snippet).await?;

            let output_path = sub_dir.join(test_file_name(function, occurrence));
            fs::write(&output_path, format!("{test_code}\n"))?;
            info!(
                function = %function,
                path = %output_path.display(),
                "Wrote generated test"
            );
            report.generated.push(GeneratedTest {
                function: function.clone(),
                output_path,
            });
        }
    }

    let archive_path = workspace.join(format!("{repo_name}_tests.zip"));
    archive::zip_directory(&test_dir, &archive_path)?;
    if !archive_path.exists() {
        return Err(Error::Archive {
            path: archive_path.display().to_string(),
            message: "archive missing after creation".to_string(),
        });
    }

    info!(
        archive = %archive_path.display(),
        generated = report.generated.len(),
        skipped = report.skipped.len(),
        "Pipeline complete"
    );

    Ok(PipelineOutput {
        archive_path,
        repo_dir,
        test_dir,
        report,
    })
}
