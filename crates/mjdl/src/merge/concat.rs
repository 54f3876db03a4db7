use std::path::{Path, PathBuf};

use super::Merger;
use crate::{
    error::{MjdlError, MjdlResult},
    util::path::result_index,
};

/// Order result files by the number before the first `_` of their names.
pub fn sort_results(files: Vec<PathBuf>) -> MjdlResult<Vec<PathBuf>> {
    let mut keyed = files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            match result_index(&name) {
                Some(index) => Ok((index, path)),
                None => Err(MjdlError::InvalidResultName(name)),
            }
        })
        .collect::<MjdlResult<Vec<_>>>()?;

    keyed.sort_by_key(|(index, _)| *index);
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

/// Regular files of `results_dir` in concatenation order. Dotfiles are skipped.
pub async fn list_results<P>(results_dir: P) -> MjdlResult<Vec<PathBuf>>
where
    P: AsRef<Path>,
{
    let mut dir = tokio::fs::read_dir(results_dir.as_ref()).await?;
    let mut files = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    sort_results(files)
}

/// Concatenate every result in `results_dir` into `output`.
///
/// Returns the inputs in the order they were joined. Nothing is written when
/// the directory holds no results.
pub async fn concat_all<P, O, M>(results_dir: P, output: O, merger: &M) -> MjdlResult<Vec<PathBuf>>
where
    P: AsRef<Path>,
    O: AsRef<Path>,
    M: Merger,
{
    let files = list_results(results_dir.as_ref()).await?;
    if files.is_empty() {
        tracing::warn!(
            "No results in {}, nothing to concatenate.",
            results_dir.as_ref().display()
        );
        return Ok(files);
    }

    tracing::info!(
        "Concatenating {} file(s) into {}...",
        files.len(),
        output.as_ref().display()
    );
    merger.concat(&files, output.as_ref()).await?;

    tracing::info!(
        "All finished. Please checkout your file at {}",
        output.as_ref().display()
    );
    Ok(files)
}
