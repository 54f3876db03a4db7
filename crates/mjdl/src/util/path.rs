use std::path::Path;

/// Extension of per-source results and of the final concatenation.
pub const RESULT_EXTENSION: &str = "mp4";

pub trait MjdlPathExt {
    /// Name a batch after its URL list, dropping directories and the last extension.
    ///
    /// `lists/course.txt` becomes `course`, `course.v2.txt` becomes `course.v2`.
    fn batch_name(&self) -> String;
}

impl MjdlPathExt for Path {
    fn batch_name(&self) -> String {
        self.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// `{index}_{batch}.mp4`
pub fn result_file_name(index: usize, batch: &str) -> String {
    format!("{index}_{batch}.{RESULT_EXTENSION}")
}

/// Parse the numeric prefix before the first `_` of a result file name.
pub fn result_index(file_name: &str) -> Option<u64> {
    let (prefix, _) = file_name.split_once('_')?;
    prefix.parse().ok()
}
