use std::fs;
use std::path::Path;

/// Base names of the `*.cfg` files in `scripts_dir/category`, sorted.
///
/// An absent or unreadable directory means "no options" and yields an empty list.
pub fn list_cfg_files(scripts_dir: &Path, category: &str) -> Vec<String> {
    let folder = scripts_dir.join(category);
    let entries = match fs::read_dir(&folder) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(folder = %folder.display(), "no cfg options: {e}");
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "cfg"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
