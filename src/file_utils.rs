use anyhow::{Result, Context, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Kinds of input the optimizer accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// SRT track
    Srt,
    /// `index | start | end | text` mapping file
    Mapping,
    /// Word-aligned JSON (explicit word ranges or Whisper-style segments)
    Aligned,
}

impl InputKind {
    /// Extensions recognised when scanning a directory
    pub const EXTENSIONS: [&'static str; 3] = ["srt", "txt", "json"];
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    // @generates: Output path for an optimized track
    // @params: input_file, output_dir, suffix, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        suffix: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(suffix);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.as_ref().join(output_filename)
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(wanted) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Find every optimizable input in a directory, skipping our own outputs
    pub fn find_inputs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut inputs = Vec::new();
        for ext in InputKind::EXTENSIONS {
            inputs.extend(
                Self::find_files(dir.as_ref(), ext)?
                    .into_iter()
                    .filter(|p| !Self::is_generated(p)),
            );
        }
        inputs.sort();
        Ok(inputs)
    }

    /// Whether a path was written by the optimizer itself
    pub fn is_generated(path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        name.contains(".optimized.") || name.ends_with(".report.txt")
    }

    /// Detect how to read an input from its extension, falling back to its contents
    pub fn detect_input_kind<P: AsRef<Path>>(path: P) -> Result<InputKind> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            match ext.to_string_lossy().to_lowercase().as_str() {
                "srt" => return Ok(InputKind::Srt),
                "json" => return Ok(InputKind::Aligned),
                _ => {}
            }
        }

        let content = Self::read_to_string(path)?;
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('{') {
            Ok(InputKind::Aligned)
        } else if content.contains("-->") {
            Ok(InputKind::Srt)
        } else {
            Ok(InputKind::Mapping)
        }
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file through a temporary sibling, then rename it into place
    ///
    /// Readers never observe a partially written file.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.flush()?;
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to publish {:?}: {}", path, e.error))?;

        Ok(())
    }
}
