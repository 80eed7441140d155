//! Input discovery and per-input parsing.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::builder::{BuildError, SkippedEntry};
use super::SourceRecord;
use crate::classfile::ClassFile;
use crate::extract::{extract, ExtractedClass};
use crate::source::{classify, Language};

const ARCHIVE_EXTENSIONS: [&str; 4] = ["jar", "zip", "war", "ear"];

/// One unit of parsing work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    /// A `.class` file; `explicit` when named directly by the caller.
    Class { path: PathBuf, explicit: bool },
    /// A jar, zip, war or ear archive.
    Archive(PathBuf),
    /// A source file in an enabled language.
    Source(PathBuf, Language),
}

/// What one input contributed.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    pub(crate) classes: Vec<ExtractedClass>,
    pub(crate) sources: Vec<SourceRecord>,
    pub(crate) skipped: Vec<SkippedEntry>,
}

/// Expands the caller's paths into parsing work, in deterministic order.
pub(crate) fn discover(paths: &[PathBuf], languages: &[Language]) -> Result<Vec<Input>, BuildError> {
    let mut inputs = Vec::new();
    for path in paths {
        let metadata = std::fs::metadata(path).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;

        if metadata.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| BuildError::Io {
                    path: path.clone(),
                    source: e.into(),
                })?;
                if entry.file_type().is_file() {
                    if let Some(input) = classify_path(entry.path(), false, languages) {
                        inputs.push(input);
                    }
                }
            }
        } else {
            match classify_path(path, true, languages) {
                Some(input) => inputs.push(input),
                None => return Err(BuildError::Unsupported { path: path.clone() }),
            }
        }
    }
    debug!("Discovered {} inputs", inputs.len());
    Ok(inputs)
}

fn classify_path(path: &Path, explicit: bool, languages: &[Language]) -> Option<Input> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if extension == "class" {
        if path.file_name().is_some_and(|n| n == "module-info.class") {
            return None;
        }
        return Some(Input::Class {
            path: path.to_path_buf(),
            explicit,
        });
    }
    if ARCHIVE_EXTENSIONS.contains(&extension.as_str()) {
        return Some(Input::Archive(path.to_path_buf()));
    }
    Language::from_path(path)
        .filter(|language| languages.contains(language))
        .map(|language| Input::Source(path.to_path_buf(), language))
}

/// Parses one input.
pub(crate) fn parse(input: &Input) -> Result<Parsed, BuildError> {
    let mut parsed = Parsed::default();
    match input {
        Input::Class { path, explicit } => {
            let data = read(path)?;
            match decode(&data) {
                Ok(class) => parsed.classes.push(class),
                Err(source) if *explicit => {
                    return Err(BuildError::Decode {
                        path: path.clone(),
                        source,
                    })
                }
                Err(source) => parsed.skip(path.display().to_string(), source.to_string()),
            }
        }
        Input::Archive(path) => {
            let data = read(path)?;
            let archive = zip::ZipArchive::new(Cursor::new(data)).map_err(|source| {
                BuildError::Archive {
                    path: path.clone(),
                    source,
                }
            })?;
            read_archive(archive, &path.display().to_string(), &mut parsed);
        }
        Input::Source(path, language) => {
            let data = read(path)?;
            let counts = classify(*language, &String::from_utf8_lossy(&data));
            parsed.sources.push(SourceRecord {
                directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                counts,
            });
        }
    }
    Ok(parsed)
}

impl Parsed {
    fn skip(&mut self, location: String, reason: String) {
        warn!("Skipping {}: {}", location, reason);
        self.skipped.push(SkippedEntry { location, reason });
    }
}

fn read(path: &Path) -> Result<Vec<u8>, BuildError> {
    std::fs::read(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode(data: &[u8]) -> Result<ExtractedClass, crate::classfile::DecodeError> {
    let class = ClassFile::parse(data)?;
    extract(&class)
}

/// Reads every class of an opened archive, descending into nested archives.
///
/// Entries that cannot be read or decoded are recorded as skipped.
fn read_archive<R: Read + std::io::Seek>(
    mut archive: zip::ZipArchive<R>,
    location: &str,
    parsed: &mut Parsed,
) {
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                parsed.skip(format!("{location}!/#{index}"), err.to_string());
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let entry_location = format!("{location}!/{name}");
        let lower = name.to_ascii_lowercase();

        let nested = ARCHIVE_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")));
        let class = lower.ends_with(".class") && !lower.ends_with("module-info.class");
        if !nested && !class {
            continue;
        }

        let mut data = Vec::new();
        if let Err(err) = entry.read_to_end(&mut data) {
            parsed.skip(entry_location, err.to_string());
            continue;
        }
        drop(entry);

        if class {
            match decode(&data) {
                Ok(extracted) => parsed.classes.push(extracted),
                Err(err) => parsed.skip(entry_location, err.to_string()),
            }
        } else {
            match zip::ZipArchive::new(Cursor::new(data)) {
                Ok(inner) => read_archive(inner, &entry_location, parsed),
                Err(err) => parsed.skip(entry_location, err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_path() {
        let all = Language::ALL;
        assert_eq!(
            classify_path(Path::new("a/B.class"), false, &all),
            Some(Input::Class {
                path: PathBuf::from("a/B.class"),
                explicit: false
            })
        );
        assert_eq!(
            classify_path(Path::new("lib/x.JAR"), false, &all),
            Some(Input::Archive(PathBuf::from("lib/x.JAR")))
        );
        assert_eq!(classify_path(Path::new("module-info.class"), true, &all), None);
        assert_eq!(classify_path(Path::new("README.md"), false, &all), None);
        assert_eq!(
            classify_path(Path::new("A.kt"), false, &[Language::Java]),
            None
        );
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let err = discover(&[PathBuf::from("/definitely/not/here")], &[]).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }

    #[test]
    fn test_directory_walk_skips_unreadable_class() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/Broken.class"), b"not a class").unwrap();
        std::fs::write(dir.path().join("a/notes.txt"), b"ignored").unwrap();

        let inputs = discover(&[dir.path().to_path_buf()], &Language::ALL).unwrap();
        assert_eq!(inputs.len(), 1);
        let parsed = parse(&inputs[0]).unwrap();
        assert!(parsed.classes.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn test_explicit_broken_class_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.class");
        std::fs::write(&path, [0xCA, 0xFE]).unwrap();
        let inputs = discover(&[path], &[]).unwrap();
        let err = parse(&inputs[0]).unwrap_err();
        assert!(matches!(err, BuildError::Decode { .. }));
    }

    #[test]
    fn test_corrupt_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jar");
        std::fs::write(&path, b"PK not really").unwrap();
        let err = parse(&Input::Archive(path)).unwrap_err();
        assert!(matches!(err, BuildError::Archive { .. }));
    }

    #[test]
    fn test_source_file_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.java");
        std::fs::write(&path, "// c\nclass A {}\n").unwrap();
        let parsed = parse(&Input::Source(path, Language::Java)).unwrap();
        assert_eq!(parsed.sources[0].file_name, "A.java");
        assert_eq!(parsed.sources[0].counts.code, 1);
        assert_eq!(parsed.sources[0].counts.comment, 1);
    }
}
