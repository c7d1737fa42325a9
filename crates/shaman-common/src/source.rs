//! Shader source acquisition.
//!
//! Sources come either from one file per stage or from a single combined
//! file split into `#shader <stage>` sections.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::common::com_dprintf;

/// Line prefix that opens a section in a combined source file.
pub const SECTION_HEADER: &str = "#shader";

/// One compilable unit of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
    Geometry,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Vertex, Stage::Fragment, Stage::Geometry];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
            Stage::Geometry => "geometry",
        }
    }

    /// Stage named by a section header, e.g. `vertex` in `#shader vertex`.
    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to obtain source text for a stage.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open {stage} source {}: {source}", path.display())]
    Open {
        stage: Stage,
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not read {stage} source {}: {source}", path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        source: io::Error,
    },
    #[error("no {stage} source available")]
    Missing { stage: Stage },
}

impl SourceError {
    pub fn stage(&self) -> Stage {
        match self {
            SourceError::Open { stage, .. }
            | SourceError::Io { stage, .. }
            | SourceError::Missing { stage } => *stage,
        }
    }
}

/// Source text per stage. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Option<String>,
    pub fragment: Option<String>,
    pub geometry: Option<String>,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: Some(vertex.into()),
            fragment: Some(fragment.into()),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    pub fn get(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Vertex => self.vertex.as_deref(),
            Stage::Fragment => self.fragment.as_deref(),
            Stage::Geometry => self.geometry.as_deref(),
        }
    }

    /// Text for a stage the caller cannot do without.
    pub fn require(&self, stage: Stage) -> Result<&str, SourceError> {
        self.get(stage).ok_or(SourceError::Missing { stage })
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<String> {
        match stage {
            Stage::Vertex => &mut self.vertex,
            Stage::Fragment => &mut self.fragment,
            Stage::Geometry => &mut self.geometry,
        }
    }
}

// ============================================================
// File reading
// ============================================================

fn open_source(stage: Stage, path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Open {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

fn read_source(stage: Stage, path: &Path, file: &mut File) -> Result<String, SourceError> {
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(|source| SourceError::Io {
        stage,
        path: path.to_path_buf(),
        source,
    })?;
    com_dprintf(&format!("read {} source {} ({} bytes)\n", stage, path.display(), text.len()));
    Ok(text)
}

/// Read the whole of one source file.
pub fn read_text(stage: Stage, path: &Path) -> Result<String, SourceError> {
    let mut file = open_source(stage, path)?;
    read_source(stage, path, &mut file)
}

/// Read one file per stage. Both required files are opened before either is
/// read, so an unopenable fragment file is reported ahead of a vertex read
/// error.
pub fn read_distinct(
    vertex_path: &Path,
    fragment_path: &Path,
    geometry_path: Option<&Path>,
) -> Result<ShaderSources, SourceError> {
    let mut vertex_file = open_source(Stage::Vertex, vertex_path)?;
    let mut fragment_file = open_source(Stage::Fragment, fragment_path)?;

    let vertex = read_source(Stage::Vertex, vertex_path, &mut vertex_file)?;
    let fragment = read_source(Stage::Fragment, fragment_path, &mut fragment_file)?;
    let geometry = match geometry_path {
        Some(path) => Some(read_text(Stage::Geometry, path)?),
        None => None,
    };

    Ok(ShaderSources {
        vertex: Some(vertex),
        fragment: Some(fragment),
        geometry,
    })
}

/// Read a combined source file and split it into stages. Open and read
/// failures are attributed to the vertex stage, the first one consumed.
pub fn read_combined(path: &Path) -> Result<ShaderSources, SourceError> {
    let text = read_text(Stage::Vertex, path)?;
    Ok(split_combined(&text))
}

// ============================================================
// Combined-source splitting
// ============================================================

/// Split combined source text into its `#shader <stage>` sections.
///
/// A section runs from the line after its header up to the next line that
/// starts with `#shader`, or to the end of the text. The body is kept
/// verbatim. The first section for a stage wins; unknown stage names close
/// the previous section and are otherwise skipped. A header on the last line
/// with no newline after it has no body.
pub fn split_combined(text: &str) -> ShaderSources {
    let mut sources = ShaderSources::default();
    let mut current: Option<(Stage, String)> = None;

    for line in text.split_inclusive('\n') {
        let Some(rest) = line.trim_start().strip_prefix(SECTION_HEADER) else {
            if let Some((_, body)) = current.as_mut() {
                body.push_str(line);
            }
            continue;
        };

        if let Some((stage, body)) = current.take() {
            let slot = sources.slot_mut(stage);
            if slot.is_none() {
                *slot = Some(body);
            }
        }

        if !line.ends_with('\n') {
            break;
        }
        let name = rest.split_whitespace().next().unwrap_or("");
        current = Stage::from_name(name).map(|stage| (stage, String::new()));
    }

    if let Some((stage, body)) = current {
        let slot = sources.slot_mut(stage);
        if slot.is_none() {
            *slot = Some(body);
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_two_sections() {
        let sources = split_combined("#shader vertex\nA\n#shader fragment\nB\n");
        assert_eq!(sources.vertex.as_deref(), Some("A\n"));
        assert_eq!(sources.fragment.as_deref(), Some("B\n"));
        assert_eq!(sources.geometry, None);
    }

    #[test]
    fn test_split_order_and_geometry() {
        let text = "#shader fragment\nvoid main() {}\n#shader geometry\nG\n#shader vertex\nV1\nV2";
        let sources = split_combined(text);
        assert_eq!(sources.fragment.as_deref(), Some("void main() {}\n"));
        assert_eq!(sources.geometry.as_deref(), Some("G\n"));
        assert_eq!(sources.vertex.as_deref(), Some("V1\nV2"));
    }

    #[test]
    fn test_split_missing_section() {
        let sources = split_combined("#shader vertex\nA\n");
        assert_eq!(sources.vertex.as_deref(), Some("A\n"));
        assert!(matches!(
            sources.require(Stage::Fragment),
            Err(SourceError::Missing { stage: Stage::Fragment })
        ));
    }

    #[test]
    fn test_split_unknown_and_duplicate_sections() {
        let text = "preamble\n#shader vertex\nA\n#shader compute\nC\n#shader vertex\nZ\n";
        let sources = split_combined(text);
        assert_eq!(sources.vertex.as_deref(), Some("A\n"));
        assert_eq!(sources.fragment, None);
    }

    #[test]
    fn test_split_header_at_end_has_no_body() {
        let sources = split_combined("#shader vertex\nA\n#shader fragment");
        assert_eq!(sources.vertex.as_deref(), Some("A\n"));
        assert_eq!(sources.fragment, None);
    }

    #[test]
    fn test_split_empty_section() {
        let sources = split_combined("#shader vertex\n#shader fragment\nB\n");
        assert_eq!(sources.vertex.as_deref(), Some(""));
        assert_eq!(sources.fragment.as_deref(), Some("B\n"));
    }

    #[test]
    fn test_read_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let vpath = dir.path().join("a.vert");
        let fpath = dir.path().join("a.frag");
        std::fs::write(&vpath, "vertex text").unwrap();
        std::fs::write(&fpath, "fragment text").unwrap();

        let sources = read_distinct(&vpath, &fpath, None).unwrap();
        assert_eq!(sources, ShaderSources::new("vertex text", "fragment text"));
    }

    #[test]
    fn test_read_distinct_open_order() {
        let dir = tempfile::tempdir().unwrap();
        let vpath = dir.path().join("a.vert");
        let missing = dir.path().join("missing.frag");
        std::fs::write(&vpath, "vertex text").unwrap();

        let err = read_distinct(&vpath, &missing, None).unwrap_err();
        assert!(matches!(err, SourceError::Open { stage: Stage::Fragment, .. }));

        let err = read_distinct(&missing, &missing, None).unwrap_err();
        assert!(matches!(err, SourceError::Open { stage: Stage::Vertex, .. }));
    }

    #[test]
    fn test_read_invalid_utf8_is_io_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = read_text(Stage::Geometry, file.path()).unwrap_err();
        assert!(matches!(err, SourceError::Io { stage: Stage::Geometry, .. }));
        assert_eq!(err.stage(), Stage::Geometry);
    }

    #[test]
    fn test_read_combined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"#shader vertex\nA\n#shader fragment\nB\n").unwrap();

        let sources = read_combined(file.path()).unwrap();
        assert_eq!(sources, ShaderSources::new("A\n", "B\n"));
    }
}
