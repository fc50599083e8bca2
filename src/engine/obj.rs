use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str;

use nalgebra_glm as glm;

#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Raw geometry from an OBJ file: positions and 0-based triangle indices,
/// both in file order. Indices are not checked against the vertex count.
#[derive(Clone, Debug, Default)]
pub struct ObjData {
    pub vertices: Vec<glm::Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

pub fn load_obj(path: &Path) -> Result<ObjData, ObjError> {
    let file = File::open(path).map_err(|source| ObjError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    parse_obj(BufReader::new(file))
}

/// Reads `v x y z` and `f i j k` lines. Every other line is ignored, even
/// when it is not valid UTF-8.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<ObjData, ObjError> {
    let mut obj = ObjData::default();

    for (number, line) in reader.split(b'\n').enumerate() {
        let line_number = number + 1;
        let line = line.map_err(|source| ObjError::Read {
            line: line_number,
            source,
        })?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);

        if let Some(rest) = line.strip_prefix(b"v ") {
            match str::from_utf8(rest) {
                Ok(fields) => obj.vertices.push(parse_vertex(fields)),
                Err(_) => {
                    tracing::warn!(line = line_number, "skipping vertex that is not UTF-8")
                }
            }
        } else if let Some(rest) = line.strip_prefix(b"f ") {
            match str::from_utf8(rest).ok().and_then(parse_triangle) {
                Some(triangle) => obj.triangles.push(triangle),
                None => tracing::warn!(
                    line = line_number,
                    "skipping face that is not a triangle of positive indices: {:?}",
                    String::from_utf8_lossy(line)
                ),
            }
        }
    }

    Ok(obj)
}

// Missing or malformed coordinates read as zero.
fn parse_vertex(fields: &str) -> glm::Vec3 {
    let mut coords = fields
        .split_whitespace()
        .map(|field| field.parse::<f32>().unwrap_or(0.0));

    let x = coords.next().unwrap_or(0.0);
    let y = coords.next().unwrap_or(0.0);
    let z = coords.next().unwrap_or(0.0);
    glm::vec3(x, y, z)
}

fn parse_triangle(fields: &str) -> Option<[u32; 3]> {
    let indices = fields
        .split_whitespace()
        .map(parse_index)
        .collect::<Option<Vec<u32>>>()?;

    match indices[..] {
        [a, b, c] => Some([a, b, c]),
        _ => None,
    }
}

// `7`, `7/2` and `7/2/5` all name vertex 7 (1-based).
fn parse_index(token: &str) -> Option<u32> {
    let vertex = token.split('/').next()?;
    vertex.parse::<u32>().ok()?.checked_sub(1)
}
