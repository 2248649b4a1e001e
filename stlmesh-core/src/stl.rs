/// STL model parser for binary and ASCII formats
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use nom::{
    character::complete::{multispace0, multispace1},
    number::complete::float,
    sequence::preceded,
    IResult,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, StlError, StlResult};
use crate::mesh::TriangleMesh;
use crate::scalar::Scalar;
use crate::transform::{transform_coordinate, transform_normal, AffineTransform, TransformConfig};

pub const INDEX_NORMAL: usize = 0;
pub const INDEX_V1: usize = 1;
pub const INDEX_V2: usize = 2;
pub const INDEX_V3: usize = 3;

/// One parsed facet: `[normal, v1, v2, v3]`, addressed with the `INDEX_*` constants.
pub type TriangleRecord = [Vector3<f32>; 4];

const HEADER_LEN: usize = 80;
/// Normal, three vertices and the attribute byte count
const RECORD_LEN: usize = 50;
const SUPPORTED_EXTENSIONS: &[&str] = &["STL"];

/// Any seekable byte source the parser can read a model from.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

enum ModelSource<'a> {
    Unset,
    Path(PathBuf),
    /// Borrowed from the caller; rewound and read, never closed.
    Stream(&'a mut dyn ReadSeek),
}

/// Builder-style STL reader.
///
/// Configure a source (a path or a borrowed stream, never both) and an
/// optional transform, then call [`StlParser::parse_model`]. Setters check
/// their constraints immediately and return a [`ConfigError`] on misuse.
/// Decoding failures never escape: they turn into a `false` result, with
/// the cause kept in [`StlParser::last_error`].
///
/// ```no_run
/// use stlmesh_core::StlParser;
///
/// # fn main() -> Result<(), stlmesh_core::ConfigError> {
/// let mut parser = StlParser::new().model_path("part.stl")?.scale(2.0)?;
/// if parser.parse_model()? {
///     println!("{} faces around {:?}", parser.face_count(), parser.center());
/// }
/// # Ok(())
/// # }
/// ```
pub struct StlParser<'a> {
    source: ModelSource<'a>,
    /// File opened from `ModelPath`, owned until `dispose` or drop.
    opened: Option<File>,
    transform: TransformConfig,
    invert_normals: bool,
    adjust_model_center: bool,
    update_mesh: bool,
    header: Option<String>,
    triangles: Option<Vec<TriangleRecord>>,
    center: Vector3<f32>,
    successfully_parsed: bool,
    parsing_attempts: usize,
    last_error: Option<StlError>,
}

impl<'a> StlParser<'a> {
    pub fn new() -> Self {
        Self {
            source: ModelSource::Unset,
            opened: None,
            transform: TransformConfig::Identity,
            invert_normals: false,
            adjust_model_center: true,
            update_mesh: false,
            header: None,
            triangles: None,
            center: Vector3::zeros(),
            successfully_parsed: false,
            parsing_attempts: 0,
            last_error: None,
        }
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        if matches!(self.source, ModelSource::Stream(_)) {
            return Err(ConfigError::SourceConflict);
        }
        self.source = ModelSource::Path(path.into());
        Ok(self)
    }

    /// Read from a caller-owned stream. It may be rewound but is never closed.
    pub fn stream<R: Read + Seek>(mut self, stream: &'a mut R) -> Result<Self, ConfigError> {
        if matches!(self.source, ModelSource::Path(_)) {
            return Err(ConfigError::SourceConflict);
        }
        self.source = ModelSource::Stream(stream);
        Ok(self)
    }

    pub fn scale(mut self, factor: f32) -> Result<Self, ConfigError> {
        if let TransformConfig::Composed { scale, .. } = self.composed_transform()? {
            *scale = factor;
        }
        Ok(self)
    }

    pub fn rotation(mut self, quaternion: UnitQuaternion<f32>) -> Result<Self, ConfigError> {
        if let TransformConfig::Composed { rotation, .. } = self.composed_transform()? {
            *rotation = quaternion;
        }
        Ok(self)
    }

    pub fn translate(mut self, offset: Vector3<f32>) -> Result<Self, ConfigError> {
        if let TransformConfig::Composed { translation, .. } = self.composed_transform()? {
            *translation = offset;
        }
        Ok(self)
    }

    /// Use an explicit transform instead of `scale`/`rotation`/`translate`.
    pub fn transform(mut self, transform: AffineTransform) -> Result<Self, ConfigError> {
        if self.transform.is_composed() {
            return Err(ConfigError::TransformConflict);
        }
        self.transform = TransformConfig::Explicit(transform);
        Ok(self)
    }

    pub fn invert_normals(mut self, invert: bool) -> Self {
        self.invert_normals = invert;
        self
    }

    /// Shift all vertices so the model centroid sits at the origin (default on).
    ///
    /// A vertex's position before centering is `vertex + center()`.
    pub fn adjust_model_center(mut self, adjust: bool) -> Self {
        self.adjust_model_center = adjust;
        self
    }

    /// Run [`TriangleMesh::update`] on every mesh handed out by `get_mesh`.
    pub fn update_mesh(mut self, update: bool) -> Self {
        self.update_mesh = update;
        self
    }

    fn composed_transform(&mut self) -> Result<&mut TransformConfig, ConfigError> {
        match self.transform {
            TransformConfig::Explicit(_) => Err(ConfigError::TransformConflict),
            TransformConfig::Identity => {
                self.transform = TransformConfig::composed();
                Ok(&mut self.transform)
            }
            TransformConfig::Composed { .. } => Ok(&mut self.transform),
        }
    }

    /// Parse the configured source, binary first with an ASCII fallback.
    ///
    /// Returns `Ok(false)` for every I/O or format failure. Only a missing
    /// source is reported as an error.
    pub fn parse_model(&mut self) -> Result<bool, ConfigError> {
        let options = DecodeOptions::new(&self.transform, self.invert_normals);
        self.opened = None;

        let decoded = match &mut self.source {
            ModelSource::Unset => return Err(ConfigError::MissingSource),
            ModelSource::Path(path) => {
                open_model(path).and_then(|file| decode_model(self.opened.insert(file), &options))
            }
            ModelSource::Stream(stream) => decode_model(&mut **stream, &options),
        };
        self.parsing_attempts += 1;

        match decoded {
            Ok(model) => {
                self.header = Some(model.header);
                self.triangles = Some(model.triangles);
                self.adjust_center();
                self.successfully_parsed = true;
                self.last_error = None;
                info!(
                    faces = self.face_count(),
                    "Parsed STL model, center [{:.3}, {:.3}, {:.3}]",
                    self.center.x,
                    self.center.y,
                    self.center.z
                );
            }
            Err(e) => {
                warn!(attempt = self.parsing_attempts, "Failed to parse STL model: {}", e);
                self.clear();
                self.successfully_parsed = false;
                self.last_error = Some(e);
            }
        }

        Ok(self.successfully_parsed)
    }

    /// Chaining form of [`StlParser::parse_model`].
    pub fn parsed(mut self) -> Result<(Self, bool), ConfigError> {
        let successful = self.parse_model()?;
        Ok((self, successful))
    }

    /// Build a half-edge mesh from the parsed triangles.
    ///
    /// Parses first when no attempt has been made yet. Returns `None` when
    /// there is no triangle data. Indices and normals are filled in only when
    /// [`StlParser::update_mesh`] is on.
    pub fn get_mesh<T: Scalar>(&mut self) -> Result<Option<TriangleMesh<T>>, ConfigError> {
        if !self.successfully_parsed && self.parsing_attempts == 0 {
            self.parse_model()?;
        }

        let mut mesh = self
            .triangles
            .as_deref()
            .map(TriangleMesh::from_stl_triangles);
        if self.update_mesh {
            if let Some(mesh) = mesh.as_mut() {
                mesh.update();
            }
        }
        Ok(mesh)
    }

    /// Every vertex position in triangle order, normals excluded.
    pub fn positions(&self) -> Result<impl Iterator<Item = Vector3<f32>> + '_, ConfigError> {
        let triangles = self.triangles.as_deref().ok_or(ConfigError::NotParsed)?;
        Ok(triangles
            .iter()
            .flat_map(|t| [t[INDEX_V1], t[INDEX_V2], t[INDEX_V3]]))
    }

    /// Look for collapsed or numerically broken triangles.
    ///
    /// A triangle is flagged when two corners are exactly equal, or when the
    /// dot product of two of its normalized corner positions leaves `[-1, 1]`.
    pub fn is_degenerated(&self) -> bool {
        self.triangles().iter().any(|t| {
            let (a, b, c) = (t[INDEX_V1], t[INDEX_V2], t[INDEX_V3]);
            if a == b || a == c || b == c {
                return true;
            }

            let (a, b, c) = (a.normalize(), b.normalize(), c.normalize());
            [a.dot(&b), b.dot(&c), c.dot(&a)]
                .iter()
                .any(|&cos| cos < -1.0 || cos > 1.0)
        })
    }

    /// Release the file opened from a model path. Borrowed streams are left alone.
    pub fn dispose(&mut self) {
        if matches!(self.source, ModelSource::Path(_)) {
            self.opened = None;
        }
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn triangles(&self) -> &[TriangleRecord] {
        self.triangles.as_deref().unwrap_or(&[])
    }

    pub fn face_count(&self) -> usize {
        self.triangles().len()
    }

    pub fn vertex_count(&self) -> usize {
        self.face_count() * 3
    }

    /// Centroid of all positions, measured before recentering.
    pub fn center(&self) -> Vector3<f32> {
        self.center
    }

    pub fn is_successfully_parsed(&self) -> bool {
        self.successfully_parsed
    }

    pub fn parsing_attempts(&self) -> usize {
        self.parsing_attempts
    }

    pub fn last_error(&self) -> Option<&StlError> {
        self.last_error.as_ref()
    }

    pub fn supported_extensions(&self) -> &'static [&'static str] {
        SUPPORTED_EXTENSIONS
    }

    fn clear(&mut self) {
        self.triangles = None;
    }

    fn adjust_center(&mut self) {
        let Some(triangles) = self.triangles.as_mut() else {
            return;
        };

        let positions = triangles
            .iter()
            .flat_map(|t| [t[INDEX_V1], t[INDEX_V2], t[INDEX_V3]]);
        self.center = centroid(positions).unwrap_or_else(Vector3::zeros);

        if !self.adjust_model_center {
            return;
        }
        for triangle in triangles.iter_mut() {
            for slot in [INDEX_V1, INDEX_V2, INDEX_V3] {
                triangle[slot] -= self.center;
            }
        }
    }
}

impl Default for StlParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic mean of a point set, `None` when it is empty.
///
/// Sums in `f64` so large models do not drift.
pub fn centroid<I>(positions: I) -> Option<Vector3<f32>>
where
    I: IntoIterator<Item = Vector3<f32>>,
{
    let (sum, count) = positions
        .into_iter()
        .fold((Vector3::<f64>::zeros(), 0usize), |(sum, count), p| {
            (sum + p.map(|c| c as f64), count + 1)
        });

    (count > 0).then(|| (sum / count as f64).map(|c| c as f32))
}

struct DecodedModel {
    header: String,
    triangles: Vec<TriangleRecord>,
}

/// Per-parse transform state shared read-only by the decode workers
struct DecodeOptions {
    /// `None` for the identity, so untransformed input is copied bit for bit
    matrix: Option<Matrix4<f32>>,
    invert_normals: bool,
}

impl DecodeOptions {
    fn new(transform: &TransformConfig, invert_normals: bool) -> Self {
        let matrix = match transform {
            TransformConfig::Identity => None,
            other => Some(other.to_matrix4x4()),
        };
        Self {
            matrix,
            invert_normals,
        }
    }

    fn coordinate(&self, v: Vector3<f32>) -> Vector3<f32> {
        match &self.matrix {
            Some(m) => transform_coordinate(m, &v),
            None => v,
        }
    }

    fn normal(&self, n: Vector3<f32>) -> Vector3<f32> {
        let n = match &self.matrix {
            Some(m) => transform_normal(m, &n),
            None => n,
        };
        // Zero normals are common in exported files; keep them zero
        let n = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        if self.invert_normals {
            -n
        } else {
            n
        }
    }
}

fn open_model(path: &Path) -> StlResult<File> {
    if !path.is_file() {
        return Err(StlError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path.extension().and_then(|e| e.to_str());
    let supported = extension.map_or(false, |ext| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
    });
    if !supported {
        return Err(StlError::UnsupportedExtension {
            extension: extension.map(String::from),
        });
    }

    debug!("Opening STL model {:?}", path);
    Ok(File::open(path)?)
}

fn decode_model(reader: &mut dyn ReadSeek, options: &DecodeOptions) -> StlResult<DecodedModel> {
    match parse_binary(reader, options) {
        Ok(model) => {
            debug!("Decoded {} triangles from binary STL", model.triangles.len());
            Ok(model)
        }
        Err(e) => {
            debug!("Binary decode failed ({}), retrying as ASCII", e);
            reader.rewind()?;
            let model = parse_ascii(reader, options)?;
            debug!("Decoded {} triangles from ASCII STL", model.triangles.len());
            Ok(model)
        }
    }
}

/// Parse a binary STL body, rejecting headers that look like ASCII
fn parse_binary(reader: &mut dyn ReadSeek, options: &DecodeOptions) -> StlResult<DecodedModel> {
    // Earlier attempts may have left the stream anywhere
    reader.rewind()?;

    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let header = decode_header(&header);
    if has_ascii_signature(&header) {
        return Err(StlError::AsciiSignature);
    }

    // Triangle count (4 bytes, little-endian)
    let mut count = [0u8; 4];
    reader.read_exact(&mut count)?;
    let count = u32::from_le_bytes(count) as usize;

    let expected = count.saturating_mul(RECORD_LEN);
    let mut body = Vec::new();
    (&mut *reader)
        .take(expected as u64)
        .read_to_end(&mut body)?;
    if body.len() < expected {
        return Err(StlError::Truncated {
            expected,
            actual: body.len(),
        });
    }

    // Each worker owns one output slot and reads one 50-byte record
    let mut triangles = vec![[Vector3::zeros(); 4]; count];
    triangles
        .par_iter_mut()
        .zip(body.par_chunks_exact(RECORD_LEN))
        .for_each(|(slot, record)| *slot = decode_record(record, options));

    Ok(DecodedModel { header, triangles })
}

fn decode_header(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

/// `solid ` as the first space-delimited token marks an ASCII file.
///
/// Binary exporters can write the same prefix, which then sends a valid
/// binary file down the ASCII path.
fn has_ascii_signature(header: &str) -> bool {
    match header.find(' ') {
        Some(idx) if idx > 0 => header[..idx].eq_ignore_ascii_case("solid"),
        _ => false,
    }
}

fn decode_record(record: &[u8], options: &DecodeOptions) -> TriangleRecord {
    [
        options.normal(read_vec3(record, 0)),
        options.coordinate(read_vec3(record, 12)),
        options.coordinate(read_vec3(record, 24)),
        options.coordinate(read_vec3(record, 36)),
    ]
}

#[inline]
fn read_vec3(data: &[u8], offset: usize) -> Vector3<f32> {
    let read = |o: usize| f32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
    Vector3::new(read(offset), read(offset + 4), read(offset + 8))
}

/// Parse the line-oriented ASCII grammar. Unknown keywords are skipped.
fn parse_ascii(reader: &mut dyn ReadSeek, options: &DecodeOptions) -> StlResult<DecodedModel> {
    let mut header = String::new();
    let mut triangles = Vec::new();
    let mut normal = Vector3::zeros();
    let mut vertices: Vec<Vector3<f32>> = Vec::with_capacity(3);

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => StlError::InvalidUtf8 { line: line_no },
            _ => StlError::Io(e),
        })?;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (keyword, rest) = next_token(line);
        match keyword.to_ascii_uppercase().as_str() {
            "SOLID" => header = rest.to_string(),
            "FACET" => {
                vertices.clear();
                let (kind, values) = next_token(rest);
                if kind.eq_ignore_ascii_case("normal") {
                    normal = options.normal(parse_vector3(values, line_no)?);
                }
            }
            "VERTEX" => vertices.push(options.coordinate(parse_vector3(rest, line_no)?)),
            "ENDFACET" => {
                if vertices.len() != 3 {
                    return Err(StlError::MalformedFacet {
                        line: line_no,
                        vertices: vertices.len(),
                    });
                }
                triangles.push([normal, vertices[0], vertices[1], vertices[2]]);
            }
            _ => {}
        }
    }

    if triangles.is_empty() {
        return Err(StlError::Empty);
    }

    Ok(DecodedModel { header, triangles })
}

fn next_token(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (text, ""),
    }
}

fn parse_vector3(input: &str, line: usize) -> StlResult<Vector3<f32>> {
    vector3(input)
        .map(|(_, v)| v)
        .map_err(|e| StlError::InvalidNumber {
            line,
            details: e.to_string(),
        })
}

fn vector3(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, x) = preceded(multispace0, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    fn binary_stl(header: &str, triangles: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[..header.len()].copy_from_slice(header.as_bytes());
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for triangle in triangles {
            for vector in triangle {
                for c in vector {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    const ASCII_TRIANGLE: &str = "solid test_solid
  facet normal 0 0 2
    outer loop
      vertex 0 0 0
      vertex 1.5 0 0
      vertex 0 1e1 0
    endloop
  endfacet
endsolid test_solid
";

    #[test]
    fn test_parse_binary_header() {
        let data = binary_stl("model", &[]);
        let mut cursor = Cursor::new(data);
        let model = parse_binary(&mut cursor, &DecodeOptions::new(&TransformConfig::Identity, false))
            .unwrap();
        assert_eq!(model.header, "model");
        assert!(model.triangles.is_empty());
    }

    #[test]
    fn test_ascii_signature() {
        assert!(has_ascii_signature("solid cube"));
        assert!(has_ascii_signature("SOLID cube"));
        assert!(!has_ascii_signature("solid"));
        assert!(!has_ascii_signature("solidworks export"));
        assert!(!has_ascii_signature(" solid cube"));
    }

    #[test]
    fn test_binary_record_layout() {
        let data = binary_stl(
            "cube",
            &[[[0.0, 0.0, 3.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]],
        );
        let mut cursor = Cursor::new(data);
        let mut parser = StlParser::new()
            .stream(&mut cursor)
            .unwrap()
            .adjust_model_center(false);

        assert!(parser.parse_model().unwrap());
        assert_eq!(parser.header(), Some("cube"));
        let t = parser.triangles()[0];
        assert_eq!(t[INDEX_NORMAL], Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(t[INDEX_V1], Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(t[INDEX_V2], Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(t[INDEX_V3], Vector3::new(7.0, 8.0, 9.0));
        assert_relative_eq!(parser.center(), Vector3::new(4.0, 5.0, 6.0), epsilon = 1e-6);
    }

    #[test]
    fn test_truncated_binary_is_rejected() {
        let mut data = binary_stl("part", &[[[0.0; 3]; 4]]);
        data[80..84].copy_from_slice(&1000u32.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let result = parse_binary(&mut cursor, &DecodeOptions::new(&TransformConfig::Identity, false));
        assert!(matches!(result, Err(StlError::Truncated { .. })));
    }

    #[test]
    fn test_ascii_fallback() {
        let mut cursor = Cursor::new(ASCII_TRIANGLE.as_bytes().to_vec());
        let mut parser = StlParser::new()
            .stream(&mut cursor)
            .unwrap()
            .adjust_model_center(false)
            .invert_normals(true);

        assert!(parser.parse_model().unwrap());
        assert_eq!(parser.header(), Some("test_solid"));
        assert_eq!(parser.face_count(), 1);
        let t = parser.triangles()[0];
        assert_eq!(t[INDEX_NORMAL], Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(t[INDEX_V2], Vector3::new(1.5, 0.0, 0.0));
        assert_eq!(t[INDEX_V3], Vector3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn test_ascii_without_facets_fails() {
        let mut cursor = Cursor::new(b"solid empty\nendsolid empty\n".to_vec());
        let mut parser = StlParser::new().stream(&mut cursor).unwrap();

        assert!(!parser.parse_model().unwrap());
        assert!(!parser.is_successfully_parsed());
        assert!(matches!(parser.last_error(), Some(StlError::Empty)));
        assert!(parser.positions().is_err());
    }

    #[test]
    fn test_ascii_facet_with_two_vertices_fails() {
        let text = "solid bad\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\n";
        let mut cursor = Cursor::new(text.as_bytes().to_vec());
        let mut parser = StlParser::new().stream(&mut cursor).unwrap();

        assert!(!parser.parse_model().unwrap());
        assert!(matches!(
            parser.last_error(),
            Some(StlError::MalformedFacet { line: 7, vertices: 2 })
        ));
    }

    #[test]
    fn test_ascii_bad_number_fails() {
        let text = "solid bad\nfacet normal 0 0 1\nvertex 0 zero 0\n";
        let mut cursor = Cursor::new(text.as_bytes().to_vec());
        let mut parser = StlParser::new().stream(&mut cursor).unwrap();

        assert!(!parser.parse_model().unwrap());
        assert!(matches!(
            parser.last_error(),
            Some(StlError::InvalidNumber { line: 3, .. })
        ));
    }

    #[test]
    fn test_source_conflict() {
        let mut cursor = Cursor::new(Vec::new());
        let result = StlParser::new().model_path("a").unwrap().stream(&mut cursor);
        assert_eq!(result.err(), Some(ConfigError::SourceConflict));

        let mut cursor = Cursor::new(Vec::new());
        let result = StlParser::new().stream(&mut cursor).unwrap().model_path("a");
        assert_eq!(result.err(), Some(ConfigError::SourceConflict));
    }

    #[test]
    fn test_transform_conflict() {
        let result = StlParser::new()
            .scale(2.0)
            .unwrap()
            .transform(AffineTransform::identity());
        assert_eq!(result.err(), Some(ConfigError::TransformConflict));

        let result = StlParser::new()
            .transform(AffineTransform::identity())
            .unwrap()
            .translate(Vector3::zeros());
        assert_eq!(result.err(), Some(ConfigError::TransformConflict));
    }

    #[test]
    fn test_missing_source() {
        let mut parser = StlParser::new();
        assert_eq!(parser.parse_model(), Err(ConfigError::MissingSource));
        assert_eq!(parser.parsing_attempts(), 0);
    }

    #[test]
    fn test_composed_transform_is_applied() {
        let data = binary_stl(
            "part",
            &[[[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]],
        );
        let mut cursor = Cursor::new(data);
        let mut parser = StlParser::new()
            .stream(&mut cursor)
            .unwrap()
            .scale(2.0)
            .unwrap()
            .translate(Vector3::new(0.0, 0.0, 5.0))
            .unwrap()
            .adjust_model_center(false);

        assert!(parser.parse_model().unwrap());
        let t = parser.triangles()[0];
        assert_relative_eq!(t[INDEX_V1], Vector3::new(2.0, 0.0, 5.0), epsilon = 1e-6);
        assert_relative_eq!(t[INDEX_V3], Vector3::new(0.0, 0.0, 7.0), epsilon = 1e-6);
        // Normals are renormalized after scaling
        assert_relative_eq!(t[INDEX_NORMAL], Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_detection() {
        let mut cursor = Cursor::new(binary_stl(
            "flat",
            &[[[0.0; 3], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]],
        ));
        let mut parser = StlParser::new().stream(&mut cursor).unwrap();
        assert!(parser.parse_model().unwrap());
        assert!(parser.is_degenerated());

        let h = 3f32.sqrt() / 2.0;
        let mut cursor = Cursor::new(binary_stl(
            "equilateral",
            &[[[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, h, 0.0]]],
        ));
        let mut parser = StlParser::new().stream(&mut cursor).unwrap();
        assert!(parser.parse_model().unwrap());
        assert!(!parser.is_degenerated());
    }

    #[test]
    fn test_collinear_distinct_corners_pass_degenerate_check() {
        // Normalized corners are parallel, so every dot product is 1 up to rounding
        let mut cursor = Cursor::new(binary_stl(
            "line",
            &[[[0.0; 3], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]],
        ));
        let mut parser = StlParser::new()
            .stream(&mut cursor)
            .unwrap()
            .adjust_model_center(false);
        assert!(parser.parse_model().unwrap());

        let t = parser.triangles()[0];
        let (a, b) = (t[INDEX_V1].normalize(), t[INDEX_V2].normalize());
        assert!((-1.0..=1.0).contains(&a.dot(&b)));
        assert!(!parser.is_degenerated());
    }

    #[test]
    fn test_failed_reopen_releases_previous_file() {
        let mut file = tempfile::Builder::new().suffix(".stl").tempfile().unwrap();
        std::io::Write::write_all(&mut file, ASCII_TRIANGLE.as_bytes()).unwrap();
        let path = file.path().to_path_buf();
        let mut parser = StlParser::new().model_path(&path).unwrap();

        assert!(parser.parse_model().unwrap());
        assert!(parser.opened.is_some());

        drop(file);
        assert!(!parser.parse_model().unwrap());
        assert!(matches!(parser.last_error(), Some(StlError::NotFound { .. })));
        assert!(parser.opened.is_none());
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid(std::iter::empty()), None);
        let c = centroid([Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 4.0, -6.0)]).unwrap();
        assert_relative_eq!(c, Vector3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn test_next_token() {
        assert_eq!(next_token("facet normal 0 0 1"), ("facet", "normal 0 0 1"));
        assert_eq!(next_token("vertex\t1  2 3"), ("vertex", "1  2 3"));
        assert_eq!(next_token("endfacet"), ("endfacet", ""));
    }
}
