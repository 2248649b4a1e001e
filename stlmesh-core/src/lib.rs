/// stlmesh core library - STL reading and half-edge meshes
///
/// Reads binary and ASCII STL models into flat triangle records, applies an
/// optional affine transform, recenters the model, and builds an indexed
/// half-edge mesh for adjacency queries.

pub mod error;
pub mod mesh;
pub mod scalar;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use error::{ConfigError, StlError, StlResult};
pub use mesh::{HalfEdge, HalfEdgeId, Triangle, TriangleId, TriangleMesh, Vertex, VertexId};
pub use scalar::Scalar;
pub use stl::{centroid, StlParser, TriangleRecord, INDEX_NORMAL, INDEX_V1, INDEX_V2, INDEX_V3};
pub use transform::{AffineTransform, TransformConfig};
