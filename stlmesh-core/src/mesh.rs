/// Indexed half-edge triangle mesh.
///
/// Vertices, half-edges and triangles live in dense arenas and refer to each
/// other through typed indices, so the cyclic `next`/`previous`/`opposite`
/// links need no shared ownership. A missing opposite (mesh boundary) is
/// `None`.
use std::thread::{self, JoinHandle};

use hashbrown::HashMap;
use nalgebra::Vector3;
use tracing::debug;

use crate::scalar::Scalar;
use crate::stl::{TriangleRecord, INDEX_V1, INDEX_V2, INDEX_V3};

/// Index into [`TriangleMesh::vertices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

/// Index into [`TriangleMesh::half_edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfEdgeId(pub usize);

/// Index into [`TriangleMesh::triangles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub usize);

/// A mesh vertex shared by every triangle corner welded onto it.
#[derive(Debug, Clone)]
pub struct Vertex<T: Scalar> {
    position: Vector3<T>,
    normal: Option<Vector3<T>>,
    index: Option<usize>,
    out_edges: Vec<HalfEdgeId>,
    in_edges: Vec<HalfEdgeId>,
}

impl<T: Scalar> Vertex<T> {
    fn new(position: Vector3<T>) -> Self {
        Self {
            position,
            normal: None,
            index: None,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        }
    }

    pub fn position(&self) -> &Vector3<T> {
        &self.position
    }

    /// Set by [`TriangleMesh::compute_vertex_normals`].
    pub fn normal(&self) -> Option<&Vector3<T>> {
        self.normal.as_ref()
    }

    /// Dense index assigned by [`TriangleMesh::need_vertex_indices`].
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Half-edges starting at this vertex.
    pub fn out_edges(&self) -> &[HalfEdgeId] {
        &self.out_edges
    }

    /// Half-edges ending at this vertex.
    pub fn in_edges(&self) -> &[HalfEdgeId] {
        &self.in_edges
    }
}

/// Directed edge owned by exactly one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    start: VertexId,
    end: VertexId,
    next: HalfEdgeId,
    previous: HalfEdgeId,
    opposite: Option<HalfEdgeId>,
    triangle: TriangleId,
}

impl HalfEdge {
    pub fn start_vertex(&self) -> VertexId {
        self.start
    }

    pub fn end_vertex(&self) -> VertexId {
        self.end
    }

    pub fn next_edge(&self) -> HalfEdgeId {
        self.next
    }

    pub fn previous_edge(&self) -> HalfEdgeId {
        self.previous
    }

    /// `None` on the mesh boundary.
    pub fn opposite_edge(&self) -> Option<HalfEdgeId> {
        self.opposite
    }

    pub fn triangle(&self) -> TriangleId {
        self.triangle
    }

    pub fn is_boundary(&self) -> bool {
        self.opposite.is_none()
    }
}

/// A face made of three half-edges forming a closed loop.
///
/// The face normal is cached when the mesh is built. Moving vertices with
/// [`TriangleMesh::set_vertex_position`] leaves it stale until
/// [`TriangleMesh::recompute_normals`] is called.
#[derive(Debug, Clone)]
pub struct Triangle<T: Scalar> {
    index: usize,
    edges: [HalfEdgeId; 3],
    normal: Vector3<T>,
}

impl<T: Scalar> Triangle<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn edges(&self) -> [HalfEdgeId; 3] {
        self.edges
    }

    /// Cached unit normal, zero for a collapsed triangle.
    pub fn normal(&self) -> &Vector3<T> {
        &self.normal
    }
}

/// Half-edge mesh over the scalar type `T`.
#[derive(Debug, Clone)]
pub struct TriangleMesh<T: Scalar> {
    vertices: Vec<Vertex<T>>,
    half_edges: Vec<HalfEdge>,
    triangles: Vec<Triangle<T>>,
}

impl<T: Scalar> TriangleMesh<T> {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            half_edges: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangle_count / 2 + 3),
            half_edges: Vec::with_capacity(triangle_count * 3),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Build the mesh from parser records, ignoring the stored facet normals.
    ///
    /// Corners whose `f32` coordinates compare equal are welded into one
    /// vertex, so `-0.0` and `0.0` share a vertex. Half-edges running in opposite directions between the same
    /// two vertices are paired as opposites; when more than two triangles
    /// share an edge only the first pair is linked and the rest stay open.
    pub fn from_stl_triangles(records: &[TriangleRecord]) -> Self {
        let mut mesh = Self::with_capacity(records.len());
        let mut welded: HashMap<[u32; 3], VertexId> = HashMap::with_capacity(records.len());
        let mut directed: HashMap<(VertexId, VertexId), HalfEdgeId> =
            HashMap::with_capacity(records.len() * 3);

        for record in records {
            let corners = [INDEX_V1, INDEX_V2, INDEX_V3]
                .map(|slot| mesh.weld_vertex(&mut welded, &record[slot]));
            mesh.push_triangle(corners, &mut directed);
        }

        debug!(
            "Built half-edge mesh: {} vertices, {} triangles, {} boundary edges",
            mesh.vertices.len(),
            mesh.triangles.len(),
            mesh.boundary_edges().count()
        );

        mesh
    }

    fn weld_vertex(
        &mut self,
        welded: &mut HashMap<[u32; 3], VertexId>,
        position: &Vector3<f32>,
    ) -> VertexId {
        *welded.entry(weld_key(position)).or_insert_with(|| {
            let id = VertexId(self.vertices.len());
            self.vertices
                .push(Vertex::new(position.map(T::cast_from_f32)));
            id
        })
    }

    fn push_triangle(
        &mut self,
        corners: [VertexId; 3],
        directed: &mut HashMap<(VertexId, VertexId), HalfEdgeId>,
    ) {
        let triangle = TriangleId(self.triangles.len());
        let base = self.half_edges.len();

        for i in 0..3 {
            self.half_edges.push(HalfEdge {
                start: corners[i],
                end: corners[(i + 1) % 3],
                next: HalfEdgeId(base + (i + 1) % 3),
                previous: HalfEdgeId(base + (i + 2) % 3),
                opposite: None,
                triangle,
            });
        }

        for i in 0..3 {
            let id = HalfEdgeId(base + i);
            let (start, end) = (corners[i], corners[(i + 1) % 3]);
            self.vertices[start.0].out_edges.push(id);
            self.vertices[end.0].in_edges.push(id);

            // A collapsed edge has no meaningful twin
            if start == end {
                continue;
            }
            if let Some(&twin) = directed.get(&(end, start)) {
                if self.half_edges[twin.0].opposite.is_none() {
                    self.half_edges[twin.0].opposite = Some(id);
                    self.half_edges[id.0].opposite = Some(twin);
                }
            }
            directed.entry((start, end)).or_insert(id);
        }

        let edges = [HalfEdgeId(base), HalfEdgeId(base + 1), HalfEdgeId(base + 2)];
        let normal = self.face_normal(edges);
        self.triangles.push(Triangle {
            index: triangle.0,
            edges,
            normal,
        });
    }

    pub fn vertices(&self) -> &[Vertex<T>] {
        &self.vertices
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    pub fn triangles(&self) -> &[Triangle<T>] {
        &self.triangles
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex<T> {
        &self.vertices[id.0]
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.0]
    }

    pub fn triangle(&self, id: TriangleId) -> &Triangle<T> {
        &self.triangles[id.0]
    }

    /// `end - start`, computed on every call.
    pub fn edge_vector(&self, id: HalfEdgeId) -> Vector3<T> {
        let edge = &self.half_edges[id.0];
        self.vertices[edge.end.0].position - self.vertices[edge.start.0].position
    }

    pub fn triangle_vertices(&self, id: TriangleId) -> [VertexId; 3] {
        self.triangles[id.0]
            .edges
            .map(|edge| self.half_edges[edge.0].start)
    }

    pub fn triangle_positions(&self, id: TriangleId) -> [Vector3<T>; 3] {
        self.triangle_vertices(id)
            .map(|vertex| self.vertices[vertex.0].position)
    }

    /// Cached normal, see [`Triangle`] for staleness.
    pub fn triangle_normal(&self, id: TriangleId) -> Vector3<T> {
        self.triangles[id.0].normal
    }

    /// Euclidean area, `0.5 * |e0 x e1|`.
    pub fn triangle_area(&self, id: TriangleId) -> T {
        let [e0, e1, _] = self.triangles[id.0].edges;
        self.edge_vector(e0).cross(&self.edge_vector(e1)).norm() * T::cast_from_f32(0.5)
    }

    /// Mean of the three corner positions.
    pub fn triangle_mass_center(&self, id: TriangleId) -> Vector3<T> {
        let [a, b, c] = self.triangle_positions(id);
        (a + b + c) / T::cast_from_f32(3.0)
    }

    pub fn outgoing_edges(&self, id: VertexId) -> &[HalfEdgeId] {
        &self.vertices[id.0].out_edges
    }

    /// Triangles incident to a vertex.
    pub fn vertex_fan(&self, id: VertexId) -> impl Iterator<Item = TriangleId> + '_ {
        self.vertices[id.0]
            .out_edges
            .iter()
            .map(|edge| self.half_edges[edge.0].triangle)
    }

    pub fn boundary_edges(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.half_edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.opposite.is_none())
            .map(|(i, _)| HalfEdgeId(i))
    }

    /// True when the mesh has faces and every half-edge has an opposite.
    pub fn is_closed(&self) -> bool {
        !self.half_edges.is_empty() && self.half_edges.iter().all(|edge| edge.opposite.is_some())
    }

    /// Number every vertex by its current position in the vertex list.
    ///
    /// Indices are a snapshot and are not kept in sync afterwards.
    pub fn need_vertex_indices(&mut self) {
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            vertex.index = Some(i);
        }
    }

    /// Move a vertex. Cached triangle and vertex normals are left untouched.
    pub fn set_vertex_position(&mut self, id: VertexId, position: Vector3<T>) {
        self.vertices[id.0].position = position;
    }

    pub fn recompute_normals(&mut self) {
        for i in 0..self.triangles.len() {
            let normal = self.face_normal(self.triangles[i].edges);
            self.triangles[i].normal = normal;
        }
    }

    /// Area-weighted vertex normals from the current positions.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::<T>::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let [e0, e1, _] = triangle.edges;
            // Unnormalized cross product weights by twice the area
            let weighted = self.edge_vector(e0).cross(&self.edge_vector(e1));
            for edge in triangle.edges {
                sums[self.half_edges[edge.0].start.0] += weighted;
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = Some(sum.try_normalize(T::zero()).unwrap_or_else(Vector3::zeros));
        }
    }

    /// Refresh vertex indices, triangle normals and vertex normals.
    pub fn update(&mut self) {
        self.need_vertex_indices();
        self.recompute_normals();
        self.compute_vertex_normals();
    }

    /// Run [`TriangleMesh::update`] on a background thread.
    pub fn update_async(mut self) -> JoinHandle<Self>
    where
        T: 'static,
    {
        thread::spawn(move || {
            self.update();
            self
        })
    }

    fn face_normal(&self, edges: [HalfEdgeId; 3]) -> Vector3<T> {
        self.edge_vector(edges[0])
            .cross(&self.edge_vector(edges[1]))
            .try_normalize(T::zero())
            .unwrap_or_else(Vector3::zeros)
    }
}

impl<T: Scalar> Default for TriangleMesh<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash key for exact coordinate equality. Both zeros map to `+0.0`.
fn weld_key(position: &Vector3<f32>) -> [u32; 3] {
    [position.x, position.y, position.z].map(|c| {
        let c = if c == 0.0 { 0.0f32 } else { c };
        c.to_bits()
    })
}
