/// Model inspection for the stlmesh command line
use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};
use nalgebra::{UnitQuaternion, Vector3};
use stlmesh_core::{StlParser, TriangleId};
use tracing::debug;

/// How the model is loaded before it is summarised
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub scale: Option<f32>,
    pub translate: Option<[f32; 3]>,
    /// Roll, pitch, yaw in radians
    pub rotate_euler: Option<[f32; 3]>,
    pub invert_normals: bool,
    pub keep_origin: bool,
    /// Also build the half-edge mesh and report its topology
    pub mesh: bool,
}

#[derive(Debug, Clone)]
pub struct MeshStats {
    pub vertices: usize,
    pub half_edges: usize,
    pub boundary_edges: usize,
    pub closed: bool,
    pub surface_area: f64,
}

#[derive(Debug, Clone)]
pub struct ModelReport {
    pub header: String,
    pub faces: usize,
    pub vertices: usize,
    pub center: Vector3<f32>,
    pub degenerate: bool,
    pub mesh: Option<MeshStats>,
}

/// Parse a model file and collect its statistics
pub fn inspect(path: &Path, options: &InspectOptions) -> Result<ModelReport> {
    let mut parser = StlParser::new().model_path(path)?;
    if let Some(factor) = options.scale {
        parser = parser.scale(factor)?;
    }
    if let Some([roll, pitch, yaw]) = options.rotate_euler {
        parser = parser.rotation(UnitQuaternion::from_euler_angles(roll, pitch, yaw))?;
    }
    if let Some(offset) = options.translate {
        parser = parser.translate(Vector3::from(offset))?;
    }
    let mut parser = parser
        .invert_normals(options.invert_normals)
        .adjust_model_center(!options.keep_origin);

    if !parser.parse_model()? {
        let reason = parser
            .last_error()
            .map_or_else(|| "unknown error".to_string(), |e| e.to_string());
        bail!("failed to parse {}: {}", path.display(), reason);
    }

    let mesh = if options.mesh {
        parser.get_mesh::<f64>()?.map(|mesh| {
            debug!("Collecting half-edge statistics");
            MeshStats {
                vertices: mesh.vertices().len(),
                half_edges: mesh.half_edges().len(),
                boundary_edges: mesh.boundary_edges().count(),
                closed: mesh.is_closed(),
                surface_area: (0..mesh.triangles().len())
                    .map(|t| mesh.triangle_area(TriangleId(t)))
                    .sum(),
            }
        })
    } else {
        None
    };

    let report = ModelReport {
        header: parser.header().unwrap_or_default().to_string(),
        faces: parser.face_count(),
        vertices: parser.vertex_count(),
        center: parser.center(),
        degenerate: parser.is_degenerated(),
        mesh,
    };
    parser.dispose();

    Ok(report)
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Header:      {}", self.header)?;
        writeln!(f, "Faces:       {}", self.faces)?;
        writeln!(f, "Vertices:    {}", self.vertices)?;
        writeln!(
            f,
            "Center:      [{:.4}, {:.4}, {:.4}]",
            self.center.x, self.center.y, self.center.z
        )?;
        writeln!(f, "Degenerate:  {}", if self.degenerate { "yes" } else { "no" })?;

        if let Some(mesh) = &self.mesh {
            writeln!(f, "Half-edge mesh:")?;
            writeln!(f, "  Welded vertices: {}", mesh.vertices)?;
            writeln!(f, "  Half-edges:      {}", mesh.half_edges)?;
            writeln!(f, "  Boundary edges:  {}", mesh.boundary_edges)?;
            writeln!(f, "  Closed:          {}", if mesh.closed { "yes" } else { "no" })?;
            writeln!(f, "  Surface area:    {:.4}", mesh.surface_area)?;
        }
        Ok(())
    }
}
