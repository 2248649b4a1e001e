//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

/// `[normal, v1, v2, v3]` as plain arrays
pub type Facet = [[f32; 3]; 4];

/// Axis-aligned cube spanning `[lo, hi]` on every axis, 12 outward-wound facets.
pub fn cube(lo: f32, hi: f32) -> Vec<Facet> {
    let (l, h) = (lo, hi);
    vec![
        // Front face
        [[0.0, 0.0, 1.0], [l, l, h], [h, l, h], [h, h, h]],
        [[0.0, 0.0, 1.0], [l, l, h], [h, h, h], [l, h, h]],
        // Back face
        [[0.0, 0.0, -1.0], [l, l, l], [l, h, l], [h, h, l]],
        [[0.0, 0.0, -1.0], [l, l, l], [h, h, l], [h, l, l]],
        // Top face
        [[0.0, 1.0, 0.0], [l, h, l], [l, h, h], [h, h, h]],
        [[0.0, 1.0, 0.0], [l, h, l], [h, h, h], [h, h, l]],
        // Bottom face
        [[0.0, -1.0, 0.0], [l, l, l], [h, l, l], [h, l, h]],
        [[0.0, -1.0, 0.0], [l, l, l], [h, l, h], [l, l, h]],
        // Right face
        [[1.0, 0.0, 0.0], [h, l, l], [h, h, l], [h, h, h]],
        [[1.0, 0.0, 0.0], [h, l, l], [h, h, h], [h, l, h]],
        // Left face
        [[-1.0, 0.0, 0.0], [l, l, l], [l, l, h], [l, h, h]],
        [[-1.0, 0.0, 0.0], [l, l, l], [l, h, h], [l, h, l]],
    ]
}

pub fn binary_stl(header: &str, facets: &[Facet]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data[..header.len()].copy_from_slice(header.as_bytes());
    data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
    for facet in facets {
        for vector in facet {
            for c in vector {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

pub fn ascii_stl(name: &str, facets: &[Facet]) -> String {
    let mut out = format!("solid {name}\n");
    for [n, a, b, c] in facets {
        out.push_str(&format!("  facet normal {} {} {}\n", n[0], n[1], n[2]));
        out.push_str("    outer loop\n");
        for v in [a, b, c] {
            out.push_str(&format!("      vertex {:.6} {:.6} {:.6}\n", v[0], v[1], v[2]));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    out
}

pub fn temp_model(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
