//! Mesh results.
//!
//! Meshes are prepared for the viewer here: faces are fan-triangulated,
//! missing vertex normals are accumulated from area-weighted face normals,
//! and the geometry is centred on its bounding sphere and scaled to a fixed
//! radius. The viewer hook on the page reads the prepared JSON from a
//! `<script type="application/json">` element.

use std::collections::HashMap;

use serde::Serialize;

use super::{facts, panel, steps_list, variant_item, variants_container, RenderError, Rendered};
use crate::api::response::{MeshAugmented, MeshOriginal, MeshPreprocessed};
use crate::api::MeshData;

/// Radius every mesh is scaled to.
pub const CANONICAL_RADIUS: f64 = 2.0;

/// Viewer-ready geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedMesh {
    pub positions: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
    #[serde(skip)]
    pub center: [f64; 3],
    #[serde(skip)]
    pub radius: f64,
}

impl PreparedMesh {
    pub fn prepare(mesh: &MeshData) -> Self {
        let indices = triangulate(&mesh.faces);
        let normals = match &mesh.normals {
            Some(normals) if normals.len() == mesh.vertices.len() => normals.clone(),
            _ => accumulate_normals(&mesh.vertices, &indices),
        };
        let (center, radius) = bounding_sphere(&mesh.vertices);
        let scale = if radius > 1e-12 {
            CANONICAL_RADIUS / radius
        } else {
            1.0
        };
        let positions = mesh
            .vertices
            .iter()
            .map(|v| {
                [
                    (v[0] - center[0]) * scale,
                    (v[1] - center[1]) * scale,
                    (v[2] - center[2]) * scale,
                ]
            })
            .collect();
        Self {
            positions,
            normals,
            indices,
            center,
            radius,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn to_json(&self) -> Result<String, RenderError> {
        serde_json::to_string(self).map_err(|e| RenderError::Malformed {
            field: format!("mesh geometry ({e})"),
        })
    }
}

/// Fan-triangulate polygon faces: (v0, vi, vi+1).
fn triangulate(faces: &[Vec<u32>]) -> Vec<u32> {
    let mut indices = Vec::with_capacity(faces.len() * 3);
    for face in faces {
        for i in 1..face.len().saturating_sub(1) {
            indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
        }
    }
    indices
}

/// Unnormalized triangle normal; its length is twice the triangle's area.
fn face_normal(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> [f64; 3] {
    let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ]
}

/// Normalize, falling back to +Y for degenerate vectors.
fn normalize_or_up(v: [f64; 3]) -> [f64; 3] {
    let len_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    if len_sq > 1e-24 {
        let inv = 1.0 / len_sq.sqrt();
        [v[0] * inv, v[1] * inv, v[2] * inv]
    } else {
        [0.0, 1.0, 0.0]
    }
}

fn accumulate_normals(vertices: &[[f64; 3]], indices: &[u32]) -> Vec<[f64; 3]> {
    let mut acc = vec![[0.0; 3]; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = face_normal(vertices[i0], vertices[i1], vertices[i2]);
        for i in [i0, i1, i2] {
            acc[i][0] += n[0];
            acc[i][1] += n[1];
            acc[i][2] += n[2];
        }
    }
    acc.into_iter().map(normalize_or_up).collect()
}

/// Bounding-box centre and the largest distance from it to any vertex.
fn bounding_sphere(vertices: &[[f64; 3]]) -> ([f64; 3], f64) {
    if vertices.is_empty() {
        return ([0.0; 3], 0.0);
    }
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for v in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(v[axis]);
            max[axis] = max[axis].max(v[axis]);
        }
    }
    let center = [
        (min[0] + max[0]) / 2.0,
        (min[1] + max[1]) / 2.0,
        (min[2] + max[2]) / 2.0,
    ];
    let radius = vertices
        .iter()
        .map(|v| {
            let d = [v[0] - center[0], v[1] - center[1], v[2] - center[2]];
            (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
        })
        .fold(0.0, f64::max);
    (center, radius)
}

/// A surface is closed when every undirected edge is shared by exactly two faces.
pub fn is_watertight(mesh: &MeshData) -> bool {
    if mesh.faces.is_empty() {
        return false;
    }
    let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
    for face in &mesh.faces {
        for (i, &a) in face.iter().enumerate() {
            let b = face[(i + 1) % face.len()];
            *edges.entry((a.min(b), a.max(b))).or_default() += 1;
        }
    }
    edges.values().all(|&count| count == 2)
}

fn yes_no(flag: bool) -> String {
    String::from(if flag { "Yes" } else { "No" })
}

fn viewer(prepared: &PreparedMesh, label: &str) -> Result<String, RenderError> {
    let id = uuid::Uuid::new_v4();
    Ok(format!(
        "<div class=\"mesh-viewer\" data-mesh=\"mesh-{id}\" aria-label=\"{}\"></div>\
         <script type=\"application/json\" id=\"mesh-{id}\">{}</script>",
        super::escape_html(label),
        prepared.to_json()?
    ))
}

pub fn original(result: &MeshOriginal) -> Result<Rendered, RenderError> {
    let prepared = PreparedMesh::prepare(&result.mesh);
    let v = &result.validation;
    let rows = [
        ("Vertices", v.vertex_count.to_string()),
        ("Faces", v.face_count.to_string()),
        ("Watertight", yes_no(v.is_watertight)),
    ];
    let body = format!("{}{}", viewer(&prepared, "Original mesh")?, facts(&rows));
    Ok(Rendered::new(panel("mesh", "Original 3D Model", result.source, &body)))
}

pub fn preprocessed(result: &MeshPreprocessed) -> Result<Rendered, RenderError> {
    let prepared = PreparedMesh::prepare(&result.mesh);
    let stats = &result.statistics;
    let mut rows = vec![
        ("Original vertices", stats.original.vertices.to_string()),
        ("Original faces", stats.original.faces.to_string()),
        ("Processed vertices", stats.processed.vertices.to_string()),
        ("Processed faces", stats.processed.faces.to_string()),
        ("Vertices reduced", stats.improvements.vertices_reduced.to_string()),
        ("Faces reduced", stats.improvements.faces_reduced.to_string()),
    ];
    if let Some(watertight) = stats.processed.is_watertight {
        rows.push(("Watertight", yes_no(watertight)));
    }
    let body = format!(
        "{}{}{}",
        viewer(&prepared, "Processed mesh")?,
        facts(&rows),
        steps_list(&result.steps)
    );
    Ok(Rendered::new(panel("mesh", "Processed 3D Model", result.source, &body)))
}

pub fn augmented(result: &MeshAugmented) -> Result<Rendered, RenderError> {
    let mut items = Vec::with_capacity(result.variants.len());
    for variant in &result.variants {
        let mesh = &variant.value;
        let prepared = PreparedMesh::prepare(mesh);
        let rows = [
            ("Vertices", mesh.vertices.len().to_string()),
            ("Faces", mesh.faces.len().to_string()),
            ("Watertight", yes_no(is_watertight(mesh))),
        ];
        let body = format!("{}{}", viewer(&prepared, &variant.name)?, facts(&rows));
        items.push(variant_item(&variant.name, &body));
    }
    let body = format!("{}{}", variants_container(&items), steps_list(&result.steps));
    Ok(Rendered::new(panel("mesh", "Augmented 3D Models", result.source, &body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> MeshData {
        MeshData {
            vertices: vec![
                [1.0, 1.0, 1.0],
                [-1.0, -1.0, 1.0],
                [-1.0, 1.0, -1.0],
                [1.0, -1.0, -1.0],
            ],
            faces: vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
            normals: None,
        }
    }

    fn length(v: [f64; 3]) -> f64 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_fan_triangulation() {
        assert_eq!(triangulate(&[vec![0, 1, 2, 3]]), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(triangulate(&[vec![4, 5, 6]]), vec![4, 5, 6]);
    }

    #[test]
    fn test_prepare_scales_to_canonical_radius() {
        let mut mesh = tetrahedron();
        for v in &mut mesh.vertices {
            v[0] = v[0] * 10.0 + 5.0;
            v[1] = v[1] * 10.0 - 3.0;
            v[2] *= 10.0;
        }
        let prepared = PreparedMesh::prepare(&mesh);
        assert!((prepared.center[0] - 5.0).abs() < 1e-9);
        assert!((prepared.center[1] + 3.0).abs() < 1e-9);
        let max = prepared.positions.iter().copied().map(length).fold(0.0, f64::max);
        assert!((max - CANONICAL_RADIUS).abs() < 1e-9);
    }

    #[test]
    fn test_computed_normals_point_outward() {
        let mesh = tetrahedron();
        let prepared = PreparedMesh::prepare(&mesh);
        assert_eq!(prepared.normals.len(), 4);
        for (n, v) in prepared.normals.iter().zip(&mesh.vertices) {
            assert!((length(*n) - 1.0).abs() < 1e-9);
            let dot = n[0] * v[0] + n[1] * v[1] + n[2] * v[2];
            assert!(dot > 0.0, "normal {n:?} points inward at {v:?}");
        }
    }

    #[test]
    fn test_supplied_normals_are_kept() {
        let mut mesh = tetrahedron();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        let prepared = PreparedMesh::prepare(&mesh);
        assert!(prepared.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_degenerate_mesh() {
        let mesh = MeshData {
            vertices: vec![[1.0, 1.0, 1.0]],
            faces: vec![],
            normals: None,
        };
        let prepared = PreparedMesh::prepare(&mesh);
        assert_eq!(prepared.positions, vec![[0.0, 0.0, 0.0]]);
        assert_eq!(prepared.normals, vec![[0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_watertight_detection() {
        let closed = tetrahedron();
        assert!(is_watertight(&closed));

        let mut open = tetrahedron();
        open.faces.pop();
        assert!(!is_watertight(&open));
    }

    #[test]
    fn test_augmented_panels_embed_geometry() {
        use crate::api::response::Variant;
        use crate::api::ResponseSource;

        let result = MeshAugmented {
            variants: ["scaled", "rotated"]
                .iter()
                .map(|name| Variant {
                    name: name.to_string(),
                    value: tetrahedron(),
                })
                .collect(),
            steps: vec!["Scaled by 1.5".into()],
            source: ResponseSource::Live,
        };
        let rendered = augmented(&result).unwrap();
        assert_eq!(rendered.html.matches("class=\"mesh-viewer\"").count(), 2);
        assert_eq!(rendered.html.matches("\"indices\":[").count(), 2);
        assert!(rendered.html.contains("<dd>Yes</dd>"));
    }
}
