//! Attribute access for mesh vertices, edges and faces.
//!
//! Vertex coordinates are exposed as the attributes `x`, `y` and `z`; they are
//! stored in the vertex record rather than the attribute store, so they are
//! always present and always numeric.

use nalgebra::Point3;

use super::Mesh;
use crate::attr::{Attr, AttrMap};
use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, FaceKey, VertexKey};

pub(crate) const COORDINATE_NAMES: [&str; 3] = ["x", "y", "z"];

/// Pull `x`, `y`, `z` out of an attribute map and apply them to `base`.
pub(crate) fn take_position(attrs: &mut AttrMap, base: Point3<f64>) -> Result<Point3<f64>> {
    let mut position = base;
    for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
        if let Some(value) = attrs.remove(*name) {
            position[axis] = value
                .as_f64()
                .ok_or_else(|| MeshError::invalid_param("coordinate", format!("{:?}", value), "must be numeric"))?;
        }
    }
    Ok(position)
}

pub(crate) fn coordinate_axis(name: &str) -> Option<usize> {
    COORDINATE_NAMES.iter().position(|&n| n == name)
}

impl Mesh {
    // ==================== Vertices ====================

    /// Default vertex attributes, coordinates included.
    pub fn default_vertex_attributes(&self) -> AttrMap {
        let mut out = self.vertex_attrs.defaults().clone();
        for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
            out.insert(name.to_string(), Attr::Float(self.default_position[axis]));
        }
        out
    }

    /// Merge `mapping` into the default vertex template.
    ///
    /// Changed values reach only vertices created afterwards; new names reach all.
    pub fn update_default_vertex_attributes(&mut self, mut mapping: AttrMap) -> Result<()> {
        self.default_position = take_position(&mut mapping, self.default_position)?;
        self.vertex_attrs.update_defaults(mapping);
        Ok(())
    }

    /// Read one vertex attribute.
    pub fn vertex_attribute(&self, v: VertexKey, name: &str) -> Option<Attr> {
        let record = self.vertices.get(&v)?;
        match coordinate_axis(name) {
            Some(axis) => Some(Attr::Float(record.position[axis])),
            None => self.vertex_attrs.get(v, name).cloned(),
        }
    }

    /// All attributes of a vertex, coordinates included.
    pub fn vertex_attributes(&self, v: VertexKey) -> Option<AttrMap> {
        let record = self.vertices.get(&v)?;
        let mut out = self.vertex_attrs.attributes(v);
        for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
            out.insert(name.to_string(), Attr::Float(record.position[axis]));
        }
        Some(out)
    }

    /// Write one vertex attribute.
    pub fn set_vertex_attribute(&mut self, v: VertexKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_vertex(v) {
            return Err(MeshError::not_found("vertex", v));
        }
        match coordinate_axis(name) {
            Some(axis) => {
                let x = value
                    .as_f64()
                    .ok_or_else(|| MeshError::invalid_param("coordinate", format!("{:?}", value), "must be numeric"))?;
                if let Some(record) = self.vertices.get_mut(&v) {
                    record.position[axis] = x;
                }
                Ok(())
            }
            None => self.vertex_attrs.set(v, name, value),
        }
    }

    /// Drop a vertex attribute override.
    pub fn unset_vertex_attribute(&mut self, v: VertexKey, name: &str) {
        self.vertex_attrs.unset(v, name);
    }

    /// Read one attribute for many vertices (all vertices when `keys` is `None`).
    pub fn vertices_attribute(&self, name: &str, keys: Option<&[VertexKey]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&v| self.vertex_attribute(v, name)).collect(),
            None => self.vertices().map(|v| self.vertex_attribute(v, name)).collect(),
        }
    }

    /// Read several attributes for many vertices.
    pub fn vertices_attributes(&self, names: &[&str], keys: Option<&[VertexKey]>) -> Vec<Vec<Option<Attr>>> {
        let keys: Vec<VertexKey> = keys.map_or_else(|| self.vertices().collect(), <[_]>::to_vec);
        keys.iter()
            .map(|&v| names.iter().map(|name| self.vertex_attribute(v, name)).collect())
            .collect()
    }

    /// Write one attribute on many vertices. Nothing is written if any key is unknown.
    pub fn set_vertices_attribute(&mut self, name: &str, value: Attr, keys: Option<&[VertexKey]>) -> Result<()> {
        let keys: Vec<VertexKey> = keys.map_or_else(|| self.vertices().collect(), <[_]>::to_vec);
        if let Some(&missing) = keys.iter().find(|&&v| !self.has_vertex(v)) {
            return Err(MeshError::not_found("vertex", missing));
        }
        if coordinate_axis(name).is_none() {
            self.vertex_attrs.check_name(name)?;
        } else if value.as_f64().is_none() {
            return Err(MeshError::invalid_param("coordinate", format!("{:?}", value), "must be numeric"));
        }
        for v in keys {
            self.set_vertex_attribute(v, name, value.clone())?;
        }
        Ok(())
    }

    // ==================== Faces ====================

    /// Default face attributes.
    pub fn default_face_attributes(&self) -> &AttrMap {
        self.face_attrs.defaults()
    }

    /// Merge `mapping` into the default face template.
    pub fn update_default_face_attributes(&mut self, mapping: AttrMap) {
        self.face_attrs.update_defaults(mapping);
    }

    /// Read one face attribute.
    pub fn face_attribute(&self, f: FaceKey, name: &str) -> Option<Attr> {
        if !self.has_face(f) {
            return None;
        }
        self.face_attrs.get(f, name).cloned()
    }

    /// All attributes of a face.
    pub fn face_attributes(&self, f: FaceKey) -> Option<AttrMap> {
        self.has_face(f).then(|| self.face_attrs.attributes(f))
    }

    /// Write one face attribute.
    pub fn set_face_attribute(&mut self, f: FaceKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_face(f) {
            return Err(MeshError::not_found("face", f));
        }
        self.face_attrs.set(f, name, value)
    }

    /// Drop a face attribute override.
    pub fn unset_face_attribute(&mut self, f: FaceKey, name: &str) {
        self.face_attrs.unset(f, name);
    }

    /// Read one attribute for many faces.
    pub fn faces_attribute(&self, name: &str, keys: Option<&[FaceKey]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&f| self.face_attribute(f, name)).collect(),
            None => self.faces().map(|f| self.face_attribute(f, name)).collect(),
        }
    }

    /// Write one attribute on many faces. Nothing is written if any key is unknown.
    pub fn set_faces_attribute(&mut self, name: &str, value: Attr, keys: Option<&[FaceKey]>) -> Result<()> {
        let keys: Vec<FaceKey> = keys.map_or_else(|| self.faces().collect(), <[_]>::to_vec);
        if let Some(&missing) = keys.iter().find(|&&f| !self.has_face(f)) {
            return Err(MeshError::not_found("face", missing));
        }
        self.face_attrs.check_name(name)?;
        for f in keys {
            self.face_attrs.set(f, name, value.clone())?;
        }
        Ok(())
    }

    // ==================== Edges ====================

    /// Default edge attributes.
    pub fn default_edge_attributes(&self) -> &AttrMap {
        self.edge_attrs.defaults()
    }

    /// Merge `mapping` into the default edge template.
    pub fn update_default_edge_attributes(&mut self, mapping: AttrMap) {
        self.edge_attrs.update_defaults(mapping);
    }

    /// Read one edge attribute. Either orientation of the edge may be given.
    pub fn edge_attribute(&self, u: VertexKey, v: VertexKey, name: &str) -> Option<Attr> {
        if !self.has_edge(u, v) {
            return None;
        }
        self.edge_attrs.get(canonical_edge(u, v), name).cloned()
    }

    /// All attributes of an edge.
    pub fn edge_attributes(&self, u: VertexKey, v: VertexKey) -> Option<AttrMap> {
        self.has_edge(u, v)
            .then(|| self.edge_attrs.attributes(canonical_edge(u, v)))
    }

    /// Write one edge attribute. The edge record is created on first write.
    pub fn set_edge_attribute(&mut self, u: VertexKey, v: VertexKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_edge(u, v) {
            return Err(MeshError::not_found("edge", (u, v)));
        }
        self.edge_attrs.set(canonical_edge(u, v), name, value)
    }

    /// Drop an edge attribute override.
    pub fn unset_edge_attribute(&mut self, u: VertexKey, v: VertexKey, name: &str) {
        self.edge_attrs.unset(canonical_edge(u, v), name);
    }

    /// Read one attribute for many edges (all edges when `keys` is `None`).
    pub fn edges_attribute(&self, name: &str, keys: Option<&[(VertexKey, VertexKey)]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&(u, v)| self.edge_attribute(u, v, name)).collect(),
            None => self.edges().map(|(u, v)| self.edge_attribute(u, v, name)).collect(),
        }
    }

    /// Write one attribute on many edges. Nothing is written if any edge is unknown.
    pub fn set_edges_attribute(
        &mut self,
        name: &str,
        value: Attr,
        keys: Option<&[(VertexKey, VertexKey)]>,
    ) -> Result<()> {
        let keys: Vec<(VertexKey, VertexKey)> = keys.map_or_else(|| self.edges().collect(), <[_]>::to_vec);
        if let Some(&missing) = keys.iter().find(|&&(u, v)| !self.has_edge(u, v)) {
            return Err(MeshError::not_found("edge", missing));
        }
        self.edge_attrs.check_name(name)?;
        for (u, v) in keys {
            self.edge_attrs.set(canonical_edge(u, v), name, value.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{attrs, MeshConfig};

    fn triangle() -> (Mesh, [VertexKey; 3], FaceKey) {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex_at(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex_at(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex_at(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_face(&[a, b, c], None, AttrMap::new()).unwrap();
        (mesh, [a, b, c], f)
    }

    #[test]
    fn test_coordinates_are_attributes() {
        let (mut mesh, [_, b, _], _) = triangle();
        assert_eq!(mesh.vertex_attribute(b, "x"), Some(Attr::Float(1.0)));

        mesh.set_vertex_attribute(b, "z", Attr::from(2.5)).unwrap();
        assert_eq!(mesh.position(b), Point3::new(1.0, 0.0, 2.5));

        let err = mesh.set_vertex_attribute(b, "y", Attr::from("up"));
        assert!(matches!(err, Err(MeshError::InvalidParameter { .. })));
    }

    #[test]
    fn test_default_values_apply_to_later_vertices_only() {
        let mut mesh = Mesh::new();
        mesh.update_default_vertex_attributes(attrs([("is_fixed", Attr::from(false))]))
            .unwrap();
        let a = mesh.add_vertex_at(Point3::origin());
        mesh.update_default_vertex_attributes(attrs([("is_fixed", Attr::from(true)), ("load", Attr::from(1.0))]))
            .unwrap();
        let b = mesh.add_vertex_at(Point3::origin());

        assert_eq!(mesh.vertex_attribute(a, "is_fixed"), Some(Attr::Bool(false)));
        assert_eq!(mesh.vertex_attribute(b, "is_fixed"), Some(Attr::Bool(true)));
        // Names new to the template reach older vertices too.
        assert_eq!(mesh.vertex_attribute(a, "load"), Some(Attr::Float(1.0)));
    }

    #[test]
    fn test_edge_attributes_ignore_orientation() {
        let (mut mesh, [a, b, _], _) = triangle();
        mesh.set_edge_attribute(b, a, "crease", Attr::from(true)).unwrap();
        assert_eq!(mesh.edge_attribute(a, b, "crease"), Some(Attr::Bool(true)));

        let missing = VertexKey::new(99);
        assert!(mesh.set_edge_attribute(a, missing, "crease", Attr::from(true)).is_err());
    }

    #[test]
    fn test_batch_write_is_all_or_nothing() {
        let (mut mesh, [a, _, _], f) = triangle();
        let keys = [a, VertexKey::new(42)];
        let err = mesh.set_vertices_attribute("weight", Attr::from(2.0), Some(&keys));
        assert!(matches!(err, Err(MeshError::KeyNotFound { .. })));
        assert_eq!(mesh.vertex_attribute(a, "weight"), None);

        mesh.set_faces_attribute("color", Attr::from("red"), None).unwrap();
        assert_eq!(mesh.face_attribute(f, "color"), Some(Attr::from("red")));
    }

    #[test]
    fn test_strict_schema_on_mesh() {
        let mut mesh = Mesh::with_config(MeshConfig::default().with_strict_attributes(true));
        mesh.update_default_face_attributes(attrs([("color", Attr::from("grey"))]));
        let a = mesh.add_vertex_at(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex_at(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex_at(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_face(&[a, b, c], None, AttrMap::new()).unwrap();

        assert!(mesh.set_face_attribute(f, "color", Attr::from("red")).is_ok());
        assert!(matches!(
            mesh.set_face_attribute(f, "shade", Attr::from(1)),
            Err(MeshError::AttributeSchema { .. })
        ));
        // Coordinates are always declared.
        assert!(mesh.set_vertex_attribute(a, "x", Attr::from(3.0)).is_ok());
    }
}
