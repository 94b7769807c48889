use cgmath::{Vector2, Vector3};

use crate::{
    PIXELS_PER_UNIT,
    data_structures::node::{FLOATS_PER_VERTEX, Geometry},
    resources::tag::Tag,
};

/// One side of a cuboid. North faces -Z, east faces +X, up faces +Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::North,
        Face::South,
        Face::East,
        Face::West,
        Face::Up,
        Face::Down,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Face::North => "n",
            Face::South => "s",
            Face::East => "e",
            Face::West => "w",
            Face::Up => "u",
            Face::Down => "d",
        }
    }

    pub fn normal(self) -> Vector3<f32> {
        match self {
            Face::North => Vector3::new(0.0, 0.0, -1.0),
            Face::South => Vector3::new(0.0, 0.0, 1.0),
            Face::East => Vector3::new(1.0, 0.0, 0.0),
            Face::West => Vector3::new(-1.0, 0.0, 0.0),
            Face::Up => Vector3::new(0.0, 1.0, 0.0),
            Face::Down => Vector3::new(0.0, -1.0, 0.0),
        }
    }

    /// Corners as seen from outside: top-left, bottom-left, bottom-right, top-right.
    /// That order is counter-clockwise around the outward normal.
    fn corners(self, min: Vector3<f32>, max: Vector3<f32>) -> [Vector3<f32>; 4] {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        let v = Vector3::new;
        match self {
            Face::North => [v(x1, y1, z0), v(x1, y0, z0), v(x0, y0, z0), v(x0, y1, z0)],
            Face::South => [v(x0, y1, z1), v(x0, y0, z1), v(x1, y0, z1), v(x1, y1, z1)],
            Face::East => [v(x1, y1, z1), v(x1, y0, z1), v(x1, y0, z0), v(x1, y1, z0)],
            Face::West => [v(x0, y1, z0), v(x0, y0, z0), v(x0, y0, z1), v(x0, y1, z1)],
            Face::Up => [v(x0, y1, z0), v(x0, y1, z1), v(x1, y1, z1), v(x1, y1, z0)],
            Face::Down => [v(x0, y0, z1), v(x0, y0, z0), v(x1, y0, z0), v(x1, y0, z1)],
        }
    }
}

/// Accumulates vertices in the flat 8-float layout of [`Geometry`], converting from
/// authoring units on the way in: positions from pixels to model units, UVs from texture
/// pixels to 0..1 and normals flipped.
pub struct GeometryBuilder {
    tex_size: Vector2<f32>,
    data: Vec<f32>,
}

impl GeometryBuilder {
    pub fn new(tex_size: Vector2<f32>) -> Self {
        Self {
            tex_size: Vector2::new(tex_size.x.max(1.0), tex_size.y.max(1.0)),
            data: Vec::new(),
        }
    }

    pub fn push_vertex(&mut self, position: Vector3<f32>, uv: Vector2<f32>, normal: Vector3<f32>) {
        let position = position / PIXELS_PER_UNIT;
        self.data.extend_from_slice(&[
            position.x,
            position.y,
            position.z,
            uv.x / self.tex_size.x,
            uv.y / self.tex_size.y,
            -normal.x,
            -normal.y,
            -normal.z,
        ]);
    }

    /// `uv` is `[u1, v1, u2, v2]` in texture pixels.
    pub fn push_face(&mut self, face: Face, min: Vector3<f32>, max: Vector3<f32>, uv: [f32; 4]) {
        let [u1, v1, u2, v2] = uv;
        let uvs = [
            Vector2::new(u1, v1),
            Vector2::new(u1, v2),
            Vector2::new(u2, v2),
            Vector2::new(u2, v1),
        ];
        for (corner, uv) in face.corners(min, max).into_iter().zip(uvs) {
            self.push_vertex(corner, uv, face.normal());
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / FLOATS_PER_VERTEX
    }

    pub fn build(self) -> Geometry {
        Geometry::new(self.data)
    }
}

/// Box between `from` and `to` (pixels), grown by `inflate` on every side. Faces
/// without a UV box, or with an empty one, are left out.
pub fn build_cuboid(
    from: Vector3<f32>,
    to: Vector3<f32>,
    inflate: f32,
    faces: &[(Face, [f32; 4])],
    tex_size: Vector2<f32>,
) -> Geometry {
    let grow = Vector3::new(inflate, inflate, inflate);
    let min = Vector3::new(from.x.min(to.x), from.y.min(to.y), from.z.min(to.z)) - grow;
    let max = Vector3::new(from.x.max(to.x), from.y.max(to.y), from.z.max(to.z)) + grow;

    let mut builder = GeometryBuilder::new(tex_size);
    for &(face, uv) in faces {
        let [u1, v1, u2, v2] = uv;
        if u1 == u2 || v1 == v2 {
            continue;
        }
        builder.push_face(face, min, max, uv);
    }
    builder.build()
}

pub fn cuboid_from_tag(tag: &Tag, tex_size: Vector2<f32>) -> Geometry {
    let zero = Vector3::new(0.0, 0.0, 0.0);
    let from = tag.get_vec3("f").unwrap_or(zero);
    let to = tag.get_vec3("t").unwrap_or(zero);
    let inflate = tag.get_f32("inf").unwrap_or(0.0);

    let faces: Vec<(Face, [f32; 4])> = Face::ALL
        .into_iter()
        .filter_map(|face| {
            let uv = tag.get(face.key())?.get("uv")?.as_floats()?;
            match uv.as_slice() {
                [u1, v1, u2, v2, ..] => Some((face, [*u1, *v1, *u2, *v2])),
                _ => None,
            }
        })
        .collect();
    build_cuboid(from, to, inflate, &faces, tex_size)
}

/// Free-form mesh from `vtx`: 8 floats per vertex, pixel position, texture-pixel UV and
/// normal, four vertices per quad. A trailing partial quad is dropped.
pub fn mesh_from_tag(tag: &Tag, tex_size: Vector2<f32>) -> Geometry {
    let Some(raw) = tag.get("vtx").and_then(Tag::as_floats) else {
        return Geometry::default();
    };

    let quad_floats = FLOATS_PER_VERTEX * 4;
    if raw.len() % quad_floats != 0 {
        log::warn!(
            "Mesh vertex list of {} floats does not end on a whole quad, dropping the rest",
            raw.len()
        );
    }

    let mut builder = GeometryBuilder::new(tex_size);
    for v in raw.chunks_exact(quad_floats).flat_map(|q| q.chunks_exact(FLOATS_PER_VERTEX)) {
        builder.push_vertex(
            Vector3::new(v[0], v[1], v[2]),
            Vector2::new(v[3], v[4]),
            Vector3::new(v[5], v[6], v[7]),
        );
    }
    builder.build()
}
