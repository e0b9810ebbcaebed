// src/province/mesh.rs
//! Построение меша провинции
//!
//! Конвейер: ограниченная триангуляция всех контуров → Delaunay refinement →
//! релаксация Ллойда → отбор внутренних треугольников → нормализованный буфер вершин.
//!
//! Буфер не индексирован: каждая вершина повторяется в каждом своём треугольнике,
//! на вершину приходится 3 числа (x, y, 0).

use serde::Serialize;

use crate::config::{MeshSettings, Normalization};
use crate::error::GeometryError;
use crate::geometry::{Coordinate, Ring};
use crate::province::triangulator::{PlanarConstrainedTriangulator, SpadeTriangulator};

/// Чисел на одну вершину
pub const COMPONENTS_PER_VERTEX: usize = 3;
/// Чисел на один треугольник
pub const COMPONENTS_PER_TRIANGLE: usize = 3 * COMPONENTS_PER_VERTEX;

/// Результат триангуляции провинции
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceMesh {
    /// Плоский список вершин треугольников (x, y, 0)
    pub vertices: Vec<f32>,
    /// Число точек Штейнера, добавленных refinement
    pub steiner_vertices: usize,
    /// Суммарное число сдвигов вершин за все итерации Ллойда
    pub relaxed_moves: usize,
    /// `false`, если refinement остановился на лимите вершин
    pub refinement_complete: bool,
}

impl ProvinceMesh {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / COMPONENTS_PER_TRIANGLE
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Треугольники как тройки точек (x, y) в нормализованной плоскости
    pub fn triangles(&self) -> impl Iterator<Item = [(f32, f32); 3]> + '_ {
        self.vertices.chunks_exact(COMPONENTS_PER_TRIANGLE).map(|t| {
            [(t[0], t[1]), (t[3], t[4]), (t[6], t[7])]
        })
    }
}

/// Триангулирует контуры провинции триангулятором по умолчанию (`spade`)
pub fn triangulate(rings: &[Ring], settings: &MeshSettings) -> Result<ProvinceMesh, GeometryError> {
    triangulate_using(SpadeTriangulator::new(settings.domain_rule), rings, settings)
}

/// Триангулирует контуры заданным триангулятором
///
/// # Ошибки
/// - [`GeometryError::NoRings`] — пустой список контуров
/// - [`GeometryError::DegenerateRing`] — все точки контура на одной прямой
/// - [`GeometryError::CrossingConstraint`] — ребро контура пересекает уже вставленное ребро
/// - [`GeometryError::InvalidCoordinate`] — координата не поддерживается триангулятором
/// - [`GeometryError::ConstraintLost`] — ребро контура не удалось восстановить после разбиения или релаксации
pub fn triangulate_using<T: PlanarConstrainedTriangulator>(
    mut triangulator: T,
    rings: &[Ring],
    settings: &MeshSettings,
) -> Result<ProvinceMesh, GeometryError> {
    if rings.is_empty() {
        return Err(GeometryError::NoRings);
    }

    // ШАГ 1: Общая триангуляция для всех контуров
    for (ring_index, ring) in rings.iter().enumerate() {
        if ring.is_degenerate() {
            return Err(GeometryError::DegenerateRing { ring: ring_index });
        }

        let handles = ring
            .points()
            .iter()
            .map(|&point| triangulator.insert_point(point))
            .collect::<Result<Vec<_>, _>>()?;

        let len = handles.len();
        for edge in 0..len {
            let (from, to) = (handles[edge], handles[(edge + 1) % len]);
            if from == to {
                continue; // повторяющаяся точка
            }
            if !triangulator.insert_constraint_edge(from, to) {
                return Err(GeometryError::CrossingConstraint {
                    ring: ring_index,
                    edge,
                });
            }
        }
    }

    // ШАГ 2: Refinement
    let outcome = triangulator.refine(&settings.refinement)?;
    if !outcome.complete {
        tracing::warn!(
            added = outcome.added_vertices,
            "refinement остановлен на лимите дополнительных вершин"
        );
    }

    // ШАГ 3: Релаксация
    let relaxed_moves = triangulator.relax(settings.relaxation_iterations)?;

    // ШАГ 4-5: Отбор и нормализация
    let faces = triangulator.in_domain_faces();
    let mut vertices = Vec::with_capacity(faces.len() * COMPONENTS_PER_TRIANGLE);
    for face in &faces {
        for &point in face {
            let (x, y) = normalize(point, settings.normalization);
            vertices.extend_from_slice(&[x, y, 0.0]);
        }
    }

    tracing::trace!(
        triangles = faces.len(),
        steiner = outcome.added_vertices,
        relaxed_moves,
        "меш построен"
    );

    Ok(ProvinceMesh {
        vertices,
        steiner_vertices: outcome.added_vertices,
        relaxed_moves,
        refinement_complete: outcome.complete,
    })
}

/// Переводит градусы в нормализованную плоскость
///
/// # Пример
/// ```
/// use geomap::config::Normalization;
/// use geomap::geometry::Coordinate;
/// use geomap::province::mesh::normalize;
/// let (x, y) = normalize(Coordinate::new(-180.0, 42.5), Normalization::default());
/// assert_eq!((x, y), (-1.0, 0.5));
/// ```
#[must_use]
pub fn normalize(point: Coordinate, normalization: Normalization) -> (f32, f32) {
    (
        (point.lon / normalization.lon_divisor) as f32,
        (point.lat / normalization.lat_divisor) as f32,
    )
}
