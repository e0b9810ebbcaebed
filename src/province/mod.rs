// src/province/mod.rs
//! Провинции и построение их мешей

pub mod mesh;
pub mod png;
pub mod triangulator;

use serde::{Deserialize, Serialize};

use crate::config::MeshSettings;
use crate::error::GeometryError;
use crate::geometry::{Coordinate, Ring};
use mesh::ProvinceMesh;

/// Провинция: именованный регион из одного или нескольких контуров
///
/// Неизменяема после создания: поля закрыты, доступны только через методы.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProvinceData")]
pub struct Province {
    id: String,
    rings: Vec<Ring>,
    center: Coordinate,
}

#[derive(Deserialize)]
struct ProvinceData {
    id: String,
    rings: Vec<Ring>,
    #[serde(default)]
    center: Coordinate,
}

impl TryFrom<ProvinceData> for Province {
    type Error = GeometryError;

    fn try_from(data: ProvinceData) -> Result<Self, Self::Error> {
        Province::new(data.id, data.rings, data.center)
    }
}

impl Province {
    /// Создаёт провинцию. Непустота `id` не проверяется.
    ///
    /// # Ошибки
    /// [`GeometryError::NoRings`], если `rings` пуст.
    pub fn new(
        id: impl Into<String>,
        rings: Vec<Ring>,
        center: Coordinate,
    ) -> Result<Self, GeometryError> {
        if rings.is_empty() {
            return Err(GeometryError::NoRings);
        }
        Ok(Self {
            id: id.into(),
            rings,
            center,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Контуры границы провинции
    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.center
    }

    /// Общее число точек во всех контурах
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Ring::len).sum()
    }

    /// Вершины триангулированной провинции с параметрами по умолчанию
    ///
    /// Плоский неиндексированный список: (x, y, 0) на вершину, 3 вершины на треугольник.
    /// Пересчитывается при каждом вызове.
    pub fn triangulated_vertices(&self) -> Result<Vec<f32>, GeometryError> {
        self.triangulated_vertices_with(&MeshSettings::default())
    }

    pub fn triangulated_vertices_with(
        &self,
        settings: &MeshSettings,
    ) -> Result<Vec<f32>, GeometryError> {
        Ok(self.triangulate_with(settings)?.vertices)
    }

    /// Полный результат триангуляции со статистикой
    pub fn triangulate_with(&self, settings: &MeshSettings) -> Result<ProvinceMesh, GeometryError> {
        mesh::triangulate(&self.rings, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().map(|&p| Coordinate::from(p)).collect()
    }

    fn some_province() -> Province {
        let ring_a = Ring::new(coords(&[
            (-13.183_593_75, 62.186_013_857_194_226),
            (-22.587_890_625, 50.457_504_020_420_58),
            (14.677_734_375_000_002, 34.957_995_310_867_92),
            (28.388_671_875, 52.375_599_176_659_1),
            (9.052_734_375, 65.585_720_023_294_73),
        ]))
        .unwrap();
        let ring_b = Ring::new(coords(&[
            (26.630_859_375, 41.902_277_040_963_696),
            (35.419_921_875, 37.857_507_156_252_03),
            (31.289_062_500_000_004, 46.012_223_840_632_36),
        ]))
        .unwrap();
        Province::new(
            "some_province",
            vec![ring_a, ring_b],
            Coordinate::new(6.416_015_625, 51.998_410_382_390_325),
        )
        .unwrap()
    }

    #[test]
    fn accessors_return_constructor_values() {
        let ring = Ring::new(coords(&[(-55.5, 79.5), (45.1, 80.77), (45.1, -80.77)])).unwrap();
        let province =
            Province::new("some_province", vec![ring.clone()], Coordinate::new(-5.0, 20.0)).unwrap();

        assert_eq!(province.id(), "some_province");
        assert_eq!(province.center(), Coordinate::new(-5.0, 20.0));
        assert_eq!(province.rings(), &[ring]);
        assert_eq!(province.point_count(), 3);
    }

    #[test]
    fn empty_rings_are_rejected() {
        let err = Province::new("empty", Vec::new(), Coordinate::default()).unwrap_err();
        assert!(matches!(err, GeometryError::NoRings));
    }

    /// Ожидаемые треугольники в нормализованной плоскости. Две точки Штейнера —
    /// середины рёбер (14.68, 34.96)-(28.39, 52.38) и (-22.59, 50.46)-(14.68, 34.96).
    const EXPECTED_TRIANGLES: [[(f32, f32); 3]; 6] = [
        [(0.081_542_97, 0.411_270_56), (0.119_628_906, 0.513_727), (-0.021_972_656, 0.502_444_15)],
        [(0.157_714_84, 0.616_183_5), (0.050_292_97, 0.771_596_7), (0.119_628_906, 0.513_727)],
        [(0.119_628_906, 0.513_727), (0.050_292_97, 0.771_596_7), (-0.021_972_656, 0.502_444_15)],
        [(0.196_777_34, 0.445_382_42), (0.173_828_13, 0.541_320_26), (0.147_949_22, 0.492_968)],
        [(0.050_292_97, 0.771_596_7), (-0.073_242_19, 0.731_600_2), (-0.021_972_656, 0.502_444_15)],
        [(-0.073_242_19, 0.731_600_2), (-0.125_488_28, 0.593_617_7), (-0.021_972_656, 0.502_444_15)],
    ];

    fn same_point(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    fn same_triangle(a: [(f32, f32); 3], b: [(f32, f32); 3]) -> bool {
        a.iter().all(|&p| b.iter().any(|&q| same_point(p, q)))
            && b.iter().all(|&q| a.iter().any(|&p| same_point(p, q)))
    }

    #[test]
    fn two_ring_province_triangulates() {
        let vertices = some_province().triangulated_vertices().unwrap();

        assert_eq!(vertices.len(), 54);
        for vertex in vertices.chunks_exact(3) {
            assert!((-1.0..=1.0).contains(&vertex[0]));
            assert!((-1.0..=1.0).contains(&vertex[1]));
            assert_eq!(vertex[2], 0.0);
        }
    }

    #[test]
    fn two_ring_province_matches_reference_mesh() {
        let mesh = some_province().triangulate_with(&MeshSettings::default()).unwrap();

        assert_eq!(mesh.triangle_count(), 6);
        assert_eq!(mesh.steiner_vertices, 2);
        assert_eq!(mesh.relaxed_moves, 0);
        assert!(mesh.refinement_complete);

        let triangles: Vec<_> = mesh.triangles().collect();
        for expected in EXPECTED_TRIANGLES {
            assert!(
                triangles.iter().any(|&t| same_triangle(t, expected)),
                "нет треугольника {expected:?} среди {triangles:?}"
            );
        }
    }

    #[test]
    fn triangulation_is_repeatable() {
        let province = some_province();
        let first = province.triangulated_vertices().unwrap();
        let second = province.triangulated_vertices().unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first, second);
    }

    #[test]
    fn deserialize_rejects_empty_rings() {
        let province: Result<Province, _> =
            serde_json::from_str(r#"{"id": "x", "rings": [], "center": {"lon": 0, "lat": 0}}"#);
        assert!(province.is_err());
    }
}
