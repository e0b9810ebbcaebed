// src/loader.rs
//! Загрузка карты из коллекции географических объектов (GeoJSON-подобный документ)
//!
//! Модуль не читает файлы: на вход подаётся уже разобранный `serde_json::Value`.
//!
//! ## Политика ошибок
//!
//! 1. **Структурные ошибки** ([`LoadError`]) — корень не объект, тип не `FeatureCollection`,
//!    нет массива `features`. Загрузка прерывается, карта не возвращается.
//! 2. **Ошибки объекта** ([`FeatureError`]) — объект пропускается, загрузка продолжается.
//!    Причины пишутся в лог (`debug`) и в [`LoadReport`].
//!
//! ## Формат объекта
//!
//! ```json
//! {
//!   "type": "Feature",
//!   "properties": { "name": "<id провинции>", "type": "multipolygon" },
//!   "geometry": { "type": "MultiPolygon", "coordinates": [[[[lon, lat], ...]]] }
//! }
//! ```
//!
//! Без `"type": "multipolygon"` ожидается геометрия `LineString` с одним контуром.
//! У каждого подполигона `MultiPolygon` берётся только внешний контур, дыры игнорируются.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map as JsonObject, Value};

use crate::config::LoaderSettings;
use crate::error::{FeatureError, LoadError};
use crate::geometry::{Coordinate, Ring};
use crate::map::Map;
use crate::province::Province;

const MULTIPOLYGON_PROPERTY: &str = "multipolygon";
const MULTIPOLYGON_GEOMETRY: &str = "MultiPolygon";
const LINE_STRING_GEOMETRY: &str = "LineString";

/// Пропущенный объект коллекции
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    /// Индекс объекта в массиве `features`
    pub index: usize,
    /// Имя провинции, если его удалось прочитать
    pub name: Option<String>,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: FeatureError,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &FeatureError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Диагностика загрузки
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Всего объектов в `features`
    pub features_total: usize,
    /// Добавлено провинций
    pub provinces_loaded: usize,
    /// Контуров, отброшенных из-за нехватки точек
    pub rings_dropped: usize,
    pub skipped: Vec<SkippedFeature>,
}

impl LoadReport {
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    fn skip(&mut self, index: usize, name: Option<&str>, reason: FeatureError) {
        tracing::debug!(index, name, "объект пропущен: {reason}");
        self.skipped.push(SkippedFeature {
            index,
            name: name.map(str::to_owned),
            reason,
        });
    }
}

/// Загружает карту с параметрами по умолчанию
pub fn load_map(document: &Value) -> Result<Map, LoadError> {
    load_map_with(document, &LoaderSettings::default()).map(|(map, _)| map)
}

/// Загружает карту и возвращает диагностику
///
/// # Пример
/// ```
/// use geomap::config::LoaderSettings;
/// use geomap::loader::load_map_with;
/// use serde_json::json;
///
/// let document = json!({
///     "type": "FeatureCollection",
///     "features": [{
///         "type": "Feature",
///         "properties": { "name": "alpha" },
///         "geometry": {
///             "type": "LineString",
///             "coordinates": [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [0.0, 0.0]]
///         }
///     }]
/// });
/// let (map, report) = load_map_with(&document, &LoaderSettings::default()).unwrap();
/// assert_eq!(map.len(), 1);
/// assert_eq!(report.skipped_count(), 0);
/// ```
pub fn load_map_with(
    document: &Value,
    settings: &LoaderSettings,
) -> Result<(Map, LoadReport), LoadError> {
    let root = document.as_object().ok_or(LoadError::RootNotObject)?;

    if root.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(LoadError::NotFeatureCollection);
    }
    let features = root
        .get("features")
        .ok_or(LoadError::MissingFeatures)?
        .as_array()
        .ok_or(LoadError::FeaturesNotArray)?;

    let mut map = Map::new(settings.radius);
    let mut report = LoadReport {
        features_total: features.len(),
        ..LoadReport::default()
    };
    let mut seen_names: HashSet<&str> = HashSet::new();

    for (index, feature) in features.iter().enumerate() {
        match parse_feature(feature, &mut seen_names, &mut report) {
            Ok(province) => {
                map.add_province(province)?;
                report.provinces_loaded += 1;
            }
            Err((name, reason)) => report.skip(index, name, reason),
        }
    }

    tracing::info!(
        provinces = report.provinces_loaded,
        skipped = report.skipped_count(),
        rings_dropped = report.rings_dropped,
        "карта загружена"
    );

    Ok((map, report))
}

type FeatureResult<'a, T> = Result<T, (Option<&'a str>, FeatureError)>;

fn parse_feature<'a>(
    feature: &'a Value,
    seen_names: &mut HashSet<&'a str>,
    report: &mut LoadReport,
) -> FeatureResult<'a, Province> {
    if feature.get("type").and_then(Value::as_str) != Some("Feature") {
        return Err((None, FeatureError::NotAFeature));
    }

    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or((None, FeatureError::MissingProperties))?;

    let name = properties
        .get("name")
        .and_then(Value::as_str)
        .ok_or((None, FeatureError::MissingName))?;
    if name.is_empty() {
        return Err((None, FeatureError::EmptyName));
    }
    // Имя занимается сразу: следующий объект с тем же именем пропускается,
    // даже если у этого дальше окажется плохая геометрия
    if !seen_names.insert(name) {
        return Err((Some(name), FeatureError::DuplicateName(name.to_owned())));
    }
    let fail = |reason| (Some(name), reason);

    let multipolygon =
        properties.get("type").and_then(Value::as_str) == Some(MULTIPOLYGON_PROPERTY);

    let geometry = feature
        .get("geometry")
        .and_then(Value::as_object)
        .ok_or_else(|| fail(FeatureError::MissingGeometry))?;
    check_geometry_type(geometry, multipolygon).map_err(fail)?;

    let coordinates = geometry
        .get("coordinates")
        .filter(|value| value.is_array())
        .ok_or_else(|| fail(FeatureError::MissingCoordinates))?;

    let candidates: Vec<Vec<Coordinate>> = match coordinates.as_array() {
        Some(polygons) if multipolygon => polygons
            .iter()
            .filter_map(Value::as_array)
            .filter_map(|polygon| polygon.first())
            .map(extract_ring_coordinates)
            .collect(),
        _ => vec![extract_ring_coordinates(coordinates)],
    };

    let mut rings = Vec::with_capacity(candidates.len());
    for points in candidates.into_iter().filter(|points| !points.is_empty()) {
        match Ring::new(points) {
            Ok(ring) => rings.push(ring),
            Err(err) => {
                tracing::debug!(name, "контур отброшен: {err}");
                report.rings_dropped += 1;
            }
        }
    }

    // Центр пока не вычисляется
    Province::new(name, rings, Coordinate::default()).map_err(|_| fail(FeatureError::NoUsableRings))
}

fn check_geometry_type(
    geometry: &JsonObject<String, Value>,
    multipolygon: bool,
) -> Result<(), FeatureError> {
    let expected = if multipolygon {
        MULTIPOLYGON_GEOMETRY
    } else {
        LINE_STRING_GEOMETRY
    };
    match geometry.get("type").and_then(Value::as_str) {
        Some(found) if found == expected => Ok(()),
        found => Err(FeatureError::GeometryTypeMismatch {
            expected,
            found: found.unwrap_or("<нет>").to_owned(),
        }),
    }
}

/// Извлекает точки одного контура
///
/// Последний элемент массива всегда пропускается: он повторяет первую точку.
/// Элемент без двух числовых компонент отбрасывается, остальные точки сохраняются.
///
/// # Пример
/// ```
/// use geomap::loader::extract_ring_coordinates;
/// use serde_json::json;
///
/// let points = extract_ring_coordinates(&json!([[1.0, 2.0], ["x", 3.0], [4, 5], [1.0, 2.0]]));
/// assert_eq!(points.len(), 2);
/// assert_eq!((points[1].lon, points[1].lat), (4.0, 5.0));
/// ```
#[must_use]
pub fn extract_ring_coordinates(value: &Value) -> Vec<Coordinate> {
    let Some(pairs) = value.as_array() else {
        return Vec::new();
    };
    let Some((_closing, body)) = pairs.split_last() else {
        return Vec::new();
    };

    body.iter()
        .filter_map(Value::as_array)
        .filter(|pair| pair.len() > 1)
        .filter_map(|pair| Some(Coordinate::new(pair[0].as_f64()?, pair[1].as_f64()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EARTH_RADIUS;
    use crate::error::MapError;
    use serde_json::json;

    fn line_feature(name: Value, coordinates: Value) -> Value {
        json!({
            "type": "Feature",
            "properties": { "name": name },
            "geometry": { "type": "LineString", "coordinates": coordinates }
        })
    }

    fn triangle() -> Value {
        json!([[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [0.0, 0.0]])
    }

    fn collection(features: Vec<Value>) -> Value {
        json!({ "type": "FeatureCollection", "features": features })
    }

    #[test]
    fn structural_errors_abort_the_load() {
        assert!(matches!(load_map(&json!([])), Err(LoadError::RootNotObject)));
        assert!(matches!(
            load_map(&json!({ "type": "Feature", "features": [] })),
            Err(LoadError::NotFeatureCollection)
        ));
        assert!(matches!(
            load_map(&json!({ "features": [] })),
            Err(LoadError::NotFeatureCollection)
        ));
        assert!(matches!(
            load_map(&json!({ "type": "FeatureCollection" })),
            Err(LoadError::MissingFeatures)
        ));
        assert!(matches!(
            load_map(&json!({ "type": "FeatureCollection", "features": {} })),
            Err(LoadError::FeaturesNotArray)
        ));
    }

    #[test]
    fn empty_collection_gives_empty_map() {
        let map = load_map(&collection(vec![])).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.radius(), EARTH_RADIUS);
    }

    #[test]
    fn loads_line_string_feature() {
        let map = load_map(&collection(vec![line_feature(json!("alpha"), triangle())])).unwrap();
        let province = map.province("alpha").unwrap();
        assert_eq!(province.rings().len(), 1);
        // замыкающая точка отброшена
        assert_eq!(province.rings()[0].len(), 3);
        assert_eq!(province.center(), Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn empty_and_duplicate_names_are_skipped() {
        let document = collection(vec![
            line_feature(json!("alpha"), triangle()),
            line_feature(json!(""), triangle()),
            line_feature(json!("alpha"), json!([[50.0, 0.0], [60.0, 0.0], [50.0, 10.0], [50.0, 0.0]])),
            line_feature(json!(42), triangle()),
        ]);
        let (map, report) = load_map_with(&document, &LoaderSettings::default()).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.province("alpha").unwrap().rings()[0].points()[0].lon, 0.0);
        assert_eq!(report.features_total, 4);
        assert_eq!(report.provinces_loaded, 1);
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            [
                FeatureError::EmptyName,
                FeatureError::DuplicateName("alpha".into()),
                FeatureError::MissingName,
            ]
        );
        assert_eq!(report.skipped[1].index, 2);
    }

    #[test]
    fn malformed_features_are_skipped() {
        let document = collection(vec![
            json!("not an object"),
            json!({ "type": "Polygon" }),
            json!({ "type": "Feature" }),
            json!({ "type": "Feature", "properties": { "name": "no_geometry" } }),
            json!({
                "type": "Feature",
                "properties": { "name": "wrong_type" },
                "geometry": { "type": "Polygon", "coordinates": [] }
            }),
            json!({
                "type": "Feature",
                "properties": { "name": "no_coordinates" },
                "geometry": { "type": "LineString" }
            }),
            line_feature(json!("too_short"), json!([[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]])),
            line_feature(json!("ok"), triangle()),
        ]);
        let (map, report) = load_map_with(&document, &LoaderSettings::default()).unwrap();

        assert_eq!(map.sorted_ids(), ["ok"]);
        assert_eq!(report.skipped_count(), 7);
        assert_eq!(report.rings_dropped, 1);
        assert!(matches!(
            report.skipped[4].reason,
            FeatureError::GeometryTypeMismatch { expected: "LineString", .. }
        ));
        assert_eq!(report.skipped[5].reason, FeatureError::MissingCoordinates);
        assert_eq!(report.skipped[6].reason, FeatureError::NoUsableRings);
    }

    #[test]
    fn multipolygon_uses_outer_rings_only() {
        let document = collection(vec![json!({
            "type": "Feature",
            "properties": { "name": "islands", "type": "multipolygon" },
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [
                        [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
                        [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 4.0]]
                    ],
                    "garbage",
                    [
                        [[20.0, 0.0], [30.0, 0.0], [20.0, 10.0], [20.0, 0.0]]
                    ],
                    []
                ]
            }
        })]);
        let map = load_map(&document).unwrap();
        let rings = map.province("islands").unwrap().rings();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[1].len(), 3);
    }

    #[test]
    fn multipolygon_flag_requires_multipolygon_geometry() {
        let document = collection(vec![json!({
            "type": "Feature",
            "properties": { "name": "mixed", "type": "multipolygon" },
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]] }
        })]);
        let (map, report) = load_map_with(&document, &LoaderSettings::default()).unwrap();
        assert!(map.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            FeatureError::GeometryTypeMismatch { expected: "MultiPolygon", .. }
        ));
    }

    #[test]
    fn invalid_pairs_are_dropped_individually() {
        let points = extract_ring_coordinates(&json!([
            [0.0, 0.0],
            [1.0],
            "x",
            [2.0, null],
            [3.0, 4.0, 100.0],
            [5.0, 6.0],
            [0.0, 0.0]
        ]));
        assert_eq!(
            points,
            [Coordinate::new(0.0, 0.0), Coordinate::new(3.0, 4.0), Coordinate::new(5.0, 6.0)]
        );
        assert!(extract_ring_coordinates(&json!([])).is_empty());
        assert!(extract_ring_coordinates(&json!({})).is_empty());
    }

    #[test]
    fn custom_radius_is_used() {
        let settings = LoaderSettings { radius: 1000.0 };
        let (map, _) = load_map_with(&collection(vec![]), &settings).unwrap();
        assert_eq!(map.radius(), 1000.0);
    }

    #[test]
    fn map_error_converts_into_load_error() {
        let err: LoadError = MapError::DuplicateProvince("x".into()).into();
        assert!(matches!(err, LoadError::Map(_)));
    }
}
