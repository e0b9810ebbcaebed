// src/map.rs
//! Карта: набор провинций с уникальными идентификаторами и радиус планеты

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::MeshSettings;
use crate::error::{GeometryError, MapError};
use crate::province::Province;
use crate::province::mesh::ProvinceMesh;

/// Результат триангуляции одной провинции в пакетном режиме
pub type ProvinceMeshResult = (String, Result<ProvinceMesh, GeometryError>);

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    radius: f64,
    provinces: HashMap<String, Province>,
}

impl Map {
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            provinces: HashMap::new(),
        }
    }

    /// Добавляет провинцию. Провинция с уже существующим `id` отклоняется, старая запись не меняется.
    pub fn add_province(&mut self, province: Province) -> Result<(), MapError> {
        if self.provinces.contains_key(province.id()) {
            return Err(MapError::DuplicateProvince(province.id().to_owned()));
        }
        self.provinces.insert(province.id().to_owned(), province);
        Ok(())
    }

    #[must_use]
    pub fn provinces(&self) -> &HashMap<String, Province> {
        &self.provinces
    }

    #[must_use]
    pub fn province(&self, id: &str) -> Option<&Province> {
        self.provinces.get(id)
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.provinces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty()
    }

    /// Идентификаторы провинций в лексикографическом порядке
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.provinces.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Триангулирует все провинции; результат отсортирован по `id`.
    ///
    /// С фичей `parallel` провинции обрабатываются в пуле rayon: данные неизменяемы,
    /// синхронизация не нужна.
    #[must_use]
    pub fn triangulate_all(&self, settings: &MeshSettings) -> Vec<ProvinceMeshResult> {
        let provinces: Vec<&Province> = self.provinces.values().collect();

        #[cfg(feature = "parallel")]
        let iter = provinces.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = provinces.iter();

        let mut results: Vec<ProvinceMeshResult> = iter
            .map(|province| {
                let mesh = province.triangulate_with(settings);
                if let Err(err) = &mesh {
                    tracing::warn!(province = province.id(), "триангуляция не удалась: {err}");
                }
                (province.id().to_owned(), mesh)
            })
            .collect();

        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}
