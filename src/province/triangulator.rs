// src/province/triangulator.rs
//! Ограниченная триангуляция Делоне на плоскости
//!
//! Трейт [`PlanarConstrainedTriangulator`] описывает возможности, нужные построителю меша:
//! вставка точек и ограничивающих рёбер, Delaunay refinement, релаксация Ллойда
//! и перебор треугольников внутри провинции.
//!
//! [`SpadeTriangulator`] реализует его поверх `spade`.
//!
//! ## Классификация треугольников
//!
//! Для каждой конечной грани считается минимальное число ограничивающих рёбер,
//! которые нужно пересечь, чтобы дойти до неё из внешней области (0-1 BFS от выпуклой оболочки).
//! Решение "внутри/снаружи" принимает [`DomainRule`].
//!
//! ## Согласование контуров
//!
//! `spade` при исключённых внешних гранях не видит вершин, "задевающих" ребро контура снаружи
//! (вершина другого контура внутри диаметральной окружности ребра). Перед каждым refinement
//! такие рёбра делятся пополам, пока задетых не останется.

use std::collections::VecDeque;

use spade::handles::{FixedVertexHandle, VertexHandle};
use spade::{
    AngleLimit, CdtEdge, ConstrainedDelaunayTriangulation, Point2, RefinementParameters,
    Triangulation,
};

use crate::config::{DomainRule, RefinementCriteria};
use crate::error::GeometryError;
use crate::geometry::Coordinate;

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;
type CdtVertex<'a> = VertexHandle<'a, Point2<f64>, (), CdtEdge<()>, ()>;

/// Сколько раз подряд чередуются согласование контуров и refinement
const MAX_CONFORMING_ROUNDS: usize = 8;

/// Сдвиг меньше этой доли (в квадрате) от масштаба координат не считается сдвигом
const MIN_RELATIVE_MOVE_2: f64 = 1e-24;

/// Итог refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinementOutcome {
    /// Сколько точек Штейнера добавлено
    pub added_vertices: usize,
    /// `false`, если упёрлись в лимит дополнительных вершин
    pub complete: bool,
}

/// Возможности ограниченной триангуляции, которые использует построитель меша
pub trait PlanarConstrainedTriangulator {
    type Vertex: Copy + PartialEq;

    /// Вставляет точку. Повторная вставка той же позиции возвращает существующую вершину.
    fn insert_point(&mut self, point: Coordinate) -> Result<Self::Vertex, GeometryError>;

    /// Добавляет ограничивающее ребро. Возвращает `false`, если оно пересекло бы уже существующее.
    fn insert_constraint_edge(&mut self, from: Self::Vertex, to: Self::Vertex) -> bool;

    /// Дробит треугольники, нарушающие критерии, сохраняя ограничивающие рёбра
    /// (они могут делиться на части)
    fn refine(&mut self, criteria: &RefinementCriteria)
    -> Result<RefinementOutcome, GeometryError>;

    /// Выполняет `iterations` итераций Ллойда, возвращает суммарное число сдвинутых вершин
    fn relax(&mut self, iterations: usize) -> Result<usize, GeometryError>;

    /// Конечные треугольники внутри провинции, в порядке обхода граней
    fn in_domain_faces(&self) -> Vec<[Coordinate; 3]>;

    fn vertex_count(&self) -> usize;
}

/// Реализация на `spade::ConstrainedDelaunayTriangulation`
#[derive(Debug, Clone)]
pub struct SpadeTriangulator {
    cdt: Cdt,
    rule: DomainRule,
}

impl SpadeTriangulator {
    #[must_use]
    pub fn new(rule: DomainRule) -> Self {
        Self {
            cdt: Cdt::new(),
            rule,
        }
    }

    /// Число пересечённых контуров для каждой грани, индекс — индекс грани в `spade`.
    /// `usize::MAX` у внешней грани и недостижимых граней.
    fn crossing_depths(&self) -> Vec<usize> {
        let mut depths = vec![usize::MAX; self.cdt.num_all_faces()];
        if self.cdt.num_inner_faces() == 0 || self.cdt.all_vertices_on_line() {
            return depths;
        }

        let mut queue = VecDeque::new();
        for hull_edge in self.cdt.convex_hull() {
            let inward = hull_edge.rev();
            if let Some(face) = inward.face().as_inner() {
                let depth = usize::from(inward.is_constraint_edge());
                if depth < depths[face.index()] {
                    depths[face.index()] = depth;
                    queue.push_back((face, depth));
                }
            }
        }

        while let Some((face, depth)) = queue.pop_front() {
            if depth > depths[face.index()] {
                continue;
            }
            for edge in face.adjacent_edges() {
                let Some(neighbor) = edge.rev().face().as_inner() else {
                    continue;
                };
                let crossing = usize::from(edge.is_constraint_edge());
                let next = depth + crossing;
                if next < depths[neighbor.index()] {
                    depths[neighbor.index()] = next;
                    if crossing == 0 {
                        queue.push_front((neighbor, next));
                    } else {
                        queue.push_back((neighbor, next));
                    }
                }
            }
        }

        depths
    }

    /// Центр масс ячейки Вороного вершины, если вершину можно сдвинуть.
    ///
    /// Двигаются только свободные вершины: не на ограничивающем ребре, не на оболочке,
    /// все смежные грани внутри провинции. Новая позиция должна лежать в ядре звезды вершины.
    fn lloyd_target(&self, vertex: CdtVertex<'_>, depths: &[usize]) -> Option<Point2<f64>> {
        let mut cell = Vec::new();
        let mut link = Vec::new();
        for edge in vertex.out_edges() {
            if edge.is_constraint_edge() {
                return None;
            }
            let face = edge.face().as_inner()?;
            if !self.rule.is_in_domain(depths[face.index()]) {
                return None;
            }
            cell.push(face.circumcenter());
            link.push(edge.to().position());
        }
        if cell.len() < 3 {
            return None;
        }

        if polygon_signed_area(&link) < 0.0 {
            cell.reverse();
            link.reverse();
        }
        let target = polygon_centroid(&cell)?;
        let position = vertex.position();
        let scale = 1.0 + position.x * position.x + position.y * position.y;
        if target.distance_2(position) <= MIN_RELATIVE_MOVE_2 * scale {
            return None;
        }

        let n = link.len();
        let inside_kernel =
            (0..n).all(|i| orientation(link[i], link[(i + 1) % n], target) > f64::EPSILON);
        inside_kernel.then_some(target)
    }

    /// Рёбра контуров, которые задевает вершина с исключённой из refinement стороны.
    ///
    /// `spade` исключает грани с чётным числом пересечений контуров. Вершины, соединённые
    /// ограничивающим ребром с концом проверяемого ребра, не учитываются: иначе острый
    /// угол между рёбрами дробился бы бесконечно.
    fn encroached_from_outside(&self) -> Vec<[FixedVertexHandle; 2]> {
        let depths = self.crossing_depths();
        let is_excluded = |depth: usize| depth == usize::MAX || depth % 2 == 0;

        self.cdt
            .undirected_edges()
            .filter(|edge| edge.is_constraint_edge())
            .filter_map(|edge| {
                let [from, to] = edge.vertices();
                let directed = edge.as_directed();
                let encroached = [directed, directed.rev()].into_iter().any(|side| {
                    let Some(face) = side.face().as_inner() else {
                        return false;
                    };
                    let Some(opposite) = side.opposite_vertex() else {
                        return false;
                    };
                    is_excluded(depths[face.index()])
                        && !self.cdt.exists_constraint(opposite.fix(), from.fix())
                        && !self.cdt.exists_constraint(opposite.fix(), to.fix())
                        && is_encroaching(from.position(), to.position(), opposite.position())
                });
                encroached.then(|| [from.fix(), to.fix()])
            })
            .collect()
    }

    /// Делит ограничивающее ребро пополам. Возвращает `false`, если ребра уже нет
    /// или оно слишком короткое для деления.
    fn split_constraint(
        &mut self,
        from: FixedVertexHandle,
        to: FixedVertexHandle,
    ) -> Result<bool, GeometryError> {
        let Some(edge) = self.cdt.get_edge_from_neighbors(from, to) else {
            return Ok(false);
        };
        let [a, b] = edge.positions();
        let undirected = edge.fix().as_undirected();
        let midpoint = Point2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5);
        if midpoint == a || midpoint == b {
            return Ok(false);
        }

        self.cdt.remove_constraint_edge(undirected);
        let middle = self.cdt.insert(midpoint)?;
        for (start, end) in [(from, middle), (middle, to)] {
            if start != end && self.cdt.try_add_constraint(start, end).is_empty() {
                return Err(constraint_lost(&self.cdt, start, end));
            }
        }
        Ok(true)
    }

    /// Делит задетые снаружи рёбра, пока они есть и число вершин меньше `vertex_cap`.
    /// Возвращает `false`, если остановились на лимите.
    fn conform_constraints(&mut self, vertex_cap: usize) -> Result<bool, GeometryError> {
        loop {
            let encroached = self.encroached_from_outside();
            if encroached.is_empty() {
                return Ok(true);
            }
            let mut split_any = false;
            for [from, to] in encroached {
                if self.cdt.num_vertices() >= vertex_cap {
                    return Ok(false);
                }
                split_any |= self.split_constraint(from, to)?;
            }
            if !split_any {
                return Ok(true);
            }
        }
    }

    fn relax_once(&mut self) -> Result<usize, GeometryError> {
        let depths = self.crossing_depths();
        let moves: Vec<(usize, Point2<f64>)> = self
            .cdt
            .vertices()
            .filter_map(|vertex| {
                self.lloyd_target(vertex, &depths)
                    .map(|target| (vertex.fix().index(), target))
            })
            .collect();
        if moves.is_empty() {
            return Ok(0);
        }

        let mut positions: Vec<Point2<f64>> =
            self.cdt.vertices().map(|vertex| vertex.position()).collect();
        for &(index, target) in &moves {
            positions[index] = target;
        }
        let constraints: Vec<[usize; 2]> = self
            .cdt
            .undirected_edges()
            .filter(|edge| edge.is_constraint_edge())
            .map(|edge| {
                let [from, to] = edge.vertices();
                [from.fix().index(), to.fix().index()]
            })
            .collect();

        // spade не умеет двигать вершины, поэтому триангуляция пересобирается
        self.cdt = rebuild(positions, &constraints)?;

        Ok(moves.len())
    }
}

impl PlanarConstrainedTriangulator for SpadeTriangulator {
    type Vertex = FixedVertexHandle;

    fn insert_point(&mut self, point: Coordinate) -> Result<Self::Vertex, GeometryError> {
        Ok(self.cdt.insert(Point2::new(point.lon, point.lat))?)
    }

    fn insert_constraint_edge(&mut self, from: Self::Vertex, to: Self::Vertex) -> bool {
        if from == to {
            return true;
        }
        if !self.cdt.can_add_constraint(from, to) {
            return false;
        }
        self.cdt.add_constraint(from, to);
        true
    }

    fn refine(
        &mut self,
        criteria: &RefinementCriteria,
    ) -> Result<RefinementOutcome, GeometryError> {
        let before = self.cdt.num_vertices();
        let budget = criteria.max_additional_vertices.unwrap_or(before * 10);
        let vertex_cap = before.saturating_add(budget);

        let mut parameters = RefinementParameters::<f64>::new()
            .with_angle_limit(AngleLimit::from_deg(criteria.min_angle_deg))
            .exclude_outer_faces(true);
        if let Some(max_area) = criteria.max_area {
            parameters = parameters.with_max_allowed_area(max_area);
        }
        if let Some(min_area) = criteria.min_area {
            parameters = parameters.with_min_required_area(min_area);
        }

        let mut complete = false;
        for _ in 0..MAX_CONFORMING_ROUNDS {
            if !self.conform_constraints(vertex_cap)? {
                break;
            }
            let remaining = vertex_cap.saturating_sub(self.cdt.num_vertices());
            let result = self
                .cdt
                .refine(parameters.clone().with_max_additional_vertices(remaining));
            if !result.refinement_complete {
                break;
            }
            // новые точки Штейнера могли задеть соседний контур снаружи
            if self.encroached_from_outside().is_empty() {
                complete = true;
                break;
            }
        }

        Ok(RefinementOutcome {
            added_vertices: self.cdt.num_vertices() - before,
            complete,
        })
    }

    fn relax(&mut self, iterations: usize) -> Result<usize, GeometryError> {
        let mut moved = 0;
        for _ in 0..iterations {
            let step = self.relax_once()?;
            if step == 0 {
                break;
            }
            moved += step;
        }
        Ok(moved)
    }

    fn in_domain_faces(&self) -> Vec<[Coordinate; 3]> {
        let depths = self.crossing_depths();
        self.cdt
            .inner_faces()
            .filter(|face| self.rule.is_in_domain(depths[face.index()]))
            .map(|face| face.positions())
            .filter(|&[a, b, c]| is_valid_triangle(a, b, c))
            .map(|positions| positions.map(|p| Coordinate::new(p.x, p.y)))
            .collect()
    }

    fn vertex_count(&self) -> usize {
        self.cdt.num_vertices()
    }
}

/// Собирает триангуляцию заново: вершины вставляются по порядку, рёбра задаются индексами вершин
fn rebuild(positions: Vec<Point2<f64>>, constraints: &[[usize; 2]]) -> Result<Cdt, GeometryError> {
    let mut cdt = Cdt::new();
    let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(positions.len());
    for position in positions {
        handles.push(cdt.insert(position)?);
    }
    for &[from, to] in constraints {
        let (from, to) = (handles[from], handles[to]);
        if from != to && cdt.try_add_constraint(from, to).is_empty() {
            return Err(constraint_lost(&cdt, from, to));
        }
    }
    Ok(cdt)
}

fn constraint_lost(cdt: &Cdt, start: FixedVertexHandle, end: FixedVertexHandle) -> GeometryError {
    let [start, end] = [start, end].map(|vertex| {
        let position = cdt.vertex(vertex).position();
        [position.x, position.y]
    });
    GeometryError::ConstraintLost { start, end }
}

/// Лежит ли точка строго внутри диаметральной окружности отрезка
fn is_encroaching(from: Point2<f64>, to: Point2<f64>, point: Point2<f64>) -> bool {
    let center = Point2::new((from.x + to.x) * 0.5, (from.y + to.y) * 0.5);
    point.distance_2(center) < from.distance_2(to) * 0.25
}

fn orientation(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn is_valid_triangle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    [a, b, c].iter().all(|p| p.x.is_finite() && p.y.is_finite()) && orientation(a, b, c).abs() > 0.0
}

fn polygon_signed_area(polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

fn polygon_centroid(polygon: &[Point2<f64>]) -> Option<Point2<f64>> {
    let area = polygon_signed_area(polygon);
    if area.abs() <= f64::EPSILON || !area.is_finite() {
        return None;
    }
    let n = polygon.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let factor = 1.0 / (6.0 * area);
    Some(Point2::new(cx * factor, cy * factor))
}
