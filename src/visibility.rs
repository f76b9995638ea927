//! Obstacle-evading shortest paths over a visibility graph.
//!
//! Graph vertices are the outline points of every no-fly zone; an edge
//! joins two vertices when the straight segment between them is
//! collision-free. The base graph is immutable and shared by all
//! workers. Each query builds a small local overlay holding the
//! temporary start/end vertices, so no copy of the graph is ever made.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::info;
use rayon::prelude::*;

use crate::geometry::Point;
use crate::obstacles::{ObstacleSet, OUTLINE_MARGIN};

/// Dijkstra frontier entry.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behaviour; node index breaks ties
        // so the search order is deterministic.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Temporary start/end vertices for one query.
///
/// Indices `n` and `n + 1` (with `n` base vertices) denote start and end.
struct QueryOverlay {
    start: Point,
    end: Point,
    /// Base vertices visible from the start, with distances.
    start_links: Vec<(usize, f64)>,
    /// Distance from each base vertex to the end, if visible.
    end_links: Vec<Option<f64>>,
}

pub struct VisibilityGraph<'a> {
    obstacles: &'a ObstacleSet,
    vertices: Vec<Point>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl<'a> VisibilityGraph<'a> {
    /// Build the graph from every obstacle outline point. Construction is
    /// quadratic in the number of vertices; rows are computed in parallel.
    pub fn new(obstacles: &'a ObstacleSet) -> Self {
        Self::with_margin(obstacles, OUTLINE_MARGIN)
    }

    pub fn with_margin(obstacles: &'a ObstacleSet, margin: f64) -> Self {
        let vertices = obstacles.outline_points(margin);
        let adjacency: Vec<Vec<(usize, f64)>> = (0..vertices.len())
            .into_par_iter()
            .map(|i| {
                let vi = vertices[i];
                vertices
                    .iter()
                    .enumerate()
                    .filter(|&(j, &vj)| j != i && !obstacles.line_collision(vi, vj))
                    .map(|(j, &vj)| (j, vi.distance(vj)))
                    .collect()
            })
            .collect();

        let graph = Self {
            obstacles,
            vertices,
            adjacency,
        };
        info!(
            "visibility graph: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        graph
    }

    pub fn obstacles(&self) -> &'a ObstacleSet {
        self.obstacles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Undirected edge count.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Shortest obstacle-evading path from `a` to `b` as a vertex chain
    /// starting with `a` and ending with `b`. `None` means no route.
    pub fn get_path(&self, a: Point, b: Point) -> Option<Vec<Point>> {
        if !self.obstacles.line_collision(a, b) {
            return Some(vec![a, b]);
        }
        let overlay = self.overlay(a, b);
        let (_, nodes) = self.dijkstra(&overlay)?;
        Some(nodes.into_iter().map(|i| self.point_at(&overlay, i)).collect())
    }

    /// Length of the path `get_path` would return.
    pub fn get_path_length(&self, a: Point, b: Point) -> Option<f64> {
        if !self.obstacles.line_collision(a, b) {
            return Some(a.distance(b));
        }
        let overlay = self.overlay(a, b);
        self.dijkstra(&overlay).map(|(cost, _)| cost)
    }

    fn overlay(&self, start: Point, end: Point) -> QueryOverlay {
        let start_links = self
            .vertices
            .iter()
            .enumerate()
            .filter(|&(_, &v)| !self.obstacles.line_collision(start, v))
            .map(|(i, &v)| (i, start.distance(v)))
            .collect();
        let end_links = self
            .vertices
            .iter()
            .map(|&v| (!self.obstacles.line_collision(v, end)).then(|| v.distance(end)))
            .collect();
        QueryOverlay {
            start,
            end,
            start_links,
            end_links,
        }
    }

    fn point_at(&self, overlay: &QueryOverlay, node: usize) -> Point {
        let n = self.vertices.len();
        if node == n {
            overlay.start
        } else if node == n + 1 {
            overlay.end
        } else {
            self.vertices[node]
        }
    }

    /// Single-pair Dijkstra from the overlay start to the overlay end.
    /// The direct start-end edge is never present: callers only get here
    /// once the straight line is known to collide.
    fn dijkstra(&self, overlay: &QueryOverlay) -> Option<(f64, Vec<usize>)> {
        let n = self.vertices.len();
        let start = n;
        let end = n + 1;
        let mut dist = vec![f64::INFINITY; n + 2];
        let mut prev: Vec<Option<usize>> = vec![None; n + 2];
        let mut heap = BinaryHeap::new();

        dist[start] = 0.0;
        heap.push(Frontier {
            cost: 0.0,
            node: start,
        });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == end {
                break;
            }
            if cost > dist[node] {
                continue;
            }

            let mut relax = |next: usize, w: f64, heap: &mut BinaryHeap<Frontier>| {
                let candidate = cost + w;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    prev[next] = Some(node);
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            };

            if node == start {
                for &(v, w) in &overlay.start_links {
                    relax(v, w, &mut heap);
                }
            } else {
                for &(v, w) in &self.adjacency[node] {
                    relax(v, w, &mut heap);
                }
                if let Some(w) = overlay.end_links[node] {
                    relax(end, w, &mut heap);
                }
            }
        }

        if !dist[end].is_finite() {
            return None;
        }

        let mut nodes = vec![end];
        let mut cursor = end;
        while let Some(p) = prev[cursor] {
            nodes.push(p);
            cursor = p;
        }
        nodes.reverse();
        Some((dist[end], nodes))
    }
}
