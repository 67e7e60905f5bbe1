//! Grid pathfinding with a bounded per-frame request budget

use crate::config::NavigationConfig;
use engine2d::foundation::collections::BoundedQueue;
use engine2d::prelude::*;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;
use thiserror::Error;

/// Impassable tile
pub const SOLID_COST: u8 = 0;
/// Cheapest walkable tile
pub const ROAD_COST: u8 = 1;
/// Ordinary ground
pub const NORMAL_COST: u8 = 2;

const STRAIGHT_STEP: u32 = 10;
const DIAGONAL_STEP: u32 = 14;

/// Errors building a navigation graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The cost map has no tiles
    #[error("Navigation map is empty")]
    EmptyMap,

    /// A row is shorter or longer than the first one
    #[error("Navigation map row {row} has {found} tiles, expected {expected}")]
    RaggedMap {
        /// Offending row
        row: usize,
        /// Width of the first row
        expected: usize,
        /// Width of the offending row
        found: usize,
    },
}

/// One walkable or solid tile
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Movement cost multiplier; [`SOLID_COST`] blocks the tile
    pub cost: u8,
    /// Tile center in pixels
    pub position: Vec2,
    neighbors: Vec<usize>,
}

/// Eight-connected tile graph
///
/// Diagonal moves are only allowed when both adjacent straight tiles are
/// walkable, so paths never cut the corner of a wall.
#[derive(Debug, Clone)]
pub struct NavigationGraph {
    width: usize,
    height: usize,
    nodes: Vec<GraphNode>,
}

impl NavigationGraph {
    /// Build the graph from rows of tile costs
    pub fn from_cost_map(map: &[Vec<u8>], tile_size: Vec2) -> Result<Self, NavigationError> {
        let height = map.len();
        let width = map.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(NavigationError::EmptyMap);
        }
        if let Some((row, line)) = map.iter().enumerate().find(|(_, line)| line.len() != width) {
            return Err(NavigationError::RaggedMap {
                row,
                expected: width,
                found: line.len(),
            });
        }

        let mut nodes: Vec<GraphNode> = map
            .iter()
            .enumerate()
            .flat_map(|(y, line)| {
                line.iter().enumerate().map(move |(x, &cost)| GraphNode {
                    cost,
                    position: Vec2::new(
                        (x as f32 + 0.5) * tile_size.x,
                        (y as f32 + 0.5) * tile_size.y,
                    ),
                    neighbors: Vec::new(),
                })
            })
            .collect();

        let walkable = |x: usize, y: usize| map[y][x] != SOLID_COST;
        for y in 0..height {
            for x in 0..width {
                if !walkable(x, y) {
                    continue;
                }
                let mut neighbors = Vec::with_capacity(8);
                for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
                    let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
                        continue;
                    };
                    if nx >= width || ny >= height || !walkable(nx, ny) {
                        continue;
                    }
                    if dx != 0 && dy != 0 && !(walkable(nx, y) && walkable(x, ny)) {
                        continue;
                    }
                    neighbors.push(ny * width + nx);
                }
                nodes[y * width + x].neighbors = neighbors;
            }
        }

        Ok(Self { width, height, nodes })
    }

    /// Build the graph described by the game configuration
    ///
    /// Roads are painted first, obstacles last, so an obstacle on a road wins.
    pub fn from_config(config: &NavigationConfig) -> Result<Self, NavigationError> {
        let mut map = vec![vec![NORMAL_COST; config.width]; config.height];
        let mut paint = |rects: &[[usize; 4]], cost: u8| {
            for &[x, y, w, h] in rects {
                for row in map.iter_mut().skip(y).take(h) {
                    for tile in row.iter_mut().skip(x).take(w) {
                        *tile = cost;
                    }
                }
            }
        };
        paint(&config.roads, ROAD_COST);
        paint(&config.obstacles, SOLID_COST);
        Self::from_cost_map(&map, Vec2::new(config.tile_size[0], config.tile_size[1]))
    }

    /// Grid size in tiles
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Node at tile `(x, y)`
    pub fn node(&self, x: usize, y: usize) -> Option<&GraphNode> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.nodes.get(y * self.width + x)
    }

    /// Walkable node closest to `point`
    pub fn nearest_node(&self, point: Vec2) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.cost != SOLID_COST)
            .min_by(|(_, a), (_, b)| {
                let da = (a.position - point).norm_squared();
                let db = (b.position - point).norm_squared();
                da.total_cmp(&db)
            })
            .map(|(index, _)| index)
    }

    /// Tile centers from the tile nearest `origin` to the one nearest `destination`
    ///
    /// Empty when either end has no walkable tile or the ends are not connected.
    pub fn path_between(&self, origin: Vec2, destination: Vec2) -> Vec<Vec2> {
        match (self.nearest_node(origin), self.nearest_node(destination)) {
            (Some(from), Some(to)) => self.path_between_nodes(from, to),
            _ => Vec::new(),
        }
    }

    /// A* over node indices
    pub fn path_between_nodes(&self, from: usize, to: usize) -> Vec<Vec2> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return Vec::new();
        }

        let mut cost_so_far = vec![u32::MAX; self.nodes.len()];
        let mut came_from = vec![usize::MAX; self.nodes.len()];
        let mut frontier = BinaryHeap::new();
        cost_so_far[from] = 0;
        frontier.push(Reverse((self.heuristic(from, to), from)));

        while let Some(Reverse((_, current))) = frontier.pop() {
            if current == to {
                return self.reconstruct(&came_from, from, to);
            }
            for &next in &self.nodes[current].neighbors {
                let cost = cost_so_far[current] + self.step_cost(current, next);
                if cost < cost_so_far[next] {
                    cost_so_far[next] = cost;
                    came_from[next] = current;
                    frontier.push(Reverse((cost + self.heuristic(next, to), next)));
                }
            }
        }
        Vec::new()
    }

    fn coordinates(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    fn step_cost(&self, from: usize, to: usize) -> u32 {
        let (fx, fy) = self.coordinates(from);
        let (tx, ty) = self.coordinates(to);
        let step = if fx != tx && fy != ty { DIAGONAL_STEP } else { STRAIGHT_STEP };
        step * u32::from(self.nodes[to].cost)
    }

    // Octile distance at road cost never overestimates
    fn heuristic(&self, from: usize, to: usize) -> u32 {
        let (fx, fy) = self.coordinates(from);
        let (tx, ty) = self.coordinates(to);
        let dx = fx.abs_diff(tx);
        let dy = fy.abs_diff(ty);
        let (long, short) = (dx.max(dy), dx.min(dy));
        let octile = STRAIGHT_STEP as usize * (long - short) + DIAGONAL_STEP as usize * short;
        u32::try_from(octile).unwrap_or(u32::MAX) * u32::from(ROAD_COST)
    }

    fn reconstruct(&self, came_from: &[usize], from: usize, to: usize) -> Vec<Vec2> {
        let mut path = vec![self.nodes[to].position];
        let mut current = to;
        while current != from {
            current = came_from[current];
            path.push(self.nodes[current].position);
        }
        path.reverse();
        path
    }
}

/// Handle for a queued path search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathTicket(u64);

#[derive(Debug, Clone)]
struct PathRequest {
    ticket: PathTicket,
    origin: Vec2,
    destination: Vec2,
}

/// Services path requests a few per frame
pub struct NavigationSystem {
    graph: NavigationGraph,
    requests: BoundedQueue<PathRequest>,
    finished: HashMap<PathTicket, Vec<Vec2>>,
    next_ticket: u64,
}

impl NavigationSystem {
    /// System name used in scene files
    pub const NAME: &'static str = "navigation";

    /// Create a system over `graph` answering `per_update` requests per frame
    pub fn new(graph: NavigationGraph, per_update: usize) -> Self {
        Self {
            graph,
            requests: BoundedQueue::new(per_update),
            finished: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Create a shared system
    pub fn shared(graph: NavigationGraph, per_update: usize) -> Shared<Self> {
        Rc::new(RefCell::new(Self::new(graph, per_update)))
    }

    /// Queue a search; the path becomes available after a later update
    pub fn ask_for_path(&mut self, origin: Vec2, destination: Vec2) -> PathTicket {
        let ticket = PathTicket(self.next_ticket);
        self.next_ticket += 1;
        self.requests.push(PathRequest {
            ticket,
            origin,
            destination,
        });
        ticket
    }

    /// Collect a finished path; `None` while the request is still queued
    pub fn take_path(&mut self, ticket: PathTicket) -> Option<Vec<Vec2>> {
        self.finished.remove(&ticket)
    }

    /// Drop a request whether it is queued or finished
    pub fn cancel(&mut self, ticket: PathTicket) {
        self.requests.retain(|request| request.ticket != ticket);
        self.finished.remove(&ticket);
    }

    /// Requests not yet searched
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Graph searched by this system
    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }
}

impl System for NavigationSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&mut self, _delta_time: f32) -> EcsResult<()> {
        for request in self.requests.drain_tick() {
            let path = self.graph.path_between(request.origin, request.destination);
            if path.is_empty() {
                log::debug!(
                    "No path from ({}, {}) to ({}, {})",
                    request.origin.x,
                    request.origin.y,
                    request.destination.x,
                    request.destination.y
                );
            }
            self.finished.insert(request.ticket, path);
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.requests.clear();
        self.finished.clear();
    }
}
