use super::*;

/// Golden-angle spiral used to seed nodes that have no previous position.
pub(crate) fn phyllotaxis(center: Point, index: usize) -> Point {
    let radius = 10.0 * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5f32.sqrt());
    Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

/// Tiny deterministic offset for coincident points.
fn jiggle(index: usize) -> f32 {
    let magnitude = 1e-6 * (index as f32 + 1.0);
    if index % 2 == 0 { magnitude } else { -magnitude }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fixed: Option<Point>,
}

impl Body {
    pub fn at(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            vx: 0.0,
            vy: 0.0,
            fixed: None,
        }
    }

    pub fn pinned(point: Point) -> Self {
        Self {
            fixed: Some(point),
            ..Self::at(point)
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone)]
pub struct LinkSpring {
    pub source: usize,
    pub target: usize,
    pub strength: f32,
    pub bias: f32,
}

#[derive(Debug, Clone)]
pub enum Force {
    Link {
        springs: Vec<LinkSpring>,
        distance: f32,
    },
    /// Per-node pull towards a target point, with separate x and y strengths.
    Position {
        targets: Vec<Point>,
        strength_x: Vec<f32>,
        strength_y: Vec<f32>,
    },
    Collide {
        radii: Vec<f32>,
        strength: f32,
    },
    /// Pull towards the radius²-weighted centroid of each node's group.
    Cluster {
        groups: Vec<usize>,
        weights: Vec<f32>,
        strength: f32,
    },
}

impl Force {
    /// Springs for `edges`, each weakened by the busier of its two endpoints.
    pub fn link(node_count: usize, edges: &[(usize, usize)], distance: f32, strength: f32) -> Self {
        let mut count = vec![0usize; node_count];
        for &(source, target) in edges {
            count[source] += 1;
            count[target] += 1;
        }
        let springs = edges
            .iter()
            .map(|&(source, target)| {
                let (cs, ct) = (count[source] as f32, count[target] as f32);
                LinkSpring {
                    source,
                    target,
                    strength: strength / cs.min(ct).max(1.0),
                    bias: cs / (cs + ct),
                }
            })
            .collect();
        Force::Link { springs, distance }
    }

    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        match self {
            Force::Link { springs, distance } => {
                for (idx, spring) in springs.iter().enumerate() {
                    if spring.strength == 0.0 {
                        continue;
                    }
                    let source = bodies[spring.source];
                    let target = bodies[spring.target];
                    let mut dx = target.x + target.vx - source.x - source.vx;
                    let mut dy = target.y + target.vy - source.y - source.vy;
                    if dx == 0.0 {
                        dx = jiggle(idx);
                    }
                    if dy == 0.0 {
                        dy = jiggle(idx + 1);
                    }
                    let length = (dx * dx + dy * dy).sqrt();
                    let scale = (length - distance) / length * alpha * spring.strength;
                    dx *= scale;
                    dy *= scale;
                    bodies[spring.target].vx -= dx * spring.bias;
                    bodies[spring.target].vy -= dy * spring.bias;
                    bodies[spring.source].vx += dx * (1.0 - spring.bias);
                    bodies[spring.source].vy += dy * (1.0 - spring.bias);
                }
            }
            Force::Position {
                targets,
                strength_x,
                strength_y,
            } => {
                for (idx, body) in bodies.iter_mut().enumerate() {
                    let target = targets[idx];
                    body.vx += (target.x - body.x) * strength_x[idx] * alpha;
                    body.vy += (target.y - body.y) * strength_y[idx] * alpha;
                }
            }
            Force::Collide { radii, strength } => {
                let grid = CollideGrid::build(bodies, radii);
                let mut candidates = Vec::new();
                for i in 0..bodies.len() {
                    grid.candidates_after(i, &mut candidates);
                    let ri = radii[i];
                    for &j in &candidates {
                        let rj = radii[j];
                        let reach = ri + rj;
                        let a = bodies[i];
                        let b = bodies[j];
                        let mut dx = (a.x + a.vx) - (b.x + b.vx);
                        let mut dy = (a.y + a.vy) - (b.y + b.vy);
                        let mut dist_sq = dx * dx + dy * dy;
                        if dist_sq >= reach * reach {
                            continue;
                        }
                        if dx == 0.0 {
                            dx = jiggle(i + j);
                            dist_sq += dx * dx;
                        }
                        if dy == 0.0 {
                            dy = jiggle(i + j + 1);
                            dist_sq += dy * dy;
                        }
                        let dist = dist_sq.sqrt();
                        let push = (reach - dist) / dist * strength;
                        dx *= push;
                        dy *= push;
                        let share = (rj * rj) / (ri * ri + rj * rj).max(f32::EPSILON);
                        bodies[i].vx += dx * share;
                        bodies[i].vy += dy * share;
                        bodies[j].vx -= dx * (1.0 - share);
                        bodies[j].vy -= dy * (1.0 - share);
                    }
                }
            }
            Force::Cluster {
                groups,
                weights,
                strength,
            } => {
                let group_count = groups.iter().copied().max().map_or(0, |max| max + 1);
                let mut sums = vec![(0.0f32, 0.0f32, 0.0f32); group_count];
                for (idx, body) in bodies.iter().enumerate() {
                    let entry = &mut sums[groups[idx]];
                    entry.0 += body.x * weights[idx];
                    entry.1 += body.y * weights[idx];
                    entry.2 += weights[idx];
                }
                for (idx, body) in bodies.iter_mut().enumerate() {
                    let (sx, sy, total) = sums[groups[idx]];
                    if total <= 0.0 {
                        continue;
                    }
                    body.vx -= (body.x - sx / total) * strength * alpha;
                    body.vy -= (body.y - sy / total) * strength * alpha;
                }
            }
        }
    }
}

/// Uniform grid over predicted positions, one cell per largest collision
/// reach, so a collide pass only compares bodies in neighbouring cells.
struct CollideGrid {
    cells: HashMap<(i64, i64), Vec<usize>>,
    keys: Vec<(i64, i64)>,
}

impl CollideGrid {
    fn build(bodies: &[Body], radii: &[f32]) -> Self {
        let max_radius = radii.iter().copied().fold(0.0f32, f32::max);
        let cell = (2.0 * max_radius).max(f32::EPSILON);
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let keys: Vec<(i64, i64)> = bodies
            .iter()
            .map(|body| {
                (
                    ((body.x + body.vx) / cell).floor() as i64,
                    ((body.y + body.vy) / cell).floor() as i64,
                )
            })
            .collect();
        for (idx, key) in keys.iter().enumerate() {
            cells.entry(*key).or_default().push(idx);
        }
        Self { cells, keys }
    }

    /// Indices greater than `i` in the 3x3 block around `i`, ascending.
    fn candidates_after(&self, i: usize, out: &mut Vec<usize>) {
        out.clear();
        let (cx, cy) = self.keys[i];
        for gx in cx.saturating_sub(1)..=cx.saturating_add(1) {
            for gy in cy.saturating_sub(1)..=cy.saturating_add(1) {
                if let Some(members) = self.cells.get(&(gx, gy)) {
                    out.extend(members.iter().copied().filter(|&j| j > i));
                }
            }
        }
        out.sort_unstable();
    }
}

/// Velocity Verlet style simulation with a cooling `alpha`, run for a fixed
/// number of ticks and then frozen.
#[derive(Debug, Clone)]
pub struct Simulation {
    bodies: Vec<Body>,
    forces: Vec<Force>,
    alpha: f32,
    alpha_min: f32,
    velocity_decay: f32,
}

impl Simulation {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self {
            bodies,
            forces: Vec::new(),
            alpha: 1.0,
            alpha_min: 0.001,
            velocity_decay: 0.4,
        }
    }

    pub fn with_force(mut self, force: Force) -> Self {
        self.forces.push(force);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_alpha_min(mut self, alpha_min: f32) -> Self {
        self.alpha_min = alpha_min;
        self
    }

    pub fn with_velocity_decay(mut self, velocity_decay: f32) -> Self {
        self.velocity_decay = velocity_decay;
        self
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Run exactly `ticks` iterations, cooling so that a full-energy start
    /// would reach `alpha_min` on the last one.
    pub fn run(&mut self, ticks: usize) {
        if ticks == 0 || self.bodies.is_empty() {
            return;
        }
        let decay = 1.0 - self.alpha_min.max(f32::MIN_POSITIVE).powf(1.0 / ticks as f32);
        for _ in 0..ticks {
            self.tick(decay);
        }
    }

    fn tick(&mut self, decay: f32) {
        self.alpha += (0.0 - self.alpha) * decay;
        for force in &self.forces {
            force.apply(&mut self.bodies, self.alpha);
        }
        let keep = 1.0 - self.velocity_decay;
        for body in &mut self.bodies {
            if let Some(fixed) = body.fixed {
                body.x = fixed.x;
                body.y = fixed.y;
                body.vx = 0.0;
                body.vy = 0.0;
                continue;
            }
            body.vx *= keep;
            body.vy *= keep;
            body.x += body.vx;
            body.y += body.vy;
        }
    }
}
