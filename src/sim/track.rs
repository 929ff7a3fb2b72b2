//! Track geometry
//!
//! A track is an ordered list of segments laid end to end. Lateral
//! coordinates are measured from the centerline; lanes split each segment's
//! width evenly. Obstacles are flattened into one list sorted by distance so
//! collision queries are a binary search.

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::RngState;
use crate::consts::{DEFAULT_LANES, LANE_WIDTH};
use crate::error::SimError;

/// Upper bound on generated segments
pub const MAX_SEGMENTS: usize = 10_000;

/// Static hazard types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Knocks the rider down, light damage
    Pothole,
    /// Slows the rider, no knockdown
    OilSlick,
    /// Knocks the rider down, heavy damage
    Barrier,
}

impl ObstacleKind {
    pub fn radius(&self) -> f64 {
        match self {
            ObstacleKind::Pothole => 0.8,
            ObstacleKind::OilSlick => 1.5,
            ObstacleKind::Barrier => 1.0,
        }
    }

    pub fn knocks_down(&self) -> bool {
        !matches!(self, ObstacleKind::OilSlick)
    }
}

/// An obstacle placed on the road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Index in the track's obstacle list (assigned by [`Track::new`])
    #[serde(default)]
    pub id: u32,
    pub kind: ObstacleKind,
    /// `x` = lateral offset, `y` = distance. Segment-relative when supplied
    /// in a [`Segment`], absolute once flattened into the track.
    pub pos: DVec2,
    pub radius: f64,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, lateral: f64, distance: f64) -> Self {
        Self {
            id: 0,
            kind,
            pos: DVec2::new(lateral, distance),
            radius: kind.radius(),
        }
    }
}

/// A stretch of road
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub length: f64,
    pub width: f64,
    /// Signed curvature (1/m), positive bends right
    pub curvature: f64,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl Segment {
    pub fn straight(length: f64, width: f64) -> Self {
        Self {
            length,
            width,
            curvature: 0.0,
            obstacles: Vec::new(),
        }
    }
}

/// Parameters for procedural tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackParams {
    pub length: f64,
    pub lanes: u32,
    pub segment_length: f64,
    pub hazards_per_km: f64,
    pub max_curvature: f64,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            length: 3000.0,
            lanes: DEFAULT_LANES,
            segment_length: 200.0,
            hazards_per_km: 12.0,
            max_curvature: 0.003,
        }
    }
}

/// Immutable race track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    lanes: u32,
    segments: Vec<Segment>,
    /// Start distance of each segment
    starts: Vec<f64>,
    length: f64,
    /// All obstacles, absolute positions, sorted by distance
    obstacles: Vec<Obstacle>,
    max_obstacle_radius: f64,
}

impl Track {
    pub fn new(lanes: u32, segments: Vec<Segment>) -> Result<Self, SimError> {
        if lanes == 0 {
            return Err(SimError::InvalidTrack("track needs at least one lane"));
        }
        if segments.is_empty() {
            return Err(SimError::InvalidTrack("track needs at least one segment"));
        }

        let mut starts = Vec::with_capacity(segments.len());
        let mut obstacles = Vec::new();
        let mut offset = 0.0;
        for seg in &segments {
            if !(seg.length.is_finite() && seg.length > 0.0) {
                return Err(SimError::InvalidTrack("segment length must be positive"));
            }
            if !(seg.width.is_finite() && seg.width > 0.0) {
                return Err(SimError::InvalidTrack("segment width must be positive"));
            }
            if !seg.curvature.is_finite() {
                return Err(SimError::InvalidTrack("segment curvature must be finite"));
            }
            for obstacle in &seg.obstacles {
                if !(0.0..=seg.length).contains(&obstacle.pos.y)
                    || obstacle.pos.x.abs() > seg.width / 2.0
                {
                    return Err(SimError::InvalidTrack("obstacle lies outside its segment"));
                }
                let mut placed = *obstacle;
                placed.pos.y += offset;
                obstacles.push(placed);
            }
            starts.push(offset);
            offset += seg.length;
        }

        obstacles.sort_by(|a, b| a.pos.y.total_cmp(&b.pos.y));
        for (idx, obstacle) in obstacles.iter_mut().enumerate() {
            obstacle.id = idx as u32;
        }
        let max_obstacle_radius = obstacles.iter().map(|o| o.radius).fold(0.0, f64::max);

        Ok(Self {
            lanes,
            segments,
            starts,
            length: offset,
            obstacles,
            max_obstacle_radius,
        })
    }

    /// Straight obstacle-free track, handy for tests and tutorials
    pub fn straight(length: f64, lanes: u32) -> Result<Self, SimError> {
        Self::new(lanes, vec![Segment::straight(length, lanes as f64 * LANE_WIDTH)])
    }

    /// Build a seeded procedural track
    pub fn generate(rng: &RngState, params: &TrackParams) -> Result<Self, SimError> {
        if params.lanes == 0 {
            return Err(SimError::InvalidTrack("track needs at least one lane"));
        }
        let lengths_ok = |v: f64| v.is_finite() && v > 0.0;
        if !(lengths_ok(params.length) && lengths_ok(params.segment_length)) {
            return Err(SimError::InvalidTrack("track and segment length must be positive"));
        }
        if (params.length / params.segment_length).ceil() > MAX_SEGMENTS as f64 {
            return Err(SimError::InvalidTrack("too many segments"));
        }
        if !(params.hazards_per_km.is_finite() && params.hazards_per_km >= 0.0) {
            return Err(SimError::InvalidTrack("hazard density must be non-negative"));
        }
        if !(params.max_curvature.is_finite() && params.max_curvature >= 0.0) {
            return Err(SimError::InvalidTrack("max curvature must be non-negative"));
        }
        let mut rng = rng.stream(0, 0x7261_636b);
        let width = params.lanes as f64 * LANE_WIDTH;
        let lane_center = |lane: u32| -width / 2.0 + (lane as f64 + 0.5) * LANE_WIDTH;

        let mut segments = Vec::new();
        let mut remaining = params.length;
        while remaining > 1e-9 {
            let length = remaining.min(params.segment_length);
            let curvature = if rng.random_bool(0.4) {
                0.0
            } else {
                rng.random_range(-params.max_curvature..=params.max_curvature)
            };
            segments.push(Segment {
                length,
                width,
                curvature,
                obstacles: Vec::new(),
            });
            remaining -= length;
        }

        // Hazards keep clear of the start grid and the finish line
        let margin = 20.0_f64.min(params.length / 4.0);
        let count = (params.length / 1000.0 * params.hazards_per_km).round() as usize;
        if count > MAX_SEGMENTS * 100 {
            return Err(SimError::InvalidTrack("too many hazards"));
        }
        for _ in 0..count {
            let distance = rng.random_range(margin..=params.length - margin);
            let lane = rng.random_range(0..params.lanes);
            let kind = match rng.random_range(0..10) {
                0..4 => ObstacleKind::Pothole,
                4..8 => ObstacleKind::OilSlick,
                _ => ObstacleKind::Barrier,
            };
            let seg_idx = ((distance / params.segment_length) as usize).min(segments.len() - 1);
            let local = (distance - seg_idx as f64 * params.segment_length)
                .clamp(0.0, segments[seg_idx].length);
            segments[seg_idx]
                .obstacles
                .push(Obstacle::new(kind, lane_center(lane), local));
        }

        let track = Self::new(params.lanes, segments)?;
        log::debug!(
            "Generated track: {:.0} m, {} segments, {} obstacles",
            track.length,
            track.segments.len(),
            track.obstacles.len()
        );
        Ok(track)
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Segment containing `distance` (the last one past the finish)
    pub fn segment_at(&self, distance: f64) -> &Segment {
        let idx = self.starts.partition_point(|&s| s <= distance).saturating_sub(1);
        &self.segments[idx]
    }

    pub fn half_width_at(&self, distance: f64) -> f64 {
        self.segment_at(distance).width / 2.0
    }

    pub fn curvature_at(&self, distance: f64) -> f64 {
        self.segment_at(distance).curvature
    }

    pub fn lane_width_at(&self, distance: f64) -> f64 {
        self.segment_at(distance).width / self.lanes as f64
    }

    /// Lateral offset of a lane's center
    pub fn lane_center(&self, lane: u32, distance: f64) -> f64 {
        let lane = lane.min(self.lanes - 1);
        -self.half_width_at(distance) + (lane as f64 + 0.5) * self.lane_width_at(distance)
    }

    /// Lane containing a lateral offset
    pub fn lane_of(&self, lateral: f64, distance: f64) -> u32 {
        let from_left = lateral + self.half_width_at(distance);
        let lane = (from_left / self.lane_width_at(distance)).floor();
        (lane.max(0.0) as u32).min(self.lanes - 1)
    }

    /// Obstacles whose distance lies within `reach` of `distance`
    /// (reach is widened by the largest obstacle radius)
    pub fn obstacles_near(&self, distance: f64, reach: f64) -> &[Obstacle] {
        self.obstacles_between(distance - reach, distance + reach)
    }

    /// Obstacles that could touch anything between `from` and `to`
    pub fn obstacles_between(&self, from: f64, to: f64) -> &[Obstacle] {
        let lo = from - self.max_obstacle_radius;
        let hi = to + self.max_obstacle_radius;
        let start = self.obstacles.partition_point(|o| o.pos.y < lo);
        let end = self.obstacles.partition_point(|o| o.pos.y <= hi);
        &self.obstacles[start..end.max(start)]
    }
}
