use crate::boundary::{NetworkSink, PositionAux};
use glam::Vec3;
use plaza_common::NetworkConfig;
use plaza_common::math::shortest_angle_diff;

/// Rate-limited outbound position updates.
///
/// At most one update per `1 / publish_rate_hz` seconds, and only when the
/// avatar moved or turned past the minimum deltas (or its flags changed).
#[derive(Debug, Clone)]
pub struct PositionPublisher {
    interval: f64,
    min_position_delta: f32,
    min_yaw_delta: f32,
    last_sent_at: Option<f64>,
    last: Option<(Vec3, f32, PositionAux)>,
    sent: u64,
}

impl PositionPublisher {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            interval: 1.0 / f64::from(config.publish_rate_hz.max(f32::EPSILON)),
            min_position_delta: config.min_position_delta,
            min_yaw_delta: config.min_yaw_delta,
            last_sent_at: None,
            last: None,
            sent: 0,
        }
    }

    /// Publish if the rate limit and deltas allow. Returns whether it sent.
    pub fn tick(
        &mut self,
        now: f64,
        position: Vec3,
        yaw: f32,
        aux: PositionAux,
        sink: &mut dyn NetworkSink,
    ) -> bool {
        if self
            .last_sent_at
            .is_some_and(|at| now - at < self.interval)
        {
            return false;
        }
        if let Some((last_pos, last_yaw, last_aux)) = self.last {
            let moved = last_pos.distance(position) >= self.min_position_delta;
            let turned = shortest_angle_diff(last_yaw, yaw).abs() >= self.min_yaw_delta;
            if !moved && !turned && last_aux == aux {
                return false;
            }
        }
        sink.publish_position(position, yaw, aux);
        self.last_sent_at = Some(now);
        self.last = Some((position, yaw, aux));
        self.sent += 1;
        true
    }

    /// Forget the last sent state so the next tick always publishes.
    pub fn reset(&mut self) {
        self.last_sent_at = None;
        self.last = None;
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

/// Periodic republish of the ball by the client that kicked it last.
///
/// Ownership passes away as soon as a sync from elsewhere arrives.
#[derive(Debug, Clone)]
pub struct BallRepublisher {
    interval: f64,
    last_published: Option<f64>,
}

impl BallRepublisher {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            interval: config.ball_republish_interval,
            last_published: None,
        }
    }

    /// True after a local kick until a remote sync arrives.
    pub fn owns_ball(&self) -> bool {
        self.last_published.is_some()
    }

    /// This client kicked the ball and published the kick at `now`.
    pub fn on_kick(&mut self, now: f64) {
        self.last_published = Some(now);
    }

    /// Another client's state was adopted.
    pub fn on_remote_sync(&mut self) {
        self.last_published = None;
    }

    /// Republish while owned and moving. Returns whether it sent.
    pub fn tick(
        &mut self,
        now: f64,
        position: Vec3,
        velocity: Vec3,
        moving: bool,
        sink: &mut dyn NetworkSink,
    ) -> bool {
        let Some(last) = self.last_published else {
            return false;
        };
        if !moving {
            // One final publish so everyone agrees on the resting spot.
            sink.publish_ball_kick(position, velocity);
            self.last_published = None;
            return true;
        }
        if now - last < self.interval {
            return false;
        }
        sink.publish_ball_kick(position, velocity);
        self.last_published = Some(now);
        true
    }
}
