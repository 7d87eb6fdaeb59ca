//! Procedural ball animations
//!
//! Two finite-state animations mutate the ball's scalar state once per frame
//! and emit the matching transform commands before the ball draw:
//!
//! - the **bounce loop**, which oscillates the ball vertically forever while
//!   enabled and spins it about the X axis, and
//! - the **scoring trajectory**, a one-shot arc over the goal that disables
//!   host input for its duration and self-disables when it completes.
//!
//! Only one animation can be active at a time. The source system drove the
//! two with independent flags and never enforced exclusivity; whether their
//! composed translations were intended is unknowable from behavior, so
//! simultaneous activation is rejected here rather than silently serialized
//! (see DESIGN.md).

use crate::gfx::backend::RenderBackend;

/// Per-frame vertical step of both animations.
const CLIMB_STEP: f64 = 0.2;
/// Bounce apex: rising flips to falling above this height.
const BOUNCE_CEILING: f64 = 3.0;
/// Bounce floor: falling flips to rising below this height.
const BOUNCE_FLOOR: f64 = 0.1;
/// Sideways drift per frame during the scoring trajectory.
const SCORING_DRIFT: f64 = 0.09;
/// Depth step per frame during the scoring trajectory.
const SCORING_ADVANCE: f64 = 0.2;
/// Height at which the scoring ball crosses the goal and deflects.
const GOAL_CROSSING_HEIGHT: f64 = 6.7;
/// Height at which the scoring trajectory terminates.
const SCORING_END_HEIGHT: f64 = 10.0;

/// Host-surface operations the engine is allowed to request.
///
/// The scoring trajectory blocks interaction for its duration through
/// `set_input_enabled`.
pub trait SurfaceControl {
    fn set_input_enabled(&mut self, enabled: bool);
    fn request_close(&mut self);
}

/// Scalar animation state of the ball.
///
/// `height`/`going_up` belong to the bounce loop, `x`/`y` to the scoring
/// trajectory. `rotation` accumulates `rotation_speed` degrees per bounce
/// frame without bound; it is reduced modulo a full turn only when emitted,
/// so the f64 accumulator keeps its precision across a session.
#[derive(Clone, Debug, PartialEq)]
pub struct BallState {
    pub height: f64,
    pub going_up: bool,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
    pub scale: f64,
}

impl Default for BallState {
    fn default() -> Self {
        Self {
            height: 0.0,
            going_up: true,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            rotation_speed: 1.0,
            scale: 1.0,
        }
    }
}

/// Phase of the scoring trajectory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScoringPhase {
    /// Climbing toward the goal, drifting right.
    Approach,
    /// Past the crossbar, drifting back left until the arc ends.
    Deflected,
}

/// The single active animation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimationMode {
    Idle,
    Bouncing,
    Scoring(ScoringPhase),
}

/// Drives the two animation state machines.
pub struct AnimationEngine {
    mode: AnimationMode,
    pub ball: BallState,
}

impl Default for AnimationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationEngine {
    pub fn new() -> Self {
        Self {
            mode: AnimationMode::Idle,
            ball: BallState::default(),
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == AnimationMode::Idle
    }

    /// Toggles the bounce loop.
    ///
    /// Returns `false` (and changes nothing) while the scoring trajectory is
    /// active. Toggling off does NOT reset `ball.height`; the caller resets
    /// it to zero on toggle, matching the host bindings of the source
    /// system.
    pub fn toggle_bounce(&mut self) -> bool {
        match self.mode {
            AnimationMode::Scoring(_) => false,
            AnimationMode::Bouncing => {
                self.mode = AnimationMode::Idle;
                true
            }
            AnimationMode::Idle => {
                self.mode = AnimationMode::Bouncing;
                true
            }
        }
    }

    /// Starts the scoring trajectory and disables host input for its
    /// duration.
    ///
    /// Returns `false` (and changes nothing) unless the engine is idle.
    pub fn start_scoring(&mut self, host: &mut dyn SurfaceControl) -> bool {
        if self.mode != AnimationMode::Idle {
            return false;
        }
        self.mode = AnimationMode::Scoring(ScoringPhase::Approach);
        host.set_input_enabled(false);
        true
    }

    /// Advances the active animation by one frame.
    pub fn advance(&mut self, host: &mut dyn SurfaceControl) {
        match self.mode {
            AnimationMode::Idle => {}
            AnimationMode::Bouncing => {
                if self.ball.going_up {
                    self.ball.height += CLIMB_STEP;
                    if self.ball.height > BOUNCE_CEILING {
                        self.ball.going_up = false;
                    }
                } else {
                    self.ball.height -= CLIMB_STEP;
                    if self.ball.height < BOUNCE_FLOOR {
                        self.ball.going_up = true;
                    }
                }
                self.ball.rotation += self.ball.rotation_speed;
            }
            AnimationMode::Scoring(ScoringPhase::Approach) => {
                self.ball.height += CLIMB_STEP;
                self.ball.x += SCORING_DRIFT;
                self.ball.y -= SCORING_ADVANCE;
                if self.ball.height > GOAL_CROSSING_HEIGHT {
                    self.mode = AnimationMode::Scoring(ScoringPhase::Deflected);
                }
            }
            AnimationMode::Scoring(ScoringPhase::Deflected) => {
                self.ball.height += CLIMB_STEP;
                self.ball.x -= SCORING_DRIFT;
                self.ball.y -= SCORING_ADVANCE;
                if self.ball.height > SCORING_END_HEIGHT {
                    self.ball.height = 0.0;
                    self.ball.x = 0.0;
                    self.ball.y = 0.0;
                    self.mode = AnimationMode::Idle;
                    host.set_input_enabled(true);
                }
            }
        }
    }

    /// Emits the active animation's transform commands.
    ///
    /// Must be issued inside the ball's transform scope, before the ball
    /// draw.
    pub fn apply_transform(&self, backend: &mut dyn RenderBackend) {
        match self.mode {
            AnimationMode::Idle => {}
            AnimationMode::Bouncing => {
                backend.translate(0.0, 0.0, self.ball.height as f32);
                backend.rotate((self.ball.rotation % 360.0) as f32, [1.0, 0.0, 0.0]);
            }
            AnimationMode::Scoring(_) => {
                backend.translate(
                    self.ball.x as f32,
                    self.ball.y as f32,
                    self.ball.height as f32,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::trace::{Command, TraceBackend};

    /// Records the input-enable calls the engine makes on the host.
    #[derive(Default)]
    struct HostProbe {
        input_events: Vec<bool>,
        close_requested: bool,
    }

    impl SurfaceControl for HostProbe {
        fn set_input_enabled(&mut self, enabled: bool) {
            self.input_events.push(enabled);
        }

        fn request_close(&mut self) {
            self.close_requested = true;
        }
    }

    #[test]
    fn bounce_oscillates_within_tolerated_bounds() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();
        assert!(engine.toggle_bounce());

        let mut seen_top = false;
        let mut seen_bottom = false;
        for _ in 0..500 {
            engine.advance(&mut host);
            // One overshoot step of 0.2 is tolerated in each direction.
            assert!(engine.ball.height > -0.1 - 1e-9);
            assert!(engine.ball.height <= 3.2 + 1e-9);
            if engine.ball.height > 3.0 {
                seen_top = true;
            }
            if engine.ball.height < 0.1 {
                seen_bottom = true;
            }
        }
        assert!(seen_top && seen_bottom);
    }

    #[test]
    fn bounce_accumulates_rotation_every_frame() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();
        engine.ball.rotation_speed = 5.0;
        engine.toggle_bounce();

        for _ in 0..100 {
            engine.advance(&mut host);
        }
        assert_eq!(engine.ball.rotation, 500.0);

        // Emitted angle wraps; the accumulator does not.
        let mut trace = TraceBackend::new();
        engine.apply_transform(&mut trace);
        assert_eq!(
            trace.commands[1],
            Command::Rotate {
                angle_deg: 140.0,
                axis: [1.0, 0.0, 0.0]
            }
        );
    }

    #[test]
    fn toggle_off_keeps_height_for_the_caller_to_reset() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();
        engine.toggle_bounce();
        for _ in 0..7 {
            engine.advance(&mut host);
        }
        assert!(engine.ball.height > 0.0);

        assert!(engine.toggle_bounce());
        assert!(engine.is_idle());
        assert!(engine.ball.height > 0.0);
    }

    #[test]
    fn scoring_trajectory_is_deterministic_and_self_disabling() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();

        assert!(engine.start_scoring(&mut host));
        assert_eq!(host.input_events, vec![false]);

        // Phase 1: 34 frames to clear 6.7, phase 2: 17 more to clear 10.
        let mut frames = 0;
        while !engine.is_idle() {
            engine.advance(&mut host);
            frames += 1;
            assert!(frames <= 51, "trajectory failed to terminate");
        }
        assert_eq!(frames, 51);

        // Terminal transition resets the trajectory state and re-enables
        // input.
        assert_eq!(engine.ball.height, 0.0);
        assert_eq!(engine.ball.x, 0.0);
        assert_eq!(engine.ball.y, 0.0);
        assert_eq!(host.input_events, vec![false, true]);
    }

    #[test]
    fn scoring_phase_flips_above_the_crossbar() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();
        engine.start_scoring(&mut host);

        for _ in 0..33 {
            engine.advance(&mut host);
        }
        assert_eq!(engine.mode(), AnimationMode::Scoring(ScoringPhase::Approach));
        let peak_x = engine.ball.x;

        engine.advance(&mut host);
        assert_eq!(
            engine.mode(),
            AnimationMode::Scoring(ScoringPhase::Deflected)
        );

        engine.advance(&mut host);
        assert!(engine.ball.x < peak_x + SCORING_DRIFT);
    }

    #[test]
    fn simultaneous_activation_is_rejected() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();

        engine.toggle_bounce();
        assert!(!engine.start_scoring(&mut host));
        assert!(host.input_events.is_empty());
        assert_eq!(engine.mode(), AnimationMode::Bouncing);

        engine.toggle_bounce();
        engine.start_scoring(&mut host);
        assert!(!engine.toggle_bounce());
        assert!(matches!(engine.mode(), AnimationMode::Scoring(_)));
    }

    #[test]
    fn idle_engine_emits_no_transforms() {
        let engine = AnimationEngine::new();
        let mut trace = TraceBackend::new();
        engine.apply_transform(&mut trace);
        assert!(trace.commands.is_empty());
    }

    #[test]
    fn scoring_transform_translates_by_trajectory_state() {
        let mut engine = AnimationEngine::new();
        let mut host = HostProbe::default();
        engine.start_scoring(&mut host);
        for _ in 0..10 {
            engine.advance(&mut host);
        }

        let mut trace = TraceBackend::new();
        engine.apply_transform(&mut trace);
        assert_eq!(
            trace.commands,
            vec![Command::Translate([
                engine.ball.x as f32,
                engine.ball.y as f32,
                engine.ball.height as f32
            ])]
        );
    }
}
