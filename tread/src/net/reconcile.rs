use core::fmt;

use manyfmt::Refmt as _;

use crate::config::NetConfig;
use crate::math::{FreeCoordinate, FreeVector, Rotation};
use crate::net::{AuthoritativeState, Networked, Pose, blend_rotation};
use crate::time::TickNumber;
use crate::util::ConciseDebug;

/// How an object's simulated state relates to the server's.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ReconcileMode {
    /// This is the server; the object's state is the truth.
    Authoritative,
    /// The client is simulating the object ahead from the last state it received.
    Predicting,
    /// The client is moving the object toward a correction over a few ticks, without
    /// simulating it.
    Warping,
    /// The client has predicted for too long without hearing from the server, and has
    /// stopped moving the object.
    Snapped,
}

/// What [`MovementDelta::receive()`] did with an update.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Correction {
    /// Updates are not applied on the server.
    Ignored,
    /// The object was moving too slowly to judge the correction by its speed, so the state
    /// was applied directly.
    Snapped,
    /// The correction was small enough to apply within the current tick.
    Folded,
    /// The correction will be spread over this many ticks.
    Warp {
        /// Number of ticks.
        ticks: u32,
    },
}

/// Whether an object should be simulated this tick, as returned by
/// [`MovementDelta::begin_tick()`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TickAction {
    /// Step the object normally.
    Simulate,
    /// Do not step the object; it is being warped or its prediction has run out.
    Hold,
}

/// Per-object reconciliation state.
///
/// On a client, each update from the server is compared with the object's predicted
/// state. Small differences are applied at once; larger ones are spread over up to
/// [`NetConfig::max_warp_ticks`] ticks. Between updates the client keeps simulating the
/// object for at most [`NetConfig::max_prediction_ticks`] ticks.
///
/// The pose at the end of each of the last two ticks is kept for rendering, which lags one
/// tick behind the simulation.
#[derive(Clone, PartialEq)]
pub struct MovementDelta {
    mode: ReconcileMode,

    /// Last received state and the server tick it was taken at.
    last_authoritative: Option<(TickNumber, Pose)>,

    /// Ticks of the current warp not yet applied.
    warp_ticks: u32,
    /// Translation applied on each warp tick.
    warp_offset: FreeVector,
    /// Orientation reached at the end of the warp.
    warp_orientation: Rotation,

    /// Ticks the client may still predict without fresh data.
    prediction_remaining: u32,

    previous: Pose,
    current: Pose,
}

impl fmt::Debug for MovementDelta {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("MovementDelta")
            .field("mode", &self.mode)
            .field("last_authoritative", &self.last_authoritative.map(|(t, _)| t))
            .field("warp_ticks", &self.warp_ticks)
            .field("warp_offset", &self.warp_offset.refmt(&ConciseDebug))
            .field("prediction_remaining", &self.prediction_remaining)
            .finish_non_exhaustive()
    }
}

impl MovementDelta {
    /// Creates the state of an object simulated by the server.
    pub fn server(pose: Pose) -> Self {
        Self::new(ReconcileMode::Authoritative, pose, 0)
    }

    /// Creates the state of an object a client has just been told about.
    pub fn client(pose: Pose, config: &NetConfig) -> Self {
        Self::new(ReconcileMode::Predicting, pose, config.max_prediction_ticks)
    }

    fn new(mode: ReconcileMode, pose: Pose, prediction_remaining: u32) -> Self {
        Self {
            mode,
            last_authoritative: None,
            warp_ticks: 0,
            warp_offset: FreeVector::zero(),
            warp_orientation: pose.orientation,
            prediction_remaining,
            previous: pose,
            current: pose,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Ticks remaining in the current warp.
    pub fn warp_ticks_remaining(&self) -> u32 {
        self.warp_ticks
    }

    /// Ticks the client may still predict before it stops moving the object.
    pub fn prediction_remaining(&self) -> u32 {
        self.prediction_remaining
    }

    /// Server tick and pose of the last update received, if any.
    pub fn last_authoritative(&self) -> Option<(TickNumber, Pose)> {
        self.last_authoritative
    }

    /// Applies an update from the server to `object`.
    ///
    /// `latency_ticks` is how many ticks old the update is; the authoritative position is
    /// extrapolated over that time at the authoritative velocity before comparing it to
    /// the prediction. `dt` is the tick length in seconds.
    pub fn receive<N: Networked + ?Sized>(
        &mut self,
        object: &mut N,
        server_tick: TickNumber,
        state: &AuthoritativeState,
        latency_ticks: u32,
        dt: FreeCoordinate,
        config: &NetConfig,
    ) -> Correction {
        if self.mode == ReconcileMode::Authoritative {
            log::debug!("ignoring state update for a server object");
            return Correction::Ignored;
        }
        if self.last_authoritative.is_some_and(|(tick, _)| tick > server_tick) {
            log::debug!("ignoring out-of-order state update from tick {server_tick}");
            return Correction::Ignored;
        }
        self.last_authoritative = Some((server_tick, state.pose()));
        self.prediction_remaining = config.max_prediction_ticks;
        self.warp_ticks = 0;
        self.mode = ReconcileMode::Predicting;

        let mass = object.net_mass();
        let velocity = if mass > 0.0 {
            state.linear_momentum / mass
        } else {
            FreeVector::zero()
        };
        let speed = velocity.length();
        let target = AuthoritativeState {
            position: state.position + velocity * (FreeCoordinate::from(latency_ticks) * dt),
            ..*state
        };

        // Below the snap speed the correction time would divide by nearly zero.
        if state.at_rest || !(speed >= config.snap_speed) || !(dt > 0.0) {
            object.apply_authoritative_state(&target);
            log::trace!("snapped to {:?}", target.position.refmt(&ConciseDebug));
            return Correction::Snapped;
        }

        let predicted = object.pose();
        let offset = target.position - predicted.position;
        let correction_ticks = offset.length() / (speed * dt);
        if correction_ticks < config.min_warp_fraction {
            object.apply_authoritative_state(&target);
            return Correction::Folded;
        }

        let ticks = (correction_ticks.round() as u32).clamp(1, config.max_warp_ticks.max(1));
        let duration = FreeCoordinate::from(ticks) * dt;
        let warp_target = target.position + velocity * duration;
        object.apply_authoritative_state(&AuthoritativeState {
            position: predicted.position,
            orientation: predicted.orientation,
            ..*state
        });
        self.warp_ticks = ticks;
        self.warp_offset = (warp_target - predicted.position) / FreeCoordinate::from(ticks);
        self.warp_orientation = state.orientation;
        self.mode = ReconcileMode::Warping;
        log::debug!(
            "warping {:?} over {ticks} ticks ({correction_ticks:.2} at current speed)",
            offset.refmt(&ConciseDebug)
        );
        Correction::Warp { ticks }
    }

    /// Prepares `object` for the next tick, and says whether to simulate it.
    ///
    /// While warping, this moves the object by one tick's share of the correction.
    pub fn begin_tick<N: Networked + ?Sized>(&mut self, object: &mut N) -> TickAction {
        self.previous = self.current;
        match self.mode {
            ReconcileMode::Authoritative => TickAction::Simulate,
            ReconcileMode::Warping => {
                let pose = object.pose();
                let orientation = blend_rotation(
                    &pose.orientation,
                    &self.warp_orientation,
                    1.0 / FreeCoordinate::from(self.warp_ticks.max(1)),
                );
                object.set_pose(Pose::new(pose.position + self.warp_offset, orientation));
                self.warp_ticks = self.warp_ticks.saturating_sub(1);
                self.prediction_remaining = self.prediction_remaining.saturating_sub(1);
                if self.warp_ticks == 0 {
                    self.mode = ReconcileMode::Predicting;
                }
                TickAction::Hold
            }
            ReconcileMode::Predicting => {
                if self.prediction_remaining == 0 {
                    log::debug!("no update within the prediction horizon; holding position");
                    self.mode = ReconcileMode::Snapped;
                    TickAction::Hold
                } else {
                    self.prediction_remaining -= 1;
                    TickAction::Simulate
                }
            }
            ReconcileMode::Snapped => TickAction::Hold,
        }
    }

    /// Records the pose `object` reached at the end of the tick.
    pub fn end_tick<N: Networked + ?Sized>(&mut self, object: &N) {
        self.current = object.pose();
    }

    /// Returns the pose to draw at `alpha` (from 0 to 1) of the way from the end of the
    /// previous tick to the end of the current one.
    pub fn render_pose(&self, alpha: FreeCoordinate) -> Pose {
        self.previous.blend(&self.current, alpha)
    }
}
