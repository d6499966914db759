//! Data types for simulated time.

use core::fmt;
use core::num::NonZeroU16;

use crate::math::PositiveSign;

#[doc(no_inline)]
pub use core::time::Duration;

// -------------------------------------------------------------------------------------------------

/// Sequence number of a simulation tick. Wraps around after `u32::MAX` ticks.
pub type TickNumber = u32;

/// Specifies an amount of time passing in a simulation, and which tick it is.
///
/// [`Tick`] values are passed along through the `step()` operations that advance time.
/// They are produced by a [`Clock`], which has a [`TickSchedule`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tick {
    /// Schedule from which this tick was derived, which also determines its length.
    schedule: TickSchedule,

    /// The number of this tick; the clock reads this value *before* the tick happens.
    number: TickNumber,

    /// Whether simulation time is paused, and `delta_t` should not be considered
    /// as an amount of time passing. See [`Self::paused()`] for details.
    paused: bool,
}

impl Tick {
    /// A tick of arbitrary length, for testing purposes.
    #[inline]
    pub const fn arbitrary() -> Self {
        Self {
            schedule: TickSchedule::per_second(60),
            number: 0,
            paused: false,
        }
    }

    /// Construct a non-paused [`Tick`] from a duration expressed in fractional seconds,
    /// numbered 0 as if it were the first tick of a simulation.
    ///
    /// This should only be used for tests.
    #[inline]
    pub fn from_seconds(dt: f64) -> Self {
        Self {
            schedule: TickSchedule {
                base_duration: Duration::from_micros((dt * 1e6) as u64),
                divisor: NonZeroU16::MIN,
            },
            number: 0,
            paused: false,
        }
    }

    /// Returns the amount of time passed, as a [`Duration`].
    #[inline]
    pub fn delta_t_duration(self) -> Duration {
        self.schedule.delta_t()
    }

    /// Returns the amount of time passed, as a restricted floating-point number of seconds.
    #[inline]
    pub fn delta_t_ps64(self) -> PositiveSign {
        PositiveSign::new_clamped(self.delta_t_duration().as_secs_f64())
    }

    /// Returns the amount of time passed, as a floating-point number of seconds.
    #[inline]
    pub fn delta_t_f64(self) -> f64 {
        self.delta_t_ps64().into_inner()
    }

    /// Returns the number of this tick.
    #[inline]
    pub fn number(self) -> TickNumber {
        self.number
    }

    /// Returns the schedule this tick was produced by.
    #[inline]
    pub fn schedule(self) -> TickSchedule {
        self.schedule
    }

    /// Returns a copy of this tick with the given number, for replaying or predicting
    /// ticks other than the clock's current one.
    #[inline]
    #[must_use]
    pub fn with_number(self, number: TickNumber) -> Self {
        Self { number, ..self }
    }

    /// Set the paused flag. See [`Tick::paused`] for more information.
    #[inline]
    #[must_use]
    pub fn pause(self) -> Self {
        Self {
            paused: true,
            ..self
        }
    }

    /// Returns the "paused" state of this Tick. If true, then step operations should
    /// not perform any changes that reflect simulated time passing. They should still
    /// take care of the side effects of other mutations, particularly where
    /// not doing so might lead to a stale or inconsistent view.
    #[inline]
    pub fn paused(&self) -> bool {
        self.paused
    }
}

// -------------------------------------------------------------------------------------------------

/// Specifies which [`Tick`]s a repeating event occurs on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Schedule {
    period: NonZeroU16,
}

impl Schedule {
    /// Schedule which includes every tick.
    pub const EVERY_TICK: Self = Self {
        period: NonZeroU16::MIN,
    };

    /// Creates a schedule which specifies executing some action every `period` ticks.
    #[inline]
    pub const fn from_period(period: NonZeroU16) -> Self {
        Schedule { period }
    }

    /// Returns whether the action should happen on this tick.
    #[inline]
    pub fn contains(self, tick: Tick) -> bool {
        tick.number() % u32::from(self.period.get()) == 0
    }
}

// -------------------------------------------------------------------------------------------------

/// Defines how long a [`Tick`] is: a base real-time duration divided into `divisor` ticks.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct TickSchedule {
    base_duration: Duration,
    divisor: NonZeroU16,
}

impl TickSchedule {
    /// Construct a [`TickSchedule`] which specifies `divisor` ticks per second.
    #[inline]
    pub const fn per_second(divisor: u16) -> Self {
        Self {
            base_duration: Duration::from_secs(1),
            divisor: match NonZeroU16::new(divisor) {
                Some(x) => x,
                None => panic!("divisor must be nonzero"),
            },
        }
    }

    /// Returns the length of a [`Tick`] in this schedule.
    #[inline]
    pub fn delta_t(&self) -> Duration {
        self.base_duration / u32::from(self.divisor.get())
    }
}

impl fmt::Debug for TickSchedule {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let TickSchedule {
            base_duration,
            divisor,
        } = *self;
        write!(f, "TickSchedule({base_duration:?} / {divisor})")
    }
}

// -------------------------------------------------------------------------------------------------

/// Produces successive [`Tick`]s of a simulation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Clock {
    schedule: TickSchedule,
    /// Number of the next tick to be produced.
    number: TickNumber,
}

impl Clock {
    /// Creates a new [`Clock`] whose next tick will have the given number.
    #[inline]
    pub const fn new(schedule: TickSchedule, number: TickNumber) -> Self {
        Self { schedule, number }
    }

    /// Returns the schedule which this clock obeys.
    #[inline]
    pub fn schedule(&self) -> TickSchedule {
        self.schedule
    }

    /// Returns the number of the next tick this clock will produce.
    #[inline]
    pub fn next_number(&self) -> TickNumber {
        self.number
    }

    /// Returns the next tick without advancing the clock.
    #[inline]
    pub fn next_tick(&self, paused: bool) -> Tick {
        let tick = Tick {
            schedule: self.schedule,
            number: self.number,
            paused: false,
        };
        if paused { tick.pause() } else { tick }
    }

    /// Advance the clock and return the tick that passed.
    #[inline]
    pub fn advance(&mut self, paused: bool) -> Tick {
        let tick = self.next_tick(paused);
        if !paused {
            self.number = self.number.wrapping_add(1);
        }
        tick
    }
}

// -------------------------------------------------------------------------------------------------
