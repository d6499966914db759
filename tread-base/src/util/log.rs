//! Logging helpers shared by programs embedding the engine.

/// Targets whose [`log::Level::Trace`] messages are logged from inside the collision
/// loops, potentially several times per body per sub-step.
const INNER_LOOP_TARGETS: &[&str] = &["tread::physics::resolve", "tread::physics::sweep"];

/// Provides the recommended log filter for programs which want to exclude particularly noisy
/// details of the engine.
///
/// The guiding principle for this filtering is that at [`log::Level::Debug`] or lower level,
/// there should be no messages produced every tick unless something is wrong, and at
/// [`log::Level::Trace`] there should be about one message per object per tick.
/// Trace messages from the contact resolution and sweep loops are therefore excluded.
#[allow(clippy::missing_inline_in_public_items)]
pub fn standard_filter(metadata: &log::Metadata<'_>) -> bool {
    let target = metadata.target();

    !(metadata.level() == log::Level::Trace
        && INNER_LOOP_TARGETS
            .iter()
            .any(|prefix| target.starts_with(prefix)))
}
