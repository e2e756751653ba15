//! # Frame Loop
//!
//! Drives [`Dispatcher::update`] at a fixed rate on the current task until a
//! shutdown future completes.
//!
//! Ticks that are missed (a slow frame, a suspended process) are skipped
//! rather than replayed in a burst.

use std::future::Future;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::config::DispatcherConfig;
use crate::dispatch::{Dispatcher, FrameStats};

/// Totals of one frame loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub totals: FrameStats,
}

/// Returns the frame period for a rate in Hz. A rate of 0 is treated as 1.
#[must_use]
pub fn frame_period(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Runs frames until `shutdown` completes.
///
/// # Examples
///
/// ```
/// use input_router::config::DispatcherConfig;
/// use input_router::dispatch::Dispatcher;
/// use input_router::runner::run_frames;
/// use tokio::time::{sleep, Duration};
///
/// # tokio_test::block_on(async {
/// let mut dispatcher = Dispatcher::new();
/// let summary = run_frames(
///     &mut dispatcher,
///     &DispatcherConfig::default(),
///     sleep(Duration::from_millis(50)),
/// )
/// .await;
/// assert!(summary.frames >= 1);
/// # });
/// ```
pub async fn run_frames<F>(
    dispatcher: &mut Dispatcher,
    config: &DispatcherConfig,
    shutdown: F,
) -> RunSummary
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(frame_period(config.frame_rate_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let stats_interval = config.stats_interval_frames.max(1);
    let mut summary = RunSummary::default();
    let mut window = FrameStats::default();

    info!("Frame loop running at {}Hz", config.frame_rate_hz);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = dispatcher.update();
                summary.frames += 1;
                summary.totals.merge(stats);
                window.merge(stats);

                if summary.frames % stats_interval == 0 {
                    info!(
                        "Frame {}: {} dirty, {} informed, {} propagated in last {} frames",
                        summary.frames,
                        window.dirty,
                        window.informed,
                        window.propagated,
                        stats_interval
                    );
                    window = FrameStats::default();
                }
            }

            _ = &mut shutdown => {
                info!("Frame loop stopped after {} frames", summary.frames);
                break;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::controller::ControllerType;
    use tokio::time::sleep;

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(60), Duration::from_micros(16_666));
        assert_eq!(frame_period(1000), Duration::from_millis(1));
        assert_eq!(frame_period(1), Duration::from_secs(1));
        assert_eq!(frame_period(0), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_immediate_shutdown() {
        let mut dispatcher = Dispatcher::new();
        let config = DispatcherConfig {
            frame_rate_hz: 1,
            stats_interval_frames: 1,
        };
        // The first tick completes immediately, so at most one frame runs
        let summary = run_frames(&mut dispatcher, &config, async {}).await;
        assert!(summary.frames <= 1);
    }

    #[tokio::test]
    async fn test_frames_drain_producer_updates() {
        let mut dispatcher = Dispatcher::new();
        let mut pad = dispatcher.controller_builder("Pad", "", ControllerType::Device);
        let fire = pad.add_button("Fire", "", None).unwrap();
        dispatcher.add_controller(pad).unwrap();
        let mut game = dispatcher.controller_builder("Game", "", ControllerType::Virtual);
        let shoot = game.add_button("Shoot", "", None).unwrap();
        let game = dispatcher.add_controller(game).unwrap();
        dispatcher.connect(game, "Shoot", fire.control(), 1.0).unwrap();

        let producer = std::thread::spawn(move || fire.set_pressed(true));
        producer.join().unwrap();

        let config = DispatcherConfig {
            frame_rate_hz: 1000,
            stats_interval_frames: 5,
        };
        let summary = run_frames(&mut dispatcher, &config, sleep(Duration::from_millis(30))).await;

        assert!(summary.frames >= 1);
        assert_eq!(summary.totals.dirty, 1);
        assert_eq!(summary.totals.propagated, 1);
        assert!(shoot.is_pressed());
    }
}
