//! Hardware button handling.
//!
//! Four active-low inputs, each bound one-to-one to an orientation:
//! A → 0°, B → 90°, C → 180°, D → 270°. A qualifying falling edge enqueues
//! an orientation-change command for the engine; no long-press or chord
//! encodings exist. Edges within the debounce window of the prior accepted
//! edge on the same input are ignored.
//!
//! Each line gets its own listener thread blocking on kernel edge events.
//! GPIO failures are logged and never crash a listener; a host without the
//! GPIO chip (any non-Pi machine) simply runs without buttons.

use std::time::{Duration, Instant};

use linux_embedded_hal::gpio_cdev::{Chip, EventRequestFlags, LineRequestFlags};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ButtonConfig;
use crate::engine::FrameCommand;
use crate::state::Orientation;

/// Edges on the same input within this window of the last accepted edge
/// are switch bounce, not presses.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Orientation bound to each button, in pin order (A, B, C, D).
const BINDINGS: [Orientation; 4] = [
    Orientation::Deg0,
    Orientation::Deg90,
    Orientation::Deg180,
    Orientation::Deg270,
];

/// Suppresses spurious repeated edges from one physical input.
///
/// The window is measured from the previously *accepted* edge, so a long
/// bounce train collapses into one press.
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Whether an edge observed at `now` counts as a press.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }
}

/// Start the button listeners. All failure modes are logged and absorbed:
/// the rest of the daemon keeps running without buttons.
pub fn spawn(config: &ButtonConfig, tx: mpsc::Sender<FrameCommand>) {
    if !config.enabled {
        info!("Buttons disabled by configuration");
        return;
    }

    let mut chip = match Chip::new(&config.gpio_chip) {
        Ok(chip) => chip,
        Err(e) => {
            warn!(
                chip = %config.gpio_chip,
                error = %e,
                "No GPIO chip available, running without buttons"
            );
            return;
        }
    };

    for (index, (&pin, &orientation)) in config.pins.iter().zip(BINDINGS.iter()).enumerate() {
        let label = ['A', 'B', 'C', 'D'][index];
        let events = chip.get_line(pin).and_then(|line| {
            line.events(
                LineRequestFlags::INPUT,
                EventRequestFlags::FALLING_EDGE,
                "inky-frame-button",
            )
        });
        let events = match events {
            Ok(events) => events,
            Err(e) => {
                error!(button = %label, pin, error = %e, "Could not watch button line");
                continue;
            }
        };

        let tx = tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("button-{label}"))
            .spawn(move || {
                let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
                for event in events {
                    if let Err(e) = event {
                        // Stay armed for the next edge.
                        error!(button = %label, error = %e, "Button event read failed");
                        continue;
                    }
                    if !debouncer.accept(Instant::now()) {
                        debug!(button = %label, "Edge ignored (debounce)");
                        continue;
                    }
                    info!(button = %label, %orientation, "Button pressed");
                    if tx
                        .blocking_send(FrameCommand::SetOrientation(orientation))
                        .is_err()
                    {
                        warn!(button = %label, "Engine gone, stopping button listener");
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            error!(button = %label, error = %e, "Could not start button listener thread");
        }
    }
    info!(pins = ?config.pins, "Button listeners armed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_edges_within_window_count_once() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        let t0 = Instant::now();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(100)));
        assert!(!debouncer.accept(t0 + Duration::from_millis(249)));
    }

    #[test]
    fn test_edge_after_window_is_a_new_press() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        let t0 = Instant::now();

        assert!(debouncer.accept(t0));
        assert!(debouncer.accept(t0 + Duration::from_millis(250)));
    }

    #[test]
    fn test_window_measured_from_accepted_edge() {
        // A bounce inside the window must not extend it.
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        let t0 = Instant::now();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(200)));
        assert!(debouncer.accept(t0 + Duration::from_millis(260)));
    }

    #[test]
    fn test_inputs_debounce_independently() {
        let t0 = Instant::now();
        let mut a = Debouncer::new(DEBOUNCE_WINDOW);
        let mut b = Debouncer::new(DEBOUNCE_WINDOW);

        assert!(a.accept(t0));
        assert!(b.accept(t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_bindings_cover_all_orientations_in_order() {
        assert_eq!(
            BINDINGS.map(Orientation::degrees),
            [0, 90, 180, 270]
        );
    }
}
