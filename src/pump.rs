use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    central::Central,
    channels::Channel,
    link::LinkHandle,
    types::{ControlInputs, MotionSample},
};

/// Latest-value cell for control inputs
///
/// The input layer writes into the cell at whatever rate it samples
/// (typically much faster than the send cadence); the pump reads one
/// [`ControlInputs`] snapshot per tick. There is no queue: samples written
/// between ticks are overwritten by design, and a reader never observes a
/// half-updated set of inputs.
#[derive(Clone)]
pub struct InputCell {
    tx: std::sync::Arc<watch::Sender<ControlInputs>>,
}

impl InputCell {
    /// Create a cell holding the default (neutral) inputs
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ControlInputs::default());
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Overwrite the movement joystick sample
    pub fn set_movement(&self, sample: MotionSample) {
        self.tx.send_modify(|inputs| inputs.movement = sample);
    }

    /// Overwrite the rotation joystick sample
    pub fn set_rotation(&self, sample: MotionSample) {
        self.tx.send_modify(|inputs| inputs.rotation = sample);
    }

    /// Overwrite the full button vector
    pub fn set_buttons(&self, buttons: [bool; crate::BUTTON_COUNT]) {
        self.tx.send_modify(|inputs| inputs.buttons = buttons);
    }

    /// Toggle a single button, ignoring out-of-range indices
    pub fn toggle_button(&self, index: usize) {
        if index < crate::BUTTON_COUNT {
            self.tx
                .send_modify(|inputs| inputs.buttons[index] = !inputs.buttons[index]);
        }
    }

    /// Take an atomic snapshot of the current inputs
    #[must_use]
    pub fn snapshot(&self) -> ControlInputs {
        *self.tx.borrow()
    }
}

impl Default for InputCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-cadence send timer
///
/// Each tick reads the latest [`InputCell`] snapshot, encodes it, and fires
/// all three channels through the link, best-effort. Owned by whichever
/// control surface is active: [`stop`](Self::stop) (or dropping the pump)
/// deterministically ends the task, so no dangling timer keeps writing after
/// its owner is gone.
pub struct CommandPump {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl CommandPump {
    /// Start pumping the cell's inputs through the link at `period`
    pub fn start<C: Central>(link: LinkHandle<C>, inputs: InputCell, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // A stalled send must not cause a burst of catch-up ticks;
            // most-recent-wins means missed ticks are simply gone.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Command pump started at {}ms cadence", period.as_millis());
            loop {
                tokio::select! {
                    // Err means the pump was dropped without stop(); both end
                    // the task.
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let snapshot = inputs.snapshot();
                        link.send_motion(Channel::Movement, snapshot.movement).await;
                        link.send_motion(Channel::Rotation, snapshot.rotation).await;
                        link.send_buttons(&snapshot.buttons).await;
                    }
                }
            }
            info!("Command pump stopped");
        });

        Self {
            handle,
            shutdown_tx,
        }
    }

    /// Stop the pump and wait for its task to finish
    ///
    /// After this returns, no further writes will be issued by this pump.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            debug!("Command pump task ended abnormally: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_snapshot_is_latest_value() {
        let cell = InputCell::new();

        cell.set_movement(MotionSample::new(10.0, 5.0));
        cell.set_movement(MotionSample::new(20.0, 6.0));
        cell.set_movement(MotionSample::new(30.0, 7.0));

        // Intermediate samples are gone; only the latest survives.
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.movement, MotionSample::new(30.0, 7.0));
    }

    #[test]
    fn test_cell_updates_are_independent() {
        let cell = InputCell::new();

        cell.set_rotation(MotionSample::new(180.0, 25.0));
        cell.set_buttons([true, false, false]);

        let snapshot = cell.snapshot();
        assert_eq!(snapshot.movement, MotionSample::neutral());
        assert_eq!(snapshot.rotation, MotionSample::new(180.0, 25.0));
        assert_eq!(snapshot.buttons, [true, false, false]);
    }

    #[test]
    fn test_toggle_button() {
        let cell = InputCell::new();
        assert_eq!(cell.snapshot().buttons, [false, true, true]);

        cell.toggle_button(0);
        cell.toggle_button(2);
        assert_eq!(cell.snapshot().buttons, [true, true, false]);

        // Out of range is a no-op, not a panic.
        cell.toggle_button(99);
        assert_eq!(cell.snapshot().buttons, [true, true, false]);
    }

    #[test]
    fn test_cloned_cells_share_state() {
        let cell = InputCell::new();
        let writer = cell.clone();

        writer.set_movement(MotionSample::new(45.0, 12.5));
        assert_eq!(cell.snapshot().movement, MotionSample::new(45.0, 12.5));
    }
}
