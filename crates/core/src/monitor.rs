//! Background power-reserve watch.
//!
//! Polls the actuation endpoint's status on a fixed period, independent of
//! the single-flight gate, and emits one low-battery warning per discharge
//! cycle.

use crate::body::{BodyApi, PowerReading};
use crate::directive::Directive;
use crate::mood::{Light, LightMode, Mood};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const LOW_BATTERY_SPEECH: &str = "Warning! My battery is almost empty! Please charge me!";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSettings {
    pub interval: Duration,
    /// Warn when the reading drops below this.
    pub low_volts: f64,
    /// Re-arm the warning once the reading is at or above this.
    pub recover_volts: f64,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            low_volts: 6.8,
            recover_volts: 7.0,
        }
    }
}

/// Hysteresis between the low and recover thresholds.
#[derive(Debug, Clone)]
pub struct BatteryWatch {
    low_volts: f64,
    recover_volts: f64,
    warned: bool,
}

impl BatteryWatch {
    pub fn new(low_volts: f64, recover_volts: f64) -> Self {
        Self {
            low_volts,
            recover_volts,
            warned: false,
        }
    }

    pub fn warned(&self) -> bool {
        self.warned
    }

    /// Returns `true` when this reading should trigger a warning.
    ///
    /// Non-positive readings are treated as "sensor not available".
    pub fn observe(&mut self, volts: f64) -> bool {
        if volts <= 0.0 {
            return false;
        }
        if volts < self.low_volts && !self.warned {
            self.warned = true;
            return true;
        }
        if volts >= self.recover_volts {
            self.warned = false;
        }
        false
    }
}

pub fn low_battery_directive() -> Directive {
    Directive::new(
        Vec::new(),
        LOW_BATTERY_SPEECH,
        Mood::Alert,
        Some(Light::new(255, 0, 0, LightMode::Boom, 2.5)),
    )
}

/// Runs one poll: reads status and sends the warning if needed.
pub async fn check_power(body: &dyn BodyApi, battery: &mut BatteryWatch) {
    let status = match body.status().await {
        Ok(status) => status,
        Err(e) => {
            debug!(error = %e, "Power check skipped");
            return;
        }
    };
    let Some(reading) = PowerReading::from_status(&status) else {
        return;
    };
    if battery.observe(reading.battery_volts) {
        warn!(volts = reading.battery_volts, "Battery low");
        if let Err(e) = body.combo(low_battery_directive()).await {
            warn!(error = %e, "Failed to deliver low-battery warning");
        }
    }
}

/// Handle to the running power-check worker.
pub struct PowerMonitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PowerMonitor {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(body: Arc<dyn BodyApi>, settings: PowerSettings) -> Self {
        let (shutdown, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut battery = BatteryWatch::new(settings.low_volts, settings.recover_volts);
            let mut ticker = tokio::time::interval(settings.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval = ?settings.interval, "Power monitor started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => check_power(body.as_ref(), &mut battery).await,
                    _ = stop_rx.changed() => break,
                }
            }
            info!("Power monitor stopped");
        });
        Self { shutdown, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Power monitor task ended abnormally");
        }
    }
}
