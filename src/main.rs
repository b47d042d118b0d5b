// RoboDog - Firmware Entry Point
//
// On the board:
//   1. Bring up logging and take the peripherals.
//   2. Configure one 50 Hz LEDC timer and a channel per leg servo.
//   3. Initialise the gait controller (servos move to their power-up pose).
//   4. Park the main thread; actions arrive through `ActionHandle`s.
//
// On a host build the same controller runs against simulated PWM channels.
// Action names on the command line are queued in order; without arguments the
// bring-up demo sequence is played.

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    device::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

// ---------------------------------------------------------------------------
// Board bring-up
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
mod device {
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::prelude::*;

    use robodog::config::*;
    use robodog::drivers::ledc::LedcPwm;
    use robodog::{GaitConfig, GaitController, ServoBank};

    pub fn run() -> anyhow::Result<()> {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("RoboDog firmware starting");

        let peripherals = Peripherals::take()?;
        let ledc = peripherals.ledc;
        let pins = peripherals.pins;

        // ---- Servo PWM ------------------------------------------------------
        let timer = LedcTimerDriver::new(
            ledc.timer0,
            &TimerConfig::default()
                .frequency(SERVO_PWM_FREQUENCY_HZ.Hz())
                .resolution(Resolution::Bits14),
        )?;
        // The timer drives every servo channel for the whole run time.
        let timer = &*Box::leak(Box::new(timer));

        let pwms = [
            LedcPwm::new(LedcDriver::new(ledc.channel0, timer, pins.gpio2)?),
            LedcPwm::new(LedcDriver::new(ledc.channel1, timer, pins.gpio3)?),
            LedcPwm::new(LedcDriver::new(ledc.channel2, timer, pins.gpio4)?),
            LedcPwm::new(LedcDriver::new(ledc.channel3, timer, pins.gpio5)?),
        ];
        log::info!(
            "Servo PWM on GPIO {}/{}/{}/{} at {} Hz",
            PIN_SERVO_FRONT_LEFT,
            PIN_SERVO_REAR_RIGHT,
            PIN_SERVO_FRONT_RIGHT,
            PIN_SERVO_REAR_LEFT,
            SERVO_PWM_FREQUENCY_HZ
        );

        // ---- Gait controller ------------------------------------------------
        let config = GaitConfig::default();
        let bank = ServoBank::from_config(pwms, &config);
        let mut controller = GaitController::new(bank, FreeRtos, config);
        controller.init()?;
        log::info!("Boot complete, waiting for actions");

        // All work happens in the action task; `controller` must stay alive.
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
mod host {
    use std::str::FromStr;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::thread;

    use anyhow::{anyhow, Context};
    use log::{LevelFilter, Log, Metadata, Record};

    use robodog::sim::{sim_channels, PwmLog, StdDelay};
    use robodog::tasks::demo::{self, DemoStep, DEMO_SEQUENCE};
    use robodog::{Action, GaitConfig, GaitController, Leg, MotionEvent, ServoBank};

    struct StderrLogger;

    impl Log for StderrLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                let thread = thread::current();
                eprintln!(
                    "{:<5} [{}] {}",
                    record.level(),
                    thread.name().unwrap_or("?"),
                    record.args()
                );
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: StderrLogger = StderrLogger;

    fn init_logging() {
        let level = std::env::var("ROBODOG_LOG")
            .ok()
            .and_then(|s| LevelFilter::from_str(&s).ok())
            .unwrap_or(LevelFilter::Info);
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }

    pub fn run() -> anyhow::Result<()> {
        init_logging();
        log::info!("RoboDog host simulation starting");

        let actions = std::env::args()
            .skip(1)
            .map(|arg| Action::from_str(&arg).map_err(|e| anyhow!("{arg}: {e}")))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let pwm_log = PwmLog::default();
        let config = GaitConfig::default();
        let bank = ServoBank::from_config(sim_channels(&pwm_log), &config);
        let (tx, rx) = mpsc::channel();
        let mut controller = GaitController::new(bank, StdDelay, config).with_events(tx);
        controller.init().context("gait controller init")?;

        let queued = if !actions.is_empty() {
            for &action in &actions {
                controller.set(action)?;
            }
            actions.len()
        } else if cfg!(feature = "action-demo") {
            // `init` already started the demo thread.
            DEMO_SEQUENCE.iter().filter(|s| matches!(s, DemoStep::Queue(_))).count()
        } else {
            demo::run_sequence(&controller.handle(), DEMO_SEQUENCE, &AtomicBool::new(false), thread::sleep)
        };

        let mut finished = 0;
        while finished < queued {
            match rx.recv().context("action task went away")? {
                MotionEvent::Started(_) => {}
                MotionEvent::Completed(_) | MotionEvent::Cancelled(_) => finished += 1,
                MotionEvent::Aborted { action, reason } => {
                    log::warn!("{} aborted: {}", action, reason);
                    finished += 1;
                }
            }
        }

        controller.stop()?;
        let duties = controller.duties().unwrap_or_default();
        for leg in Leg::ALL {
            log::info!("{:>11}: duty {}", leg, duties[leg.index()]);
        }
        log::info!("{} actions, {} PWM writes", queued, pwm_log.duty_writes().len());
        Ok(())
    }
}
