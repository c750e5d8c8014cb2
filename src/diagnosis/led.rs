use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use opcua::sync::Mutex;
use rppal::gpio::{Gpio, OutputPin};
use tokio::runtime::Handle;

use super::LedCommand;

/// Binary output the diagnosis LED is wired to.
pub trait LedPin: Send {
    fn set(&mut self, on: bool) -> anyhow::Result<()>;
}

pub struct GpioLed {
    pin: OutputPin,
}

impl GpioLed {
    /// Claims `gpio_pin` (BCM numbering) as an output, initially low.
    pub fn open(gpio_pin: u8) -> anyhow::Result<Self> {
        let gpio = Gpio::new().context("Failed to access GPIO")?;
        let mut pin = gpio
            .get(gpio_pin)
            .with_context(|| format!("Failed to claim GPIO {gpio_pin} for the diagnosis LED"))?
            .into_output_low();
        // Restore the pin when the server exits.
        pin.set_reset_on_drop(true);
        Ok(Self { pin })
    }
}

impl LedPin for GpioLed {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

/// Stand-in used when no GPIO is available; only logs.
#[derive(Default)]
pub struct LoggingLed;

impl LedPin for LoggingLed {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        tracing::info!(on, "Diagnosis LED (simulated)");
        Ok(())
    }
}

/// Pin plus the number of commands applied to it. Both change under one lock
/// so a hold timer cannot act on a pin a newer command already drove.
struct LedState {
    pin: Box<dyn LedPin>,
    generation: u64,
}

pub struct DiagnosisLed {
    state: Mutex<LedState>,
    lit: AtomicBool,
    receiver: String,
    hold: Option<(Duration, Handle)>,
}

impl DiagnosisLed {
    pub fn new(pin: Box<dyn LedPin>, receiver: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(LedState { pin, generation: 0 }),
            lit: AtomicBool::new(false),
            receiver: receiver.into(),
            hold: None,
        }
    }

    /// Turn the LED off again `hold` after every ON command. The timer runs on
    /// `runtime`, since method callbacks execute on the server's own threads.
    pub fn with_hold(mut self, hold: Duration, runtime: Handle) -> Self {
        self.hold = Some((hold, runtime));
        self
    }

    /// Receiver name `dropMessage` callers must address.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn is_on(&self) -> bool {
        self.lit.load(Ordering::Acquire)
    }

    pub fn switch(self: &Arc<Self>, command: LedCommand) -> anyhow::Result<()> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.pin.set(command.is_on())?;
            self.lit.store(command.is_on(), Ordering::Release);
            state.generation
        };
        tracing::info!(?command, "Diagnosis LED switched");

        if let (LedCommand::On, Some((hold, runtime))) = (command, &self.hold) {
            let led = Arc::clone(self);
            let hold = *hold;
            runtime.spawn(async move {
                tokio::time::sleep(hold).await;
                match led.release(generation) {
                    Ok(true) => tracing::info!("Diagnosis LED hold expired"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Failed to switch diagnosis LED off: {:#}", e),
                }
            });
        }
        Ok(())
    }

    /// Switches the LED off if no command followed the one numbered
    /// `generation`. Returns false when a later command owns the LED.
    fn release(&self, generation: u64) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return Ok(false);
        }
        state.pin.set(false)?;
        self.lit.store(false, Ordering::Release);
        Ok(true)
    }
}
