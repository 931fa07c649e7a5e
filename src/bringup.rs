//! Power-on sequencing for the shared SPI bus and the card.
//!
//! The radio and the SD card share the bus, so before first card contact
//! the radio's chip select must sit high and the card's low, with generous
//! settle times ([`quiesce_bus`]). Card init is then attempted a bounded
//! number of times ([`init_card`]); the caller picks the failure policy —
//! [`halt`] reproduces the legacy behavior of parking the logger, or it
//! can carry on in a degraded mode. [`WriteIndicator`] is the LED pulse
//! that acknowledges a landed write.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

/// Settle time after power-on before touching any chip select.
pub const POWER_SETTLE_MS: u32 = 100;
/// Wait after deselecting the radio, before the card is addressed.
pub const RADIO_QUIESCE_MS: u32 = 1_000;
/// Wait after selecting the card, before init traffic starts.
pub const CARD_SELECT_MS: u32 = 3_000;
/// Pause between card init attempts.
pub const RETRY_PAUSE_MS: u32 = 2_000;
/// The legacy policy: one retry after the first failed attempt.
pub const DEFAULT_ATTEMPTS: u8 = 2;

/// Blinks per write acknowledgement.
pub const PULSE_COUNT: u8 = 5;
/// LED on time and off time per blink.
pub const PULSE_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupError {
    /// A chip-select line refused to drive.
    ChipSelect,
    /// The card answered none of the init attempts.
    CardUnresponsive,
}

/// Quiet the bus for card init: settle, radio CS high, card CS low, with
/// the fixed waits between steps.
///
/// The pins are only borrowed; afterwards the caller hands the card CS to
/// its SPI device.
pub fn quiesce_bus<R, C, D>(
    radio_cs: &mut R,
    card_cs: &mut C,
    delay: &mut D,
) -> Result<(), BringupError>
where
    R: OutputPin,
    C: OutputPin,
    D: DelayNs,
{
    delay.delay_ms(POWER_SETTLE_MS);
    radio_cs.set_high().map_err(|_| BringupError::ChipSelect)?;
    delay.delay_ms(RADIO_QUIESCE_MS);
    card_cs.set_low().map_err(|_| BringupError::ChipSelect)?;
    delay.delay_ms(CARD_SELECT_MS);
    Ok(())
}

/// Run `probe` until it succeeds, up to `attempts` tries with
/// [`RETRY_PAUSE_MS`] between them. Returns the 1-based attempt that
/// succeeded. `attempts` is clamped to at least one try;
/// [`DEFAULT_ATTEMPTS`] gives the legacy retry-once behavior.
///
/// The probe is typically [`SdStorage::card_size_bytes`], which re-runs
/// the card's init sequence on every call.
///
/// [`SdStorage::card_size_bytes`]: crate::sdcard::SdStorage::card_size_bytes
pub fn init_card<D, P, T, E>(
    delay: &mut D,
    attempts: u8,
    mut probe: P,
) -> Result<u8, BringupError>
where
    D: DelayNs,
    P: FnMut() -> Result<T, E>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        if probe().is_ok() {
            return Ok(attempt);
        }
        warn!("bringup: card init failed (attempt {}/{})", attempt, attempts);
        if attempt < attempts {
            delay.delay_ms(RETRY_PAUSE_MS);
        }
    }
    Err(BringupError::CardUnresponsive)
}

/// Park the core forever. The legacy response to an unresponsive card at
/// boot: a logger that writes nothing further is the failure signal.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// The write-acknowledge LED: five slow blinks after a line lands on the
/// card. Driven by the control loop, not the storage layer, so a dead LED
/// can never fail a write.
pub struct WriteIndicator<LED, D>
where
    LED: OutputPin,
    D: DelayNs,
{
    led: LED,
    delay: D,
}

impl<LED, D> WriteIndicator<LED, D>
where
    LED: OutputPin,
    D: DelayNs,
{
    pub fn new(led: LED, delay: D) -> Self {
        Self { led, delay }
    }

    /// Blink [`PULSE_COUNT`] times, [`PULSE_MS`] on and off each.
    /// Pin errors are ignored; the pulse is best-effort.
    pub fn pulse(&mut self) {
        for _ in 0..PULSE_COUNT {
            let _ = self.led.set_high();
            self.delay.delay_ms(PULSE_MS);
            let _ = self.led.set_low();
            self.delay.delay_ms(PULSE_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        RadioHigh,
        RadioLow,
        CardHigh,
        CardLow,
        LedHigh,
        LedLow,
        Wait(u32),
    }

    type SharedLog = Rc<RefCell<Vec<Event>>>;

    // records every transition into the shared log
    struct LogPin {
        log: SharedLog,
        high: Event,
        low: Event,
    }

    impl LogPin {
        fn new(log: &SharedLog, high: Event, low: Event) -> Self {
            Self {
                log: log.clone(),
                high,
                low,
            }
        }
    }

    impl embedded_hal::digital::ErrorType for LogPin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for LogPin {
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(self.high);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(self.low);
            Ok(())
        }
    }

    // records ms-level waits; production code never goes below delay_ms
    struct LogDelay(SharedLog);

    impl DelayNs for LogDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Event::Wait(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Event::Wait(ms));
        }
    }

    #[derive(Debug)]
    struct PinStuck;

    impl embedded_hal::digital::Error for PinStuck {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }

    // a pin whose driver always refuses
    struct StuckPin;

    impl embedded_hal::digital::ErrorType for StuckPin {
        type Error = PinStuck;
    }

    impl OutputPin for StuckPin {
        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(PinStuck)
        }

        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(PinStuck)
        }
    }

    #[test]
    fn quiesce_deselects_radio_before_selecting_card() {
        let log = SharedLog::default();
        let mut radio = LogPin::new(&log, Event::RadioHigh, Event::RadioLow);
        let mut card = LogPin::new(&log, Event::CardHigh, Event::CardLow);
        let mut delay = LogDelay(log.clone());

        quiesce_bus(&mut radio, &mut card, &mut delay).unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::Wait(POWER_SETTLE_MS),
                Event::RadioHigh,
                Event::Wait(RADIO_QUIESCE_MS),
                Event::CardLow,
                Event::Wait(CARD_SELECT_MS),
            ]
        );
    }

    #[test]
    fn quiesce_reports_a_stuck_chip_select() {
        let log = SharedLog::default();
        let mut card = LogPin::new(&log, Event::CardHigh, Event::CardLow);
        let mut delay = LogDelay(log.clone());

        let result = quiesce_bus(&mut StuckPin, &mut card, &mut delay);

        assert_eq!(result, Err(BringupError::ChipSelect));
        // the card line must not move once the sequence has failed
        assert_eq!(log.borrow().as_slice(), &[Event::Wait(POWER_SETTLE_MS)]);
    }

    #[test]
    fn init_reports_first_attempt_without_pausing() {
        let log = SharedLog::default();
        let mut delay = LogDelay(log.clone());

        let result = init_card(&mut delay, DEFAULT_ATTEMPTS, || Ok::<_, ()>(()));

        assert_eq!(result, Ok(1));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn init_pauses_once_then_reports_second_attempt() {
        let log = SharedLog::default();
        let mut delay = LogDelay(log.clone());
        let mut tries = 0u8;

        let result = init_card(&mut delay, DEFAULT_ATTEMPTS, || {
            tries += 1;
            if tries < 2 { Err("not ready") } else { Ok(()) }
        });

        assert_eq!(result, Ok(2));
        assert_eq!(tries, 2);
        assert_eq!(log.borrow().as_slice(), &[Event::Wait(RETRY_PAUSE_MS)]);
    }

    #[test]
    fn init_gives_up_after_the_configured_attempts() {
        let log = SharedLog::default();
        let mut delay = LogDelay(log.clone());
        let mut tries = 0u8;

        let result = init_card(&mut delay, DEFAULT_ATTEMPTS, || {
            tries += 1;
            Err::<(), _>("no card")
        });

        assert_eq!(result, Err(BringupError::CardUnresponsive));
        assert_eq!(tries, 2);
        // one pause between the two attempts, none after the last
        assert_eq!(log.borrow().as_slice(), &[Event::Wait(RETRY_PAUSE_MS)]);
    }

    #[test]
    fn init_clamps_zero_attempts_to_one_try() {
        let log = SharedLog::default();
        let mut delay = LogDelay(log.clone());
        let mut tries = 0u8;

        let result = init_card(&mut delay, 0, || {
            tries += 1;
            Err::<(), _>("no card")
        });

        assert_eq!(result, Err(BringupError::CardUnresponsive));
        assert_eq!(tries, 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn indicator_blinks_five_full_cycles() {
        let log = SharedLog::default();
        let led = LogPin::new(&log, Event::LedHigh, Event::LedLow);
        let mut indicator = WriteIndicator::new(led, LogDelay(log.clone()));

        indicator.pulse();

        let events = log.borrow();
        assert_eq!(events.len(), 4 * PULSE_COUNT as usize);
        for cycle in events.chunks(4) {
            assert_eq!(
                cycle,
                &[
                    Event::LedHigh,
                    Event::Wait(PULSE_MS),
                    Event::LedLow,
                    Event::Wait(PULSE_MS),
                ]
            );
        }
    }
}
