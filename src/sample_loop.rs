use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::alert::AlertEvaluator;
use crate::config::{AssociationPolicy, Config, Handler, ASSOCIATION_POLL_MS};
use crate::error::Error;
use crate::logging::{debug, error, info, warn};
use crate::radio::{FrameSender, RadioLink};
use crate::sensors::{AnalogInput, LightSensor, Sample};
use crate::timer::CountDownTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Init,
    Associating,
    /// Terminal; the loop never leaves it
    Running,
}

/// Samples the light sensor and reports to the coordinator, forever.
pub struct SampleLoop<R, A, D> {
    config: Config,
    radio: FrameSender<R>,
    sensor: LightSensor<A>,
    evaluator: AlertEvaluator,
    delay: D,
    state: State,
}

impl<R, A, D> SampleLoop<R, A, D>
where
    R: RadioLink,
    A: AnalogInput,
    D: DelayNs,
{
    /// param config: program variant and timing
    /// param link: the radio, not yet initialised
    /// param input: analog channel wired to the light sensor
    /// param delay: blocking delay for polls and the sample interval
    pub fn new(config: Config, link: R, input: A, delay: D) -> Self {
        Self {
            config,
            radio: FrameSender::new(link),
            sensor: LightSensor::new(input),
            evaluator: AlertEvaluator::new(config.alert_threshold),
            delay,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn radio(&self) -> &R {
        self.radio.link()
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn release(self) -> (R, A, D) {
        (self.radio.release(), self.sensor.release(), self.delay)
    }

    /// Init, wait for association, then run iterations forever.
    /// Init and send failures are logged and ignored.
    /// returns only if a bounded association wait runs out
    pub fn run(&mut self) -> Result<Infallible, Error> {
        if let Err(e) = self.init() {
            error!("{}", e);
        }
        self.associate()?;

        loop {
            self.step();
        }
    }

    /// Brings up the radio link
    pub fn init(&mut self) -> Result<(), Error> {
        self.state = State::Init;
        info!(
            "light sensor node starting, alerting: {}, dispatch: {:?}, threshold: {}",
            self.config.alerting,
            self.config.dispatch,
            self.config.alert_threshold
        );
        self.radio.init()
    }

    /// Polls the radio until it has joined the network
    pub fn associate(&mut self) -> Result<(), Error> {
        self.state = State::Associating;
        let mut budget = match self.config.association {
            AssociationPolicy::Unbounded => None,
            AssociationPolicy::Bounded { polls } => Some((polls, CountDownTimer::new(polls))),
        };

        loop {
            if let Some((polls, timer)) = budget.as_ref() {
                if timer.is_finished() {
                    warn!("gave up on association after {} polls", *polls);
                    return Err(Error::AssociationTimeout(*polls));
                }
            }

            match self.radio.is_associated() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => debug!("association poll failed: {}", e),
            }

            if let Some((_, timer)) = budget.as_mut() {
                timer.tick();
            }
            self.delay.delay_ms(ASSOCIATION_POLL_MS);
        }

        info!("associated with coordinator");
        self.state = State::Running;
        Ok(())
    }

    /// One iteration followed by the sample interval delay
    pub fn step(&mut self) {
        match self.tick() {
            Ok(sample) => debug!("reported {}", sample.raw()),
            Err(e) => warn!("iteration incomplete: {}", e),
        }
        self.delay.delay_ms(self.config.sample_interval_ms);
    }

    /// Takes a sample and runs every handler against it, in order.
    /// A failing handler does not stop the ones after it.
    /// returns the sample, or the first error of the iteration
    pub fn tick(&mut self) -> Result<Sample, Error> {
        let sample = self.sensor.sample()?;

        let mut failure = None;
        for &handler in self.config.handlers() {
            if let Err(e) = self.handle(handler, sample) {
                warn!("{:?} failed: {}", handler, e);
                failure.get_or_insert(e);
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(sample),
        }
    }

    fn handle(&mut self, handler: Handler, sample: Sample) -> Result<(), Error> {
        match handler {
            Handler::Report => self.radio.send_sample(sample),
            Handler::Alert => match self.evaluator.evaluate(sample) {
                Some(message) => {
                    info!("light {} above threshold", sample.raw());
                    self.radio.send_str(&message)
                }
                None => Ok(()),
            },
        }
    }
}
