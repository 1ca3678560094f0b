/// Readings strictly above this raise an alert
pub const ALERT_THRESHOLD: u16 = 700;
/// Time between samples
pub const SAMPLE_INTERVAL_MS: u32 = 60_000;
/// Time between association status polls
pub const ASSOCIATION_POLL_MS: u32 = 250;

/// One action run against the current sample, in list order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handler {
    /// Send the raw 2-byte sample
    Report,
    /// Send the alert text if the sample is above the threshold
    Alert,
}

const REPORT_ONLY: &[Handler] = &[Handler::Report];
const REPORT_AND_ALERT: &[Handler] = &[Handler::Report, Handler::Alert];

/// How the loop calls its handlers.
/// Both styles run the same static handler list and are indistinguishable on the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchStyle {
    Direct,
    HandlerList,
}

/// What to do while waiting for the radio to join the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssociationPolicy {
    /// Wait forever
    Unbounded,
    /// Give up with `Error::AssociationTimeout` after this many polls
    Bounded { polls: u16 },
}

/// The four program variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    Base,
    Alert,
    Host,
    HostedAlert,
}

impl Variant {
    /// Variant picked by the `alert` and `hosted` cargo features
    pub const SELECTED: Variant = match (cfg!(feature = "hosted"), cfg!(feature = "alert")) {
        (false, false) => Variant::Base,
        (false, true) => Variant::Alert,
        (true, false) => Variant::Host,
        (true, true) => Variant::HostedAlert,
    };

    pub const fn config(self) -> Config {
        match self {
            Variant::Base => Config::BASE,
            Variant::Alert => Config::ALERT,
            Variant::Host => Config::HOST,
            Variant::HostedAlert => Config::HOSTED_ALERT,
        }
    }
}

/// Config defines the compile-time behaviour of the sample loop.
/// alerting: whether readings above the threshold also send alert text
/// dispatch: how the handlers are called, see `DispatchStyle`
/// alert_threshold: raw reading that must be exceeded to alert
/// sample_interval_ms: delay after each iteration
/// association: policy for the association wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub alerting: bool,
    pub dispatch: DispatchStyle,
    pub alert_threshold: u16,
    pub sample_interval_ms: u32,
    pub association: AssociationPolicy,
}

impl Config {
    pub const BASE: Config = Config::new(false, DispatchStyle::Direct);
    pub const ALERT: Config = Config::new(true, DispatchStyle::Direct);
    pub const HOST: Config = Config::new(false, DispatchStyle::HandlerList);
    pub const HOSTED_ALERT: Config = Config::new(true, DispatchStyle::HandlerList);

    pub const fn new(alerting: bool, dispatch: DispatchStyle) -> Self {
        Config {
            alerting,
            dispatch,
            alert_threshold: ALERT_THRESHOLD,
            sample_interval_ms: SAMPLE_INTERVAL_MS,
            association: AssociationPolicy::Unbounded,
        }
    }

    pub const fn with_association(mut self, association: AssociationPolicy) -> Self {
        self.association = association;
        self
    }

    /// Handlers run once per iteration, report always first
    pub const fn handlers(&self) -> &'static [Handler] {
        if self.alerting {
            REPORT_AND_ALERT
        } else {
            REPORT_ONLY
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Variant::SELECTED.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_always_runs_first() {
        for variant in [Variant::Base, Variant::Alert, Variant::Host, Variant::HostedAlert] {
            assert_eq!(variant.config().handlers()[0], Handler::Report);
        }
    }

    #[test]
    fn alerting_variants_add_alert_handler() {
        assert_eq!(Config::BASE.handlers(), &[Handler::Report]);
        assert_eq!(Config::HOST.handlers(), &[Handler::Report]);
        assert_eq!(Config::ALERT.handlers(), &[Handler::Report, Handler::Alert]);
        assert_eq!(
            Config::HOSTED_ALERT.handlers(),
            &[Handler::Report, Handler::Alert]
        );
    }

    #[test]
    fn defaults_match_the_deployed_nodes() {
        let config = Config::default();
        assert_eq!(config.alert_threshold, 700);
        assert_eq!(config.sample_interval_ms, 60_000);
        assert_eq!(config.association, AssociationPolicy::Unbounded);
    }

    #[test]
    fn bounded_association_is_opt_in() {
        let config = Config::ALERT.with_association(AssociationPolicy::Bounded { polls: 40 });
        assert_eq!(config.association, AssociationPolicy::Bounded { polls: 40 });
        assert!(config.alerting);
    }
}
