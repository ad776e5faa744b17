pub mod controller;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod rates;
pub mod router;

use argh::FromArgs;

#[derive(Debug, FromArgs, Clone)]
/// Acquire start/stop timing from a time-to-digital converter, here fed
/// by the built-in simulated tagger
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// path to a JSON acquisition config
    #[argh(option, short = 'c')]
    pub config: Option<String>,
    /// how long to acquire, in whole seconds
    #[argh(option, short = 't', default = "5")]
    pub seconds: u64,
    /// seed for the simulated tagger
    #[argh(option, default = "42")]
    pub seed: u64,
    /// simulated start events per second
    #[argh(option, default = "1000.0")]
    pub sim_rate: f64,
}
