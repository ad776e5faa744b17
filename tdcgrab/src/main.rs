use anyhow::Result;
use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};
use tracing::warn;

use tdcgrab::controller;
use tdcgrab::device::SimTagger;
use tdcgrab::dispatch::{HistogramUpdate, Update};
use tdcgrab::CliArgs;
use tdctools::cfg::{ChannelConfig, ChannelRole, GrabConfig};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unversioned");

fn main() -> Result<()> {
    // Parse command line arguments
    let args: CliArgs = argh::from_env();

    if args.version {
        println!(
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        );
        return Ok(())
    }

    tracing_subscriber::fmt::init();

    // Load the acquisition config
    let config: GrabConfig = match &args.config {
        Some(path) => {
            let f = File::open(path)?;
            let rdr = BufReader::new(f);
            serde_json::from_reader(rdr)?
        }
        None => demo_config(),
    };
    let tick = config.tick;

    let tagger = SimTagger::new(args.seed).start_rate(args.sim_rate);
    let (tx, rx) = flume::unbounded();
    let mut grab = controller::start(tagger, config, tx)?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut last_histograms = None;
    while let Ok(update) = rx.recv_deadline(deadline) {
        match update {
            Update::Rates(u) => {
                let line = u
                    .labels()
                    .iter()
                    .zip(&u.rates)
                    .map(|(label, rate)| format!("{}: {:.1} /s", label, rate))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("{}", line);
            }
            Update::Histograms(u) => {
                last_histograms = Some(u);
            }
            Update::RawTags(u) => {
                for (label, tags) in u.labels().iter().zip(&u.tags) {
                    println!("{}: {} tags", label, tags.len());
                }
            }
            Update::Diagnostic(d) => warn!("acquisition diagnostic: {:?}", d),
        }
    }
    grab.stop();

    if let Some(mut u) = last_histograms {
        for (label, h) in u.labels.iter().zip(u.histograms.iter_mut()) {
            println!(
                "{}: {} pairs, mean {:.1} ticks ({:.3e} s), sigma {:.1} ticks",
                label,
                h.sample_count(),
                h.mean(),
                h.mean() * tick,
                h.sigma(),
            );
        }
        if u.dropped_sessions > 0 {
            warn!("{} incomplete pairing sessions dropped", u.dropped_sessions);
        }
        write_histogram(&u)?;
    }
    Ok(())
}

/// Dump the last histogram of the set as tab-separated center/count rows
fn write_histogram(u: &HistogramUpdate) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(std::io::stdout());
    if let Some(h) = u.histograms.last() {
        for (center, count) in h.centers().iter().zip(h.bins()) {
            wtr.write_record(&[center.to_string(), count.to_string()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Start on line 0, stops on 1 and 2, background singles counted on 4
fn demo_config() -> GrabConfig {
    GrabConfig {
        description: String::from("simulated start/stop demo"),
        channels: vec![
            ChannelConfig {
                channel: 0,
                role: ChannelRole::Start,
                ..Default::default()
            },
            ChannelConfig {
                channel: 1,
                role: ChannelRole::Stop,
                ..Default::default()
            },
            ChannelConfig {
                channel: 2,
                role: ChannelRole::Stop,
                ..Default::default()
            },
            ChannelConfig {
                channel: 4,
                role: ChannelRole::Rate,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}
