//! This crate simulates the byte-error-rate-versus-SNR performance of the ATSC 8-VSB trellis
//! decoding stage over an AWGN channel. Simulation parameters are specified on the command line,
//! and simulation results are saved to a JSON file.
//!
//! Build the executable with `cargo build --release` and then run
//! `./target/release/vsb-trellis -h` for help on the command-line interface.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use anyhow::Result;
use clap::{crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use std::time::Instant;
use vsb_trellis::sim;

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    let json_filename = &json_filename_from_matches(&matches);
    sim::run_awgn_sims(&all_sim_params(&matches), json_filename)?;
    eprintln!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates the performance of the ATSC 8-VSB trellis decoder over an AWGN channel")
        .arg(num_batches())
        .arg(first_snr_db())
        .arg(snr_step_db())
        .arg(num_snr())
        .arg(json_filename())
}

/// Returns argument for number of twelve-segment batches to be transmitted.
fn num_batches() -> Arg {
    Arg::new("num_batches")
        .short('b')
        .value_parser(value_parser!(u32))
        .default_value("10")
        .help("Number of twelve-segment batches to be transmitted")
}

/// Returns argument for first SNR (dB).
fn first_snr_db() -> Arg {
    Arg::new("first_snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("15.0")
        .help("First SNR (dB)")
}

/// Returns argument for SNR step (dB).
fn snr_step_db() -> Arg {
    Arg::new("snr_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("1.0")
        .help("SNR step (dB)")
}

/// Returns argument for number of SNR values.
fn num_snr() -> Arg {
    Arg::new("num_snr")
        .short('s')
        .value_parser(value_parser!(u32))
        .default_value("4")
        .help("Number of SNR values")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters based on command-line arguments.
fn all_sim_params(matches: &ArgMatches) -> Vec<sim::SimParams> {
    all_snr_db_from_matches(matches)
        .into_iter()
        .map(|snr_db| sim::SimParams {
            num_batches: num_batches_from_matches(matches),
            snr_db,
        })
        .collect()
    // OK to unwrap in the associated functions called above: All command-line arguments have
    // default values, so an error cannot occur.
}

/// Returns number of twelve-segment batches to be transmitted.
fn num_batches_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_batches").unwrap()
}

/// Returns all SNR (dB) values.
fn all_snr_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_snr_db: f64 = *matches.get_one("first_snr_db").unwrap();
    let snr_step_db: f64 = *matches.get_one("snr_step_db").unwrap();
    let num_snr: u32 = *matches.get_one("num_snr").unwrap();
    (0 .. num_snr)
        .map(|n| first_snr_db + snr_step_db * f64::from(n))
        .collect()
}

/// Returns name of JSON file to which simulation results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}
