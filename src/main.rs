use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod cli;

fn main() {
    let args = args::Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let config_path = match args.config {
        Some(p) => p,
        None => {
            eprintln!("No election data provided. Use --config, or --help for usage.");
            std::process::exit(2);
        }
    };

    let res = cli::run_evaluation(config_path, args.out, args.reference);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
