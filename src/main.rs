mod cli;
mod commands;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    ut_create::log::init(cli.verbose);

    if let Err(err) = commands::create::run(cli) {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
