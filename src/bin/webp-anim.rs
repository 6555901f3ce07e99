use std::error::Error;

use tracing_subscriber::EnvFilter;
use webpanim::{args, help};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn Error>> {
    help::maybe_print_help_and_exit("webp-anim");
    let arguments: Vec<_> = std::env::args_os().collect();
    let plan = args::parse_args(arguments)?;
    plan.execute()?;
    Ok(())
}
