use std::ffi::OsStr;

use strum::VariantArray;

use crate::args::Arg;

pub fn maybe_print_help_and_exit(bin_name: &str) {
    match std::env::args_os().nth(1) {
        None => print_help_and_exit(bin_name),
        Some(arg) => {
            if arg.as_os_str() == OsStr::new("--help") || arg.as_os_str() == OsStr::new("-help") {
                print_help_and_exit(bin_name)
            }
        }
    }
}

fn print_help_and_exit(bin_name: &str) -> ! {
    print_help(bin_name);
    std::process::exit(0);
}

fn print_help(bin_name: &str) {
    println!("Version: {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!("Usage: {bin_name} [options ...] frame [options ...] frame ... output.webp");
    println!("Use - as the output to write to standard output.");
    println!();
    println!("Options:");
    for arg in Arg::VARIANTS {
        let name: &'static str = arg.into();
        let value = if arg.needs_value() { " <value>" } else { "" };
        let usage = format!("-{name}{value}");
        println!("  {usage:19} {}", arg.help_text());
    }
}
