//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = odata_feed_cli::run() {
        eprintln!("odata-feed: {err}");
        std::process::exit(1);
    }
}
