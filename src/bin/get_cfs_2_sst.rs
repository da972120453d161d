//! CFS SST downloader.
//!
//! Retrieves CFS daily surface temperature from the day before each requested cycle.

use gefs_init_data::{logging, main_for, Dataset};

fn main() {
    logging::init();

    ::std::process::exit(main_for(Dataset::CfsSst));
}
