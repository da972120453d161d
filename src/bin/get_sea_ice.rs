//! Sea ice downloader.
//!
//! Retrieves the daily sea ice analysis for each requested cycle.

use gefs_init_data::{logging, main_for, Dataset};

fn main() {
    logging::init();

    ::std::process::exit(main_for(Dataset::SeaIce));
}
