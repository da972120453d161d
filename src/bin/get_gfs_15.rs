//! GFS initial conditions downloader.
//!
//! Retrieves GFS and GDAS analyses plus EnKF members from the previous cycle.

use gefs_init_data::{logging, main_for, Dataset};

fn main() {
    logging::init();

    ::std::process::exit(main_for(Dataset::Gfs15));
}
