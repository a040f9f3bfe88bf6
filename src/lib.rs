use chrono::{Local, NaiveDate};

mod calendar;
mod config;
mod daily;
mod error;
mod hospital;
mod ioutil;
mod isolation;
mod pipeline;
mod progress;
mod sources;
mod summary;
mod table;
mod timeseries;
mod vaccination;
mod variation;
mod weekly;

pub use calendar::*;
pub use config::*;
pub use daily::*;
pub use error::{Error, Result};
pub use hospital::*;
pub use ioutil::{find_input, magic_create, magic_open};
pub use isolation::*;
pub use pipeline::*;
pub use progress::*;
pub use sources::*;
pub use summary::*;
pub use table::*;
pub use timeseries::*;
pub use vaccination::*;
pub use variation::*;
pub use weekly::*;


/// Today in the local time zone, the default reference date.
pub fn naive_today() -> NaiveDate {
	Local::now().naive_local().date()
}
