use std::fmt;
use std::io;

use chrono::NaiveDate;


#[derive(Debug)]
pub enum Error {
	Io(io::Error),
	Csv(csv::Error),
	InvalidDate(String),
	/// Two observations for the same series on the same day. The positional
	/// predecessor of either one is ill-defined.
	DuplicateDate{key: String, date: NaiveDate},
	/// Weekly rows must be strictly increasing by week.
	UnorderedWeeks{key: String},
	InvalidWeek(String),
	Config(String),
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Io(e) => fmt::Display::fmt(e, f),
			Self::Csv(e) => fmt::Display::fmt(e, f),
			Self::InvalidDate(s) => write!(f, "invalid date: {:?}", s),
			Self::DuplicateDate{key, date} => write!(f, "duplicate observation for {} on {}", key, date),
			Self::UnorderedWeeks{key} => write!(f, "weekly rows of {} are not strictly ordered", key),
			Self::InvalidWeek(s) => write!(f, "invalid epidemiological week: {:?}", s),
			Self::Config(s) => write!(f, "configuration error: {}", s),
		}
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<csv::Error> for Error {
	fn from(err: csv::Error) -> Self {
		Self::Csv(err)
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			Self::Csv(e) => Some(e),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
