use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use super::error::{Error, Result};


// abbreviations as printed in the published tables (pt_BR locale)
const MONTHS: [&str; 12] = [
	"jan", "fev", "mar", "abr", "mai", "jun",
	"jul", "ago", "set", "out", "nov", "dez",
];


/// Zero-based week of the year where weeks start on Sunday. Days before the
/// first Sunday of the year are week 0 (strftime `%U`).
fn sunday_week_number(date: NaiveDate) -> u32 {
	(date.ordinal0() + 7 - date.weekday().num_days_from_sunday()) / 7
}

/// Same as [`sunday_week_number`], with Monday as first day (strftime `%W`).
fn monday_week_number(date: NaiveDate) -> u32 {
	(date.ordinal0() + 7 - date.weekday().num_days_from_monday()) / 7
}

fn last_day_of_previous_year(date: NaiveDate) -> NaiveDate {
	date - Duration::days(date.ordinal() as i64)
}

fn format_day(date: NaiveDate, include_year: bool) -> String {
	let month = MONTHS[date.month0() as usize];
	if include_year {
		format!("{:02}/{}/{:02}", date.day(), month, date.year().rem_euclid(100))
	} else {
		format!("{:02}/{}", date.day(), month)
	}
}


/// An epidemiological week: Sunday through Saturday.
///
/// Weeks are numbered like strftime `%U`. The days of January before the
/// first Sunday (week 0) belong to the last week of the previous year, so
/// a week can span two calendar years but its number never is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpiWeek {
	year: i32,
	week: u32,
	sunday: NaiveDate,
}

impl EpiWeek {
	pub fn of(date: NaiveDate) -> Self {
		let (year, week) = match sunday_week_number(date) {
			0 => {
				// December 31 always has at least one Sunday before it in its
				// own year, so this cannot end up in week 0 again.
				let eoy = last_day_of_previous_year(date);
				(eoy.year(), sunday_week_number(eoy))
			},
			week => (date.year(), week),
		};
		let sunday = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
		Self{year, week, sunday}
	}

	#[inline(always)]
	pub fn year(&self) -> i32 {
		self.year
	}

	#[inline(always)]
	pub fn number(&self) -> u32 {
		self.week
	}

	#[inline(always)]
	pub fn sunday(&self) -> NaiveDate {
		self.sunday
	}

	#[inline(always)]
	pub fn saturday(&self) -> NaiveDate {
		self.sunday + Duration::days(6)
	}

	pub fn contains(&self, date: NaiveDate) -> bool {
		date >= self.sunday() && date <= self.saturday()
	}

	pub fn succ(&self) -> Self {
		Self::of(self.sunday + Duration::days(7))
	}

	/// "DD/mmm/YY a DD/mmm/YY", or without the years.
	pub fn label(&self, include_year: bool) -> String {
		format!(
			"{} a {}",
			format_day(self.sunday(), include_year),
			format_day(self.saturday(), include_year),
		)
	}
}

impl fmt::Display for EpiWeek {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}-W{:02}", self.year, self.week)
	}
}

impl FromStr for EpiWeek {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = || Error::InvalidWeek(s.into());
		let (year, week) = s.split_once("-W").ok_or_else(invalid)?;
		let year = year.parse::<i32>().map_err(|_| invalid())?;
		let week = week.parse::<u32>().map_err(|_| invalid())?;
		if week == 0 || week > 53 {
			return Err(invalid())
		}
		let jan1 = NaiveDate::from_yo_opt(year, 1).ok_or_else(invalid)?;
		let first_sunday = jan1
			.checked_add_signed(Duration::days(((7 - jan1.weekday().num_days_from_sunday()) % 7) as i64))
			.ok_or_else(invalid)?;
		let sunday = first_sunday
			.checked_add_signed(Duration::days(7 * (week as i64 - 1)))
			.ok_or_else(invalid)?;
		let result = Self::of(sunday);
		// week 53 only exists in some years
		if result.year != year || result.week != week {
			return Err(invalid())
		}
		Ok(result)
	}
}


pub fn week_bucket(date: NaiveDate) -> EpiWeek {
	EpiWeek::of(date)
}

pub fn week_label(week: &EpiWeek, include_year: bool) -> String {
	week.label(include_year)
}

/// One-based week number for the "Nth epidemiological week" header.
///
/// This counts Monday-start weeks (strftime `%W`) and is only a display
/// value; bucketing always goes through [`EpiWeek`].
pub fn epi_week_ordinal(date: NaiveDate) -> u32 {
	let week = match monday_week_number(date) {
		0 => monday_week_number(last_day_of_previous_year(date)),
		week => week,
	};
	week + 1
}
