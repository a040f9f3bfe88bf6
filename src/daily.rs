use std::fmt;

use serde::{Serialize, Deserialize};

use enum_map::{Enum};

use chrono::NaiveDate;

use super::error::{Error, Result};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Geography {
	#[serde(rename = "city")]
	City,
	#[serde(rename = "state")]
	State,
}

impl Geography {
	pub fn all() -> [Geography; 2] {
		[Self::City, Self::State]
	}
}

impl fmt::Display for Geography {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::City => f.write_str("city"),
			Self::State => f.write_str("state"),
		}
	}
}


/// Running totals as published by the bulletin of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CumulativeCounts {
	pub cases: u64,
	pub deaths: u64,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
	pub geography: Geography,
	pub date: NaiveDate,
	pub cumulative_cases: u64,
	pub cumulative_deaths: u64,
	pub daily_cases: i64,
	pub daily_deaths: i64,
	pub letality: Option<f64>,
}


pub fn round2(v: f64) -> f64 {
	(v * 100.0).round() / 100.0
}

/// Difference of two counters, negative when the feed retracted.
pub fn signed_delta(current: u64, previous: u64) -> i64 {
	if current >= previous {
		(current - previous) as i64
	} else {
		-((previous - current) as i64)
	}
}

/// Case fatality in percent, rounded to two places. Undefined without cases.
pub fn letality(cases: u64, deaths: u64) -> Option<f64> {
	if cases == 0 {
		return None
	}
	Some(round2(deaths as f64 / cases as f64 * 100.0))
}


/// Derive per-day increments and letality from cumulative counters.
///
/// Observations are sorted by date first. Each row is compared against the
/// row before it in that order, wherever it lies on the calendar. The first
/// row counts its whole cumulative value as that day's increase.
pub fn normalize_daily(geography: Geography, raw: &[(NaiveDate, CumulativeCounts)]) -> Result<Vec<DailyRecord>> {
	let mut sorted = raw.to_vec();
	sorted.sort_by_key(|(date, _)| *date);
	for pair in sorted.windows(2) {
		if pair[0].0 == pair[1].0 {
			return Err(Error::DuplicateDate{
				key: geography.to_string(),
				date: pair[0].0,
			})
		}
	}

	let mut result = Vec::with_capacity(sorted.len());
	let mut prev: Option<CumulativeCounts> = None;
	for (date, counts) in sorted {
		let (daily_cases, daily_deaths) = match prev {
			Some(p) => (signed_delta(counts.cases, p.cases), signed_delta(counts.deaths, p.deaths)),
			None => (counts.cases as i64, counts.deaths as i64),
		};
		result.push(DailyRecord{
			geography,
			date,
			cumulative_cases: counts.cases,
			cumulative_deaths: counts.deaths,
			daily_cases,
			daily_deaths,
			letality: letality(counts.cases, counts.deaths),
		});
		prev = Some(counts);
	}
	Ok(result)
}


#[cfg(test)]
mod tests {
	use super::*;

	fn d(m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2020, m, day).unwrap()
	}

	fn c(cases: u64, deaths: u64) -> CumulativeCounts {
		CumulativeCounts{cases, deaths}
	}

	#[test]
	fn deltas_follow_positional_predecessor() {
		let raw = vec![
			(d(1, 12), c(150, 9)),
			(d(1, 5), c(100, 4)),
			(d(1, 6), c(100, 5)),
		];
		let records = normalize_daily(Geography::State, &raw).unwrap();
		let dates: Vec<_> = records.iter().map(|r| r.date).collect();
		assert_eq!(dates, vec![d(1, 5), d(1, 6), d(1, 12)]);
		let cases: Vec<_> = records.iter().map(|r| r.daily_cases).collect();
		assert_eq!(cases, vec![100, 0, 50]);
		let deaths: Vec<_> = records.iter().map(|r| r.daily_deaths).collect();
		assert_eq!(deaths, vec![4, 1, 4]);
		for pair in records.windows(2) {
			assert_eq!(pair[1].daily_cases, pair[1].cumulative_cases as i64 - pair[0].cumulative_cases as i64);
		}
	}

	#[test]
	fn retraction_gives_negative_delta() {
		let raw = vec![(d(2, 1), c(10, 1)), (d(2, 2), c(8, 1))];
		let records = normalize_daily(Geography::City, &raw).unwrap();
		assert_eq!(records[1].daily_cases, -2);
	}

	#[test]
	fn letality_is_guarded_and_rounded() {
		let raw = vec![(d(3, 1), c(0, 0)), (d(3, 2), c(3, 1))];
		let records = normalize_daily(Geography::City, &raw).unwrap();
		assert_eq!(records[0].letality, None);
		assert_eq!(records[1].letality, Some(33.33));
	}

	#[test]
	fn normalizing_twice_is_identical() {
		let raw = vec![(d(4, 2), c(20, 2)), (d(4, 1), c(10, 1))];
		let a = normalize_daily(Geography::State, &raw).unwrap();
		let b = normalize_daily(Geography::State, &raw).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn duplicate_dates_are_structural_errors() {
		let raw = vec![(d(4, 1), c(10, 1)), (d(4, 1), c(11, 1))];
		assert!(normalize_daily(Geography::State, &raw).is_err());
	}

	#[test]
	fn empty_input_gives_empty_output() {
		assert!(normalize_daily(Geography::State, &[]).unwrap().is_empty());
	}
}
