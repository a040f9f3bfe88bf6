use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use enum_map::{Enum, EnumMap};

use chrono::{Duration, NaiveDate};

use super::calendar::{week_bucket, EpiWeek};
use super::daily::Geography;
use super::error::{Error, Result};
use super::table::{WeeklyRow, WideWeeklyTable};


/// How several observations falling into the same day or week combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
	Sum,
	Mean,
	Max,
	/// The observation with the latest date.
	Last,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum Metric {
	Cases,
	Deaths,
	Vaccinated,
	VaccinatedPct,
	IcuOccupancy,
	IsolationCurrent,
	/// Isolation index of two weeks before, matched against the cases it
	/// is expected to influence.
	IsolationLagged,
	Hospitalizations,
	HospitalizationTrend,
}

impl Metric {
	pub fn all() -> [Metric; 9] {
		[
			Self::Cases,
			Self::Deaths,
			Self::Vaccinated,
			Self::VaccinatedPct,
			Self::IcuOccupancy,
			Self::IsolationCurrent,
			Self::IsolationLagged,
			Self::Hospitalizations,
			Self::HospitalizationTrend,
		]
	}

	pub fn reducer(&self) -> Reducer {
		match self {
			Self::Cases | Self::Deaths | Self::Vaccinated => Reducer::Sum,
			Self::IcuOccupancy | Self::IsolationCurrent | Self::IsolationLagged => Reducer::Mean,
			Self::VaccinatedPct => Reducer::Max,
			Self::Hospitalizations | Self::HospitalizationTrend => Reducer::Last,
		}
	}

	/// Counts whose empty weeks look like zero sums.
	pub fn is_count(&self) -> bool {
		self.reducer() == Reducer::Sum
	}

	/// Hospitalization trend is already a relative figure and has no
	/// week-over-week variation of its own.
	pub fn has_variation(&self) -> bool {
		match self {
			Self::Hospitalizations | Self::HospitalizationTrend => false,
			_ => true,
		}
	}

	pub fn column_name(&self) -> &'static str {
		match self {
			Self::Cases => "cases_sum",
			Self::Deaths => "deaths_sum",
			Self::Vaccinated => "vaccinated_sum",
			Self::VaccinatedPct => "vaccinated_pct_max",
			Self::IcuOccupancy => "icu_occupancy_avg",
			Self::IsolationCurrent => "isolation_current_avg",
			Self::IsolationLagged => "isolation_index_avg",
			Self::Hospitalizations => "hospitalizations_current",
			Self::HospitalizationTrend => "hospitalizations_variation_pct",
		}
	}

	pub fn variation_column_name(&self) -> Option<&'static str> {
		match self {
			Self::Cases => Some("variation_cases_pct"),
			Self::Deaths => Some("variation_deaths_pct"),
			Self::Vaccinated => Some("variation_vaccinated_pct"),
			Self::VaccinatedPct => Some("variation_vaccinated_pct_pct"),
			Self::IcuOccupancy => Some("variation_icu_pct"),
			Self::IsolationCurrent => Some("variation_isolation_pct"),
			Self::IsolationLagged => Some("variation_isolation_lagged_pct"),
			Self::Hospitalizations | Self::HospitalizationTrend => None,
		}
	}
}

impl fmt::Display for Metric {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.column_name())
	}
}


/// What a count metric whose week sums to zero means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroWeeks {
	/// The feeds report nothing rather than zero for days they skip, so a
	/// zero week is treated as a week without data.
	AsMissing,
	Keep,
}

impl Default for ZeroWeeks {
	fn default() -> Self {
		Self::AsMissing
	}
}

impl FromStr for ZeroWeeks {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim() {
			"missing" => Ok(Self::AsMissing),
			"keep" => Ok(Self::Keep),
			other => Err(Error::Config(format!("unknown zero week policy {:?} (expected missing or keep)", other))),
		}
	}
}


/// Longest accepted isolation lag, in days.
pub const MAX_LAG_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct AggregateOptions {
	pub zero_weeks: ZeroWeeks,
	pub isolation_lag_days: i64,
}

impl AggregateOptions {
	pub fn lag_days(&self, metric: Metric) -> i64 {
		match metric {
			Metric::IsolationLagged => self.isolation_lag_days,
			_ => 0,
		}
	}
}

impl Default for AggregateOptions {
	fn default() -> Self {
		Self{
			zero_weeks: ZeroWeeks::default(),
			isolation_lag_days: 14,
		}
	}
}


#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
	sum: f64,
	max: Option<f64>,
	last: Option<f64>,
	n: usize,
}

impl Accumulator {
	fn push(&mut self, v: Option<f64>) {
		let v = match v {
			Some(v) if !v.is_nan() => v,
			_ => return,
		};
		self.sum += v;
		self.max = match self.max {
			Some(max) if max >= v => Some(max),
			_ => Some(v),
		};
		self.last = Some(v);
		self.n += 1;
	}

	fn finish(&self, reducer: Reducer) -> Option<f64> {
		if self.n == 0 {
			return None
		}
		match reducer {
			Reducer::Sum => Some(self.sum),
			Reducer::Mean => Some(self.sum / self.n as f64),
			Reducer::Max => self.max,
			Reducer::Last => self.last,
		}
	}
}


/// One metric of one geography, reduced to weeks.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyColumn {
	pub metric: Metric,
	pub points: Vec<(EpiWeek, Option<f64>)>,
}

impl WeeklyColumn {
	pub fn get(&self, week: &EpiWeek) -> Option<f64> {
		let i = self.points.binary_search_by_key(week, |(w, _)| *w).ok()?;
		self.points[i].1
	}
}


/// Reduce a daily series to epidemiological weeks.
///
/// Observations of the same day are collapsed first, then every day is
/// moved forward by the metric's lag and the days of each week are
/// collapsed again, both with the metric's reducer. A week that only has
/// absent values is kept as `None`. Lags beyond [`MAX_LAG_DAYS`] are cut
/// down to it.
pub fn aggregate_weekly(points: &[(NaiveDate, Option<f64>)], metric: Metric, options: &AggregateOptions) -> WeeklyColumn {
	let reducer = metric.reducer();

	let mut days: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
	for (date, v) in points.iter() {
		days.entry(*date).or_default().push(*v);
	}

	let lag = Duration::days(options.lag_days(metric).max(-MAX_LAG_DAYS).min(MAX_LAG_DAYS));
	let mut weeks: BTreeMap<EpiWeek, Accumulator> = BTreeMap::new();
	for (date, acc) in days.iter() {
		let shifted = match date.checked_add_signed(lag) {
			Some(shifted) => shifted,
			None => continue,
		};
		weeks.entry(week_bucket(shifted)).or_default().push(acc.finish(reducer));
	}

	let points = weeks.into_iter().map(|(week, acc)| {
		let v = match acc.finish(reducer) {
			Some(v) if v == 0.0 && metric.is_count() && options.zero_weeks == ZeroWeeks::AsMissing => None,
			other => other,
		};
		(week, v)
	}).collect();
	WeeklyColumn{metric, points}
}


/// Outer-join weekly columns on their week.
///
/// Every week present in any column gets a row. Two columns for the same
/// metric are collapsed with that metric's reducer.
pub fn merge_weekly(geography: Geography, columns: &[WeeklyColumn]) -> WideWeeklyTable {
	let mut weeks: BTreeMap<EpiWeek, EnumMap<Metric, Accumulator>> = BTreeMap::new();
	for column in columns.iter() {
		for (week, v) in column.points.iter() {
			weeks.entry(*week).or_default()[column.metric].push(*v);
		}
	}

	let rows = weeks.into_iter().map(|(week, accs)| {
		let mut row = WeeklyRow::new(week);
		for (metric, value) in row.values.iter_mut() {
			*value = accs[metric].finish(metric.reducer());
		}
		row
	}).collect();
	WideWeeklyTable::from_ordered(geography, rows)
}
