use enum_map::EnumMap;

use super::calendar::EpiWeek;
use super::daily::Geography;
use super::error::{Error, Result};
use super::weekly::Metric;


#[derive(Debug, Clone)]
pub struct WeeklyRow {
	pub week: EpiWeek,
	pub values: EnumMap<Metric, Option<f64>>,
	/// Change against the previous row, in percent.
	pub variations: EnumMap<Metric, Option<f64>>,
}

impl WeeklyRow {
	pub fn new(week: EpiWeek) -> Self {
		Self{
			week,
			values: EnumMap::default(),
			variations: EnumMap::default(),
		}
	}

	pub fn with_values<I: IntoIterator<Item = (Metric, f64)>>(week: EpiWeek, values: I) -> Self {
		let mut row = Self::new(week);
		for (metric, v) in values {
			row.values[metric] = Some(v);
		}
		row
	}

	pub fn label(&self, include_year: bool) -> String {
		self.week.label(include_year)
	}
}


/// All weekly metrics of one geography, one row per week.
///
/// Rows are strictly increasing by week, so the row before a row is its
/// predecessor. Weeks without any data in between are not filled in.
#[derive(Debug, Clone)]
pub struct WideWeeklyTable {
	geography: Geography,
	rows: Vec<WeeklyRow>,
}

impl WideWeeklyTable {
	pub fn new(geography: Geography, rows: Vec<WeeklyRow>) -> Result<Self> {
		for pair in rows.windows(2) {
			if pair[0].week >= pair[1].week {
				return Err(Error::UnorderedWeeks{key: geography.to_string()})
			}
		}
		Ok(Self::from_ordered(geography, rows))
	}

	pub(crate) fn from_ordered(geography: Geography, rows: Vec<WeeklyRow>) -> Self {
		Self{geography, rows}
	}

	#[inline(always)]
	pub fn geography(&self) -> Geography {
		self.geography
	}

	pub fn rows(&self) -> &[WeeklyRow] {
		&self.rows[..]
	}

	pub(crate) fn rows_mut(&mut self) -> &mut [WeeklyRow] {
		&mut self.rows[..]
	}

	pub fn position(&self, week: &EpiWeek) -> Option<usize> {
		self.rows.binary_search_by_key(week, |row| row.week).ok()
	}

	pub fn row(&self, week: &EpiWeek) -> Option<&WeeklyRow> {
		Some(&self.rows[self.position(week)?])
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn w(s: &str) -> EpiWeek {
		s.parse().unwrap()
	}

	#[test]
	fn construction_rejects_unordered_rows() {
		let rows = vec![WeeklyRow::new(w("2020-W02")), WeeklyRow::new(w("2020-W01"))];
		assert!(WideWeeklyTable::new(Geography::City, rows).is_err());
		let rows = vec![WeeklyRow::new(w("2020-W02")), WeeklyRow::new(w("2020-W02"))];
		assert!(WideWeeklyTable::new(Geography::City, rows).is_err());
	}

	#[test]
	fn lookup_by_week() {
		let rows = vec![
			WeeklyRow::with_values(w("2019-W52"), vec![(Metric::Cases, 1.0)]),
			WeeklyRow::with_values(w("2020-W02"), vec![(Metric::Cases, 2.0)]),
		];
		let table = WideWeeklyTable::new(Geography::State, rows).unwrap();
		assert_eq!(table.position(&w("2020-W02")), Some(1));
		assert_eq!(table.row(&w("2020-W01")).map(|r| r.week), None);
		assert_eq!(table.row(&w("2020-W02")).unwrap().values[Metric::Cases], Some(2.0));
		assert_eq!(table.rows()[0].label(true), "29/dez/19 a 04/jan/20");
	}
}
