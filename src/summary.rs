use std::fmt;

use num_format::{Locale, ToFormattedString};

use chrono::{Duration, NaiveDate};

use super::calendar::{epi_week_ordinal, week_bucket, week_label, EpiWeek};
use super::daily::{DailyRecord, Geography};
use super::table::{WeeklyRow, WideWeeklyTable};
use super::variation::{format_variation_pt, UNAVAILABLE};
use super::weekly::Metric;


/// Whole number with `.` as thousands separator.
pub fn format_count(v: Option<f64>) -> String {
	match v {
		Some(v) if v.is_finite() => (v.round() as i64).to_formatted_string(&Locale::pt),
		_ => UNAVAILABLE.into(),
	}
}

/// Percentage with one decimal and a decimal comma.
pub fn format_percent(v: Option<f64>) -> String {
	match v {
		Some(v) if v.is_finite() => format!("{:.1}%", v).replace('.', ","),
		_ => UNAVAILABLE.into(),
	}
}


#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
	pub title: &'static str,
	pub value: String,
	pub variation: String,
}

impl SummaryLine {
	fn count(title: &'static str, row: &WeeklyRow, metric: Metric) -> Self {
		Self{
			title,
			value: format_count(row.values[metric]),
			variation: format_variation_pt(row.variations[metric]),
		}
	}

	fn percent(title: &'static str, row: &WeeklyRow, metric: Metric) -> Self {
		Self{
			title,
			value: format_percent(row.values[metric]),
			variation: format_variation_pt(row.variations[metric]),
		}
	}
}


/// The figures of the last complete week before a reference date.
#[derive(Debug, Clone)]
pub struct WeeklySummary {
	pub geography: Geography,
	pub week: EpiWeek,
	/// Number shown in the "Nª semana epidemiológica" header.
	pub ordinal: u32,
	pub lines: Vec<SummaryLine>,
}

impl WeeklySummary {
	/// Summarize the week containing the day before `reference_date`.
	///
	/// Returns `None` if the table has no row for that week.
	pub fn build(table: &WideWeeklyTable, reference_date: NaiveDate) -> Option<Self> {
		let week = week_bucket(reference_date - Duration::days(1));
		let row = table.row(&week)?;
		let hospitalizations = SummaryLine{
			title: "Internações",
			value: format_count(row.values[Metric::Hospitalizations]),
			variation: format_variation_pt(row.values[Metric::HospitalizationTrend]),
		};
		Some(Self{
			geography: table.geography(),
			week,
			ordinal: epi_week_ordinal(reference_date),
			lines: vec![
				SummaryLine::count("Vacinadas", row, Metric::Vaccinated),
				SummaryLine::count("Casos", row, Metric::Cases),
				SummaryLine::count("Óbitos", row, Metric::Deaths),
				hospitalizations,
				SummaryLine::percent("Ocupação de UTIs", row, Metric::IcuOccupancy),
				SummaryLine::percent("Isolamento", row, Metric::IsolationCurrent),
			],
		})
	}

	pub fn heading(&self) -> String {
		format!("{}ª semana epidemiológica ({})", self.ordinal, week_label(&self.week, false))
	}

	pub fn line(&self, title: &str) -> Option<&SummaryLine> {
		self.lines.iter().find(|line| line.title == title)
	}
}

impl fmt::Display for WeeklySummary {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "{}: {}", self.geography, self.heading())?;
		for line in self.lines.iter() {
			writeln!(f, "  {:<18} {:>14} {:>14}", line.title, line.value, line.variation)?;
		}
		Ok(())
	}
}


/// The bulletin of the reference date and the one published before it.
#[derive(Debug, Clone)]
pub struct DailySnapshot {
	pub geography: Geography,
	pub reference_date: NaiveDate,
	pub today: Option<DailyRecord>,
	pub previous: Option<DailyRecord>,
}

impl DailySnapshot {
	pub fn build(geography: Geography, records: &[DailyRecord], reference_date: NaiveDate) -> Self {
		let today = records.iter().find(|rec| rec.date == reference_date).cloned();
		let previous = records.iter()
			.filter(|rec| rec.date < reference_date)
			.max_by_key(|rec| rec.date)
			.cloned();
		Self{
			geography,
			reference_date,
			today,
			previous,
		}
	}
}

impl fmt::Display for DailySnapshot {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match &self.today {
			Some(rec) => write!(
				f,
				"{} {}: {} casos ({} no dia), {} óbitos ({} no dia), letalidade {}",
				self.geography,
				rec.date.format("%d/%m/%Y"),
				format_count(Some(rec.cumulative_cases as f64)),
				format_count(Some(rec.daily_cases as f64)),
				format_count(Some(rec.cumulative_deaths as f64)),
				format_count(Some(rec.daily_deaths as f64)),
				format_percent(rec.letality),
			),
			None => write!(f, "{} {}: sem boletim", self.geography, self.reference_date.format("%d/%m/%Y")),
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::variation::compute_variations;

	fn d(m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2021, m, day).unwrap()
	}

	fn table() -> WideWeeklyTable {
		let w1 = week_bucket(d(3, 7));
		let rows = vec![
			WeeklyRow::with_values(w1, vec![
				(Metric::Cases, 80000.0),
				(Metric::IcuOccupancy, 80.0),
			]),
			WeeklyRow::with_values(w1.succ(), vec![
				(Metric::Cases, 100000.0),
				(Metric::IcuOccupancy, 90.44),
				(Metric::Hospitalizations, 12345.0),
				(Metric::HospitalizationTrend, -4.26),
			]),
		];
		compute_variations(WideWeeklyTable::new(Geography::State, rows).unwrap())
	}

	#[test]
	fn counts_and_percentages_use_portuguese_separators() {
		assert_eq!(format_count(Some(1234567.4)), "1.234.567");
		assert_eq!(format_count(Some(12.0)), "12");
		assert_eq!(format_count(None), UNAVAILABLE);
		assert_eq!(format_percent(Some(45.26)), "45,3%");
		assert_eq!(format_percent(Some(f64::NAN)), UNAVAILABLE);
	}

	#[test]
	fn summary_uses_week_before_reference_date() {
		// Sunday the 21st: the summary covers the week that ended on the 20th
		let summary = WeeklySummary::build(&table(), d(3, 21)).unwrap();
		assert_eq!(summary.week, week_bucket(d(3, 14)));
		assert_eq!(summary.ordinal, epi_week_ordinal(d(3, 21)));
		let cases = summary.line("Casos").unwrap();
		assert_eq!(cases.value, "100.000");
		assert_eq!(cases.variation, "+25,0%");
		let icu = summary.line("Ocupação de UTIs").unwrap();
		assert_eq!(icu.value, "90,4%");
		let hosp = summary.line("Internações").unwrap();
		assert_eq!(hosp.value, "12.345");
		assert_eq!(hosp.variation, "-4,3%");
		let vaccinated = summary.line("Vacinadas").unwrap();
		assert_eq!(vaccinated.value, UNAVAILABLE);
		assert_eq!(vaccinated.variation, UNAVAILABLE);
	}

	#[test]
	fn summary_without_row_is_none() {
		assert!(WeeklySummary::build(&table(), d(5, 1)).is_none());
	}

	#[test]
	fn daily_snapshot_picks_previous_available_day() {
		let rec = |day: u32, cases: u64| DailyRecord{
			geography: Geography::City,
			date: d(3, day),
			cumulative_cases: cases,
			cumulative_deaths: 0,
			daily_cases: 0,
			daily_deaths: 0,
			letality: None,
		};
		let records = vec![rec(1, 10), rec(3, 30), rec(6, 60)];
		let snapshot = DailySnapshot::build(Geography::City, &records, d(3, 6));
		assert_eq!(snapshot.today.unwrap().cumulative_cases, 60);
		assert_eq!(snapshot.previous.unwrap().date, d(3, 3));

		let missing = DailySnapshot::build(Geography::City, &records, d(3, 5));
		assert!(missing.today.is_none());
		assert_eq!(missing.previous.unwrap().date, d(3, 3));
	}
}
