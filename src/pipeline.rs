use std::fmt;
use std::path::Path;

use enum_map::EnumMap;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use log::{debug, info, warn};

use super::config::{Config, GeographyNames};
use super::daily::{normalize_daily, CumulativeCounts, DailyRecord, Geography};
use super::error::{Error, Result};
use super::hospital::{
	drs_points, latest_field_hospitals, reconcile_bed_occupancy, reconcile_city_beds,
	BedNetwork, BedOccupancyRecord, CityBedRecord, FieldHospitalRecord, HospitalizationRecord,
};
use super::ioutil::{find_input, magic_open};
use super::isolation::isolation_points;
use super::progress::ProgressSink;
use super::sources::{self, SourceKind};
use super::table::WideWeeklyTable;
use super::timeseries::TimeSeries;
use super::vaccination::{derive_vaccination, synthesize_total, vaccination_key, VaccinationCounts, VaccinationDay};
use super::variation::compute_variations;
use super::weekly::{aggregate_weekly, merge_weekly, AggregateOptions, Metric, WeeklyColumn};


/// Something the report had to do without.
#[derive(Debug, Clone, PartialEq)]
pub enum Degraded {
	/// A whole input file could not be used.
	SourceUnavailable{source: SourceKind, reason: String},
	/// The input was read, but has no series for this geography.
	SeriesMissing{geography: Geography, source: SourceKind},
	/// The geography's data is structurally broken; it has no table.
	GeographySkipped{geography: Geography, reason: String},
}

impl fmt::Display for Degraded {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::SourceUnavailable{source, reason} => write!(f, "{} unavailable: {}", source, reason),
			Self::SeriesMissing{geography, source} => write!(f, "no {} series for {}", source, geography),
			Self::GeographySkipped{geography, reason} => write!(f, "{} skipped: {}", geography, reason),
		}
	}
}


/// Parsed inputs. An input that is `None` leaves its columns empty.
#[derive(Debug, Clone, Default)]
pub struct Sources {
	pub cases: EnumMap<Geography, Option<Vec<(NaiveDate, CumulativeCounts)>>>,
	pub isolation: Option<TimeSeries<SmartString, f64>>,
	pub state_beds: Option<Vec<BedOccupancyRecord>>,
	pub hospitalizations: Option<Vec<HospitalizationRecord>>,
	pub vaccination: Option<TimeSeries<SmartString, VaccinationCounts>>,
	pub city_beds: EnumMap<BedNetwork, Option<Vec<CityBedRecord>>>,
	pub field_hospitals: Option<Vec<FieldHospitalRecord>>,
	/// Inputs that were present but could not be read.
	pub failures: Vec<Degraded>,
}

fn load_one<T, S, F>(s: &mut S, data_dir: &Path, kind: SourceKind, failures: &mut Vec<Degraded>, loader: F) -> Option<T>
	where S: ProgressSink + ?Sized, F: FnOnce(&mut S, Box<dyn std::io::Read>) -> Result<T>
{
	let path = match find_input(data_dir.join(kind.file_name())) {
		Some(path) => path,
		None => {
			warn!("{}: {} not found in {}", kind, kind.file_name(), data_dir.display());
			return None
		},
	};
	info!("loading {} from {}", kind, path.display());
	let result = magic_open(&path).map_err(Error::from).and_then(|r| loader(s, r));
	match result {
		Ok(v) => Some(v),
		Err(e) => {
			warn!("{}: failed to load {}: {}", kind, path.display(), e);
			failures.push(Degraded::SourceUnavailable{source: kind, reason: e.to_string()});
			None
		},
	}
}

impl Sources {
	/// Read every input below the configured data directory. Missing or
	/// unreadable files are logged and left out.
	pub fn load<S: ProgressSink + ?Sized>(s: &mut S, config: &Config) -> Self {
		let dir = config.data_dir.as_path();
		let mut failures = Vec::new();
		let municipality = config.names[Geography::City].municipality.clone();
		let mut cases = EnumMap::default();
		cases[Geography::City] = load_one(&mut *s, dir, SourceKind::CityCases, &mut failures, |s, r| {
			sources::load_city_cases(s, r, &municipality)
		});
		cases[Geography::State] = load_one(&mut *s, dir, SourceKind::StateCases, &mut failures, |s, r| {
			sources::load_state_cases(s, r)
		});
		let isolation = load_one(&mut *s, dir, SourceKind::Isolation, &mut failures, |s, r| {
			sources::load_isolation(s, r)
		});
		let state_beds = load_one(&mut *s, dir, SourceKind::StateBeds, &mut failures, |s, r| {
			sources::load_bed_occupancy(s, r)
		});
		let hospitalizations = load_one(&mut *s, dir, SourceKind::Hospitalizations, &mut failures, |s, r| {
			sources::load_hospitalizations(s, r)
		});
		let vaccination = load_one(&mut *s, dir, SourceKind::Vaccination, &mut failures, |s, r| {
			sources::load_vaccination(s, r)
		});
		let mut city_beds = EnumMap::default();
		for network in BedNetwork::all().iter() {
			let network = *network;
			city_beds[network] = load_one(&mut *s, dir, SourceKind::city_beds(network), &mut failures, |s, r| {
				sources::load_city_beds(s, r, network)
			});
		}
		let field_hospitals = load_one(&mut *s, dir, SourceKind::FieldHospitals, &mut failures, |s, r| {
			sources::load_field_hospitals(s, r)
		});
		Self{
			cases,
			isolation,
			state_beds,
			hospitalizations,
			vaccination,
			city_beds,
			field_hospitals,
			failures,
		}
	}

	fn is_available(&self, kind: SourceKind) -> bool {
		match kind {
			SourceKind::CityCases => self.cases[Geography::City].is_some(),
			SourceKind::StateCases => self.cases[Geography::State].is_some(),
			SourceKind::Isolation => self.isolation.is_some(),
			SourceKind::StateBeds => self.state_beds.is_some(),
			SourceKind::Hospitalizations => self.hospitalizations.is_some(),
			SourceKind::Vaccination => self.vaccination.is_some(),
			SourceKind::CityBedsPublic => self.city_beds[BedNetwork::Public].is_some(),
			SourceKind::CityBedsPrivate => self.city_beds[BedNetwork::Private].is_some(),
			SourceKind::CityBedsTotal => self.city_beds[BedNetwork::Total].is_some(),
			SourceKind::FieldHospitals => self.field_hospitals.is_some(),
		}
	}
}


#[derive(Debug, Clone)]
pub struct GeographyReport {
	pub daily: Vec<DailyRecord>,
	pub vaccination: Vec<VaccinationDay>,
	pub table: WideWeeklyTable,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
	pub reports: EnumMap<Geography, Option<GeographyReport>>,
	/// The reconciled state bed series, if there was one to reconcile. It
	/// covers every input row, including those after the reference date.
	pub state_beds: Option<Vec<BedOccupancyRecord>>,
	/// Combined public and private city beds, if any city bed file was read.
	pub city_beds: Option<Vec<CityBedRecord>>,
	/// Newest figures of each field hospital up to the reference date.
	pub field_hospitals: Vec<FieldHospitalRecord>,
	pub degraded: Vec<Degraded>,
}

impl PipelineOutcome {
	pub fn table(&self, geography: Geography) -> Option<&WideWeeklyTable> {
		self.reports[geography].as_ref().map(|report| &report.table)
	}

	pub fn is_complete(&self) -> bool {
		self.degraded.is_empty()
	}
}


fn until<T: Clone>(points: &[(NaiveDate, T)], last: NaiveDate) -> Vec<(NaiveDate, T)> {
	points.iter().filter(|(date, _)| *date <= last).cloned().collect()
}

fn daily_points<F: Fn(&DailyRecord) -> i64>(records: &[DailyRecord], field: F) -> Vec<(NaiveDate, Option<f64>)> {
	records.iter().map(|rec| (rec.date, Some(field(rec) as f64))).collect()
}

struct Builder<'a> {
	sources: &'a Sources,
	beds: Option<&'a [BedOccupancyRecord]>,
	options: &'a AggregateOptions,
	reference_date: NaiveDate,
	degraded: &'a mut Vec<Degraded>,
}

impl<'a> Builder<'a> {
	fn push(&self, columns: &mut Vec<WeeklyColumn>, points: Vec<(NaiveDate, Option<f64>)>, metric: Metric) {
		let points = until(&points, self.reference_date);
		let mut column = aggregate_weekly(&points, metric, self.options);
		// lagged metrics reach into weeks that have not started yet
		column.points.retain(|(week, _)| week.sunday() <= self.reference_date);
		columns.push(column);
	}

	fn missing(&mut self, geography: Geography, source: SourceKind) {
		if self.sources.is_available(source) {
			warn!("{} has no {} series", geography, source);
			self.degraded.push(Degraded::SeriesMissing{geography, source});
		}
	}

	fn build(&mut self, geography: Geography, names: &GeographyNames) -> Result<GeographyReport> {
		let sources = self.sources;
		let mut columns = Vec::new();

		let daily = match &sources.cases[geography] {
			Some(raw) => normalize_daily(geography, &until(raw, self.reference_date))?,
			None => Vec::new(),
		};
		if sources.cases[geography].is_some() && daily.is_empty() {
			self.missing(geography, SourceKind::cases(geography));
		}
		self.push(&mut columns, daily_points(&daily, |rec| rec.daily_cases), Metric::Cases);
		self.push(&mut columns, daily_points(&daily, |rec| rec.daily_deaths), Metric::Deaths);

		if let Some(series) = &sources.isolation {
			match isolation_points(series, &names.isolation) {
				Some(points) => {
					self.push(&mut columns, points.clone(), Metric::IsolationCurrent);
					self.push(&mut columns, points, Metric::IsolationLagged);
				},
				None => self.missing(geography, SourceKind::Isolation),
			}
		}

		let drs = sources.hospitalizations.as_ref().map(|v| &v[..]).unwrap_or(&[]);
		match (geography, self.beds) {
			(Geography::State, Some(beds)) => {
				let points = beds.iter().map(|rec| (rec.date, rec.state_icu)).collect();
				self.push(&mut columns, points, Metric::IcuOccupancy);
			},
			_ => {
				let points = drs_points(drs, &names.drs, |rec| rec.occupancy_last_day);
				self.push(&mut columns, points, Metric::IcuOccupancy);
			},
		}
		let admissions = drs_points(drs, &names.drs, |rec| rec.admissions_7d);
		if admissions.is_empty() {
			self.missing(geography, SourceKind::Hospitalizations);
		}
		self.push(&mut columns, admissions, Metric::Hospitalizations);
		self.push(&mut columns, drs_points(drs, &names.drs, |rec| rec.admissions_trend), Metric::HospitalizationTrend);

		let mut vaccination = Vec::new();
		if let Some(series) = &sources.vaccination {
			let key = vaccination_key(&names.vaccination);
			let synthesized;
			let series = match geography {
				Geography::State => {
					let population = drs.iter()
						.filter(|rec| rec.drs.as_str() == names.drs.as_str())
						.max_by_key(|rec| rec.date)
						.and_then(|rec| rec.population)
						.map(|pop| pop.round() as u64);
					let mut total = series.clone();
					synthesize_total(&mut total, &names.vaccination, population);
					synthesized = total;
					&synthesized
				},
				Geography::City => series,
			};
			match series.get(&key) {
				Some(observations) => {
					vaccination = derive_vaccination(&until(observations, self.reference_date));
					let applied = vaccination.iter().map(|day| (day.date, Some(day.daily_applied as f64))).collect();
					let coverage = vaccination.iter().map(|day| (day.date, day.pct_first_dose)).collect();
					self.push(&mut columns, applied, Metric::Vaccinated);
					self.push(&mut columns, coverage, Metric::VaccinatedPct);
				},
				None => self.missing(geography, SourceKind::Vaccination),
			}
		}

		let table = compute_variations(merge_weekly(geography, &columns));
		debug!("{}: {} daily records, {} weeks", geography, daily.len(), table.len());
		Ok(GeographyReport{daily, vaccination, table})
	}
}


/// Build the weekly tables of every geography from whatever inputs are
/// available.
///
/// Observations after `reference_date` are ignored. A geography whose data
/// is structurally broken is skipped without affecting the others.
pub fn run(sources: &Sources, config: &Config, reference_date: NaiveDate) -> PipelineOutcome {
	let mut outcome = PipelineOutcome::default();
	outcome.degraded.extend(sources.failures.iter().cloned());
	for kind in SourceKind::all().iter() {
		let failed = sources.failures.iter().any(|d| match d {
			Degraded::SourceUnavailable{source, ..} => source == kind,
			_ => false,
		});
		if !sources.is_available(*kind) && !failed {
			outcome.degraded.push(Degraded::SourceUnavailable{source: *kind, reason: "not found".into()});
		}
	}

	let state_drs = config.names[Geography::State].drs.as_str();
	let city_drs = config.names[Geography::City].drs.as_str();
	// the weekly columns clip these to the reference date on their own
	outcome.state_beds = sources.state_beds.as_ref().map(|beds| {
		let drs = sources.hospitalizations.as_ref().map(|v| &v[..]).unwrap_or(&[]);
		reconcile_bed_occupancy(beds, drs, state_drs, city_drs)
	});

	if BedNetwork::all().iter().any(|network| sources.city_beds[*network].is_some()) {
		let network = |n: BedNetwork| sources.city_beds[n].as_ref().map(|v| &v[..]).unwrap_or(&[]);
		let beds = reconcile_city_beds(network(BedNetwork::Public), network(BedNetwork::Private), network(BedNetwork::Total));
		debug!("{} days of city bed figures", beds.len());
		outcome.city_beds = Some(beds);
	}
	if let Some(records) = &sources.field_hospitals {
		outcome.field_hospitals = latest_field_hospitals(records, reference_date);
	}

	for geography in Geography::all().iter() {
		let mut builder = Builder{
			sources,
			beds: outcome.state_beds.as_ref().map(|v| &v[..]),
			options: &config.aggregate,
			reference_date,
			degraded: &mut outcome.degraded,
		};
		match builder.build(*geography, &config.names[*geography]) {
			Ok(report) => {
				info!("{}: {} weeks up to {}", geography, report.table.len(), reference_date);
				outcome.reports[*geography] = Some(report);
			},
			Err(e) => {
				warn!("{}: skipped: {}", geography, e);
				outcome.degraded.push(Degraded::GeographySkipped{
					geography: *geography,
					reason: e.to_string(),
				});
			},
		}
	}
	outcome
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::calendar::week_bucket;

	fn d(m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2020, m, day).unwrap()
	}

	fn c(cases: u64, deaths: u64) -> CumulativeCounts {
		CumulativeCounts{cases, deaths}
	}

	#[test]
	fn cases_only() {
		let mut sources = Sources::default();
		sources.cases[Geography::State] = Some(vec![
			(d(1, 5), c(100, 1)),
			(d(1, 6), c(100, 1)),
			(d(1, 12), c(150, 3)),
		]);
		let outcome = run(&sources, &Config::default(), d(1, 31));
		let table = outcome.table(Geography::State).unwrap();
		assert_eq!(table.len(), 2);
		assert_eq!(table.rows()[0].values[Metric::Cases], Some(100.0));
		assert_eq!(table.rows()[1].values[Metric::Cases], Some(50.0));
		assert_eq!(table.rows()[1].variations[Metric::Cases], Some(-50.0));
		assert_eq!(table.rows()[1].values[Metric::Deaths], Some(2.0));
		assert_eq!(table.rows()[1].values[Metric::IcuOccupancy], None);

		// the city has no input at all and an empty table
		assert!(outcome.table(Geography::City).unwrap().is_empty());
		assert!(!outcome.is_complete());
		assert!(outcome.degraded.contains(&Degraded::SourceUnavailable{
			source: SourceKind::Isolation,
			reason: "not found".into(),
		}));
	}

	#[test]
	fn observations_after_reference_date_are_ignored() {
		let mut sources = Sources::default();
		sources.cases[Geography::City] = Some(vec![
			(d(1, 5), c(10, 0)),
			(d(1, 12), c(20, 0)),
		]);
		let outcome = run(&sources, &Config::default(), d(1, 11));
		let table = outcome.table(Geography::City).unwrap();
		assert_eq!(table.len(), 1);
		assert_eq!(table.rows()[0].week, week_bucket(d(1, 5)));
	}

	fn city_beds(date: NaiveDate, beds: u64, patients: u64) -> CityBedRecord {
		CityBedRecord{
			date,
			icu_occupancy: None,
			icu_beds: Some(beds),
			icu_patients: Some(patients),
			ventilated: None,
			hospitalized: None,
			respiratory: None,
			suspected: None,
		}
	}

	#[test]
	fn city_beds_without_the_combined_file() {
		let mut sources = Sources::default();
		sources.city_beds[BedNetwork::Public] = Some(vec![city_beds(d(1, 5), 100, 50)]);
		sources.city_beds[BedNetwork::Private] = Some(vec![city_beds(d(1, 5), 100, 30)]);
		let outcome = run(&sources, &Config::default(), d(1, 31));
		let beds = outcome.city_beds.unwrap();
		assert_eq!(beds.len(), 1);
		assert_eq!(beds[0].icu_occupancy, Some(40.0));
		assert!(outcome.degraded.contains(&Degraded::SourceUnavailable{
			source: SourceKind::CityBedsTotal,
			reason: "not found".into(),
		}));
		assert!(!outcome.degraded.contains(&Degraded::SourceUnavailable{
			source: SourceKind::CityBedsPublic,
			reason: "not found".into(),
		}));
	}

	#[test]
	fn no_city_bed_files_means_no_city_beds() {
		let outcome = run(&Sources::default(), &Config::default(), d(1, 31));
		assert!(outcome.city_beds.is_none());
		assert!(outcome.field_hospitals.is_empty());
	}

	#[test]
	fn broken_geography_does_not_stop_the_other() {
		let mut sources = Sources::default();
		sources.cases[Geography::City] = Some(vec![(d(1, 5), c(10, 0)), (d(1, 5), c(11, 0))]);
		sources.cases[Geography::State] = Some(vec![(d(1, 5), c(10, 0))]);
		let outcome = run(&sources, &Config::default(), d(1, 31));
		assert!(outcome.reports[Geography::City].is_none());
		assert!(outcome.reports[Geography::State].is_some());
		assert!(outcome.degraded.iter().any(|d| match d {
			Degraded::GeographySkipped{geography: Geography::City, ..} => true,
			_ => false,
		}));
	}
}
