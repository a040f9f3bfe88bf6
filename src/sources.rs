use std::fmt;
use std::io;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde::de::DeserializeOwned;

use smartstring::alias::{String as SmartString};

use enum_map::Enum;

use chrono::NaiveDate;

use log::debug;

use super::daily::{CumulativeCounts, DailyRecord, Geography};
use super::error::{Error, Result};
use super::hospital::{BedNetwork, BedOccupancyRecord, CityBedRecord, FieldHospitalRecord, HospitalizationRecord};
use super::isolation::{isolation_series, IsolationRecord};
use super::progress::{CountMeter, ProgressSink};
use super::table::WideWeeklyTable;
use super::timeseries::TimeSeries;
use super::vaccination::{vaccination_key, VaccinationCounts, VaccinationDay, VaccinationRecord};
use super::weekly::Metric;


/// The input files, one per upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum SourceKind {
	CityCases,
	StateCases,
	Isolation,
	StateBeds,
	Hospitalizations,
	Vaccination,
	CityBedsPublic,
	CityBedsPrivate,
	CityBedsTotal,
	FieldHospitals,
}

impl SourceKind {
	pub fn all() -> [SourceKind; 10] {
		[
			Self::CityCases,
			Self::StateCases,
			Self::Isolation,
			Self::StateBeds,
			Self::Hospitalizations,
			Self::Vaccination,
			Self::CityBedsPublic,
			Self::CityBedsPrivate,
			Self::CityBedsTotal,
			Self::FieldHospitals,
		]
	}

	pub fn cases(geography: Geography) -> Self {
		match geography {
			Geography::City => Self::CityCases,
			Geography::State => Self::StateCases,
		}
	}

	pub fn city_beds(network: BedNetwork) -> Self {
		match network {
			BedNetwork::Public => Self::CityBedsPublic,
			BedNetwork::Private => Self::CityBedsPrivate,
			BedNetwork::Total => Self::CityBedsTotal,
		}
	}

	pub fn file_name(&self) -> &'static str {
		match self {
			Self::CityCases => "dados_munic.csv",
			Self::StateCases => "sp.csv",
			Self::Isolation => "isolamento_social.csv",
			Self::StateBeds => "leitos_estaduais.csv",
			Self::Hospitalizations => "plano_sp_leitos_internacoes.csv",
			Self::Vaccination => "dados_vacinacao.csv",
			Self::CityBedsPublic => "leitos_municipais.csv",
			Self::CityBedsPrivate => "leitos_municipais_privados.csv",
			Self::CityBedsTotal => "leitos_municipais_total.csv",
			Self::FieldHospitals => "hospitais_campanha_sp.csv",
		}
	}

	/// The SEADE exports use `;`, files kept by this crate use `,`.
	pub fn delimiter(&self) -> u8 {
		match self {
			Self::CityCases | Self::StateCases | Self::Hospitalizations => b';',
			Self::Isolation | Self::StateBeds | Self::Vaccination => b',',
			Self::CityBedsPublic | Self::CityBedsPrivate | Self::CityBedsTotal | Self::FieldHospitals => b',',
		}
	}
}

impl fmt::Display for SourceKind {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::CityCases => f.write_str("city cases"),
			Self::StateCases => f.write_str("state cases"),
			Self::Isolation => f.write_str("isolation"),
			Self::StateBeds => f.write_str("state beds"),
			Self::Hospitalizations => f.write_str("hospitalizations"),
			Self::Vaccination => f.write_str("vaccination"),
			Self::CityBedsPublic => f.write_str("city public beds"),
			Self::CityBedsPrivate => f.write_str("city private beds"),
			Self::CityBedsTotal => f.write_str("city beds"),
			Self::FieldHospitals => f.write_str("field hospitals"),
		}
	}
}


/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (also with `/`) and
/// `DD/MM/YYYY`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
	let s = s.trim();
	let invalid = || Error::InvalidDate(s.into());
	let bytes = s.as_bytes();
	if s.len() == 10 && bytes[2] == b'/' {
		NaiveDate::parse_from_str(s, "%d/%m/%Y").map_err(|_| invalid())
	} else if s.len() == 10 {
		s.replace("/", "-").parse::<NaiveDate>().map_err(|_| invalid())
	} else if s.len() >= 19 {
		let day = s.get(..10).ok_or_else(invalid)?;
		day.replace("/", "-").parse::<NaiveDate>().map_err(|_| invalid())
	} else {
		Err(invalid())
	}
}

fn is_blank(s: &str) -> bool {
	match s {
		"" | "-" | "NA" | "nan" | "NaN" => true,
		_ => false,
	}
}

fn parse_count(s: &str) -> std::result::Result<u64, String> {
	if let Ok(v) = s.parse::<u64>() {
		return Ok(v)
	}
	match s.parse::<f64>() {
		Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
		_ => Err(format!("invalid count: {:?}", s)),
	}
}


pub(crate) fn flexible_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	parse_date(&s).map_err(de::Error::custom)
}

/// `45%`, `45,5%` or a bare number.
pub(crate) fn percent<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	let s = s.trim().trim_end_matches('%').replace(",", ".");
	s.trim().parse::<f64>().map_err(de::Error::custom)
}

/// Portuguese number format: `.` groups thousands, `,` is the decimal mark.
pub(crate) fn pt_decimal_opt<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	let s = s.trim();
	if is_blank(s) {
		return Ok(None)
	}
	let s = s.replace(".", "").replace(",", ".");
	Ok(Some(s.parse::<f64>().map_err(de::Error::custom)?))
}

pub(crate) fn pt_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	let s = s.trim().replace(".", "").replace(",", ".");
	parse_count(&s).map_err(de::Error::custom)
}

pub(crate) fn float_opt<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	let s = s.trim();
	if is_blank(s) {
		return Ok(None)
	}
	Ok(Some(s.parse::<f64>().map_err(de::Error::custom)?))
}

/// Counts written by pandas may come out as `123.0`.
pub(crate) fn count_opt<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	let s = s.trim();
	if is_blank(s) {
		return Ok(None)
	}
	Ok(Some(parse_count(s).map_err(de::Error::custom)?))
}


#[derive(Debug, Clone, Deserialize)]
pub struct MunicipalityCasesRow {
	#[serde(rename = "nome_munic")]
	pub municipality: SmartString,
	#[serde(rename = "datahora", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "casos", deserialize_with = "pt_count")]
	pub cases: u64,
	#[serde(rename = "obitos", deserialize_with = "pt_count")]
	pub deaths: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateCasesRow {
	#[serde(rename = "data", alias = "datahora", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "total_casos", alias = "casos", deserialize_with = "pt_count")]
	pub cases: u64,
	#[serde(rename = "total_obitos", alias = "obitos", deserialize_with = "pt_count")]
	pub deaths: u64,
}


fn read_records<T, R, S>(s: &mut S, r: R, delimiter: u8) -> Result<Vec<T>>
	where T: DeserializeOwned, R: io::Read, S: ProgressSink + ?Sized
{
	let mut r = csv::ReaderBuilder::new()
		.delimiter(delimiter)
		.trim(csv::Trim::All)
		.from_reader(r);
	let mut pm = CountMeter::new(s);
	let mut result = Vec::new();
	for (i, row) in r.deserialize().enumerate() {
		let rec: T = row?;
		result.push(rec);
		pm.update(i+1);
	}
	pm.finish(result.len());
	Ok(result)
}


/// Cumulative counts of one municipality out of the per-municipality
/// bulletin.
pub fn load_city_cases<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R, municipality: &str) -> Result<Vec<(NaiveDate, CumulativeCounts)>> {
	let rows: Vec<MunicipalityCasesRow> = read_records(s, r, SourceKind::CityCases.delimiter())?;
	let total = rows.len();
	let result: Vec<_> = rows.into_iter()
		.filter(|row| row.municipality.trim() == municipality)
		.map(|row| (row.date, CumulativeCounts{cases: row.cases, deaths: row.deaths}))
		.collect();
	debug!("{} of {} municipality rows belong to {}", result.len(), total, municipality);
	Ok(result)
}

pub fn load_state_cases<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<(NaiveDate, CumulativeCounts)>> {
	let rows: Vec<StateCasesRow> = read_records(s, r, SourceKind::StateCases.delimiter())?;
	Ok(rows.into_iter().map(|row| (row.date, CumulativeCounts{cases: row.cases, deaths: row.deaths})).collect())
}

pub fn load_isolation<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<TimeSeries<SmartString, f64>> {
	let rows: Vec<IsolationRecord> = read_records(s, r, SourceKind::Isolation.delimiter())?;
	isolation_series(&rows)
}

pub fn load_bed_occupancy<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<BedOccupancyRecord>> {
	read_records(s, r, SourceKind::StateBeds.delimiter())
}

/// One of the city's bed files. The network only selects the delimiter;
/// the columns of all three are understood.
pub fn load_city_beds<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R, network: BedNetwork) -> Result<Vec<CityBedRecord>> {
	read_records(s, r, SourceKind::city_beds(network).delimiter())
}

pub fn load_field_hospitals<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<FieldHospitalRecord>> {
	read_records(s, r, SourceKind::FieldHospitals.delimiter())
}

pub fn load_hospitalizations<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<HospitalizationRecord>> {
	read_records(s, r, SourceKind::Hospitalizations.delimiter())
}

/// Vaccination counters keyed by [`vaccination_key`].
pub fn load_vaccination<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<TimeSeries<SmartString, VaccinationCounts>> {
	let rows: Vec<VaccinationRecord> = read_records(s, r, SourceKind::Vaccination.delimiter())?;
	let series = TimeSeries::from_records(rows.iter().map(|row| (vaccination_key(&row.municipality), row.date, row.counts())))?;
	debug!("{} vaccination rows for {} places", rows.len(), series.len());
	Ok(series)
}


fn format_cell(v: Option<f64>) -> String {
	match v {
		Some(v) if v.is_finite() => format!("{}", v),
		_ => String::new(),
	}
}

pub fn weekly_header() -> Vec<&'static str> {
	let mut header = vec!["week", "label"];
	for metric in Metric::all().iter() {
		header.push(metric.column_name());
	}
	for metric in Metric::all().iter() {
		if let Some(name) = metric.variation_column_name() {
			header.push(name);
		}
	}
	header
}

pub fn write_weekly_csv<W: io::Write>(w: W, table: &WideWeeklyTable) -> Result<()> {
	let mut w = csv::Writer::from_writer(w);
	w.write_record(weekly_header())?;
	for row in table.rows() {
		let mut record = vec![row.week.to_string(), row.label(true)];
		for metric in Metric::all().iter() {
			record.push(format_cell(row.values[*metric]));
		}
		for metric in Metric::all().iter() {
			if metric.variation_column_name().is_some() {
				record.push(format_cell(row.variations[*metric]));
			}
		}
		w.write_record(&record)?;
	}
	w.flush()?;
	Ok(())
}

pub fn write_daily_csv<W: io::Write>(w: W, records: &[DailyRecord]) -> Result<()> {
	write_records(w, records)
}

fn write_records<W: io::Write, T: Serialize>(w: W, records: &[T]) -> Result<()> {
	let mut w = csv::Writer::from_writer(w);
	for rec in records {
		w.serialize(rec)?;
	}
	w.flush()?;
	Ok(())
}

pub fn write_bed_occupancy_csv<W: io::Write>(w: W, records: &[BedOccupancyRecord]) -> Result<()> {
	write_records(w, records)
}

pub fn write_city_beds_csv<W: io::Write>(w: W, records: &[CityBedRecord]) -> Result<()> {
	write_records(w, records)
}

pub fn write_vaccination_csv<W: io::Write>(w: W, days: &[VaccinationDay]) -> Result<()> {
	write_records(w, days)
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::progress::NullSink;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	#[test]
	fn date_formats() {
		assert_eq!(parse_date("2020-06-01").unwrap(), d(2020, 6, 1));
		assert_eq!(parse_date("01/06/2020").unwrap(), d(2020, 6, 1));
		assert_eq!(parse_date("2020/06/01 00:00:00").unwrap(), d(2020, 6, 1));
		assert_eq!(parse_date("2020-06-01T00:00:00").unwrap(), d(2020, 6, 1));
		assert!(parse_date("1 jun 20").is_err());
		assert!(parse_date("31/02/2020").is_err());
	}

	#[test]
	fn city_rows_are_filtered_by_name() {
		let data = "nome_munic;codigo_ibge;datahora;casos;casos_novos;obitos\n\
			São Paulo;3550308;2020-06-01;1.234;10;56\n\
			Campinas;3509502;2020-06-01;99;1;2\n\
			São Paulo;3550308;2020-06-02;1.300;66;57\n";
		let rows = load_city_cases(&mut NullSink, data.as_bytes(), "São Paulo").unwrap();
		assert_eq!(rows, vec![
			(d(2020, 6, 1), CumulativeCounts{cases: 1234, deaths: 56}),
			(d(2020, 6, 2), CumulativeCounts{cases: 1300, deaths: 57}),
		]);
	}

	#[test]
	fn state_rows_accept_both_headers() {
		let a = "data;total_casos;total_obitos\n01/06/2020;100;5\n";
		let b = "datahora;casos;obitos\n2020-06-01;100;5\n";
		let a = load_state_cases(&mut NullSink, a.as_bytes()).unwrap();
		let b = load_state_cases(&mut NullSink, b.as_bytes()).unwrap();
		assert_eq!(a, b);
		assert_eq!(a[0].1, CumulativeCounts{cases: 100, deaths: 5});
	}

	#[test]
	fn isolation_percentages() {
		let data = "data,município,populacao,isolamento\n\
			2020-06-01,SÃO PAULO,12252023,47%\n\
			2020-06-01,Estado de São Paulo,45919049,\"45,5%\"\n";
		let series = load_isolation(&mut NullSink, data.as_bytes()).unwrap();
		assert_eq!(series.get_value(&"São Paulo".into(), d(2020, 6, 1)), Some(&47.0));
		assert_eq!(series.get_value(&"Estado de São Paulo".into(), d(2020, 6, 1)), Some(&45.5));
	}

	#[test]
	fn hospitalizations_use_portuguese_numbers() {
		let data = "datahora;nome_drs;pacientes_uti_mm7d;total_covid_uti_mm7d;ocupacao_leitos;pop;leitos_pc;internacoes_7d;internacoes_7d_l;internacoes_7v7;pacientes_uti_ultimo_dia;total_covid_uti_ultimo_dia;ocupacao_leitos_ultimo_dia\n\
			2021-04-01;Estado de São Paulo;12.345,6;14.000;88,2;46.289.333;30,2;23.456;25.000;-6,2;12.400;14.100;87,9\n\
			2021-04-01;DRS 07 Campinas;;;;;;;;;;;\n";
		let rows = load_hospitalizations(&mut NullSink, data.as_bytes()).unwrap();
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].icu_patients_mm7d, Some(12345.6));
		assert_eq!(rows[0].population, Some(46289333.0));
		assert_eq!(rows[0].admissions_trend, Some(-6.2));
		assert_eq!(rows[0].occupancy_last_day, Some(87.9));
		assert_eq!(rows[1].admissions_7d, None);
	}

	#[test]
	fn beds_skip_the_index_column() {
		let data = ",data,sp_uti,sp_enfermaria,rmsp_uti,rmsp_enfermaria\n\
			0,01/04/2021,88.1,60.2,90.3,\n";
		let rows = load_bed_occupancy(&mut NullSink, data.as_bytes()).unwrap();
		assert_eq!(rows[0].date, d(2021, 4, 1));
		assert_eq!(rows[0].state_icu, Some(88.1));
		assert_eq!(rows[0].metro_ward, None);
	}

	#[test]
	fn vaccination_counts_and_keys() {
		let data = "data,municipio,doses_recebidas,1a_dose,2a_dose,populacao\n\
			01/03/2021,São Paulo,1000.0,600.0,100,12000\n\
			01/03/2021,CAMPINAS,,50,,\n";
		let series = load_vaccination(&mut NullSink, data.as_bytes()).unwrap();
		let sp = series.get_value(&"SAO PAULO".into(), d(2021, 3, 1)).unwrap();
		assert_eq!(sp.first_dose, Some(600));
		assert_eq!(sp.doses_received, Some(1000));
		let campinas = series.get_value(&"CAMPINAS".into(), d(2021, 3, 1)).unwrap();
		assert_eq!(campinas.second_dose, None);
		assert_eq!(campinas.population, None);
	}

	#[test]
	fn city_bed_files_share_one_record() {
		let public = "data,ocupacao_uti_covid_publico,uti_covid_publico,internados_uti_publico,ventilacao_publico,internados_publico,respiratorio_publico,suspeitos_publico\n\
			01/04/2021,92,1000,920,400,2500,300,\n";
		let private = "data,ocupacao_uti_covid_privado,uti_covid_privado,internados_uti_privado\n\
			01/04/2021,,500,400\n";
		let public = load_city_beds(&mut NullSink, public.as_bytes(), BedNetwork::Public).unwrap();
		let private = load_city_beds(&mut NullSink, private.as_bytes(), BedNetwork::Private).unwrap();
		assert_eq!(public[0].date, d(2021, 4, 1));
		assert_eq!(public[0].icu_occupancy, Some(92.0));
		assert_eq!(public[0].icu_beds, Some(1000));
		assert_eq!(public[0].suspected, None);
		assert_eq!(private[0].icu_occupancy, None);
		assert_eq!(private[0].icu_patients, Some(400));
		assert_eq!(private[0].ventilated, None);
	}

	#[test]
	fn field_hospital_headers_with_accents() {
		let data = "data,hospital,comum,ocupação_comum,uti,ocupação_uti,altas,óbitos,transferidos,chegando\n\
			01/05/2020,Pacaembu,200,150,16,4,1200,3,40,\n";
		let rows = load_field_hospitals(&mut NullSink, data.as_bytes()).unwrap();
		assert_eq!(rows[0].hospital, "Pacaembu");
		assert_eq!(rows[0].ward_patients, Some(150));
		assert_eq!(rows[0].stabilization_beds, Some(16));
		assert_eq!(rows[0].deaths, Some(3));
		assert_eq!(rows[0].arriving, None);
	}

	#[test]
	fn vaccination_days_are_written_with_derived_fields() {
		let days = crate::vaccination::derive_vaccination(&[
			(d(2021, 3, 1), VaccinationCounts{first_dose: Some(10), second_dose: Some(0), doses_received: Some(20), population: Some(100)}),
		]);
		let mut buf = Vec::new();
		write_vaccination_csv(&mut buf, &days).unwrap();
		let s = String::from_utf8(buf).unwrap();
		let mut lines = s.lines();
		assert_eq!(lines.next().unwrap(), "date,first_dose,second_dose,total_doses,doses_received,population,pct_first_dose,pct_second_dose,pct_applied,daily_applied");
		assert_eq!(lines.next().unwrap(), "2021-03-01,10,0,10,20,100,10.0,0.0,50.0,10");
	}

	#[test]
	fn weekly_csv_has_stable_columns() {
		let week = "2020-W01".parse().unwrap();
		let table = WideWeeklyTable::new(Geography::City, vec![
			crate::table::WeeklyRow::with_values(week, vec![(Metric::Cases, 100.0)]),
		]).unwrap();
		let mut buf = Vec::new();
		write_weekly_csv(&mut buf, &table).unwrap();
		let s = String::from_utf8(buf).unwrap();
		let mut lines = s.lines();
		let header = lines.next().unwrap();
		assert!(header.starts_with("week,label,cases_sum,deaths_sum,"));
		assert!(header.ends_with(",variation_isolation_lagged_pct"));
		assert_eq!(header.split(',').count(), 2 + 9 + 7);
		assert!(lines.next().unwrap().starts_with("2020-W01,05/jan/20 a 11/jan/20,100,,"));
	}
}
