use std::fs;

use log::{info, warn};

use covidsp::{Config, DailySnapshot, Geography, Sources, WeeklySummary, naive_today};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let argv: Vec<String> = std::env::args().collect();
	let reference_date = match argv.get(1) {
		Some(s) => covidsp::parse_date(s)?,
		None => naive_today(),
	};
	let config = Config::from_env()?;
	info!("reference date {}, reading from {}", reference_date, config.data_dir.display());

	let sources = Sources::load(&mut *covidsp::default_output(), &config);
	let outcome = covidsp::run(&sources, &config, reference_date);

	fs::create_dir_all(&config.output_dir)?;
	for geography in Geography::all().iter() {
		let report = match &outcome.reports[*geography] {
			Some(report) => report,
			None => continue,
		};

		let path = config.output_dir.join(format!("{}_weekly.csv", geography));
		covidsp::write_weekly_csv(covidsp::magic_create(&path)?, &report.table)?;
		let path = config.output_dir.join(format!("{}_daily.csv", geography));
		covidsp::write_daily_csv(covidsp::magic_create(&path)?, &report.daily)?;
		if !report.vaccination.is_empty() {
			let path = config.output_dir.join(format!("{}_vaccination.csv", geography));
			covidsp::write_vaccination_csv(covidsp::magic_create(&path)?, &report.vaccination)?;
		}

		match WeeklySummary::build(&report.table, reference_date) {
			Some(summary) => print!("{}", summary),
			None => warn!("{}: no weekly figures for the week before {}", geography, reference_date),
		}
		println!("{}", DailySnapshot::build(*geography, &report.daily, reference_date));
	}

	if let Some(beds) = &outcome.state_beds {
		let path = config.output_dir.join(covidsp::SourceKind::StateBeds.file_name());
		covidsp::write_bed_occupancy_csv(covidsp::magic_create(&path)?, beds)?;
	}

	if let Some(beds) = &outcome.city_beds {
		let path = config.output_dir.join("city_beds.csv");
		covidsp::write_city_beds_csv(covidsp::magic_create(&path)?, beds)?;
	}
	for hospital in outcome.field_hospitals.iter() {
		info!(
			"field hospital {} on {}: ward {}, stabilization {}",
			hospital.hospital,
			hospital.date,
			covidsp::format_percent(hospital.ward_occupancy()),
			covidsp::format_percent(hospital.stabilization_occupancy()),
		);
	}

	if !outcome.is_complete() {
		for degraded in outcome.degraded.iter() {
			warn!("incomplete report: {}", degraded);
		}
	}
	Ok(())
}
