use covidsp::{epi_week_ordinal, week_bucket, week_label};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() < 2 {
		eprintln!("usage: {} DATE...", argv[0]);
		std::process::exit(2);
	}
	for arg in argv[1..].iter() {
		let date = covidsp::parse_date(arg)?;
		let week = week_bucket(date);
		println!("{}\t{}\t{}\t{}", date, week, week_label(&week, true), epi_week_ordinal(date));
	}
	Ok(())
}
