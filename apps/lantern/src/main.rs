use clap::Parser;

use lantern::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	lantern::run(args)
}
