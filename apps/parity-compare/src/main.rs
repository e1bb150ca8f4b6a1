use clap::Parser;

use parity_compare::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	parity_compare::run(args).await
}
