use clap::Args;
use stride_core::geo;
use stride_core::LocationSample;

#[derive(Args)]
pub struct DistanceArgs {
    #[arg(allow_hyphen_values = true)]
    lat1: f64,
    #[arg(allow_hyphen_values = true)]
    lon1: f64,
    #[arg(allow_hyphen_values = true)]
    lat2: f64,
    #[arg(allow_hyphen_values = true)]
    lon2: f64,
}

pub fn run(args: DistanceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let a = LocationSample::at(args.lat1, args.lon1, 0)?.coordinate();
    let b = LocationSample::at(args.lat2, args.lon2, 0)?.coordinate();
    println!("{:.1}", geo::distance(a, b));
    Ok(())
}
