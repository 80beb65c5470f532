use std::path::PathBuf;

use clap::Parser;
use indoor_nav::geometry::Point2;
use indoor_nav::routing::shortest_path_from_point;
use indoor_nav::snap::SnapConfig;
use indoor_nav::store_map::StoreMap;
use indoor_nav::turns::{build_maneuvers, format_next_instruction};

#[derive(Parser, Debug)]
struct Args {
    /// Path to a floor graph asset (see store_map::StoreMap)
    #[arg(long)]
    map: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    start_x: f64,
    #[arg(long, allow_hyphen_values = true)]
    start_y: f64,

    /// Destination node id
    #[arg(long)]
    destination: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let map_json = std::fs::read_to_string(&args.map)?;
    let map = StoreMap::from_json(&map_json)?;
    let start = Point2::new(args.start_x, args.start_y);

    let Some(path) = shortest_path_from_point(&map, start, &args.destination, &SnapConfig::default())
    else {
        println!("no route found to {}", args.destination);
        return Ok(());
    };

    println!("route length: {:.1} m", path.length_meters);
    println!("nodes: {:?}", path.node_ids);

    let maneuvers = build_maneuvers(&path.points);
    for m in &maneuvers {
        println!(
            "  [{:>5.1}m] {}",
            m.distance_from_start_meters, m.instruction
        );
    }

    if let Some(first_turn) = maneuvers.iter().find(|m| m.at_index > 0) {
        println!(
            "next instruction: {}",
            format_next_instruction(Some(first_turn), first_turn.distance_from_start_meters)
        );
    }

    Ok(())
}
