use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use flate2::read::GzDecoder;
use indoor_nav::config::{PositioningConfig, RerouteConfig, SnapConfigDto};
use indoor_nav::geometry::Point2;
use indoor_nav::pdr::{DeviceMotionSample, MagSample};
use indoor_nav::store_map::WifiReading;
use indoor_nav::{NavigationEvent, Session};
use serde::Deserialize;
use serde_json::json;

#[derive(Parser, Debug)]
struct Args {
    /// Path to a session_*.json[.gz] log
    #[arg(long)]
    log: PathBuf,

    /// Path to the floor graph asset (see store_map::StoreMap)
    #[arg(long)]
    map: PathBuf,

    /// Destination node id to route to
    #[arg(long)]
    destination: String,
}

#[derive(Deserialize)]
struct MagReading {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct MotionReading {
    timestamp_ms: f64,
    attitude_yaw_deg: Option<f64>,
    yaw_rate_deg_s: Option<f64>,
    linear_acceleration: Option<(f64, f64, f64)>,
}

#[derive(Deserialize)]
struct WifiScan {
    timestamp_ms: f64,
    readings: Vec<WifiReading>,
}

#[derive(Deserialize)]
struct SessionLog {
    start: Point2,
    magnetometer: Vec<MagReading>,
    motion: Vec<MotionReading>,
    #[serde(default)]
    wifi_scans: Vec<WifiScan>,
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> anyhow::Result<T> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        Ok(serde_json::from_reader(BufReader::new(gz))?)
    } else {
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let map_json = std::fs::read_to_string(&args.map)?;
    let log: SessionLog = load_json(&args.log)?;

    let positioning_config = PositioningConfig {
        start: log.start,
        stride_scale: 1.0,
        wifi_enabled: !log.wifi_scans.is_empty(),
        wifi_scan_interval_ms: 3500.0,
        snap: SnapConfigDto::default(),
    };

    let mut session = Session::start(&map_json, positioning_config, RerouteConfig::default())?;
    session.set_destination(&args.destination, 0.0);

    for mag in &log.magnetometer {
        session.on_magnetometer(MagSample {
            x: mag.x,
            y: mag.y,
            z: mag.z,
        });
    }

    let mut reroute_count = 0usize;
    let mut last_pose = None;

    for m in &log.motion {
        let events = session.on_device_motion(
            m.timestamp_ms,
            DeviceMotionSample {
                attitude_yaw_deg: m.attitude_yaw_deg,
                yaw_rate_deg_s: m.yaw_rate_deg_s,
                linear_acceleration: m.linear_acceleration,
                acceleration_including_gravity: None,
                timestamp_ms: m.timestamp_ms,
            },
        );
        for event in events {
            match event {
                NavigationEvent::Pose(pose) => last_pose = Some(pose),
                NavigationEvent::Route(_) => reroute_count += 1,
                _ => {}
            }
        }
    }

    for scan in &log.wifi_scans {
        let events = session.on_wifi_scan(&scan.readings, scan.timestamp_ms);
        for event in events {
            if let NavigationEvent::Pose(pose) = event {
                last_pose = Some(pose);
            }
        }
    }

    let route_length = session.route().map(|r| r.path.length_meters);

    let summary = json!({
        "log": args.log.display().to_string(),
        "map": args.map.display().to_string(),
        "destination": args.destination,
        "final_pose": last_pose.map(|p| json!({
            "x": p.x, "y": p.y, "heading_deg": p.heading_deg, "snapped": p.snapped,
        })),
        "route_length_meters": route_length,
        "reroute_count": reroute_count,
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
