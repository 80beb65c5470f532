//! Builds turn-by-turn maneuvers from a route polyline and formats the
//! next spoken/displayed instruction.

use crate::geometry::{bearing, heading_diff, Point2};

const STRAIGHT_THRESHOLD_DEG: f64 = 28.0;
const UTURN_THRESHOLD_DEG: f64 = 150.0;
const ARRIVE_THRESHOLD_M: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManeuverType {
    Start,
    Arrive,
    Left,
    Right,
    Straight,
    Uturn,
}

#[derive(Clone, Debug)]
pub struct Maneuver {
    pub maneuver_type: ManeuverType,
    pub at_index: usize,
    pub point: Point2,
    pub distance_from_start_meters: f64,
    pub instruction: String,
}

/// Build the list of maneuvers for a polyline. `straight` maneuvers below
/// the turn-angle threshold are suppressed (not emitted as interior
/// entries), but `start` and `arrive` always appear.
pub fn build_maneuvers(polyline: &[Point2]) -> Vec<Maneuver> {
    if polyline.is_empty() {
        return Vec::new();
    }

    let mut cumulative = vec![0.0; polyline.len()];
    for i in 1..polyline.len() {
        cumulative[i] = cumulative[i - 1] + polyline[i - 1].distance_to(&polyline[i]);
    }

    let mut out = Vec::new();
    out.push(Maneuver {
        maneuver_type: ManeuverType::Start,
        at_index: 0,
        point: polyline[0],
        distance_from_start_meters: 0.0,
        instruction: "Start walking".to_string(),
    });

    for i in 1..polyline.len().saturating_sub(1) {
        let b1 = bearing(&polyline[i - 1], &polyline[i]);
        let b2 = bearing(&polyline[i], &polyline[i + 1]);
        let delta = heading_diff(b2, b1);

        if delta.abs() < STRAIGHT_THRESHOLD_DEG {
            continue;
        }

        let (maneuver_type, label) = if delta.abs() > UTURN_THRESHOLD_DEG {
            (ManeuverType::Uturn, "make a U-turn")
        } else if delta > 0.0 {
            (ManeuverType::Right, "turn right")
        } else {
            (ManeuverType::Left, "turn left")
        };

        out.push(Maneuver {
            maneuver_type,
            at_index: i,
            point: polyline[i],
            distance_from_start_meters: cumulative[i],
            instruction: label.to_string(),
        });
    }

    let last = polyline.len() - 1;
    out.push(Maneuver {
        maneuver_type: ManeuverType::Arrive,
        at_index: last,
        point: polyline[last],
        distance_from_start_meters: cumulative[last],
        instruction: "Arrive at destination".to_string(),
    });

    out
}

/// Format the spoken/displayed instruction for the current next maneuver
/// `m` and remaining distance `d` (meters).
pub fn format_next_instruction(m: Option<&Maneuver>, d: f64) -> String {
    let Some(m) = m else {
        return "Select a destination".to_string();
    };

    match m.maneuver_type {
        ManeuverType::Start => "Start walking".to_string(),
        ManeuverType::Arrive => {
            if d < ARRIVE_THRESHOLD_M {
                "Arrive".to_string()
            } else {
                "Continue to destination".to_string()
            }
        }
        _ => format!("In {} m, {}", d.ceil() as i64, m.instruction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_arrive_are_always_present_exactly_once() {
        let polyline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let maneuvers = build_maneuvers(&polyline);
        assert_eq!(maneuvers.first().unwrap().maneuver_type, ManeuverType::Start);
        assert_eq!(maneuvers.last().unwrap().maneuver_type, ManeuverType::Arrive);
        assert_eq!(maneuvers.last().unwrap().at_index, polyline.len() - 1);
        assert_eq!(
            maneuvers
                .iter()
                .filter(|m| m.maneuver_type == ManeuverType::Start)
                .count(),
            1
        );
        assert_eq!(
            maneuvers
                .iter()
                .filter(|m| m.maneuver_type == ManeuverType::Arrive)
                .count(),
            1
        );
    }

    #[test]
    fn right_angle_turn_is_classified_as_right() {
        let polyline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let maneuvers = build_maneuvers(&polyline);
        let turn = maneuvers
            .iter()
            .find(|m| m.at_index == 1)
            .expect("interior turn should be emitted, 90deg exceeds threshold");
        assert_eq!(turn.maneuver_type, ManeuverType::Right);
    }

    #[test]
    fn shallow_turn_is_suppressed() {
        let polyline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.5),
        ];
        let maneuvers = build_maneuvers(&polyline);
        assert!(!maneuvers.iter().any(|m| m.at_index == 1));
    }

    #[test]
    fn format_instruction_variants() {
        assert_eq!(format_next_instruction(None, 0.0), "Select a destination");

        let start = Maneuver {
            maneuver_type: ManeuverType::Start,
            at_index: 0,
            point: Point2::new(0.0, 0.0),
            distance_from_start_meters: 0.0,
            instruction: "Start walking".into(),
        };
        assert_eq!(format_next_instruction(Some(&start), 5.0), "Start walking");

        let arrive = Maneuver {
            maneuver_type: ManeuverType::Arrive,
            at_index: 3,
            point: Point2::new(0.0, 0.0),
            distance_from_start_meters: 10.0,
            instruction: "Arrive at destination".into(),
        };
        assert_eq!(format_next_instruction(Some(&arrive), 1.0), "Arrive");
        assert_eq!(
            format_next_instruction(Some(&arrive), 5.0),
            "Continue to destination"
        );

        let left = Maneuver {
            maneuver_type: ManeuverType::Left,
            at_index: 1,
            point: Point2::new(0.0, 0.0),
            distance_from_start_meters: 3.0,
            instruction: "turn left".into(),
        };
        assert_eq!(format_next_instruction(Some(&left), 4.2), "In 5 m, turn left");
    }
}
