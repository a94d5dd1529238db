//! Pin placement
//!
//! Pin counts follow Rent's rule, `floor(k * area^p)`, and pins are dropped
//! uniformly inside a thin band along one randomly chosen edge.

use rand::Rng;

use crate::config::NetlistConfig;
use crate::layout::{Layout, Pin};
use crate::sampling;

/// Number of pins for a rectangle of the given area.
///
/// Never zero for an area above one.
pub fn pin_count(area: f64, k: f64, p: f64) -> usize {
    let count = (k * area.powf(p)).floor() as usize;
    if count == 0 && area > 1.0 {
        1
    } else {
        count
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

const SIDES: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

/// Sample `count` pin offsets for a `w` x `h` rectangle.
///
/// Each offset lies inside the rectangle, within `margin_ratio` of the extent
/// from one edge.
pub fn sample_offsets<R: Rng + ?Sized>(
    rng: &mut R,
    w: f64,
    h: f64,
    count: usize,
    margin_ratio: f64,
) -> Vec<(f64, f64)> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    let margin_x = (w * margin_ratio).min(hw);
    let margin_y = (h * margin_ratio).min(hh);

    (0..count)
        .map(|_| match SIDES[rng.gen_range(0..SIDES.len())] {
            Side::Top => (
                sampling::between(rng, -hw, hw),
                sampling::between(rng, -hh, -hh + margin_y),
            ),
            Side::Bottom => (
                sampling::between(rng, -hw, hw),
                sampling::between(rng, hh - margin_y, hh),
            ),
            Side::Left => (
                sampling::between(rng, -hw, -hw + margin_x),
                sampling::between(rng, -hh, hh),
            ),
            Side::Right => (
                sampling::between(rng, hw - margin_x, hw),
                sampling::between(rng, -hh, hh),
            ),
        })
        .collect()
}

/// Give pins to every rectangle that has none yet. Returns how many were created.
///
/// Rectangles that already carry pins (mirrored symmetric members) are left alone.
pub fn assign_pins<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &NetlistConfig,
    rng: &mut R,
) -> usize {
    let mut created = 0;
    for i in 0..layout.rectangles.len() {
        let rect = &layout.rectangles[i];
        if !rect.pins.is_empty() {
            continue;
        }
        let (id, w, h) = (rect.id, rect.w, rect.h);
        let count = pin_count(w * h, config.k, config.p);
        for offset in sample_offsets(rng, w, h, count, config.pin_edge_margin_ratio) {
            let pin_id = layout.allocate_pin_id();
            layout.rectangles[i].pins.push(Pin::new(pin_id, id, offset));
            created += 1;
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Bounds, Canvas, PinId, RectId, Rectangle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pin_count_follows_rents_rule() {
        assert_eq!(pin_count(10_000.0, 0.05, 0.6), 12);
        assert_eq!(pin_count(2_500.0, 0.1, 0.5), 5);
    }

    #[test]
    fn test_pin_count_floor_of_one() {
        assert_eq!(pin_count(4.0, 0.01, 0.6), 1);
        assert_eq!(pin_count(1.0, 0.01, 0.6), 0);
        assert_eq!(pin_count(0.5, 0.01, 0.6), 0);
    }

    #[test]
    fn test_offsets_stay_in_edge_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let (w, h) = (40.0, 20.0);
        for (dx, dy) in sample_offsets(&mut rng, w, h, 200, 0.1) {
            assert!(dx.abs() <= w / 2.0 && dy.abs() <= h / 2.0);
            let near_x = dx.abs() >= w / 2.0 - 4.0;
            let near_y = dy.abs() >= h / 2.0 - 2.0;
            assert!(near_x || near_y, "({dx}, {dy}) is not near an edge");
        }
    }

    #[test]
    fn test_assign_pins_skips_rectangles_with_pins() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut layout = Layout::new(Canvas::new(200.0, 200.0));
        let mut mirrored = Rectangle::new(RectId(0), Bounds::new(50.0, 50.0, 30.0, 30.0));
        mirrored.pins.push(Pin::new(PinId(0), RectId(0), (15.0, 0.0)));
        layout.push(mirrored);
        layout.push(Rectangle::new(RectId(1), Bounds::new(150.0, 150.0, 50.0, 50.0)));

        let config = NetlistConfig {
            k: 0.1,
            p: 0.5,
            ..NetlistConfig::default()
        };
        let created = assign_pins(&mut layout, &config, &mut rng);
        assert_eq!(created, 5);
        assert_eq!(layout.rectangles[0].pins.len(), 1);

        let ids: Vec<PinId> = layout.rectangles[1].pins.iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=5).map(PinId).collect::<Vec<_>>());
        assert!(layout.rectangles[1].pins.iter().all(|p| p.parent == RectId(1)));
    }
}
