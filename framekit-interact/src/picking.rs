//! Screen-space picking of manipulator handles

use std::f64::consts::TAU;

use nalgebra::Point2;

use framekit_core::{point_segment_distance_2d, Point3d, Vector3d, GEOMETRY_EPSILON};

use crate::viewport::Viewport;

/// Number of segments used to approximate a ring when picking
const RING_SAMPLES: usize = 64;

/// Pickable world-space shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickShape {
    /// Line segment with a sphere at its end
    Segment {
        start: Point3d,
        end: Point3d,
        tip_radius: f64,
    },
    /// Circle around `center` in the plane orthogonal to `normal`
    Circle {
        center: Point3d,
        normal: Vector3d,
        radius: f64,
    },
}

/// Result of a successful pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Index into the candidate slice
    pub index: usize,
    /// Display depth of the closest point, 0 at the near plane
    pub depth: f64,
    /// Distance in pixels between the pointer and the shape
    pub distance: f64,
    /// World-space point of the shape closest to the pointer
    pub point: Point3d,
}

/// Closest approach of the pointer to one shape
#[derive(Debug, Clone, Copy)]
struct Approach {
    distance: f64,
    depth: f64,
    point: Point3d,
}

/// Finds the shape under a display point
pub trait PickService {
    fn pick(
        &self,
        view: &dyn Viewport,
        display: &Point2<f64>,
        candidates: &[PickShape],
    ) -> Option<PickHit>;
}

/// Projects candidate shapes to display space and measures pixel distance
///
/// `tolerance` is a fraction of the viewport diagonal. Among shapes within
/// tolerance the one closest to the camera wins; on equal depth the earlier
/// candidate wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricPicker {
    pub tolerance: f64,
}

impl GeometricPicker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    fn project(view: &dyn Viewport, p: &Point3d) -> Option<(Point2<f64>, f64)> {
        let d = view.world_to_display(p)?;
        Some((Point2::new(d.x, d.y), d.z))
    }

    /// Closest approach of a projected polyline
    ///
    /// The world point is interpolated along the nearest sub-segment.
    fn polyline_approach(
        view: &dyn Viewport,
        display: &Point2<f64>,
        points: impl IntoIterator<Item = Point3d>,
    ) -> Option<Approach> {
        let projected: Vec<(Point3d, Point2<f64>, f64)> = points
            .into_iter()
            .map(|p| Self::project(view, &p).map(|(d, depth)| (p, d, depth)))
            .collect::<Option<_>>()?;

        projected
            .windows(2)
            .map(|w| {
                let ((pa, a, da), (pb, b, db)) = (w[0], w[1]);
                let (distance, t) = point_segment_distance_2d(display, &a, &b);
                Approach {
                    distance,
                    depth: da + (db - da) * t,
                    point: pa + (pb - pa) * t,
                }
            })
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
    }

    /// Pixel radius of a world-space sphere at `center`
    fn projected_radius(view: &dyn Viewport, center: &Point3d, radius: f64) -> Option<f64> {
        let camera = view.camera();
        let up = camera.orthogonalized_view_up()?;
        let (c, _) = Self::project(view, center)?;
        let (r, _) = Self::project(view, &(center + up * radius))?;
        Some((r - c).norm())
    }

    fn measure(
        &self,
        view: &dyn Viewport,
        display: &Point2<f64>,
        shape: &PickShape,
    ) -> Option<Approach> {
        let tolerance_px = self.tolerance * view.diagonal();
        match *shape {
            PickShape::Segment {
                start,
                end,
                tip_radius,
            } => {
                let shaft = Self::polyline_approach(view, display, [start, end])
                    .filter(|a| a.distance <= tolerance_px);

                let tip = Self::project(view, &end).and_then(|(tip, depth)| {
                    let radius_px = Self::projected_radius(view, &end, tip_radius).unwrap_or(0.0);
                    let distance = (display - tip).norm();
                    if distance > radius_px + tolerance_px {
                        return None;
                    }
                    let point = view.display_to_world(display, depth).unwrap_or(end);
                    Some(Approach {
                        distance,
                        depth,
                        point,
                    })
                });

                match (shaft, tip) {
                    (Some(a), Some(b)) => Some(if a.depth <= b.depth { a } else { b }),
                    (a, b) => a.or(b),
                }
            }
            PickShape::Circle {
                center,
                normal,
                radius,
            } => {
                let n = normal.try_normalize(GEOMETRY_EPSILON)?;
                let helper = if n.x.abs() < 0.9 { Vector3d::x() } else { Vector3d::y() };
                let e1 = n.cross(&helper).normalize();
                let e2 = n.cross(&e1);
                let samples = (0..=RING_SAMPLES).map(|i| {
                    let u = TAU * i as f64 / RING_SAMPLES as f64;
                    center + (e1 * u.cos() + e2 * u.sin()) * radius
                });
                Self::polyline_approach(view, display, samples)
                    .filter(|a| a.distance <= tolerance_px)
            }
        }
    }
}

impl Default for GeometricPicker {
    fn default() -> Self {
        Self::new(0.005)
    }
}

impl PickService for GeometricPicker {
    fn pick(
        &self,
        view: &dyn Viewport,
        display: &Point2<f64>,
        candidates: &[PickShape],
    ) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;
        for (index, shape) in candidates.iter().enumerate() {
            let Some(approach) = self.measure(view, display, shape) else {
                continue;
            };
            let closer = match best {
                Some(hit) => approach.depth < hit.depth - GEOMETRY_EPSILON,
                None => true,
            };
            if closer {
                best = Some(PickHit {
                    index,
                    depth: approach.depth,
                    distance: approach.distance,
                    point: approach.point,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use approx::assert_relative_eq;
    use crate::viewport::ProjectedViewport;

    fn view() -> ProjectedViewport {
        ProjectedViewport::new(Camera::default(), 800, 600)
    }

    fn display_of(view: &ProjectedViewport, p: Point3d) -> Point2<f64> {
        let d = view.world_to_display(&p).unwrap();
        Point2::new(d.x, d.y)
    }

    #[test]
    fn test_pick_segment() {
        let view = view();
        let shapes = [PickShape::Segment {
            start: Point3d::origin(),
            end: Point3d::new(1.0, 0.0, 0.0),
            tip_radius: 0.05,
        }];
        let picker = GeometricPicker::default();

        let on = display_of(&view, Point3d::new(0.5, 0.0, 0.0));
        assert_eq!(picker.pick(&view, &on, &shapes).map(|h| h.index), Some(0));

        let off = display_of(&view, Point3d::new(0.5, 0.5, 0.0));
        assert!(picker.pick(&view, &off, &shapes).is_none());
    }

    #[test]
    fn test_segment_hit_reports_world_point() {
        let view = view();
        let shapes = [PickShape::Segment {
            start: Point3d::origin(),
            end: Point3d::new(1.0, 0.0, 0.0),
            tip_radius: 0.05,
        }];
        let midpoint = display_of(&view, Point3d::new(0.5, 0.0, 0.0));
        let hit = GeometricPicker::default().pick(&view, &midpoint, &shapes).unwrap();

        assert_eq!(hit.index, 0);
        assert_relative_eq!(hit.distance, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.coords, Vector3d::new(0.5, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_tip_hit_unprojects_pointer() {
        let view = view();
        let end = Point3d::new(1.0, 0.0, 0.0);
        let shapes = [PickShape::Segment {
            start: Point3d::origin(),
            end,
            tip_radius: 0.2,
        }];
        // beyond the shaft but inside the tip sphere
        let beside = display_of(&view, Point3d::new(1.1, 0.0, 0.0));
        let hit = GeometricPicker::default().pick(&view, &beside, &shapes).unwrap();
        assert_relative_eq!(hit.point.coords, Vector3d::new(1.1, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_pick_circle() {
        let view = view();
        let shapes = [PickShape::Circle {
            center: Point3d::origin(),
            normal: Vector3d::z(),
            radius: 1.0,
        }];
        let picker = GeometricPicker::default();

        let rim = display_of(&view, Point3d::new(0.0, 1.0, 0.0));
        assert!(picker.pick(&view, &rim, &shapes).is_some());

        let center = display_of(&view, Point3d::origin());
        assert!(picker.pick(&view, &center, &shapes).is_none());

        let hit = picker.pick(&view, &rim, &shapes).unwrap();
        assert_relative_eq!(hit.point.coords, Vector3d::new(0.0, 1.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_nearest_by_depth_wins() {
        let view = view();
        let far = PickShape::Segment {
            start: Point3d::new(-1.0, 0.0, -1.0),
            end: Point3d::new(1.0, 0.0, -1.0),
            tip_radius: 0.0,
        };
        let near = PickShape::Segment {
            start: Point3d::new(-1.0, 0.0, 1.0),
            end: Point3d::new(1.0, 0.0, 1.0),
            tip_radius: 0.0,
        };
        let center = display_of(&view, Point3d::origin());
        let hit = GeometricPicker::default().pick(&view, &center, &[far, near]).unwrap();
        assert_eq!(hit.index, 1);
    }
}
