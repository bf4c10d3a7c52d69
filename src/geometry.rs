//! 2D geometry primitives for coordinate assignment.
//!
//! [`Vec2`] is the position/direction type used throughout the layout
//! pipeline. The polygon helpers ([`circumradius`], [`apothem`],
//! [`central_angle`]) give the closed-form measurements for placing ring
//! members on a regular polygon of a given bond length.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn distance_sq(self, other: Vec2) -> f64 {
        (self - other).length_sq()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Unit vector in the same direction. Zero-length vectors are returned
    /// unchanged so degenerate geometry never turns into NaN.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// Angle of the vector relative to the positive x axis, in radians.
    pub fn angle(self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            return 0.0;
        }
        self.y.atan2(self.x)
    }

    pub fn rotated(self, angle: f64) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn rotated_around(self, angle: f64, center: Vec2) -> Vec2 {
        (self - center).rotated(angle) + center
    }

    pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
        Vec2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    /// The two unit normals of the segment from `a` to `b`.
    pub fn unit_normals(a: Vec2, b: Vec2) -> [Vec2; 2] {
        let delta = b - a;
        [
            Vec2::new(-delta.y, delta.x).normalized(),
            Vec2::new(delta.y, -delta.x).normalized(),
        ]
    }

    /// Sign of the cross product with `other`: -1 when `other` lies
    /// clockwise of `self`, 1 when counterclockwise, 0 when collinear.
    pub fn clockwise(self, other: Vec2) -> i8 {
        let a = self.y * other.x;
        let b = self.x * other.y;
        if a < b {
            -1
        } else if a == b {
            0
        } else {
            1
        }
    }

    /// [`Vec2::clockwise`] for points, measured around `center` relative to
    /// `reference`.
    pub fn relative_clockwise(self, reference: Vec2, center: Vec2) -> i8 {
        let a = (self.y - center.y) * (reference.x - center.x);
        let b = (self.x - center.x) * (reference.y - center.y);
        if a < b {
            -1
        } else if a == b {
            0
        } else {
            1
        }
    }

    /// Pick the sign of `angle` such that rotating `self` around `center`
    /// by the result moves it away from `from`.
    pub fn rotate_away_from_angle(self, from: Vec2, center: Vec2, angle: f64) -> f64 {
        let probe = self.rotated_around(angle, center);
        let dist_a = probe.distance_sq(from);
        let probe = probe.rotated_around(-2.0 * angle, center);
        let dist_b = probe.distance_sq(from);
        if dist_b < dist_a { angle } else { -angle }
    }

    /// Rotate `self` around `center` by `angle`, in whichever direction
    /// increases the distance to `from`.
    pub fn rotated_away_from(self, from: Vec2, center: Vec2, angle: f64) -> Vec2 {
        let a = self.rotate_away_from_angle(from, center, angle);
        self.rotated_around(a, center)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Circumradius of a regular polygon with `n` sides of length `side`.
pub fn circumradius(side: f64, n: usize) -> f64 {
    side / (2.0 * (std::f64::consts::PI / n as f64).sin())
}

/// Apothem (center to edge midpoint) for circumradius `r` and `n` sides.
pub fn apothem(r: f64, n: usize) -> f64 {
    r * (std::f64::consts::PI / n as f64).cos()
}

/// Central angle subtended by one side of a regular `n`-gon.
pub fn central_angle(n: usize) -> f64 {
    std::f64::consts::TAU / n as f64
}

pub fn to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}
