//! Generic geometry primitives.
//!
//! All public rectangles use a top-left origin with Y growing downward.

use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

impl<T> Rect<T> {
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

impl<T: Copy + Default> Rect<T> {
    /// A rectangle anchored at the origin.
    pub fn from_size(size: Size<T>) -> Self {
        Rect {
            x: T::default(),
            y: T::default(),
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> Size<T> {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Pos<T> {
        Pos {
            x: self.x,
            y: self.y,
        }
    }
}

impl<T: Copy + Add<Output = T> + Sub<Output = T>> Rect<T> {
    pub fn right(&self) -> T {
        self.x + self.width
    }

    pub fn bottom(&self) -> T {
        self.y + self.height
    }

    /// Convert from a top-left origin to a bottom-left origin inside a container
    /// of height `container_height` (and back; the operation is its own inverse).
    pub fn flip_y(&self, container_height: T) -> Self {
        Rect {
            x: self.x,
            y: container_height - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }
}

impl Rect<f32> {
    /// Scale X and Y components independently.
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Rect {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Round every component to the nearest integer.
    pub fn round(&self) -> Rect<i32> {
        Rect {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
            width: self.width.round() as i32,
            height: self.height.round() as i32,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }
}

impl Rect<i32> {
    /// The overlapping part of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect<i32>) -> Option<Rect<i32>> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub const fn new(width: T, height: T) -> Self {
        Size { width, height }
    }

    pub fn cast<U: From<T>>(self) -> Size<U> {
        Size {
            width: U::from(self.width),
            height: U::from(self.height),
        }
    }
}

impl Size<u32> {
    pub fn to_f32(self) -> Size<f32> {
        Size::new(self.width as f32, self.height as f32)
    }

    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl<T: Mul + Copy> Mul<T> for Size<T> {
    type Output = Size<<T as Mul>::Output>;

    fn mul(self, rhs: T) -> Self::Output {
        Size {
            width: self.width * rhs,
            height: self.height * rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos<T> {
    pub x: T,
    pub y: T,
}

impl<T> Pos<T> {
    pub const fn new(x: T, y: T) -> Self {
        Pos { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_y_is_an_involution() {
        let r = Rect::new(10, 20, 30, 40);
        let flipped = r.flip_y(600);
        assert_eq!(flipped.y, 600 - 20 - 40);
        assert_eq!(flipped.flip_y(600), r);
    }

    #[test]
    fn scale_is_per_axis() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0).scale(2.0, 0.5);
        assert_eq!(r, Rect::new(2.0, 1.0, 6.0, 2.0));
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let bounds = Rect::new(0, 0, 64, 32);
        assert_eq!(
            Rect::new(60, 30, 10, 2).intersection(&bounds),
            Some(Rect::new(60, 30, 4, 2))
        );
        assert_eq!(Rect::new(64, 0, 4, 4).intersection(&bounds), None);
        assert_eq!(Rect::new(-2, -2, 4, 4).intersection(&bounds), Some(Rect::new(0, 0, 2, 2)));
    }

    #[test]
    fn degenerate_aspect_ratio() {
        assert_eq!(Rect::new(0.0, 0.0, 10.0, 0.0).aspect_ratio(), 1.0);
        assert_eq!(Rect::new(0.0, 0.0, 16.0, 9.0).aspect_ratio(), 16.0 / 9.0);
    }
}
