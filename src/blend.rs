//! Aseprite's blend modes, matching its integer math bit for bit.

use serde::Serialize;

use crate::error::FormatErrorKind;
use crate::pixel::Color;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

impl BlendMode {
    /// In file order.
    pub const ALL: [BlendMode; 19] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
        BlendMode::Addition,
        BlendMode::Subtract,
        BlendMode::Divide,
    ];

    pub fn from_u16(value: u16) -> Result<Self, FormatErrorKind> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(FormatErrorKind::BlendMode(value))
    }

    /// Composites `src` over `backdrop` at `opacity`.
    pub fn blend(self, backdrop: Color, src: Color, opacity: u8) -> Color {
        let channels = |f: fn(i32, i32) -> i32| {
            Color::new(
                f(backdrop.r.into(), src.r.into()) as u8,
                f(backdrop.g.into(), src.g.into()) as u8,
                f(backdrop.b.into(), src.b.into()) as u8,
                src.a,
            )
        };
        let src = match self {
            BlendMode::Normal => src,
            BlendMode::Multiply => channels(multiply),
            BlendMode::Screen => channels(screen),
            BlendMode::Overlay => channels(overlay),
            BlendMode::Darken => channels(|b: i32, s: i32| b.min(s)),
            BlendMode::Lighten => channels(|b: i32, s: i32| b.max(s)),
            BlendMode::ColorDodge => channels(color_dodge),
            BlendMode::ColorBurn => channels(color_burn),
            BlendMode::HardLight => channels(hard_light),
            BlendMode::SoftLight => channels(soft_light),
            BlendMode::Difference => channels(|b: i32, s: i32| (b - s).abs()),
            BlendMode::Exclusion => channels(exclusion),
            BlendMode::Addition => channels(|b: i32, s: i32| (b + s).min(255)),
            BlendMode::Subtract => channels(|b: i32, s: i32| (b - s).max(0)),
            BlendMode::Divide => channels(divide),
            BlendMode::Hue => hsl::hue(backdrop, src),
            BlendMode::Saturation => hsl::saturation(backdrop, src),
            BlendMode::Color => hsl::color(backdrop, src),
            BlendMode::Luminosity => hsl::luminosity(backdrop, src),
        };
        normal(backdrop, src, opacity)
    }
}

/// `round(a * b / 255)` in 8-bit fixed point.
pub fn mul_un8(a: u8, b: u8) -> u8 {
    mul(a.into(), b.into()) as u8
}

fn mul(a: i32, b: i32) -> i32 {
    let t = a * b + 0x80;
    ((t >> 8) + t) >> 8
}

/// `round(a * 255 / b)`; `b` must be nonzero.
fn div(a: i32, b: i32) -> i32 {
    (a * 0xff + b / 2) / b
}

fn normal(backdrop: Color, src: Color, opacity: u8) -> Color {
    if backdrop.a == 0 {
        return Color::new(src.r, src.g, src.b, mul_un8(src.a, opacity));
    }
    if src.a == 0 {
        return backdrop;
    }
    let sa = mul(src.a.into(), opacity.into());
    let ba = i32::from(backdrop.a);
    let ra = sa + ba - mul(ba, sa);
    let channel = |b: u8, s: u8| {
        let b = i32::from(b);
        (b + (i32::from(s) - b) * sa / ra) as u8
    };
    Color::new(
        channel(backdrop.r, src.r),
        channel(backdrop.g, src.g),
        channel(backdrop.b, src.b),
        ra as u8,
    )
}

fn multiply(b: i32, s: i32) -> i32 {
    mul(b, s)
}

fn screen(b: i32, s: i32) -> i32 {
    b + s - mul(b, s)
}

fn overlay(b: i32, s: i32) -> i32 {
    hard_light(s, b)
}

fn hard_light(b: i32, s: i32) -> i32 {
    if s < 128 {
        multiply(b, s << 1)
    } else {
        screen(b, (s << 1) - 255)
    }
}

fn color_dodge(b: i32, s: i32) -> i32 {
    if b == 0 {
        return 0;
    }
    let s = 255 - s;
    if b >= s {
        255
    } else {
        div(b, s)
    }
}

fn color_burn(b: i32, s: i32) -> i32 {
    if b == 255 {
        return 255;
    }
    let b = 255 - b;
    if b >= s {
        0
    } else {
        255 - div(b, s)
    }
}

fn soft_light(b: i32, s: i32) -> i32 {
    let b = f64::from(b) / 255.0;
    let s = f64::from(s) / 255.0;
    let d = if b <= 0.25 {
        ((16.0 * b - 12.0) * b + 4.0) * b
    } else {
        b.sqrt()
    };
    let r = if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        b + (2.0 * s - 1.0) * (d - b)
    };
    (r * 255.0 + 0.5) as i32
}

fn exclusion(b: i32, s: i32) -> i32 {
    b + s - 2 * mul(b, s)
}

fn divide(b: i32, s: i32) -> i32 {
    if b == 0 {
        0
    } else if b >= s {
        255
    } else {
        div(b, s)
    }
}

/// The non-separable modes, working on `[r, g, b]` in `0.0..=1.0`.
mod hsl {
    use crate::pixel::Color;

    type Rgb = [f64; 3];

    fn to_rgb(c: Color) -> Rgb {
        [c.r, c.g, c.b].map(|v| f64::from(v) / 255.0)
    }

    fn from_rgb(c: Rgb, alpha: u8) -> Color {
        let [r, g, b] = c.map(|v| ((255.0 * v) as i32).clamp(0, 255) as u8);
        Color::new(r, g, b, alpha)
    }

    fn lum([r, g, b]: Rgb) -> f64 {
        0.3 * r + 0.59 * g + 0.11 * b
    }

    fn sat([r, g, b]: Rgb) -> f64 {
        r.max(g.max(b)) - r.min(g.min(b))
    }

    fn clip_color(c: &mut Rgb) {
        let l = lum(*c);
        let n = c[0].min(c[1].min(c[2]));
        let x = c[0].max(c[1].max(c[2]));
        if n < 0.0 {
            for v in c.iter_mut() {
                *v = l + (*v - l) * l / (l - n);
            }
        }
        if x > 1.0 {
            for v in c.iter_mut() {
                *v = l + (*v - l) * (1.0 - l) / (x - l);
            }
        }
    }

    fn set_lum(c: &mut Rgb, l: f64) {
        let d = l - lum(*c);
        for v in c.iter_mut() {
            *v += d;
        }
        clip_color(c);
    }

    /// Ties pick components the same way Aseprite does, which decides the
    /// result when two channels are equal.
    fn set_sat(c: &mut Rgb, s: f64) {
        fn lesser(c: &Rgb, x: usize, y: usize) -> usize {
            if c[x] < c[y] {
                x
            } else {
                y
            }
        }
        fn greater(c: &Rgb, x: usize, y: usize) -> usize {
            if c[x] > c[y] {
                x
            } else {
                y
            }
        }

        let min = lesser(c, 0, lesser(c, 1, 2));
        let max = greater(c, 0, greater(c, 1, 2));
        let mid = if c[0] > c[1] {
            if c[1] > c[2] {
                1
            } else if c[0] > c[2] {
                2
            } else {
                0
            }
        } else if c[1] > c[2] {
            if c[2] > c[0] {
                2
            } else {
                0
            }
        } else {
            1
        };

        if c[max] > c[min] {
            c[mid] = (c[mid] - c[min]) * s / (c[max] - c[min]);
            c[max] = s;
        } else {
            c[max] = 0.0;
            c[mid] = 0.0;
        }
        c[min] = 0.0;
    }

    pub fn hue(backdrop: Color, src: Color) -> Color {
        let b = to_rgb(backdrop);
        let mut c = to_rgb(src);
        set_sat(&mut c, sat(b));
        set_lum(&mut c, lum(b));
        from_rgb(c, src.a)
    }

    pub fn saturation(backdrop: Color, src: Color) -> Color {
        let s = sat(to_rgb(src));
        let mut c = to_rgb(backdrop);
        let l = lum(c);
        set_sat(&mut c, s);
        set_lum(&mut c, l);
        from_rgb(c, src.a)
    }

    pub fn color(backdrop: Color, src: Color) -> Color {
        let mut c = to_rgb(src);
        set_lum(&mut c, lum(to_rgb(backdrop)));
        from_rgb(c, src.a)
    }

    pub fn luminosity(backdrop: Color, src: Color) -> Color {
        let mut c = to_rgb(backdrop);
        set_lum(&mut c, lum(to_rgb(src)));
        from_rgb(c, src.a)
    }
}
