use crate::share::{Format, QrOptions, Style};
use anyhow::{Context, bail};
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{Color, EcLevel, QrCode};
use std::io::Cursor;

pub const MAX_SIZE: u32 = 4096;

// Height added under the code when there is a caption.
const CAPTION_BAND: u32 = 40;
// Gap kept clear of dots around the center badge, in pixels.
const BADGE_GAP: f64 = 4.0;
const FONT_FAMILY: &str = "system-ui, -apple-system, sans-serif";

const BLACK: Rgb<u8> = Rgb([0x00, 0x00, 0x00]);
const ARXIV_RED: Rgb<u8> = Rgb([0xb3, 0x1b, 0x1b]);
const PAPER: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const BADGE_BORDER: Rgb<u8> = Rgb([0xe5, 0xe7, 0xeb]);
const LABEL_INK: Rgb<u8> = Rgb([0x37, 0x41, 0x51]);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    // A square with rounded corners.
    Square {
        x: f64,
        y: f64,
        side: f64,
        radius: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
}

impl Shape {
    fn contains(&self, px: f64, py: f64) -> bool {
        match *self {
            Shape::Square { x, y, side, radius } => {
                if px < x || py < y || px > x + side || py > y + side {
                    return false;
                }

                // Distance outside the inner square the corners are rounded around.
                let dx = (x + radius - px).max(px - (x + side - radius)).max(0.0);
                let dy = (y + radius - py).max(py - (y + side - radius)).max(0.0);
                dx * dx + dy * dy <= radius * radius
            }
            Shape::Circle { cx, cy, r } => {
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            }
        }
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        match *self {
            Shape::Square { x, y, side, .. } => (x, y, x + side, y + side),
            Shape::Circle { cx, cy, r } => (cx - r, cy - r, cx + r, cy + r),
        }
    }

    fn inset(&self, by: f64) -> Shape {
        match *self {
            Shape::Square { x, y, side, radius } => Shape::Square {
                x: x + by,
                y: y + by,
                side: (side - 2.0 * by).max(0.0),
                radius: (radius - by).max(0.0),
            },
            Shape::Circle { cx, cy, r } => Shape::Circle {
                cx,
                cy,
                r: (r - by).max(0.0),
            },
        }
    }

    fn to_svg(&self, fill: Rgb<u8>) -> String {
        match *self {
            Shape::Square { x, y, side, radius } => format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}"/>"#,
                num(x),
                num(y),
                num(side),
                num(side),
                num(radius),
                hex(fill),
            ),
            Shape::Circle { cx, cy, r } => format!(
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                num(cx),
                num(cy),
                num(r),
                hex(fill),
            ),
        }
    }
}

#[derive(Debug)]
struct Mark {
    shape: Shape,
    fill: Rgb<u8>,
}

// A code laid out on a square canvas of `size` pixels. Marks are painted in
// order, later ones on top.
#[derive(Debug)]
struct Layout {
    size: u32,
    module: f64,
    marks: Vec<Mark>,
    badge: Option<Shape>,
}

fn in_finder(x: usize, y: usize, width: usize) -> bool {
    let near = |v: usize| v < 7;
    let far = |v: usize| v >= width - 7;
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
}

fn layout(data: &str, options: &QrOptions) -> anyhow::Result<Layout> {
    if options.size > MAX_SIZE {
        bail!("Size must be at most {MAX_SIZE}px, got {}px", options.size);
    }
    if options.margin > MAX_SIZE {
        bail!("Margin must be at most {MAX_SIZE} modules, got {}", options.margin);
    }

    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::Q)
        .context("Could not encode QR code")?;
    let width = code.width();
    let colors = code.to_colors();

    // Modules are whole pixels so edges stay crisp; any slack is split
    // evenly around the quiet zone.
    let span = options
        .margin
        .checked_mul(2)
        .and_then(|margin| margin.checked_add(width as u32))
        .context("Margin is too large")?;
    if options.size < span {
        bail!(
            "Size {}px is too small for a {width} module code with a margin of {}",
            options.size,
            options.margin
        );
    }
    let module_px = options.size / span;
    let module = module_px as f64;
    let origin = ((options.size - module_px * span) / 2 + module_px * options.margin) as f64;

    let ink = match options.style {
        Style::Plain => BLACK,
        Style::Arxiv => ARXIV_RED,
    };

    let size = options.size as f64;
    let badge = options.center_label.text().map(|_| {
        let side = size * 0.25;
        Shape::Square {
            x: (size - side) / 2.0,
            y: (size - side) / 2.0,
            side,
            radius: side * 0.15,
        }
    });
    let hidden = badge.map(|badge| {
        let (x0, y0, x1, y1) = badge.bounds();
        (x0 - BADGE_GAP, y0 - BADGE_GAP, x1 + BADGE_GAP, y1 + BADGE_GAP)
    });

    let mut marks = Vec::new();
    for y in 0..width {
        for x in 0..width {
            if colors[y * width + x] != Color::Dark || in_finder(x, y, width) {
                continue;
            }

            let cx = origin + (x as f64 + 0.5) * module;
            let cy = origin + (y as f64 + 0.5) * module;
            if let Some((x0, y0, x1, y1)) = hidden
                && cx >= x0
                && cx <= x1
                && cy >= y0
                && cy <= y1
            {
                continue;
            }

            marks.push(Mark {
                shape: Shape::Circle {
                    cx,
                    cy,
                    r: module / 2.0,
                },
                fill: ink,
            });
        }
    }

    // Finder patterns: an extra rounded ring around a dot.
    for (fx, fy) in [(0, 0), (width - 7, 0), (0, width - 7)] {
        let x = origin + fx as f64 * module;
        let y = origin + fy as f64 * module;
        let ring = Shape::Square {
            x,
            y,
            side: 7.0 * module,
            radius: 2.5 * module,
        };

        marks.push(Mark {
            shape: ring,
            fill: ink,
        });
        marks.push(Mark {
            shape: ring.inset(module),
            fill: PAPER,
        });
        marks.push(Mark {
            shape: Shape::Circle {
                cx: x + 3.5 * module,
                cy: y + 3.5 * module,
                r: 1.5 * module,
            },
            fill: ink,
        });
    }

    Ok(Layout {
        size: options.size,
        module,
        marks,
        badge,
    })
}

/// Render `data` in the format the options ask for.
pub fn render(data: &str, options: &QrOptions) -> anyhow::Result<Vec<u8>> {
    match options.fmt {
        Format::Png => render_png(data, options),
        Format::Svg => Ok(render_svg(data, options)?.into_bytes()),
    }
}

pub fn mime_type(fmt: Format) -> &'static str {
    match fmt {
        Format::Png => "image/png",
        Format::Svg => "image/svg+xml",
    }
}

// There is no font rasterizer here, so text only makes it into SVG output.
pub fn render_png(data: &str, options: &QrOptions) -> anyhow::Result<Vec<u8>> {
    let layout = layout(data, options)?;

    if !options.caption.is_empty() || options.center_label.text().is_some() {
        tracing::info!("PNG output leaves out caption and badge text, use SVG to keep them");
    }

    let mut canvas = RgbImage::from_pixel(layout.size, layout.size, PAPER);
    for mark in &layout.marks {
        paint(&mut canvas, &mark.shape, mark.fill);
    }
    if let Some(badge) = layout.badge {
        paint(&mut canvas, &badge, BADGE_BORDER);
        paint(&mut canvas, &badge.inset(1.0), PAPER);
    }

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("Could not encode PNG")?;

    Ok(bytes)
}

fn paint(canvas: &mut RgbImage, shape: &Shape, fill: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let (x0, y0, x1, y1) = shape.bounds();

    let xs = x0.floor().max(0.0) as u32..(x1.ceil() as u32).min(width);
    let ys = y0.floor().max(0.0) as u32..(y1.ceil() as u32).min(height);

    for py in ys {
        for px in xs.clone() {
            // Sample at the pixel center.
            if shape.contains(px as f64 + 0.5, py as f64 + 0.5) {
                canvas.put_pixel(px, py, fill);
            }
        }
    }
}

pub fn render_svg(data: &str, options: &QrOptions) -> anyhow::Result<String> {
    let layout = layout(data, options)?;
    let size = layout.size;
    let height = if options.caption.is_empty() {
        size
    } else {
        size + CAPTION_BAND
    };

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{height}" viewBox="0 0 {size} {height}">"#
    );
    svg.push('\n');
    svg.push_str(&format!(
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        hex(PAPER)
    ));
    svg.push('\n');

    for mark in &layout.marks {
        svg.push_str(&mark.shape.to_svg(mark.fill));
        svg.push('\n');
    }

    if let (Some(badge), Some(text)) = (layout.badge, options.center_label.text())
        && let Shape::Square { x, y, side, radius } = badge
    {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
            num(x),
            num(y),
            num(side),
            num(side),
            num(radius),
            hex(PAPER),
            hex(BADGE_BORDER),
        ));
        svg.push('\n');
        svg.push_str(&text_element(
            x + side / 2.0,
            y + side / 2.0,
            (side * 0.25).max(10.0),
            500,
            text,
        ));
        svg.push('\n');
    }

    if !options.caption.is_empty() {
        let size = size as f64;
        svg.push_str(&text_element(
            size / 2.0,
            size + 25.0,
            (size * 0.024).max(12.0),
            400,
            &options.caption,
        ));
        svg.push('\n');
    }

    svg.push_str("</svg>\n");

    tracing::debug!(module = layout.module, marks = layout.marks.len(), "rendered svg");
    Ok(svg)
}

fn text_element(x: f64, y: f64, font_size: f64, weight: u32, text: &str) -> String {
    format!(
        r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" font-family="{FONT_FAMILY}" font-size="{}" font-weight="{weight}" fill="{}">{}</text>"#,
        num(x),
        num(y),
        num(font_size),
        hex(LABEL_INK),
        html_escape::encode_text(text),
    )
}

fn hex(color: Rgb<u8>) -> String {
    let [r, g, b] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

// Two decimals at most, without trailing zeros.
fn num(value: f64) -> String {
    let formatted = format!("{value:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::CenterLabel;

    const TARGET: &str = "https://arxiv.org/abs/2501.01234";

    fn options(fmt: Format) -> QrOptions {
        QrOptions {
            fmt,
            size: 512,
            caption: String::new(),
            center_label: CenterLabel::None,
            ..QrOptions::default()
        }
    }

    fn finder(layout: &Layout) -> (f64, f64, f64) {
        layout
            .marks
            .iter()
            .find_map(|mark| match mark.shape {
                Shape::Square { x, y, side, .. } => Some((x, y, side)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_num() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(100.0), "100");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(12.288), "12.29");
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(ARXIV_RED), "#b31b1b");
        assert_eq!(hex(PAPER), "#ffffff");
    }

    #[test]
    fn test_rounded_square_corners() {
        let square = Shape::Square {
            x: 0.0,
            y: 0.0,
            side: 10.0,
            radius: 3.0,
        };
        assert!(square.contains(5.0, 5.0));
        assert!(square.contains(5.0, 0.2));
        assert!(!square.contains(0.2, 0.2));
        assert!(!square.contains(11.0, 5.0));
    }

    #[test]
    fn test_layout_has_three_finders() {
        let layout = layout(TARGET, &options(Format::Svg)).unwrap();
        let rings = layout
            .marks
            .iter()
            .filter(|mark| matches!(mark.shape, Shape::Square { .. }) && mark.fill == ARXIV_RED)
            .count();
        assert_eq!(rings, 3);
        assert!(layout.module >= 1.0);
    }

    #[test]
    fn test_layout_rejects_tiny_and_huge_sizes() {
        let tiny = QrOptions {
            size: 20,
            ..options(Format::Png)
        };
        assert!(layout(TARGET, &tiny).is_err());

        let huge = QrOptions {
            size: MAX_SIZE + 1,
            ..options(Format::Png)
        };
        assert!(layout(TARGET, &huge).is_err());
    }

    #[test]
    fn test_layout_rejects_huge_margins() {
        for margin in [MAX_SIZE + 1, u32::MAX / 2 + 1, u32::MAX] {
            let wide = QrOptions {
                margin,
                ..options(Format::Svg)
            };
            assert!(layout(TARGET, &wide).is_err(), "margin {margin}");
        }
    }

    #[test]
    fn test_render_rejects_shared_extremes() {
        let restored = crate::share::decode(
            "/?id=2501.01234&fmt=svg&margin=4294967295&center=none&caption=",
        )
        .options;
        assert!(render(TARGET, &restored).is_err());

        let zero = crate::share::decode("/?id=2501.01234&fmt=png&size=0").options;
        assert!(render(TARGET, &zero).is_err());
    }

    #[test]
    fn test_badge_hides_dots() {
        let plain = layout(TARGET, &options(Format::Svg)).unwrap();
        let labelled = layout(
            TARGET,
            &QrOptions {
                center_label: CenterLabel::Preprint,
                ..options(Format::Svg)
            },
        )
        .unwrap();

        let badge = labelled.badge.unwrap();
        assert!(labelled.marks.len() < plain.marks.len());
        assert!(labelled.marks.iter().all(|mark| match mark.shape {
            Shape::Circle { cx, cy, .. } => !badge.contains(cx, cy),
            _ => true,
        }));
    }

    #[test]
    fn test_png_pixels() {
        let options = QrOptions {
            center_label: CenterLabel::Arxiv,
            ..options(Format::Png)
        };
        let finder = finder(&layout(TARGET, &options).unwrap());
        let bytes = render(TARGET, &options).unwrap();

        let image = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (512, 512));

        let (x, y, side) = finder;
        let module = side / 7.0;
        let pixel = |px: f64, py: f64| *image.get_pixel(px as u32, py as u32);

        // Ring, the light gap inside it, then the center dot.
        assert_eq!(pixel(x + side / 2.0, y + module / 2.0), ARXIV_RED);
        assert_eq!(pixel(x + 1.5 * module, y + side / 2.0), PAPER);
        assert_eq!(pixel(x + side / 2.0, y + side / 2.0), ARXIV_RED);

        // Inside the badge.
        assert_eq!(*image.get_pixel(256, 256), PAPER);
    }

    #[test]
    fn test_plain_style_is_black() {
        let svg = render_svg(
            TARGET,
            &QrOptions {
                style: Style::Plain,
                ..options(Format::Svg)
            },
        )
        .unwrap();
        assert!(svg.contains(r##"fill="#000000""##));
        assert!(!svg.contains("#b31b1b"));
    }

    #[test]
    fn test_svg_without_caption() {
        let svg = render_svg(TARGET, &options(Format::Svg)).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="512" height="512""#));
        assert!(svg.contains("#b31b1b"));
        assert!(!svg.contains("<text"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_svg_caption_and_badge() {
        let svg = render_svg(
            TARGET,
            &QrOptions {
                caption: "arXiv:2501.01234 <draft> & co".to_string(),
                center_label: CenterLabel::Preprint,
                ..options(Format::Svg)
            },
        )
        .unwrap();

        assert!(svg.contains(r#"width="512" height="552""#));
        assert!(svg.contains(">Preprint</text>"));
        assert!(svg.contains(">arXiv:2501.01234 &lt;draft&gt; &amp; co</text>"));
        assert!(svg.contains(r#"y="537""#));
        assert!(svg.contains(r#"font-size="12.29""#));
        assert!(svg.contains(r##"stroke="#e5e7eb""##));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Format::Png), "image/png");
        assert_eq!(mime_type(Format::Svg), "image/svg+xml");
    }
}
