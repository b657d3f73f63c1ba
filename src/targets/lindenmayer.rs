//! Lindenmayer system generator.
//!
//! Rewrites an axiom with a set of production rules, then walks the result
//! with a turtle:
//!
//! | Symbol      | Action                                        |
//! |-------------|-----------------------------------------------|
//! | `+`         | turn right by `angle` degrees                 |
//! | `-`         | turn left by `angle` degrees                  |
//! | `[`         | push the turtle's position and heading        |
//! | `]`         | pop the last pushed position and heading      |
//! | forward set | move forward one step, drawing a segment      |
//! | other       | variable without a drawing action             |
//!
//! A heading of 0 points north. The drawing is optionally written out as an
//! SVG file and summarised as JSON.

use super::Target;
use crate::schema::{FunctionSignature, Value};
use crate::wizard::Arguments;

use anyhow::{Context, Result, anyhow, bail};
use rand::Rng;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::fs;
use tracing::{debug, info, warn};

pub const COLOR_FUNCTIONS: &[&str] = &["rainbow", "random", "heading"];

const CONTROL_SYMBOLS: &str = "[]+-";

/// Share of the canvas an auto-scaled drawing fills.
const AUTO_MARGIN: f64 = 0.9;

const DOC: &str = r#"Draws a Lindenmayer system supporting the square bracket syntax.

:param axiom: The initial axiom. May contain uppercase letters (variables), "+" (right turn), "-" (left turn),
              "[" (store turtle position and heading) and "]" (restore stored state).
              >>> "X"
:param rules: The production rules, separated by semicolons. Each rule maps a variable (uppercase letter) to
              its replacement.
              >>> "F -> FF; X -> F+[[X]-X]-F[-FX]+X"
:param depth: How many times the rules are applied to the axiom.
              >>> 4
:param angle: The angle in degrees by which the turtle turns.
              >>> 25.0
:param forward: The variables that move the turtle forward and draw.
              >>> "F"
:param step_length: The length of one forward movement.
              >>> 10.0
:param initial_angle: The initial heading of the turtle. Rotates the drawing.
              >>> 0.0
:param compression_factor: By what factor the step length shrinks per level of depth:
                           step_length * compression_factor ** depth. 'auto' fits the drawing to the canvas.
              >>> 'auto'
:param fg_color: Either the rgb values of the line color or one of the color functions
                 rainbow, random or heading.
              >>> (122, 255, 122)
              >>> rainbow
:param bg_color: The rgb values of the background color.
              >>> (0, 0, 0)
:param canvas_size: Width and height of the canvas.
              >>> (800, 800)
:param output: Path of an SVG file to write the drawing to, or None.
              >>> "fern.svg"
:param _max_symbols: Upper bound on the length of the expanded axiom."#;

type Rgb = (u8, u8, u8);
type Point = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub heading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compression {
    Auto,
    Factor(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorScheme {
    Fixed(Rgb),
    /// Hue cycles once over the drawing order.
    Rainbow,
    Random,
    /// Hue follows the turtle's heading.
    Heading,
}

impl ColorScheme {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "rainbow" => Ok(ColorScheme::Rainbow),
            "random" => Ok(ColorScheme::Random),
            "heading" => Ok(ColorScheme::Heading),
            other => Err(anyhow!("Unknown color function '{}'", other)),
        }
    }

    fn color<G: Rng>(&self, segment: &Segment, index: usize, total: usize, rng: &mut G) -> Rgb {
        match self {
            ColorScheme::Fixed(rgb) => *rgb,
            ColorScheme::Rainbow => hue_to_rgb(360.0 * index as f64 / total.max(1) as f64),
            ColorScheme::Random => (
                rng.random_range(0..=255),
                rng.random_range(0..=255),
                rng.random_range(0..=255),
            ),
            ColorScheme::Heading => hue_to_rgb(segment.heading),
        }
    }
}

/// Fully saturated color of the given hue in degrees.
fn hue_to_rgb(hue: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let channel = |c: f64| (c * 255.0).round() as u8;
    (channel(r), channel(g), channel(b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LSystem {
    axiom: String,
    rules: HashMap<char, String>,
}

impl LSystem {
    /// Parses `rules` ("F -> FF; X -> F+[X]") and checks that the axiom and
    /// every replacement only use declared variables and control symbols.
    pub fn new(axiom: &str, rules: &str) -> Result<Self> {
        let axiom = axiom.trim();
        if axiom.is_empty() {
            bail!("The axiom cannot be empty");
        }

        let mut parsed = HashMap::new();
        for rule in rules.split([';', '\n']).map(str::trim).filter(|r| !r.is_empty()) {
            let (variable, replacement) = rule
                .split_once("->")
                .ok_or_else(|| anyhow!("Rule \"{}\" is missing '->'", rule))?;
            let (variable, replacement) = (variable.trim(), replacement.trim());

            let mut chars = variable.chars();
            let name = match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_uppercase() => c,
                _ => bail!("Variable name \"{}\" is invalid", variable),
            };
            if replacement.is_empty() {
                bail!("The replacement of the variable \"{}\" is empty", name);
            }
            if parsed.insert(name, replacement.to_string()).is_some() {
                bail!("Variable \"{}\" has more than one rule", name);
            }
        }

        let system = Self {
            axiom: axiom.to_string(),
            rules: parsed,
        };
        if let Some(c) = system.unknown_symbol(&system.axiom) {
            bail!("Character \"{}\" in axiom is neither one of [,],+,- nor a variable", c);
        }
        for (variable, replacement) in &system.rules {
            if let Some(c) = system.unknown_symbol(replacement) {
                bail!(
                    "Character \"{}\" from the replacement \"{}\" of the variable \"{}\" is neither one of [,],+,- nor a variable",
                    c,
                    replacement,
                    variable
                );
            }
        }
        Ok(system)
    }

    fn unknown_symbol(&self, text: &str) -> Option<char> {
        text.chars()
            .find(|c| !CONTROL_SYMBOLS.contains(*c) && !self.rules.contains_key(c))
    }

    /// Applies the rules `depth` times.
    pub fn expand(&self, depth: u32, max_symbols: usize) -> Result<String> {
        let mut current = self.axiom.clone();
        for level in 0..depth {
            let mut next = String::with_capacity(current.len() * 2);
            for symbol in current.chars() {
                match self.rules.get(&symbol) {
                    Some(replacement) => next.push_str(replacement),
                    None => next.push(symbol),
                }
                if next.len() > max_symbols {
                    bail!(
                        "Expansion exceeds {} symbols at depth {}; lower the depth",
                        max_symbols,
                        level + 1
                    );
                }
            }
            current = next;
        }
        debug!("Expanded axiom to {} symbols", current.len());
        Ok(current)
    }
}

/// Walks `symbols` from the origin and returns the drawn segments.
pub fn trace(
    symbols: &str,
    forward: &HashSet<char>,
    angle: f64,
    step: f64,
    initial_angle: f64,
) -> Result<Vec<Segment>> {
    let mut position: Point = (0.0, 0.0);
    let mut heading = (initial_angle + 90.0).rem_euclid(360.0);
    let mut stack: Vec<(Point, f64)> = Vec::new();
    let mut segments = Vec::new();

    for (index, symbol) in symbols.chars().enumerate() {
        match symbol {
            '[' => stack.push((position, heading)),
            ']' => {
                let Some((p, h)) = stack.pop() else {
                    bail!("Unmatched ] bracket encountered at index {}", index);
                };
                position = p;
                heading = h;
            }
            '+' => heading = (heading - angle).rem_euclid(360.0),
            '-' => heading = (heading + angle).rem_euclid(360.0),
            c if forward.contains(&c) => {
                let radians = heading.to_radians();
                let to = (
                    position.0 + step * radians.cos(),
                    position.1 + step * radians.sin(),
                );
                segments.push(Segment {
                    from: position,
                    to,
                    heading,
                });
                position = to;
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        warn!(
            "{} opening square brackets were never closed; review the axiom and rules",
            stack.len()
        );
    }
    Ok(segments)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Extreme coordinates of the drawing, origin included.
    pub fn of(segments: &[Segment]) -> Self {
        let mut bounds = Bounds {
            min: (0.0, 0.0),
            max: (0.0, 0.0),
        };
        for point in segments.iter().flat_map(|s| [s.from, s.to]) {
            bounds.min = (bounds.min.0.min(point.0), bounds.min.1.min(point.1));
            bounds.max = (bounds.max.0.max(point.0), bounds.max.1.max(point.1));
        }
        bounds
    }

    pub fn center(&self) -> Point {
        (
            (self.min.0 + self.max.0) / 2.0,
            (self.min.1 + self.max.1) / 2.0,
        )
    }

    /// Scale at which the bounds fill `margin` of the canvas.
    fn fit(&self, canvas: (u32, u32), margin: f64) -> f64 {
        let width = self.max.0 - self.min.0;
        let height = self.max.1 - self.min.1;
        let sx = if width > 0.0 { canvas.0 as f64 / width } else { f64::INFINITY };
        let sy = if height > 0.0 { canvas.1 as f64 / height } else { f64::INFINITY };
        let scale = sx.min(sy);
        if scale.is_finite() { scale * margin } else { 1.0 }
    }
}

struct Settings {
    axiom: String,
    rules: String,
    depth: u32,
    angle: f64,
    forward: HashSet<char>,
    step_length: f64,
    initial_angle: f64,
    compression: Compression,
    fg_color: ColorScheme,
    bg_color: Rgb,
    canvas: (u32, u32),
    output: Option<String>,
    max_symbols: usize,
}

impl Settings {
    fn from_arguments(arguments: &Arguments) -> Result<Self> {
        let compression = match arguments.get("compression_factor") {
            Some(Value::Str(s)) if s == "auto" => Compression::Auto,
            _ => Compression::Factor(arguments.extract("compression_factor")?),
        };
        let fg_color = match arguments.get("fg_color") {
            Some(Value::Function(name)) => ColorScheme::from_name(name)?,
            _ => ColorScheme::Fixed(arguments.extract("fg_color")?),
        };

        let forward: String = arguments.extract_or("forward", "F".to_string());
        if let Some(c) = forward.chars().find(|c| !c.is_ascii_uppercase()) {
            bail!("Forward symbol \"{}\" is not a variable", c);
        }

        Ok(Self {
            axiom: arguments.extract("axiom")?,
            rules: arguments.extract("rules")?,
            depth: arguments.extract("depth")?,
            angle: arguments.extract("angle")?,
            forward: forward.chars().collect(),
            step_length: arguments.extract_or("step_length", 10.0),
            initial_angle: arguments.extract_or("initial_angle", 0.0),
            compression,
            fg_color,
            bg_color: arguments.extract_or("bg_color", (0, 0, 0)),
            canvas: arguments.extract_or("canvas_size", (800, 800)),
            output: arguments.extract_or("output", None),
            max_symbols: arguments.extract_or("_max_symbols", 2_000_000),
        })
    }
}

pub struct Drawing {
    pub symbols: usize,
    pub segments: Vec<Segment>,
    pub bounds: Bounds,
    colors: Vec<Rgb>,
    background: Rgb,
    canvas: (u32, u32),
    scale: f64,
    /// World point placed at the centre of the canvas.
    center: Point,
}

impl Drawing {
    fn new(settings: &Settings) -> Result<Self> {
        if settings.step_length == 0.0 {
            bail!("The step length cannot be zero");
        }
        let step = match settings.compression {
            Compression::Auto => settings.step_length,
            Compression::Factor(f) if f == 0.0 => bail!("The compression factor cannot be zero"),
            Compression::Factor(f) => settings.step_length * f.powi(settings.depth as i32),
        };

        let system = LSystem::new(&settings.axiom, &settings.rules)?;
        let symbols = system.expand(settings.depth, settings.max_symbols)?;
        let segments = trace(
            &symbols,
            &settings.forward,
            settings.angle,
            step,
            settings.initial_angle,
        )?;
        let bounds = Bounds::of(&segments);

        let (scale, center) = match settings.compression {
            Compression::Auto => (bounds.fit(settings.canvas, AUTO_MARGIN), bounds.center()),
            Compression::Factor(_) => (1.0, (0.0, 0.0)),
        };

        let mut rng = rand::rng();
        let total = segments.len();
        let colors = segments
            .iter()
            .enumerate()
            .map(|(i, s)| settings.fg_color.color(s, i, total, &mut rng))
            .collect();

        Ok(Self {
            symbols: symbols.len(),
            segments,
            bounds,
            colors,
            background: settings.bg_color,
            canvas: settings.canvas,
            scale,
            center,
        })
    }

    /// Maps a world point to canvas coordinates (y axis pointing down).
    fn project(&self, (x, y): Point) -> Point {
        (
            self.canvas.0 as f64 / 2.0 + (x - self.center.0) * self.scale,
            self.canvas.1 as f64 / 2.0 - (y - self.center.1) * self.scale,
        )
    }

    pub fn to_svg(&self) -> String {
        let (width, height) = self.canvas;
        let (r, g, b) = self.background;
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"rgb({r},{g},{b})\"/>\n"
        );
        for (segment, (r, g, b)) in self.segments.iter().zip(&self.colors) {
            let (x1, y1) = self.project(segment.from);
            let (x2, y2) = self.project(segment.to);
            svg.push_str(&format!(
                "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"rgb({r},{g},{b})\"/>\n"
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }

    pub fn summary(&self) -> serde_json::Value {
        json!({
            "symbols": self.symbols,
            "segments": self.segments.len(),
            "min": [self.bounds.min.0, self.bounds.min.1],
            "max": [self.bounds.max.0, self.bounds.max.1],
            "scale": self.scale,
        })
    }
}

pub struct Lindenmayer {
    signature: FunctionSignature,
}

impl Lindenmayer {
    pub fn new() -> Result<Self> {
        let white = Value::Seq(vec![Value::Int(255); 3]);
        let black = Value::Seq(vec![Value::Int(0); 3]);

        let signature = FunctionSignature::builder("lindenmayer")
            .doc(DOC)
            .param("axiom", "str")
            .param("rules", "str")
            .param("depth", "Annotated[int, ValueRange(1, ∞)]")
            .param("angle", "float")
            .param_with_default("forward", "str", Value::str("F"))
            .param_with_default("step_length", "float", Value::Float(10.0))
            .param_with_default("initial_angle", "float", Value::Float(0.0))
            .param_with_default(
                "compression_factor",
                "Union[Literal['auto'], float]",
                Value::str("auto"),
            )
            .param_with_default("fg_color", "Union[Tuple[int, int, int], Callable]", white)
            .param_with_default("bg_color", "Tuple[int, int, int]", black)
            .param_with_default(
                "canvas_size",
                "Tuple[int, int]",
                Value::Seq(vec![Value::Int(800), Value::Int(800)]),
            )
            .param_with_default("output", "Optional[str]", Value::None)
            .param_with_default("_max_symbols", "int", Value::Int(2_000_000))
            .build()?;

        Ok(Self { signature })
    }
}

impl Target for Lindenmayer {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn functions(&self) -> &[&'static str] {
        COLOR_FUNCTIONS
    }

    fn invoke(&self, arguments: &Arguments) -> Result<serde_json::Value> {
        let settings = Settings::from_arguments(arguments)?;
        info!("Started drawing.");
        let drawing = Drawing::new(&settings)?;
        info!(
            "Finished drawing: {} symbols, {} segments",
            drawing.symbols,
            drawing.segments.len()
        );

        let mut summary = drawing.summary();
        if let Some(path) = &settings.output {
            fs::write(path, drawing.to_svg())
                .with_context(|| format!("Failed to write '{}'", path))?;
            info!("Wrote drawing to '{}'", path);
            summary["output"] = json!(path);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    fn forward(symbols: &str) -> HashSet<char> {
        symbols.chars().collect()
    }

    /// Required arguments plus every declared default.
    fn arguments(target: &Lindenmayer, extra: &[(&str, Value)]) -> Arguments {
        let mut args: Arguments = target
            .signature()
            .params()
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        args.insert("axiom", Value::str("F"));
        args.insert("rules", Value::str("F -> F+F-F"));
        args.insert("depth", Value::Int(2));
        args.insert("angle", Value::Int(90));
        for (name, value) in extra {
            args.insert(*name, value.clone());
        }
        args
    }

    #[test]
    fn test_rules_parse_and_validate() {
        let system = LSystem::new("X", "F -> FF; X -> F+[[X]-X]-F[-FX]+X").unwrap();
        assert_eq!(system.rules.len(), 2);

        assert!(LSystem::new("X", "f -> FF; X -> F").is_err());
        assert!(LSystem::new("F", "F -> FG").is_err());
        assert!(LSystem::new("FY", "F -> FF").is_err());
        assert!(LSystem::new("F", "F FF").is_err());
        assert!(LSystem::new("F", "F -> FF; F -> F").is_err());
        assert!(LSystem::new("", "F -> FF").is_err());
    }

    #[test]
    fn test_expand() {
        let system = LSystem::new("F", "F -> F+F").unwrap();
        assert_eq!(system.expand(0, 100).unwrap(), "F");
        assert_eq!(system.expand(2, 100).unwrap(), "F+F+F+F");
        assert!(system.expand(10, 100).is_err());
    }

    #[test]
    fn test_trace_turns_and_brackets() {
        let segments = trace("F+F", &forward("F"), 90.0, 1.0, 0.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(close(segments[0].to, (0.0, 1.0)));
        assert!(close(segments[1].to, (1.0, 1.0)));

        let segments = trace("F[-F]F", &forward("F"), 90.0, 1.0, 0.0).unwrap();
        assert!(close(segments[1].to, (-1.0, 1.0)));
        assert!(close(segments[2].from, (0.0, 1.0)));
        assert!(close(segments[2].to, (0.0, 2.0)));

        assert!(trace("F]F", &forward("F"), 90.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_non_forward_variables_do_not_draw() {
        let segments = trace("XFX", &forward("F"), 90.0, 2.0, 0.0).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_bounds_include_origin() {
        let segments = trace("F+F", &forward("F"), 90.0, 1.0, 0.0).unwrap();
        let bounds = Bounds::of(&segments);
        assert!(close(bounds.min, (0.0, 0.0)));
        assert!(close(bounds.max, (1.0, 1.0)));
        assert!(close(bounds.center(), (0.5, 0.5)));
    }

    #[test]
    fn test_hue_to_rgb() {
        assert_eq!(hue_to_rgb(0.0), (255, 0, 0));
        assert_eq!(hue_to_rgb(120.0), (0, 255, 0));
        assert_eq!(hue_to_rgb(240.0), (0, 0, 255));
        assert_eq!(hue_to_rgb(360.0), (255, 0, 0));
    }

    #[test]
    fn test_invoke_with_fixed_compression_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        let target = Lindenmayer::new().unwrap();
        let args = arguments(
            &target,
            &[
                ("compression_factor", Value::Float(0.5)),
                ("output", Value::str(path.to_string_lossy())),
            ],
        );

        let summary = target.invoke(&args).unwrap();
        assert_eq!(summary["symbols"], json!(17));
        assert_eq!(summary["segments"], json!(9));
        assert_eq!(summary["scale"], json!(1.0));

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<line").count(), 9);
        assert!(svg.contains("stroke=\"rgb(255,255,255)\""));
    }

    #[test]
    fn test_auto_compression_fits_canvas() {
        let target = Lindenmayer::new().unwrap();
        let args = arguments(&target, &[("fg_color", Value::Function("rainbow".into()))]);
        let settings = Settings::from_arguments(&args).unwrap();
        let drawing = Drawing::new(&settings).unwrap();

        for segment in &drawing.segments {
            for point in [segment.from, segment.to] {
                let (x, y) = drawing.project(point);
                assert!((0.0..=800.0).contains(&x) && (0.0..=800.0).contains(&y));
            }
        }
        assert_eq!(drawing.colors[0], (255, 0, 0));
    }

    #[test]
    fn test_invalid_settings_fail() {
        let target = Lindenmayer::new().unwrap();
        for extra in [
            ("step_length", Value::Float(0.0)),
            ("compression_factor", Value::Float(0.0)),
            ("fg_color", Value::Function("plaid".into())),
            ("fg_color", Value::Seq(vec![Value::Int(300), Value::Int(0), Value::Int(0)])),
            ("forward", Value::str("+")),
            ("_max_symbols", Value::Int(3)),
        ] {
            let args = arguments(&target, &[extra.clone()]);
            assert!(target.invoke(&args).is_err(), "{:?}", extra);
        }
    }

    #[test]
    fn test_signature_defaults() {
        let target = Lindenmayer::new().unwrap();
        let signature = target.signature();
        assert!(!signature.param("depth").unwrap().has_default());
        assert!(signature.param("_max_symbols").unwrap().is_internal());
        assert_eq!(
            signature.param("depth").unwrap().doc.as_deref(),
            Some("How many times the rules are applied to the axiom. >>> 4")
        );
        assert_eq!(target.functions(), COLOR_FUNCTIONS);
    }
}
