//! L-system curves
//!
//! The axiom is rewritten `generations` times, then the resulting string is
//! read by a turtle:
//!
//! - a symbol in `draw_symbols` moves forward one step, drawing
//! - `f` moves forward without drawing
//! - `+` / `-` turn by plus / minus `turn_angle` degrees
//! - `[` / `]` push / pop the turtle state
//!
//! Every other symbol only takes part in rewriting.

use cgmath::{Deg, Rad, Vector2};
use rand::RngCore;

use super::{raster, Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

const MAX_GENERATIONS: u32 = 16;
const MAX_EXPANDED_LEN: usize = 4_000_000;

#[derive(Debug, Clone)]
pub struct LSystem {
    pub name: String,
    pub axiom: String,
    pub rules: Vec<(char, String)>,
    pub generations: u32,
    /// Degrees
    pub turn_angle: f32,
    pub step_length: f32,
    /// Degrees
    pub initial_heading: f32,
    pub draw_symbols: Vec<char>,
    /// Share of the grid the curve's bounding box is scaled to
    pub fill: f32,
    pub brush_half_width: u32,
}

#[derive(Debug, Clone, Copy)]
struct Turtle {
    position: Vector2<f32>,
    heading: Rad<f32>,
}

impl LSystem {
    /// Heighway dragon
    pub fn dragon_curve() -> Self {
        Self {
            name: "Dragon Curve".into(),
            axiom: "FX".into(),
            rules: vec![('X', "X+YF+".into()), ('Y', "-FX-Y".into())],
            generations: 12,
            turn_angle: 90.0,
            step_length: 1.0,
            initial_heading: 0.0,
            draw_symbols: vec!['F'],
            fill: 0.8,
            brush_half_width: 0,
        }
    }

    pub fn sierpinski_arrowhead() -> Self {
        Self {
            name: "Sierpinski Arrowhead".into(),
            axiom: "F".into(),
            rules: vec![('F', "G-F-G".into()), ('G', "F+G+F".into())],
            generations: 7,
            turn_angle: 60.0,
            step_length: 1.0,
            initial_heading: 0.0,
            draw_symbols: vec!['F', 'G'],
            fill: 0.85,
            brush_half_width: 0,
        }
    }

    fn validate(&self) -> LifeResult<()> {
        if self.axiom.is_empty() {
            return Err(LifeError::generator("L-system axiom is empty"));
        }
        if self.generations > MAX_GENERATIONS {
            return Err(LifeError::generator(format!(
                "L-system generations {} exceed the limit of {MAX_GENERATIONS}",
                self.generations
            )));
        }
        if !(self.step_length > 0.0 && self.step_length.is_finite()) {
            return Err(LifeError::generator(format!(
                "L-system step length {} must be positive",
                self.step_length
            )));
        }
        if !self.turn_angle.is_finite() || !self.initial_heading.is_finite() {
            return Err(LifeError::generator("L-system angles must be finite"));
        }
        if !(self.fill > 0.0 && self.fill <= 1.0) {
            return Err(LifeError::generator(format!(
                "L-system fill {} must lie in (0, 1]",
                self.fill
            )));
        }
        Ok(())
    }

    /// Apply the rewrite rules `generations` times
    pub fn expand(&self) -> LifeResult<String> {
        let mut current = self.axiom.clone();
        for _ in 0..self.generations {
            let mut next = String::with_capacity(current.len() * 2);
            for symbol in current.chars() {
                match self.rules.iter().find(|(from, _)| *from == symbol) {
                    Some((_, replacement)) => next.push_str(replacement),
                    None => next.push(symbol),
                }
            }
            if next.len() > MAX_EXPANDED_LEN {
                return Err(LifeError::generator(format!(
                    "L-system '{}' expands past {MAX_EXPANDED_LEN} symbols",
                    self.name
                )));
            }
            current = next;
        }
        Ok(current)
    }

    /// Walk the turtle over `program`, returning one polyline per pen-down run
    pub fn trace(&self, program: &str) -> LifeResult<Vec<Vec<Vector2<f32>>>> {
        let turn: Rad<f32> = Deg(self.turn_angle).into();
        let mut turtle = Turtle {
            position: Vector2::new(0.0, 0.0),
            heading: Deg(self.initial_heading).into(),
        };
        let mut stack = Vec::new();
        let mut polylines = Vec::new();
        let mut current = vec![turtle.position];

        for symbol in program.chars() {
            match symbol {
                '+' => turtle.heading += turn,
                '-' => turtle.heading -= turn,
                '[' => stack.push(turtle),
                ']' => {
                    turtle = stack.pop().ok_or_else(|| {
                        LifeError::generator(format!("unbalanced ']' in L-system '{}'", self.name))
                    })?;
                    flush(&mut polylines, &mut current, turtle.position);
                }
                'f' => {
                    turtle.position += heading_vector(turtle.heading) * self.step_length;
                    flush(&mut polylines, &mut current, turtle.position);
                }
                s if self.draw_symbols.contains(&s) => {
                    turtle.position += heading_vector(turtle.heading) * self.step_length;
                    current.push(turtle.position);
                }
                _ => {}
            }
        }
        flush(&mut polylines, &mut current, turtle.position);

        Ok(polylines)
    }
}

fn heading_vector(heading: Rad<f32>) -> Vector2<f32> {
    Vector2::new(heading.0.cos(), heading.0.sin())
}

/// Close the running polyline if it drew anything and restart it at `start`
fn flush(polylines: &mut Vec<Vec<Vector2<f32>>>, current: &mut Vec<Vector2<f32>>, start: Vector2<f32>) {
    let finished = std::mem::replace(current, vec![start]);
    if finished.len() > 1 {
        polylines.push(finished);
    }
}

impl PatternGenerator for LSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, width: u32, height: u32, _rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let program = self.expand()?;
        let polylines = self.trace(&program)?;
        let (min, max) = raster::bounds(&polylines).ok_or_else(|| {
            LifeError::generator(format!("L-system '{}' draws nothing", self.name))
        })?;

        let viewport = raster::Viewport::fit(width, height, min, max, self.fill);
        let mut pattern = Pattern::new();
        raster::draw_polylines(&mut pattern, &polylines, &viewport, self.brush_half_width);
        pattern.dedup();

        Ok(pattern)
    }
}
